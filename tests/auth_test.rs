//! Integration tests for the session guard and login flow.

mod common;

use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::Argon2;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::TestClient;
use quartermaster::config::AuthMode;
use tower::ServiceExt;

fn password_mode(password: &str) -> AuthMode {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("Failed to hash password")
        .to_string();
    AuthMode::Password(hash)
}

/// Without a configured password everything is reachable.
#[tokio::test]
async fn test_unauthenticated_mode_allows_access() {
    let client = TestClient::new();
    let (status, _, _) = client.get_with_auth("/").await;
    assert_eq!(status, StatusCode::OK);
}

/// Protected pages redirect to login, preserving the requested path.
#[tokio::test]
async fn test_redirect_preserves_requested_path() {
    let client = TestClient::with_auth_mode(password_mode("hunter2"));

    let (status, location, _) = client.get_with_auth("/").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/login?next=%2F"));

    let (_, location, _) = client.get_with_auth("/reports?team_id=3").await;
    assert_eq!(
        location.as_deref(),
        Some("/login?next=%2Freports%3Fteam_id%3D3")
    );
}

/// API and HTMX requests get a bare 401 instead of a redirect.
#[tokio::test]
async fn test_api_and_htmx_get_401() {
    let client = TestClient::with_auth_mode(password_mode("hunter2"));

    let (status, _, _) = client.get_with_auth("/api/reports/team-spending").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let response = client
        .router_with_auth()
        .oneshot(
            Request::builder()
                .uri("/purchases/table")
                .header("HX-Request", "true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Wrong password re-renders the login page with an error.
#[tokio::test]
async fn test_login_with_wrong_password() {
    let client = TestClient::with_auth_mode(password_mode("hunter2"));

    let (status, set_cookie, body) = client
        .post_form_with_auth("/login", &[("password", "wrong")])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(set_cookie.is_none());
    assert!(body.contains("Invalid password"));
}

/// A correct login issues a session cookie and lands on the preserved path;
/// the cookie then opens protected pages.
#[tokio::test]
async fn test_login_then_access() {
    let client = TestClient::with_auth_mode(password_mode("hunter2"));

    let (status, set_cookie, _) = client
        .post_form_with_auth(
            "/login",
            &[("password", "hunter2"), ("next", "/purchases")],
        )
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let cookie = set_cookie.expect("Session cookie not issued");
    assert!(cookie.starts_with("session="));

    let session = cookie.split(';').next().unwrap();
    let (status, _, body) = client
        .get_with_auth_and_cookie("/purchases", Some(session))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Purchases"));
}

/// The login redirect target never leaves the application.
#[tokio::test]
async fn test_login_rejects_external_redirect() {
    let client = TestClient::with_auth_mode(password_mode("hunter2"));

    let response = client
        .router_with_auth()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    "password=hunter2&next=https%3A%2F%2Fevil.example",
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok());
    assert_eq!(location, Some("/"));
}

/// An unknown session token is not accepted.
#[tokio::test]
async fn test_bogus_session_cookie_rejected() {
    let client = TestClient::with_auth_mode(password_mode("hunter2"));

    let (status, location, _) = client
        .get_with_auth_and_cookie("/", Some("session=forged-token"))
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/login?next=%2F"));
}
