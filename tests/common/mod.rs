//! Shared test utilities for integration tests.
//!
//! This module provides a `TestClient` that can be used to test the
//! application by making HTTP requests against an in-memory database.
//! Methods are intentionally broad to support various test scenarios across
//! different test files.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use http_body_util::BodyExt;
use quartermaster::auth;
use quartermaster::config::{AuthMode, Config};
use quartermaster::db::{create_in_memory_pool, migrations};
use quartermaster::handlers;
use quartermaster::state::{AppState, JsManifest};
use quartermaster::xsrf::XsrfToken;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tower_cookies::CookieManagerLayer;

/// A test client that simulates a browser session, allowing sequential
/// requests against the application.
pub struct TestClient {
    pub state: AppState,
}

impl TestClient {
    /// Create a new test client with a fresh in-memory database (unauthenticated mode).
    pub fn new() -> Self {
        Self::with_auth_mode(AuthMode::Unauthenticated)
    }

    /// Create a new test client with a specific authentication mode.
    pub fn with_auth_mode(auth_mode: AuthMode) -> Self {
        let pool = create_in_memory_pool().expect("Failed to create in-memory pool");
        {
            let conn = pool.get().expect("Failed to get connection");
            migrations::run_migrations(&conn, Path::new("migrations"))
                .expect("Failed to run migrations");
        }

        let config = Config {
            host: "127.0.0.1".into(),
            port: 7080,
            database_path: PathBuf::from(":memory:"),
            migrations_path: PathBuf::from("migrations"),
            static_path: PathBuf::from("static"),
            auth_mode,
            currency: "BRL".into(),
            locale: "pt-BR".into(),
            report_title: "Event Cost Report".into(),
        };

        let state = AppState {
            db: pool,
            config: Arc::new(config),
            manifest: JsManifest::default(),
            xsrf_token: XsrfToken::generate(),
            sessions: Arc::new(Mutex::new(HashSet::new())),
        };

        Self { state }
    }

    /// Get the router for making requests (without auth middleware for direct handler testing).
    pub fn router(&self) -> Router {
        handlers::routes().with_state(self.state.clone())
    }

    /// Get the full router with auth middleware applied (mimics production setup).
    pub fn router_with_auth(&self) -> Router {
        use axum::middleware;

        handlers::routes()
            .route("/login", get(auth::login_page))
            .route("/login", post(auth::login_submit))
            .route("/logout", post(auth::logout))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth::auth_middleware,
            ))
            .layer(CookieManagerLayer::new())
            .with_state(self.state.clone())
    }

    /// Make a GET request and return status and body.
    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        let response = self
            .router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&body).to_string())
    }

    /// Make a GET request through the auth middleware, returning status,
    /// the Location header (if any) and the body.
    pub async fn get_with_auth(&self, uri: &str) -> (StatusCode, Option<String>, String) {
        self.get_with_auth_and_cookie(uri, None).await
    }

    /// Same as [`get_with_auth`], optionally sending a session cookie.
    pub async fn get_with_auth_and_cookie(
        &self,
        uri: &str,
        cookie: Option<&str>,
    ) -> (StatusCode, Option<String>, String) {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header("Cookie", cookie);
        }

        let response = self
            .router_with_auth()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, location, String::from_utf8_lossy(&body).to_string())
    }

    /// Make a POST request with form data and return status and body.
    pub async fn post_form(&self, uri: &str, form_data: &[(&str, &str)]) -> (StatusCode, String) {
        let body = form_data
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let response = self
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&body_bytes).to_string())
    }

    /// Make a POST request with form data through the auth middleware,
    /// returning status, Set-Cookie header and body.
    pub async fn post_form_with_auth(
        &self,
        uri: &str,
        form_data: &[(&str, &str)],
    ) -> (StatusCode, Option<String>, String) {
        let body = form_data
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let response = self
            .router_with_auth()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let set_cookie = response
            .headers()
            .get("set-cookie")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
        (
            status,
            set_cookie,
            String::from_utf8_lossy(&body_bytes).to_string(),
        )
    }

    /// Make a multipart POST request. Each part is (name, filename,
    /// content_type, bytes); parts without a filename are sent as plain
    /// text fields.
    pub async fn post_multipart(
        &self,
        uri: &str,
        parts: &[(&str, Option<&str>, &str, Vec<u8>)],
    ) -> (StatusCode, String) {
        let boundary = "qm-test-boundary";
        let mut body: Vec<u8> = Vec::new();

        for (name, filename, content_type, bytes) in parts {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            match filename {
                Some(filename) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                ),
            }
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        let response = self
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(
                        "Content-Type",
                        format!("multipart/form-data; boundary={}", boundary),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&body_bytes).to_string())
    }

    /// Get JSON from an endpoint and parse it.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        uri: &str,
    ) -> (StatusCode, Option<T>) {
        let (status, body) = self.get(uri).await;
        let parsed = serde_json::from_str(&body).ok();
        (status, parsed)
    }

    // =========================================================================
    // Helper methods for creating entities through the API
    // =========================================================================

    /// Register a purchase with a single item and return success status.
    pub async fn create_purchase(
        &self,
        date: &str,
        team_id: i64,
        location: &str,
        product: &str,
        quantity: &str,
        unit_price: &str,
    ) -> bool {
        let team_id = team_id.to_string();
        let (status, _) = self
            .post_form(
                "/purchases/create",
                &[
                    ("purchase_date", date),
                    ("team_id", &team_id),
                    ("location_name", location),
                    ("product_name[]", product),
                    ("unit_of_measure[]", "unit"),
                    ("quantity[]", quantity),
                    ("unit_price[]", unit_price),
                    ("item_notes[]", ""),
                ],
            )
            .await;
        // Redirect (303) indicates success
        status == StatusCode::SEE_OTHER
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}
