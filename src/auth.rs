//! Authentication middleware and handlers.
//!
//! Password-based authentication with an Argon2 hash; authentication can be
//! disabled by setting `QM_PASSWORD_HASH` to the explicit unauthenticated
//! magic value. Session tokens are cryptographically random UUIDs validated
//! against the server-side session store carried in [`AppState`]; tokens are
//! invalidated on logout or server restart.
//!
//! Unauthenticated requests to protected pages redirect to the login page
//! with the originally requested path in the `next` query parameter, so the
//! user lands back where they were headed after signing in.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use askama::Template;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::config::AuthMode;
use crate::error::RenderHtml;
use crate::state::{AppState, JsManifest};
use crate::VERSION;

/// Cookie name for the session token.
const SESSION_COOKIE: &str = "session";

/// Template for the login page.
#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub title: String,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub xsrf_token: String,
    pub error: Option<String>,
    pub next: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPageParams {
    pub next: Option<String>,
}

/// Form data for login.
#[derive(Debug, Deserialize)]
pub struct LoginFormData {
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Only internal paths are allowed as post-login targets; anything else
/// falls back to the dashboard.
fn sanitize_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/".to_string(),
    }
}

/// Authentication middleware guarding every protected route.
///
/// While no session is established the guard either forwards to the login
/// page (regular page loads, preserving the requested path) or answers 401
/// (HTMX/API/mutating requests); children are rendered only once a valid
/// session cookie is present.
pub async fn auth_middleware(
    State(state): State<AppState>,
    cookies: Cookies,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Skip auth entirely when no password is configured
    if matches!(state.config.auth_mode, AuthMode::Unauthenticated) {
        return next.run(request).await;
    }

    // Check for valid session cookie against server-side store
    if let Some(session_cookie) = cookies.get(SESSION_COOKIE) {
        let token = session_cookie.value().to_string();
        let is_valid = state
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&token);
        if is_valid {
            return next.run(request).await;
        }
    }

    let path = request.uri().path();

    // Allow access to login page and static assets
    if path == "/login" || path.starts_with("/static/") || path == "/health" {
        return next.run(request).await;
    }

    // For HTMX requests, API calls and non-GET methods, return 401
    let is_htmx = request.headers().contains_key("HX-Request");
    if is_htmx || path.starts_with("/api/") || request.method() != axum::http::Method::GET {
        return (StatusCode::UNAUTHORIZED, "Authentication required").into_response();
    }

    // Redirect to login, keeping the originally requested path for afterwards
    let target = match request.uri().query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    Redirect::to(&format!("/login?next={}", urlencoding::encode(&target))).into_response()
}

/// Render the login page.
pub async fn login_page(
    State(state): State<AppState>,
    Query(params): Query<LoginPageParams>,
) -> impl IntoResponse {
    // If authentication is not required, redirect to home
    if matches!(state.config.auth_mode, AuthMode::Unauthenticated) {
        return Redirect::to("/").into_response();
    }

    let template = LoginTemplate {
        title: "Login".into(),
        manifest: state.manifest.clone(),
        version: VERSION,
        xsrf_token: state.xsrf_token.value(),
        error: None,
        next: sanitize_next(params.next.as_deref()),
    };

    match template.render_html() {
        Ok(html) => html.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Handle login form submission.
pub async fn login_submit(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginFormData>,
) -> impl IntoResponse {
    let password_hash = match &state.config.auth_mode {
        AuthMode::Unauthenticated => return Redirect::to("/").into_response(),
        AuthMode::Password(hash) => hash,
    };

    let next = sanitize_next(form.next.as_deref());

    if verify_password(&form.password, password_hash) {
        // Generate a cryptographically random session token
        let session_token = Uuid::new_v4().to_string();
        state
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session_token.clone());

        // Rotate the XSRF token so it is bound to this session
        state.xsrf_token.regenerate();

        let cookie = Cookie::build((SESSION_COOKIE, session_token))
            .path("/")
            .http_only(true)
            .same_site(tower_cookies::cookie::SameSite::Strict)
            .build();
        cookies.add(cookie);

        tracing::info!("Login successful");
        return Redirect::to(&next).into_response();
    }

    tracing::warn!("Login failed: invalid password");

    let template = LoginTemplate {
        title: "Login".into(),
        manifest: state.manifest.clone(),
        version: VERSION,
        xsrf_token: state.xsrf_token.value(),
        error: Some("Invalid password".into()),
        next,
    };

    match template.render_html() {
        Ok(html) => html.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Handle logout.
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> impl IntoResponse {
    // Remove the token from the server-side session store
    if let Some(session_cookie) = cookies.get(SESSION_COOKIE) {
        state
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(session_cookie.value());
    }

    // Remove the session cookie
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .build();
    cookies.remove(cookie);

    Redirect::to("/login")
}

/// Verify a password against an Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        tracing::error!("Invalid password hash format in QM_PASSWORD_HASH");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
