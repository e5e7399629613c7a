//! XSRF (Cross-Site Request Forgery) protection middleware and utilities.
//!
//! State-changing requests (POST, PUT, DELETE, PATCH) must present the
//! session's XSRF token, either in the `X-XSRF-Token` header (fetch/HTMX
//! requests, including the multipart chart upload) or as a `_xsrf_token`
//! form field. The token is rotated on login so it is bound to the session.

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// The header name for XSRF tokens in AJAX/HTMX requests.
pub const XSRF_HEADER: &str = "X-XSRF-Token";

/// The form field name for XSRF tokens in form submissions.
pub const XSRF_FORM_FIELD: &str = "_xsrf_token";

/// XSRF token storage shared across the application. Rotated on login.
#[derive(Clone)]
pub struct XsrfToken(Arc<RwLock<String>>);

impl XsrfToken {
    /// Generate a new random XSRF token.
    pub fn generate() -> Self {
        Self(Arc::new(RwLock::new(Uuid::new_v4().to_string())))
    }

    /// Get the current token value.
    pub fn value(&self) -> String {
        self.0.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the token with a fresh random value.
    pub fn regenerate(&self) {
        let mut guard = self.0.write().unwrap_or_else(|e| e.into_inner());
        *guard = Uuid::new_v4().to_string();
    }
}

/// Middleware that validates XSRF tokens on state-changing requests.
pub async fn xsrf_middleware(
    xsrf_token: XsrfToken,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();

    if !matches!(
        method,
        Method::POST | Method::PUT | Method::DELETE | Method::PATCH
    ) {
        return next.run(request).await;
    }

    // Header first: fetch/HTMX requests and the multipart chart upload
    // always send it there.
    let header_token = request
        .headers()
        .get(XSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    if let Some(token) = header_token {
        if token == xsrf_token.value() {
            return next.run(request).await;
        }
        return xsrf_error_response();
    }

    // Plain form submissions carry the token as a hidden field; the body has
    // to be read and handed back to the handler.
    let is_form = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);

    if is_form {
        let (parts, body) = request.into_parts();
        let bytes = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(b) => b,
            Err(_) => return xsrf_error_response(),
        };

        let body_str = match std::str::from_utf8(&bytes) {
            Ok(s) => s,
            Err(_) => return xsrf_error_response(),
        };

        let form_token = serde_urlencoded::from_str::<Vec<(String, String)>>(body_str)
            .ok()
            .and_then(|pairs| {
                pairs
                    .into_iter()
                    .find(|(key, _)| key == XSRF_FORM_FIELD)
                    .map(|(_, value)| value)
            });

        if form_token.as_deref() == Some(xsrf_token.value().as_str()) {
            let body = Body::from(bytes);
            return next.run(Request::from_parts(parts, body)).await;
        }

        return xsrf_error_response();
    }

    // Multipart and JSON requests must use the header, checked above.
    xsrf_error_response()
}

fn xsrf_error_response() -> Response {
    (StatusCode::FORBIDDEN, "Invalid or missing XSRF token").into_response()
}
