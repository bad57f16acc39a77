// src/logging_middleware.rs
//! Middleware for logging requests and responses in debug mode
//!
//! Only the method, path, status, and latency are recorded. Headers and
//! bodies carry session cookies and ID tokens, so they are never logged.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::debug;

/// Middleware to log each request and its outcome in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    debug!(method = %method, path = %path, "📥 Request");

    let response = next.run(request).await;

    debug!(
        method = %method,
        path = %path,
        status = %response.status(),
        latency_ms = started.elapsed().as_millis() as u64,
        "📤 Response"
    );

    response
}
