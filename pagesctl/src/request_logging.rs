//! Request logging middleware.
//!
//! Persists one `request_logs` row per API request (method, path, status,
//! latency) when `enable_request_logging` is set. The insert happens on a
//! spawned task so logging never adds latency to, or fails, the request
//! itself.

use axum::{extract::State, middleware::Next, response::Response};
use std::time::Instant;
use tracing::debug;

use crate::AppState;

/// Paths that would only generate noise in the log.
fn is_ignored(path: &str) -> bool {
    matches!(path, "/healthz" | "/internal/metrics")
}

pub async fn log_requests(State(state): State<AppState>, request: axum::extract::Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    if state.config.enable_request_logging && !is_ignored(&path) {
        let status_code = response.status().as_u16() as i32;
        let duration_ms = start.elapsed().as_millis() as i64;
        let db = state.db.clone();

        tokio::spawn(async move {
            let result = sqlx::query(
                "INSERT INTO request_logs (method, path, status_code, duration_ms) VALUES ($1, $2, $3, $4)",
            )
            .bind(&method)
            .bind(&path)
            .bind(status_code)
            .bind(duration_ms)
            .execute(&db)
            .await;

            if let Err(e) = result {
                debug!("failed to record request log: {}", e);
            }
        });
    }

    response
}
