use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::state::AppState;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared-secret gate for every request, including the WebSocket upgrade.
///
/// `/health` and `/` always pass so deploy probes keep working without the
/// key. When no key is configured the gate is inert.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if path == "/" || path == "/health" {
        return next.run(request).await;
    }
    if !state.settings.server.auth_enabled() {
        return next.run(request).await;
    }

    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    match presented {
        Some(key) if key == state.settings.server.api_key => next.run(request).await,
        _ => {
            debug!(path, "rejected request without valid API key");
            (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
        }
    }
}
