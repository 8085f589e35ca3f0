use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::state::AppState;

/// Liveness probe with a little deployment context.
#[must_use]
pub(crate) fn handler(state: &AppState) -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "endpoints": state.endpoint_count(),
        "sources": state.source_count(),
    }))
    .into_response()
}
