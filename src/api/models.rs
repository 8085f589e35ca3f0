use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

/// Serve the fixed model catalog in the compat list envelope.
///
/// Never touches a backend; the body is built once at startup.
#[must_use]
pub(crate) fn handler(state: &AppState) -> Response {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("application/json"),
        )],
        Body::from(state.models_response_body()),
    )
        .into_response()
}
