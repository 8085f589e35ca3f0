use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use http::HeaderValue;

use crate::api::{forward, health, models, openai_chat};
use crate::protocol::Dialect;
use crate::state::AppState;

const DEFAULT_BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Dispatch a raw HTTP request to the matching handler.
///
/// The body is buffered exactly once here and replayed per failover attempt
/// downstream.
///
/// # Errors
///
/// This function currently never returns `Err` and uses `Infallible`.
pub async fn dispatch_request(
    state: Arc<AppState>,
    request: Request<Body>,
) -> Result<Response, Infallible> {
    let (parts, body) = request.into_parts();
    let request_id = state.next_request_id();

    let mut response = route(state, parts, body).await;
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }

    Ok(response)
}

async fn route(state: Arc<AppState>, parts: http::request::Parts, body: Body) -> Response {
    if parts.uri.path() == "/" {
        return if parts.method == Method::GET {
            health::handler(&state)
        } else {
            StatusCode::METHOD_NOT_ALLOWED.into_response()
        };
    }

    let hint = state.resolver.resolve(parts.uri.path());

    if hint.is_models_request {
        return if parts.method == Method::GET {
            models::handler(&state)
        } else {
            StatusCode::METHOD_NOT_ALLOWED.into_response()
        };
    }

    let body_bytes = match read_request_body(body).await {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };

    match hint.dialect {
        Dialect::OpenAi => {
            if parts.method != Method::POST {
                return StatusCode::METHOD_NOT_ALLOWED.into_response();
            }
            openai_chat::handler(state, parts, hint, body_bytes).await
        }
        Dialect::Anthropic => forward::handler(state, parts, hint, body_bytes).await,
    }
}

async fn read_request_body(body: Body) -> Result<bytes::Bytes, Response> {
    body::to_bytes(body, DEFAULT_BODY_LIMIT_BYTES)
        .await
        .map_err(|_| {
            (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large (max 2MiB)",
            )
                .into_response()
        })
}
