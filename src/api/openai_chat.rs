use std::sync::Arc;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::request::Parts;
use http::StatusCode;

use crate::error::{into_axum_response, GatewayError};
use crate::protocol::anthropic::MessagesResponse;
use crate::protocol::headers::prepare_upstream_headers;
use crate::protocol::openai_chat::{
    encode_chat_response, encode_messages_request, ChatCompletionRequest,
};
use crate::protocol::Dialect;
use crate::routing::{run_failover, FailoverOutcome, RouteHint};
use crate::state::AppState;
use crate::stream::{transcode_sse_stream, StreamTranscoder};
use crate::transport::build_attempt_url;

/// Compat ingress: translate the request into the native dialect, run the
/// failover walk, and translate the response (or its stream) back.
pub(crate) async fn handler(
    state: Arc<AppState>,
    parts: Parts,
    hint: RouteHint,
    body: Bytes,
) -> Response {
    let request: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            // A malformed compat body never reaches a backend.
            return into_axum_response(
                &GatewayError::InvalidRequest(format!("malformed chat completion body: {err}")),
                Dialect::OpenAi,
            );
        }
    };

    let native = encode_messages_request(&request, &state.config.features.default_model);
    let stream = native.stream;
    let model = native.model.clone();
    let outbound: Bytes = match serde_json::to_vec(&native) {
        Ok(encoded) => encoded.into(),
        Err(err) => {
            return into_axum_response(
                &GatewayError::Internal(format!("failed to encode native request: {err}")),
                Dialect::OpenAi,
            );
        }
    };

    let upstream_headers = prepare_upstream_headers(
        &parts.headers,
        state.config.features.spoof_client_signature,
    );
    let query = parts.uri.query();

    let result = run_failover(
        state.endpoint_count(),
        state.source_count(),
        hint.preferred_endpoint,
        state.health(),
        |endpoint, source| {
            let url = build_attempt_url(
                &state.sources()[source],
                &state.endpoint(endpoint).path_prefix,
                &hint.target_path,
                query,
            );
            let headers = upstream_headers.clone();
            let body = outbound.clone();
            let shared = Arc::clone(&state);
            async move { send_expecting_success(&shared, url, headers, body).await }
        },
    )
    .await;

    match result {
        Ok(outcome) => translate_success(&state, &hint, outcome, stream, model).await,
        Err(err) => into_axum_response(&err, Dialect::OpenAi),
    }
}

async fn send_expecting_success(
    state: &AppState,
    url: String,
    headers: http::HeaderMap,
    body: Bytes,
) -> Result<reqwest::Response, GatewayError> {
    let response = state
        .transport
        .send(http::Method::POST, &url, &headers, body)
        .await?;
    let status = response.status();
    if status.as_u16() >= 400 {
        return Err(GatewayError::Upstream {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("upstream failure")
                .to_string(),
        });
    }
    Ok(response)
}

async fn translate_success(
    state: &AppState,
    hint: &RouteHint,
    outcome: FailoverOutcome<reqwest::Response>,
    stream: bool,
    model: String,
) -> Response {
    let FailoverOutcome {
        response,
        endpoint,
        source,
        ..
    } = outcome;

    let mut client_response = if stream {
        let transcoder = StreamTranscoder::new(state.next_chat_id(), model);
        let body_stream = transcode_sse_stream(response.bytes_stream(), transcoder);
        match Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .body(Body::from_stream(body_stream))
        {
            Ok(response) => response,
            Err(err) => {
                return into_axum_response(
                    &GatewayError::Internal(format!("failed to build stream response: {err}")),
                    Dialect::OpenAi,
                );
            }
        }
    } else {
        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let raw = match response.bytes().await {
            Ok(raw) => raw,
            Err(err) => {
                return into_axum_response(
                    &GatewayError::Transport(format!("failed to read upstream body: {err}")),
                    Dialect::OpenAi,
                );
            }
        };

        match serde_json::from_slice::<MessagesResponse>(&raw) {
            Ok(native) => {
                let chat = encode_chat_response(&native, &model, state.next_chat_id());
                (status, Json(chat)).into_response()
            }
            Err(err) => {
                // Backend answered but is not speaking the shape we expect;
                // hand the original through rather than failing the request.
                tracing::warn!(error = %err, "native response not translatable, passing through");
                let mut passthrough = Response::builder().status(status);
                if let Some(content_type) = content_type {
                    passthrough = passthrough.header(CONTENT_TYPE, content_type);
                }
                match passthrough.body(Body::from(raw)) {
                    Ok(response) => return stamped(response, state, hint, endpoint, source, false),
                    Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
                }
            }
        }
    };

    super::apply_routing_headers(
        client_response.headers_mut(),
        state,
        hint,
        endpoint,
        source,
        true,
    );
    client_response
}

fn stamped(
    mut response: Response,
    state: &AppState,
    hint: &RouteHint,
    endpoint: usize,
    source: usize,
    translated: bool,
) -> Response {
    super::apply_routing_headers(
        response.headers_mut(),
        state,
        hint,
        endpoint,
        source,
        translated,
    );
    response
}
