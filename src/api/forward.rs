use std::sync::Arc;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::header::HeaderName;
use http::request::Parts;
use http::StatusCode;

use crate::error::{into_axum_response, GatewayError};
use crate::protocol::headers::prepare_upstream_headers;
use crate::protocol::Dialect;
use crate::routing::{run_failover, FailoverOutcome, RouteHint};
use crate::state::AppState;
use crate::transport::build_attempt_url;

/// Headers that describe the connection we consumed, not the payload we
/// relay. Content-Length goes too since hyper reframes the streamed body.
const SKIPPED_RESPONSE_HEADERS: &[&str] = &[
    "connection",
    "content-length",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Native ingress: reissue the buffered request verbatim through the
/// failover walk and relay the winning response stream unchanged.
pub(crate) async fn handler(
    state: Arc<AppState>,
    parts: Parts,
    hint: RouteHint,
    body: Bytes,
) -> Response {
    let upstream_headers = prepare_upstream_headers(
        &parts.headers,
        state.config.features.spoof_client_signature,
    );
    let query = parts.uri.query();
    let method = parts.method.clone();

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
            let method = method.clone();
            let headers = upstream_headers.clone();
            let body = body.clone();
            let shared = Arc::clone(&state);
            async move {
                let response = shared.transport.send(method, &url, &headers, body).await?;
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
        },
    )
    .await;

    match result {
        Ok(outcome) => relay(&state, &hint, outcome),
        Err(err) => into_axum_response(&err, Dialect::Anthropic),
    }
}

fn relay(state: &AppState, hint: &RouteHint, outcome: FailoverOutcome<reqwest::Response>) -> Response {
    let FailoverOutcome {
        response,
        endpoint,
        source,
        ..
    } = outcome;

    let status = response.status();
    let upstream_headers = response.headers().clone();

    let mut client_response = match Response::builder()
        .status(status)
        .body(Body::from_stream(response.bytes_stream()))
    {
        Ok(response) => response,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    let headers = client_response.headers_mut();
    for (name, value) in &upstream_headers {
        if !is_skipped_response_header(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    super::apply_routing_headers(headers, state, hint, endpoint, source, false);

    client_response
}

fn is_skipped_response_header(name: &HeaderName) -> bool {
    SKIPPED_RESPONSE_HEADERS
        .iter()
        .any(|skipped| name.as_str().eq_ignore_ascii_case(skipped))
}
