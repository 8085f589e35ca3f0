pub(crate) mod forward;
pub(crate) mod health;
pub(crate) mod models;
pub(crate) mod openai_chat;

use http::header::{HeaderMap, HeaderValue};

use crate::routing::RouteHint;
use crate::state::AppState;

/// Stamp the routing decision onto an outbound response: which endpoint and
/// source served the request, the preferred-endpoint hint if one was given,
/// and whether dialect translation ran.
pub(crate) fn apply_routing_headers(
    headers: &mut HeaderMap,
    state: &AppState,
    hint: &RouteHint,
    endpoint: usize,
    source: usize,
    translated: bool,
) {
    insert_str(headers, "x-upstream-endpoint", &state.endpoint(endpoint).name);
    insert_str(headers, "x-upstream-endpoint-index", &endpoint.to_string());
    insert_str(headers, "x-upstream-source", state.sources()[source].base_url());
    insert_str(headers, "x-upstream-source-index", &source.to_string());
    if let Some(preferred) = hint.preferred_endpoint {
        insert_str(headers, "x-preferred-endpoint", &state.endpoint(preferred).name);
    }
    if translated {
        headers.insert("x-dialect-translated", HeaderValue::from_static("true"));
    }
}

fn insert_str(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}
