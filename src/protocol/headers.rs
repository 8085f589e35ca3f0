use http::header::{HeaderMap, HeaderValue, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, HOST, USER_AGENT};

pub(crate) const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Substrings in a `User-Agent` that identify an API SDK build. Some relays
/// reject these outright, so the signature is swapped for one they accept.
const SDK_UA_FINGERPRINTS: &[&str] = &["anthropic-sdk", "stainless", "openai-python", "openai-node"];

const CLIENT_SIGNATURE: &str = "claude-cli/1.0.83 (external, cli)";

const BETA_FEATURES: &str = "claude-code-20250219";

/// Diagnostic headers the SDK generator adds; sent alongside a spoofed
/// signature they contradict it, so they go too.
const SDK_DIAGNOSTIC_HEADERS: &[&str] = &[
    "x-stainless-arch",
    "x-stainless-helper-method",
    "x-stainless-lang",
    "x-stainless-os",
    "x-stainless-package-version",
    "x-stainless-retry-count",
    "x-stainless-runtime",
    "x-stainless-runtime-version",
    "x-stainless-timeout",
];

/// Rewrite inbound headers for reissue against an upstream relay.
///
/// Always: drops `Content-Length` (the outbound body differs), `Host`, and
/// `Connection`, forces `Content-Type: application/json`, and injects the
/// default `anthropic-version` when absent. With `spoof_client_signature`,
/// SDK-fingerprinted user agents are replaced by a fixed client signature,
/// the beta-feature header is added when absent, and SDK diagnostic headers
/// are removed.
#[must_use]
pub fn prepare_upstream_headers(inbound: &HeaderMap, spoof_client_signature: bool) -> HeaderMap {
    let mut headers = inbound.clone();
    headers.remove(CONTENT_LENGTH);
    headers.remove(HOST);
    headers.remove(CONNECTION);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if !headers.contains_key("anthropic-version") {
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(DEFAULT_API_VERSION),
        );
    }

    if spoof_client_signature && user_agent_is_sdk(&headers) {
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_SIGNATURE));
        if !headers.contains_key("anthropic-beta") {
            headers.insert("anthropic-beta", HeaderValue::from_static(BETA_FEATURES));
        }
        for name in SDK_DIAGNOSTIC_HEADERS {
            headers.remove(*name);
        }
    }

    headers
}

fn user_agent_is_sdk(headers: &HeaderMap) -> bool {
    let Some(user_agent) = headers.get(USER_AGENT).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let lowered = user_agent.to_ascii_lowercase();
    SDK_UA_FINGERPRINTS
        .iter()
        .any(|fingerprint| lowered.contains(fingerprint))
}
