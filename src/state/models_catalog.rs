use bytes::Bytes;
use serde_json::{json, Value};

/// Model ids advertised on the catalog path. The catalog is static: listing
/// models never touches a backend.
const CATALOG_MODEL_IDS: &[&str] = &[
    "claude-3-5-haiku-20241022",
    "claude-3-5-sonnet-20241022",
    "claude-sonnet-4-20250514",
    "claude-opus-4-20250514",
];

const CATALOG_CREATED_UNIX: u64 = 1_677_610_602;

pub(crate) fn build_models_response_body() -> Bytes {
    let data: Vec<Value> = CATALOG_MODEL_IDS
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "object": "model",
                "created": CATALOG_CREATED_UNIX,
                "owned_by": "anthropic",
            })
        })
        .collect();
    let body = json!({
        "object": "list",
        "data": data,
    });
    Bytes::from(serde_json::to_vec(&body).unwrap_or_default())
}
