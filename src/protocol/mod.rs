pub mod anthropic;
pub mod error_shapes;
pub mod headers;
pub mod mapping;
pub mod openai_chat;

/// Which of the two wire protocols a request/response uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// The backends' own format (Claude Messages API).
    Anthropic,
    /// The compatibility format (OpenAI Chat Completions).
    OpenAi,
}

/// Whether an optional JSON field is present and usable.
///
/// Treated as absent: null, the placeholder strings some clients send for
/// missing values, and empty arrays/objects. Empty strings are usable.
#[must_use]
pub(crate) fn value_present(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => s != "undefined" && s != "[undefined]",
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::Object(fields) => !fields.is_empty(),
        _ => true,
    }
}
