use crate::protocol::anthropic::{MessageParam, MessagesRequest};
use crate::protocol::value_present;

use super::{ChatCompletionRequest, ChatMessage};

const DEFAULT_MAX_TOKENS: u64 = 4096;

/// Encode a Chat Completions request into the Messages wire format.
///
/// - `model` falls back to `default_model` when absent or mistyped.
/// - The last `system` message wins and is hoisted to the top-level field.
/// - `user`/`assistant` messages are copied in order when their content
///   passes the presence predicate; other roles are dropped.
/// - `stream` defaults to an explicit `false`, never omitted.
/// - Optional samplers pass through only when well-typed; `stop` is
///   normalized to a non-empty `stop_sequences` array or omitted.
#[must_use]
pub fn encode_messages_request(
    request: &ChatCompletionRequest,
    default_model: &str,
) -> MessagesRequest {
    let model = request
        .model
        .as_str()
        .filter(|m| !m.is_empty() && value_present(&request.model))
        .unwrap_or(default_model)
        .to_string();

    let mut system: Option<String> = None;
    let mut messages: Vec<MessageParam> = Vec::with_capacity(request.messages.len());
    for message in &request.messages {
        match message.role.as_str() {
            "system" => {
                if let Some(text) = usable_text(message) {
                    system = Some(text.to_string());
                }
            }
            "user" | "assistant" => {
                if value_present(&message.content) {
                    messages.push(MessageParam {
                        role: message.role.clone(),
                        content: message.content.clone(),
                    });
                }
            }
            _ => {}
        }
    }

    MessagesRequest {
        model,
        max_tokens: request.max_tokens.as_u64().unwrap_or(DEFAULT_MAX_TOKENS),
        system,
        messages,
        stream: request.stream.as_bool().unwrap_or(false),
        temperature: request.temperature.as_f64(),
        top_p: request.top_p.as_f64(),
        stop_sequences: stop_sequences(&request.stop),
    }
}

fn usable_text(message: &ChatMessage) -> Option<&str> {
    if !value_present(&message.content) {
        return None;
    }
    message.content.as_str()
}

fn stop_sequences(stop: &serde_json::Value) -> Option<Vec<String>> {
    match stop {
        serde_json::Value::String(s) if value_present(stop) => Some(vec![s.clone()]),
        serde_json::Value::Array(items) => {
            let sequences: Vec<String> = items
                .iter()
                .filter(|item| value_present(item))
                .filter_map(|item| item.as_str())
                .map(str::to_string)
                .collect();
            (!sequences.is_empty()).then_some(sequences)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

    fn parse(body: serde_json::Value) -> ChatCompletionRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_round_trip_shape() {
        let request = parse(json!({
            "model": "m",
            "messages": [
                {"role": "system", "content": "S"},
                {"role": "user", "content": "U"}
            ],
            "max_tokens": 10
        }));
        let native = encode_messages_request(&request, DEFAULT_MODEL);
        let wire = serde_json::to_value(&native).unwrap();
        assert_eq!(
            wire,
            json!({
                "model": "m",
                "max_tokens": 10,
                "system": "S",
                "messages": [{"role": "user", "content": "U"}],
                "stream": false
            })
        );
    }

    #[test]
    fn test_model_defaults_when_absent_or_mistyped() {
        let native = encode_messages_request(&parse(json!({"messages": []})), DEFAULT_MODEL);
        assert_eq!(native.model, DEFAULT_MODEL);

        let native =
            encode_messages_request(&parse(json!({"model": 42, "messages": []})), DEFAULT_MODEL);
        assert_eq!(native.model, DEFAULT_MODEL);

        let native = encode_messages_request(
            &parse(json!({"model": "undefined", "messages": []})),
            DEFAULT_MODEL,
        );
        assert_eq!(native.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_last_system_message_wins() {
        let request = parse(json!({
            "messages": [
                {"role": "system", "content": "first"},
                {"role": "user", "content": "U"},
                {"role": "system", "content": "second"}
            ]
        }));
        let native = encode_messages_request(&request, DEFAULT_MODEL);
        assert_eq!(native.system.as_deref(), Some("second"));
        assert_eq!(native.messages.len(), 1);
    }

    #[test]
    fn test_invalid_message_content_dropped() {
        let request = parse(json!({
            "messages": [
                {"role": "user", "content": null},
                {"role": "user", "content": "undefined"},
                {"role": "user", "content": "[undefined]"},
                {"role": "user", "content": []},
                {"role": "user", "content": {}},
                {"role": "assistant", "content": "kept"},
                {"role": "tool", "content": "dropped role"}
            ]
        }));
        let native = encode_messages_request(&request, DEFAULT_MODEL);
        assert_eq!(native.messages.len(), 1);
        assert_eq!(native.messages[0].role, "assistant");
    }

    #[test]
    fn test_structured_content_passes_through() {
        let request = parse(json!({
            "messages": [
                {"role": "user", "content": [{"type": "text", "text": "hi"}]}
            ]
        }));
        let native = encode_messages_request(&request, DEFAULT_MODEL);
        assert_eq!(native.messages.len(), 1);
        assert!(native.messages[0].content.is_array());
    }

    #[test]
    fn test_stream_defaults_to_explicit_false() {
        let native = encode_messages_request(&parse(json!({"messages": []})), DEFAULT_MODEL);
        assert!(!native.stream);
        let wire = serde_json::to_value(&native).unwrap();
        assert_eq!(wire["stream"], false);

        let native = encode_messages_request(
            &parse(json!({"messages": [], "stream": true})),
            DEFAULT_MODEL,
        );
        assert!(native.stream);
    }

    #[test]
    fn test_mistyped_stream_treated_as_false() {
        let native = encode_messages_request(
            &parse(json!({"messages": [], "stream": "yes"})),
            DEFAULT_MODEL,
        );
        assert!(!native.stream);
    }

    #[test]
    fn test_samplers_pass_through_only_when_numeric() {
        let native = encode_messages_request(
            &parse(json!({"messages": [], "temperature": 0.7, "top_p": "high"})),
            DEFAULT_MODEL,
        );
        assert_eq!(native.temperature, Some(0.7));
        assert!(native.top_p.is_none());
    }

    #[test]
    fn test_stop_string_wraps_to_array() {
        let native = encode_messages_request(
            &parse(json!({"messages": [], "stop": "END"})),
            DEFAULT_MODEL,
        );
        assert_eq!(native.stop_sequences, Some(vec!["END".to_string()]));
    }

    #[test]
    fn test_stop_array_filters_invalid_entries() {
        let native = encode_messages_request(
            &parse(json!({"messages": [], "stop": ["END", null, "undefined", 3]})),
            DEFAULT_MODEL,
        );
        assert_eq!(native.stop_sequences, Some(vec!["END".to_string()]));

        let native = encode_messages_request(
            &parse(json!({"messages": [], "stop": [null, "undefined"]})),
            DEFAULT_MODEL,
        );
        assert!(native.stop_sequences.is_none());
    }

    #[test]
    fn test_no_invalid_fields_leak_to_wire() {
        let request = parse(json!({
            "model": "m",
            "messages": [],
            "temperature": null,
            "top_p": "[undefined]",
            "stop": []
        }));
        let wire = serde_json::to_value(encode_messages_request(&request, DEFAULT_MODEL)).unwrap();
        let fields = wire.as_object().unwrap();
        assert!(!fields.contains_key("temperature"));
        assert!(!fields.contains_key("top_p"));
        assert!(!fields.contains_key("stop_sequences"));
        assert!(!fields.contains_key("system"));
        assert!(!fields.contains_key("messages"));
    }
}
