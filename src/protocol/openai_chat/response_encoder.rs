use crate::protocol::anthropic::MessagesResponse;
use crate::protocol::mapping::stop_reason_to_finish_reason;
use crate::util::unix_now_secs;

use super::{ChatChoice, ChatCompletionResponse, ChatResponseMessage, ChatUsage};

/// Encode a non-streaming Messages response into the Chat Completions shape.
///
/// `model` is the request's resolved model; `fallback_id` is used when the
/// backend did not report one. Missing token counts are treated as zero.
#[must_use]
pub fn encode_chat_response(
    native: &MessagesResponse,
    model: &str,
    fallback_id: String,
) -> ChatCompletionResponse {
    let content = native
        .content
        .iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text.clone())
        .unwrap_or_default();

    let prompt_tokens = native.usage.input_tokens.unwrap_or(0);
    let completion_tokens = native.usage.output_tokens.unwrap_or(0);

    ChatCompletionResponse {
        id: native.id.clone().unwrap_or(fallback_id),
        object: "chat.completion",
        created: unix_now_secs(),
        model: model.to_string(),
        choices: vec![ChatChoice {
            index: 0,
            message: ChatResponseMessage {
                role: "assistant",
                content,
            },
            finish_reason: stop_reason_to_finish_reason(native.stop_reason.as_deref()).to_string(),
        }],
        usage: ChatUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        },
    }
}
