//! Router -> OpenAI response translation for the non-streaming path.
//!
//! - Router reply -> `chat.completion` object with reasoning split out
//! - Router model catalog fallback for `/v1/models`

use crate::framing::{generate_response_id, unix_timestamp};
use crate::thinking::split_thinking;
use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, MessageContent, ModelInfo,
    ModelList, Usage,
};
use crate::upstream::UpstreamReply;

/// Rough token estimate: whitespace-separated words plus a quarter of the
/// character count. Not a tokenizer.
pub fn estimate_tokens(text: Option<&str>) -> u32 {
    let Some(text) = text else {
        return 0;
    };
    let words = text.split_whitespace().count();
    let chars = text.chars().count();
    (words + chars / 4) as u32
}

/// Build the client response from a router reply.
///
/// The response reports the model the client asked for, and `reasoning` is
/// only set when the reply actually had a reasoning segment.
pub fn build_completion_response(
    reply: UpstreamReply,
    request: &ChatCompletionRequest,
) -> ChatCompletionResponse {
    let raw = reply.content.unwrap_or_default();
    let (thinking, answer) = split_thinking(Some(&raw));

    let prompt_tokens = request
        .messages
        .iter()
        .map(|m| estimate_tokens(Some(&m.content.to_plaintext())))
        .sum();
    let completion_tokens = estimate_tokens(Some(&raw));

    let message = ChatMessage {
        role: reply.role,
        content: MessageContent::Text(answer),
        name: None,
        reasoning: (!thinking.is_empty()).then_some(thinking),
    };

    ChatCompletionResponse {
        id: generate_response_id(),
        object: "chat.completion".to_string(),
        created: unix_timestamp(),
        model: request.model.clone(),
        choices: vec![Choice {
            index: reply.index,
            message,
            finish_reason: reply.finish_reason,
        }],
        usage: Usage::new(prompt_tokens, completion_tokens),
    }
}

/// Single-entry catalog used when the router's model list is unavailable.
pub fn fallback_model_list(default_model: &str) -> ModelList {
    ModelList::new(vec![ModelInfo::new(
        default_model,
        unix_timestamp(),
        "huggingface",
    )])
}
