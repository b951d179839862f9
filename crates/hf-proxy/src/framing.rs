//! Server-Sent Event framing for OpenAI-style streams.
//!
//! Every frame is a `data: <json>` line followed by a blank line. A stream is
//! closed by the literal `data: [DONE]` frame.

use crate::types::{ChatCompletionChunk, Delta, ErrorEnvelope, StreamChoice};
use serde::Serialize;
use uuid::Uuid;

/// Terminal sentinel frame.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Fields shared by every chunk of one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamContext {
    pub id: String,
    pub created: i64,
    pub model: String,
}

impl StreamContext {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: generate_response_id(),
            created: unix_timestamp(),
            model: model.into(),
        }
    }

    pub fn chunk(&self, delta: Delta, finish_reason: Option<String>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![StreamChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}

/// A logical unit of client-visible stream output.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Chunk(ChatCompletionChunk),
    Error(ErrorEnvelope),
    Done,
}

impl Frame {
    /// Encode as a wire frame.
    pub fn encode(&self) -> serde_json::Result<String> {
        match self {
            Frame::Chunk(chunk) => sse_data(chunk),
            Frame::Error(envelope) => sse_data(envelope),
            Frame::Done => Ok(DONE_FRAME.to_string()),
        }
    }
}

fn sse_data<T: Serialize>(payload: &T) -> serde_json::Result<String> {
    Ok(format!("data: {}\n\n", serde_json::to_string(payload)?))
}

/// `chatcmpl-` followed by 29 hex characters.
pub fn generate_response_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("chatcmpl-{}", &hex[..29])
}

pub fn unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_ids_have_expected_shape() {
        let id = generate_response_id();
        assert!(id.starts_with("chatcmpl-"));
        assert_eq!(id.len(), "chatcmpl-".len() + 29);
        assert_ne!(id, generate_response_id());
    }

    #[test]
    fn chunks_share_stream_fields() {
        let ctx = StreamContext::new("deepseek-ai/DeepSeek-R1");
        let a = ctx.chunk(Delta::content("a"), None);
        let b = ctx.chunk(Delta::default(), Some("stop".into()));
        assert_eq!(a.id, b.id);
        assert_eq!(a.created, b.created);
        assert_eq!(a.model, "deepseek-ai/DeepSeek-R1");
        assert_eq!(b.choices[0].finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn encodes_data_frames() {
        let ctx = StreamContext {
            id: "chatcmpl-abc".into(),
            created: 1_700_000_000,
            model: "m".into(),
        };
        let frame = Frame::Chunk(ctx.chunk(Delta::content("hi"), None)).encode().unwrap();
        assert_eq!(
            frame,
            "data: {\"id\":\"chatcmpl-abc\",\"object\":\"chat.completion.chunk\",\"created\":1700000000,\"model\":\"m\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"hi\"},\"finish_reason\":null}]}\n\n"
        );

        assert_eq!(Frame::Done.encode().unwrap(), "data: [DONE]\n\n");

        let err = Frame::Error(ErrorEnvelope::internal("boom")).encode().unwrap();
        assert!(err.starts_with("data: {\"error\":{\"message\":\"boom\""));
        assert!(err.ends_with("\n\n"));
    }
}
