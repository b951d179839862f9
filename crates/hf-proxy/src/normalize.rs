//! Inbound request validation and normalization.
//!
//! The router takes the OpenAI request shape minus anything the proxy owns
//! (`reasoning` on messages) and minus `n`, which is always 1 here.

use crate::error::ProxyError;
use crate::types::{ChatCompletionRequest, ChatMessage, MessageContent, Role, StopSequence};
use serde::Serialize;
use std::collections::HashMap;

/// A message as forwarded upstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamMessage {
    pub role: Role,
    pub content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&ChatMessage> for UpstreamMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
            name: msg.name.clone(),
        }
    }
}

/// Request shape consumed by the upstream client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRequest {
    pub model: String,
    pub messages: Vec<UpstreamMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<HashMap<String, f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

fn check_range(name: &str, value: Option<f32>, min: f32, max: f32) -> Result<(), ProxyError> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(ProxyError::validation(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, v
        ))),
        _ => Ok(()),
    }
}

/// Reject requests the proxy cannot serve before any upstream call.
pub fn validate_request(req: &ChatCompletionRequest) -> Result<(), ProxyError> {
    if req.model.trim().is_empty() {
        return Err(ProxyError::validation("model must not be empty"));
    }
    if req.messages.is_empty() {
        return Err(ProxyError::validation("messages must not be empty"));
    }

    check_range("temperature", req.temperature, 0.0, 2.0)?;
    check_range("top_p", req.top_p, 0.0, 1.0)?;
    check_range("presence_penalty", req.presence_penalty, -2.0, 2.0)?;
    check_range("frequency_penalty", req.frequency_penalty, -2.0, 2.0)?;

    match req.n {
        Some(0) => return Err(ProxyError::validation("n must be at least 1")),
        Some(n) if n > 1 => {
            return Err(ProxyError::validation(
                "multiple choices (n > 1) are not supported",
            ))
        }
        _ => {}
    }

    if req.max_tokens == Some(0) {
        return Err(ProxyError::validation("max_tokens must be at least 1"));
    }

    Ok(())
}

/// Validate and map an inbound request. Message order is preserved as-is.
pub fn normalize_request(req: &ChatCompletionRequest) -> Result<NormalizedRequest, ProxyError> {
    validate_request(req)?;

    Ok(NormalizedRequest {
        model: req.model.clone(),
        messages: req.messages.iter().map(UpstreamMessage::from).collect(),
        temperature: req.temperature,
        top_p: req.top_p,
        max_tokens: req.max_tokens,
        stop: req.stop.clone(),
        presence_penalty: req.presence_penalty,
        frequency_penalty: req.frequency_penalty,
        logit_bias: req.logit_bias.clone(),
        user: req.user.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> ChatCompletionRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn strips_reasoning_and_keeps_order() {
        let req = request(json!({
            "model": "deepseek-ai/DeepSeek-R1",
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "2+2?"},
                {"role": "assistant", "content": "4", "reasoning": "adding"},
                {"role": "user", "content": "and 3+3?", "name": "bob"}
            ],
            "max_tokens": 64,
            "stop": "END"
        }));

        let out = normalize_request(&req).unwrap();
        let roles: Vec<Role> = out.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [Role::System, Role::User, Role::Assistant, Role::User]
        );

        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["messages"][2], json!({"role": "assistant", "content": "4"}));
        assert_eq!(v["messages"][3]["name"], "bob");
        assert_eq!(v["max_tokens"], 64);
        assert_eq!(v["stop"], "END");
        assert_eq!(v["temperature"], 1.0);
        assert!(v.get("n").is_none());
        assert!(v.get("stream").is_none());
    }

    #[test]
    fn rejects_empty_messages() {
        let req = request(json!({"model": "m", "messages": []}));
        let err = normalize_request(&req).unwrap_err();
        assert!(matches!(err, ProxyError::Validation { .. }));
    }

    #[test]
    fn rejects_out_of_range_sampling() {
        for body in [
            json!({"model": "m", "messages": [{"role": "user", "content": "x"}], "temperature": 2.5}),
            json!({"model": "m", "messages": [{"role": "user", "content": "x"}], "top_p": 1.5}),
            json!({"model": "m", "messages": [{"role": "user", "content": "x"}], "presence_penalty": -3.0}),
            json!({"model": "m", "messages": [{"role": "user", "content": "x"}], "frequency_penalty": 2.1}),
            json!({"model": "m", "messages": [{"role": "user", "content": "x"}], "max_tokens": 0}),
            json!({"model": "m", "messages": [{"role": "user", "content": "x"}], "n": 2}),
            json!({"model": " ", "messages": [{"role": "user", "content": "x"}]}),
        ] {
            let req = request(body.clone());
            assert!(
                matches!(validate_request(&req), Err(ProxyError::Validation { .. })),
                "expected rejection for {}",
                body
            );
        }
    }

    #[test]
    fn accepts_range_bounds() {
        let req = request(json!({
            "model": "m",
            "messages": [{"role": "user", "content": "x"}],
            "temperature": 0.0,
            "top_p": 1.0,
            "presence_penalty": -2.0,
            "frequency_penalty": 2.0,
            "n": 1
        }));
        assert!(validate_request(&req).is_ok());
    }
}
