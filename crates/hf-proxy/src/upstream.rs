//! Hugging Face router client.
//!
//! The router speaks OpenAI's `chat/completions` and `models` endpoints.
//! Streaming replies arrive as SSE `data:` events terminated by `[DONE]`;
//! they are parsed lazily into [`UpstreamDelta`]s so the caller can stop
//! reading (and drop the connection) at any point.

use crate::error::UpstreamError;
use crate::framing::unix_timestamp;
use crate::normalize::NormalizedRequest;
use crate::types::{ModelInfo, Role};
use async_stream::stream;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

/// One incremental unit of an upstream stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamDelta {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
}

/// A complete non-streaming reply (first choice only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReply {
    pub index: u32,
    pub role: Role,
    pub content: Option<String>,
    pub finish_reason: Option<String>,
}

/// Lazy, forward-only sequence of deltas.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<UpstreamDelta, UpstreamError>> + Send>>;

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Send a request and wait for the whole reply.
    async fn complete(
        &self,
        request: &NormalizedRequest,
        api_key: &SecretString,
    ) -> Result<UpstreamReply, UpstreamError>;

    /// Send a request and get the reply as a delta stream.
    async fn complete_streaming(
        &self,
        request: &NormalizedRequest,
        api_key: &SecretString,
    ) -> Result<DeltaStream, UpstreamError>;

    /// Fetch the model catalog.
    async fn list_models(&self, api_key: &SecretString) -> Result<Vec<ModelInfo>, UpstreamError>;
}

pub struct RouterClient {
    client: Client,
    base_url: String,
}

impl RouterClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_completion(
        &self,
        request: &NormalizedRequest,
        api_key: &SecretString,
        stream: bool,
    ) -> Result<reqwest::Response, UpstreamError> {
        let url = self.url("chat/completions");
        debug!(%url, model = %request.model, stream, "calling router");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&RouterRequest { request, stream })
            .send()
            .await?;

        ensure_success(response).await
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::from_status(status, body))
}

#[async_trait]
impl UpstreamClient for RouterClient {
    async fn complete(
        &self,
        request: &NormalizedRequest,
        api_key: &SecretString,
    ) -> Result<UpstreamReply, UpstreamError> {
        let response = self.post_completion(request, api_key, false).await?;
        let body: RouterResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::InvalidResponse("missing choices[0]".into()))?;

        Ok(UpstreamReply {
            index: choice.index,
            role: choice.message.role.unwrap_or(Role::Assistant),
            content: choice.message.content,
            finish_reason: choice.finish_reason,
        })
    }

    async fn complete_streaming(
        &self,
        request: &NormalizedRequest,
        api_key: &SecretString,
    ) -> Result<DeltaStream, UpstreamError> {
        let response = self.post_completion(request, api_key, true).await?;
        let mut events = response.bytes_stream().eventsource();

        let deltas = stream! {
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        yield Err(UpstreamError::StreamError(e.to_string()));
                        return;
                    }
                };

                let data = event.data.trim();
                if data.is_empty() {
                    continue;
                }
                if data == "[DONE]" {
                    break;
                }

                match serde_json::from_str::<RouterStreamChunk>(data) {
                    Ok(chunk) => {
                        if let Some(delta) = chunk.into_delta() {
                            yield Ok(delta);
                        }
                    }
                    Err(e) => {
                        yield Err(UpstreamError::InvalidResponse(format!(
                            "failed to parse upstream SSE json: {}: {}",
                            e, data
                        )));
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(deltas))
    }

    async fn list_models(&self, api_key: &SecretString) -> Result<Vec<ModelInfo>, UpstreamError> {
        let response = self
            .client
            .get(self.url("models"))
            .bearer_auth(api_key.expose_secret())
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let body: RouterModelList = response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;

        let now = unix_timestamp();
        Ok(body
            .data
            .into_iter()
            .map(|m| {
                ModelInfo::new(
                    m.id,
                    m.created.unwrap_or(now),
                    m.owned_by.unwrap_or_else(|| "huggingface".to_string()),
                )
            })
            .collect())
    }
}

// Router request/response types
#[derive(Debug, Serialize)]
struct RouterRequest<'a> {
    #[serde(flatten)]
    request: &'a NormalizedRequest,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct RouterResponse {
    #[serde(default)]
    choices: Vec<RouterChoice>,
}

#[derive(Debug, Deserialize)]
struct RouterChoice {
    #[serde(default)]
    index: u32,
    message: RouterMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RouterMessage {
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RouterStreamChunk {
    #[serde(default)]
    choices: Vec<RouterStreamChoice>,
}

impl RouterStreamChunk {
    /// First choice as a delta; usage-only and keep-alive events have none.
    fn into_delta(self) -> Option<UpstreamDelta> {
        let choice = self.choices.into_iter().next()?;
        Some(UpstreamDelta {
            content: choice.delta.and_then(|d| d.content),
            finish_reason: choice.finish_reason,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RouterStreamChoice {
    #[serde(default)]
    delta: Option<RouterStreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RouterStreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RouterModelList {
    #[serde(default)]
    data: Vec<RouterModel>,
}

#[derive(Debug, Deserialize)]
struct RouterModel {
    id: String,
    #[serde(default)]
    created: Option<i64>,
    #[serde(default)]
    owned_by: Option<String>,
}
