//! hf-proxy - OpenAI-compatible proxy in front of the Hugging Face router.
//!
//! Clients speak OpenAI's `/v1/chat/completions` API. Requests are forwarded
//! to the router unchanged in meaning, and replies from reasoning models are
//! split on the `</think>` marker so the reasoning segment comes back in a
//! separate `reasoning` field instead of inline with the answer.
//!
//! Design goals:
//! - Accept standard OpenAI clients, streaming and non-streaming.
//! - Reassemble reasoning output incrementally without re-reading the stream.
//! - Keep the upstream behind a trait so the HTTP surface can be tested alone.

pub mod auth;
pub mod config;
pub mod error;
pub mod framing;
pub mod normalize;
pub mod reassembler;
pub mod server;
pub mod streaming;
pub mod thinking;
pub mod translation;
pub mod types;
pub mod upstream;

pub use config::ProxyConfig;
pub use error::{ProxyError, UpstreamError};
pub use server::{configure, serve, AppState};
pub use upstream::{RouterClient, UpstreamClient};
