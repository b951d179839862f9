//! Error types.
//!
//! `UpstreamError` covers everything that can go wrong talking to the router.
//! `ProxyError` is what handlers return; its `ResponseError` impl turns each
//! variant into the JSON error envelope clients expect.

use crate::types::ErrorEnvelope;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("upstream error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("stream error: {0}")]
    StreamError(String),
}

impl UpstreamError {
    /// Map a non-success HTTP status and its body to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            429 => Self::RateLimited(body),
            _ => Self::Status { status, body },
        }
    }
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("invalid request: {details}")]
    Validation { details: String },

    #[error("path {path} not found")]
    NotFound { path: String },
}

impl ProxyError {
    pub fn validation(details: impl Into<String>) -> Self {
        Self::Validation {
            details: details.into(),
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            Self::Upstream(e) => ErrorEnvelope::internal(e.to_string()),
            Self::Validation { details } => ErrorEnvelope::invalid_request(details.clone()),
            Self::NotFound { path } => ErrorEnvelope::not_found(path),
        }
    }
}

impl ResponseError for ProxyError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.envelope())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_upstream_status() {
        assert!(matches!(
            UpstreamError::from_status(401, "bad token".into()),
            UpstreamError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            UpstreamError::from_status(429, "slow down".into()),
            UpstreamError::RateLimited(_)
        ));
        assert!(matches!(
            UpstreamError::from_status(503, "overloaded".into()),
            UpstreamError::Status { status: 503, .. }
        ));
    }

    #[test]
    fn maps_variants_to_status_and_envelope() {
        let err = ProxyError::from(UpstreamError::RateLimited("quota".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let env = err.envelope();
        assert_eq!(env.error.kind, "internal_error");
        assert_eq!(env.error.message, "rate limit exceeded: quota");

        let err = ProxyError::validation("messages must not be empty");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.envelope().error.details.as_deref(),
            Some("messages must not be empty")
        );

        let err = ProxyError::NotFound {
            path: "/v2/x".into(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.envelope().error.message, "Path /v2/x not found");
    }
}
