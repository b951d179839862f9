//! Configuration from environment variables and an optional YAML file.
//!
//! **Environment variables** (a `.env` file is read first when present):
//! - `HF_TOKEN`: default router token, used when a client sends none
//! - `HF_BASE_URL`: router base URL (default: https://router.huggingface.co/v1)
//! - `HOST` / `PORT`: bind address (default: 0.0.0.0:8000)
//! - `DEBUG`: verbose logging (default: false)
//! - `API_PREFIX`: route prefix for the OpenAI endpoints (default: /v1)
//! - `CORS_ORIGINS`: comma separated allowed origins (default: *)
//! - `DEFAULT_MODEL`: model listed when the router catalog is unavailable
//! - `REQUEST_TIMEOUT`: upstream request timeout in seconds (default: 300)
//! - `REASONING_MODEL_MARKERS`: comma separated model-name markers (default: deepseek,think)
//! - `MAX_REQUEST_BYTES`: largest accepted JSON body (default: 64 MiB)
//!
//! `HF_PROXY_CONFIG` may point at a YAML file whose `proxy:` section overrides
//! the values above:
//!
//! ```yaml
//! proxy:
//!   port: 9000
//!   default_model: "deepseek-ai/DeepSeek-R1"
//!   reasoning_markers: ["deepseek", "think", "qwq"]
//! ```

use crate::thinking::{ReasoningPolicy, DEFAULT_REASONING_MARKERS};
use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "HF_PROXY_CONFIG";

const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";
const DEFAULT_MODEL: &str = "openai/gpt-oss-120b:fireworks-ai";

/// Inline base64 images easily exceed actix's 2 MiB default.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub hf_token: Option<SecretString>,
    pub hf_base_url: String,
    pub debug: bool,
    pub api_prefix: String,
    pub cors_origins: Vec<String>,
    pub default_model: String,
    pub request_timeout_secs: u64,
    pub reasoning_markers: Vec<String>,
    pub max_request_bytes: usize,
}

#[derive(Debug, Default, Deserialize)]
struct YamlFile {
    #[serde(default)]
    proxy: YamlProxySection,
}

#[derive(Debug, Default, Deserialize)]
struct YamlProxySection {
    host: Option<String>,
    port: Option<u16>,
    hf_token: Option<String>,
    hf_base_url: Option<String>,
    debug: Option<bool>,
    api_prefix: Option<String>,
    cors_origins: Option<Vec<String>>,
    default_model: Option<String>,
    request_timeout: Option<u64>,
    reasoning_markers: Option<Vec<String>>,
    max_request_bytes: Option<usize>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::from_env_with(|key| env::var(key).ok())
    }
}

impl ProxyConfig {
    /// Build a config from `lookup`, falling back to defaults for unset or
    /// unparsable values.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(8000),
            hf_token: var("HF_TOKEN").map(SecretString::from),
            hf_base_url: var("HF_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            debug: var("DEBUG").map(|v| parse_bool(&v)).unwrap_or(false),
            api_prefix: normalize_prefix(&var("API_PREFIX").unwrap_or_else(|| "/v1".to_string())),
            cors_origins: var("CORS_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_else(|| vec!["*".to_string()]),
            default_model: var("DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            request_timeout_secs: var("REQUEST_TIMEOUT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(300),
            reasoning_markers: var("REASONING_MODEL_MARKERS")
                .map(|v| split_list(&v))
                .unwrap_or_else(|| {
                    DEFAULT_REASONING_MARKERS
                        .iter()
                        .map(|m| m.to_string())
                        .collect()
                }),
            max_request_bytes: var("MAX_REQUEST_BYTES")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_REQUEST_BYTES),
        }
    }

    /// Load `.env`, read the environment, then apply the `HF_PROXY_CONFIG`
    /// file if one is named.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::default();
        match env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => config.with_yaml_file(path.trim()),
            _ => Ok(config),
        }
    }

    /// Override values with the `proxy:` section of a YAML file.
    pub fn with_yaml_file(self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read proxy config from {:?}", path))?;
        self.with_yaml_str(&content, &path)
    }

    fn with_yaml_str(mut self, content: &str, path: &Path) -> Result<Self> {
        let file: YamlFile = serde_yaml_ng::from_str(content)
            .with_context(|| format!("Failed to parse proxy config {:?}", path))?;
        let section = file.proxy;

        if let Some(host) = section.host {
            self.host = host;
        }
        if let Some(port) = section.port {
            self.port = port;
        }
        if let Some(token) = section.hf_token.filter(|t| !t.is_empty()) {
            self.hf_token = Some(SecretString::from(token));
        }
        if let Some(url) = section.hf_base_url {
            self.hf_base_url = url;
        }
        if let Some(debug) = section.debug {
            self.debug = debug;
        }
        if let Some(prefix) = section.api_prefix {
            self.api_prefix = normalize_prefix(&prefix);
        }
        if let Some(origins) = section.cors_origins {
            self.cors_origins = origins;
        }
        if let Some(model) = section.default_model {
            self.default_model = model;
        }
        if let Some(timeout) = section.request_timeout {
            self.request_timeout_secs = timeout;
        }
        if let Some(markers) = section.reasoning_markers {
            self.reasoning_markers = markers;
        }
        if let Some(limit) = section.max_request_bytes.filter(|n| *n > 0) {
            self.max_request_bytes = limit;
        }

        Ok(self)
    }

    pub fn hf_base_url_trimmed(&self) -> String {
        self.hf_base_url.trim_end_matches('/').to_string()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }

    pub fn reasoning_policy(&self) -> ReasoningPolicy {
        ReasoningPolicy::new(&self.reasoning_markers)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Leading slash, no trailing slash. An empty prefix mounts at the root.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
