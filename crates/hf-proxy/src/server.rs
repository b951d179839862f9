//! Actix Web HTTP server.
//!
//! Exposes OpenAI-compatible endpoints under the configured prefix:
//! - `POST {prefix}/chat/completions`
//! - `GET {prefix}/models`
//!
//! plus `GET /` and `GET /health`. Anything else gets a JSON 404.

use crate::{
    auth::{bearer_token, resolve_api_key},
    config::ProxyConfig,
    error::ProxyError,
    framing::StreamContext,
    normalize::normalize_request,
    reassembler::StreamReassembler,
    streaming::{failed_stream, handle_streaming},
    thinking::ReasoningPolicy,
    translation::{build_completion_response, fallback_model_list},
    types::{ChatCompletionRequest, ModelList},
    upstream::{RouterClient, UpstreamClient},
};
use actix_cors::Cors;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use serde_json::json;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct AppState {
    pub config: ProxyConfig,
    pub upstream: Arc<dyn UpstreamClient>,
    pub reasoning: ReasoningPolicy,
}

impl AppState {
    pub fn new(config: ProxyConfig, upstream: Arc<dyn UpstreamClient>) -> Self {
        let reasoning = config.reasoning_policy();
        Self {
            config,
            upstream,
            reasoning,
        }
    }
}

pub async fn serve(config: ProxyConfig) -> Result<()> {
    let addr = config.bind_addr();
    let upstream = RouterClient::new(
        config.hf_base_url_trimmed(),
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("failed to build router client")?;

    info!(
        addr = %addr,
        upstream = %upstream.base_url(),
        prefix = %config.api_prefix,
        "hf-proxy listening"
    );

    let state = web::Data::new(AppState::new(config, Arc::new(upstream)));

    HttpServer::new(move || {
        let prefix = state.config.api_prefix.clone();
        let body_limit = state.config.max_request_bytes;
        App::new()
            .app_data(state.clone())
            .wrap(cors(&state.config))
            .configure(|cfg| configure(cfg, &prefix, body_limit))
    })
    .bind(&addr)
    .with_context(|| format!("failed to bind {}", addr))?
    .run()
    .await
    .context("server error")?;

    Ok(())
}

/// Register every route. `AppState` must be provided as app data.
///
/// `body_limit` caps JSON request bodies, in bytes.
pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str, body_limit: usize) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(body_limit)
            .error_handler(|err, _req| ProxyError::validation(err.to_string()).into()),
    )
    .route("/", web::get().to(root))
    .route("/health", web::get().to(health_check))
    .service(
        web::scope(api_prefix)
            .route("/chat/completions", web::post().to(chat_completions))
            .route("/models", web::get().to(list_models)),
    )
    .default_service(web::to(not_found));
}

fn cors(config: &ProxyConfig) -> Cors {
    if config.allows_any_origin() {
        return Cors::permissive();
    }
    config
        .cors_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

async fn root(state: web::Data<AppState>) -> HttpResponse {
    let prefix = &state.config.api_prefix;
    HttpResponse::Ok().json(json!({
        "message": "Hugging Face OpenAI-compatible proxy",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "chat_completions": format!("{}/chat/completions", prefix),
            "models": format!("{}/models", prefix),
        }
    }))
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn not_found(req: HttpRequest) -> Result<HttpResponse, ProxyError> {
    debug!(path = %req.path(), method = %req.method(), "no route");
    Err(ProxyError::NotFound {
        path: req.path().to_string(),
    })
}

async fn chat_completions(
    state: web::Data<AppState>,
    req_http: HttpRequest,
    body: web::Json<ChatCompletionRequest>,
) -> Result<HttpResponse, ProxyError> {
    let request = body.into_inner();
    info!(
        model = %request.model,
        stream = request.is_stream(),
        messages = request.messages.len(),
        "chat completion request"
    );

    let normalized = normalize_request(&request)?;
    let key = resolve_api_key(
        bearer_token(req_http.headers()),
        state.config.hf_token.as_ref(),
    );
    debug!(source = ?key.source, key = %key.masked(), "resolved upstream key");

    if request.is_stream() {
        let reasoning = state.reasoning.is_reasoning_capable(&request.model);
        let reassembler = StreamReassembler::new(StreamContext::new(&request.model), reasoning);
        debug!(id = %reassembler.context().id, reasoning, "starting stream");

        let frames: Pin<Box<dyn Stream<Item = String> + Send>> =
            match state.upstream.complete_streaming(&normalized, &key.key).await {
                Ok(deltas) => Box::pin(handle_streaming(deltas, reassembler)),
                Err(e) => {
                    error!(error = %e, model = %request.model, "upstream stream request failed");
                    Box::pin(failed_stream(reassembler, &e))
                }
            };

        return Ok(HttpResponse::Ok()
            .content_type("text/event-stream")
            .insert_header(("cache-control", "no-cache"))
            .streaming(frames.map(|frame| Ok::<_, Infallible>(web::Bytes::from(frame)))));
    }

    let reply = state
        .upstream
        .complete(&normalized, &key.key)
        .await
        .map_err(|e| {
            error!(error = %e, model = %request.model, "upstream completion failed");
            ProxyError::from(e)
        })?;

    let response = build_completion_response(reply, &request);
    info!(id = %response.id, "chat completion succeeded");
    Ok(HttpResponse::Ok().json(response))
}

async fn list_models(state: web::Data<AppState>, req_http: HttpRequest) -> HttpResponse {
    let key = resolve_api_key(
        bearer_token(req_http.headers()),
        state.config.hf_token.as_ref(),
    );

    match state.upstream.list_models(&key.key).await {
        Ok(models) => {
            info!(count = models.len(), "listed router models");
            HttpResponse::Ok().json(ModelList::new(models))
        }
        Err(e) => {
            warn!(error = %e, "router model list unavailable, using fallback");
            HttpResponse::Ok().json(fallback_model_list(&state.config.default_model))
        }
    }
}
