//! HTTP gateway for Ledgerwise.
//!
//! Exposes the chat and feedback endpoints plus session inspection,
//! index rebuilds, and a health check.
//!
//! Built on Axum.

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, header};
use axum::Router;
use ledgerwise_agent::ChatPipeline;
use ledgerwise_config::{AppConfig, GatewayConfig};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub pipeline: Arc<ChatPipeline>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl GatewayState {
    pub fn new(pipeline: Arc<ChatPipeline>) -> Self {
        Self {
            pipeline,
            start_time: chrono::Utc::now(),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router.
///
/// Layers applied:
/// - Request body size limit
/// - CORS (any origin) when `cors_allow_any` is set
/// - HTTP trace logging
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    let router = api::api_router(state).layer(DefaultBodyLimit::max(config.max_body_bytes));

    let router = if config.cors_allow_any {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
                .max_age(std::time::Duration::from_secs(3600)),
        )
    } else {
        router
    };

    router.layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// Builds the provider and pipeline once, pre-warms the knowledge index,
/// then serves until the process is stopped.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    if !config.has_api_key() {
        warn!("No API key configured; generation requests will fail until one is set");
    }

    let providers = ledgerwise_providers::router::build_from_config(&config);
    let provider = providers
        .default()
        .ok_or("No default provider configured")?;

    let pipeline = Arc::new(ChatPipeline::from_config(&config, provider)?);

    match pipeline.knowledge().ensure_index().await {
        Ok(index) => info!(terms = index.len(), "Knowledge index ready"),
        Err(e) => warn!(error = %e, "Knowledge index pre-warm failed, will retry on first request"),
    }

    let app = build_router(Arc::new(GatewayState::new(pipeline)), &config.gateway);

    info!(addr = %addr, provider = %config.default_provider, model = %config.generation_model(), "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
