use std::sync::Arc;

use axum::Router;
use haggler_agent::llm::OpenAiCompatClient;
use haggler_agent::summarizer::{Summarizer, TranscriptSummarizer};
use haggler_core::config::{AppConfig, ConfigError, LoadOptions};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::backend::OutcomeReporter;
use crate::calls::{CallInitiator, CallsState};
use crate::health;
use crate::webhook::{self, WebhookState};

pub struct Application {
    pub config: AppConfig,
    pub router: Router,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let llm_client =
        OpenAiCompatClient::from_config(&config.llm).map_err(BootstrapError::HttpClient)?;
    let summarizer: Arc<dyn Summarizer> = Arc::new(TranscriptSummarizer::new(llm_client));
    let reporter = Arc::new(
        OutcomeReporter::from_config(&config.backend).map_err(BootstrapError::HttpClient)?,
    );
    let initiator = Arc::new(CallInitiator::from_config(&config.elevenlabs));

    let router = build_router(&config, summarizer, reporter, initiator);
    info!(
        event_name = "system.bootstrap.router_ready",
        correlation_id = "bootstrap",
        "http surface assembled"
    );

    Ok(Application { config, router })
}

/// The whole HTTP surface behind one listener. CORS stays permissive: the
/// original deployment fronts a browser dashboard on a separate origin.
pub fn build_router(
    config: &AppConfig,
    summarizer: Arc<dyn Summarizer>,
    reporter: Arc<OutcomeReporter>,
    initiator: Arc<CallInitiator>,
) -> Router {
    Router::new()
        .merge(health::router())
        .merge(webhook::router(WebhookState {
            webhook_secret: config.elevenlabs.webhook_secret.clone(),
            summarizer,
            reporter,
        }))
        .merge(crate::calls::router(CallsState { initiator }))
        .layer(CorsLayer::permissive())
}
