pub mod config;
pub mod domain;
pub mod signature;

pub use config::{
    AppConfig, BackendConfig, ConfigError, ConfigOverrides, ElevenLabsConfig, LlmConfig,
    LoadOptions, LogFormat, LoggingConfig, ServerConfig,
};
pub use domain::dealer::DealerQuery;
pub use domain::outcome::{CallOutcomeReport, NegotiationOutcome};
pub use domain::webhook::{TranscriptTurn, WebhookData, WebhookEnvelope, WebhookType};
