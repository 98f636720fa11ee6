//! Outcome delivery to the backend service.

use std::time::Duration;

use haggler_core::config::BackendConfig;
use haggler_core::domain::outcome::CallOutcomeReport;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend responded with status {0}")]
    UnexpectedStatus(u16),
}

/// Delivers one finished-call report per invocation. A failed delivery is
/// terminal for the webhook that triggered it: no local retry, no queue.
/// The calling platform's own webhook redelivery is the recovery path.
pub struct OutcomeReporter {
    client: Client,
    finish_url: String,
}

impl OutcomeReporter {
    pub fn from_config(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let client =
            Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self::new(client, &config.base_url))
    }

    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            finish_url: format!("{}/api/calls/finish", base_url.trim_end_matches('/')),
        }
    }

    /// Success iff the backend answers exactly 200.
    pub async fn report(&self, report: &CallOutcomeReport) -> Result<(), DeliveryError> {
        let response = self.client.post(&self.finish_url).json(report).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DeliveryError::UnexpectedStatus(status.as_u16()));
        }

        info!(
            event_name = "backend.report_delivered",
            user_id = %report.user_id,
            is_available = report.is_available,
            "call outcome delivered to backend"
        );
        Ok(())
    }
}
