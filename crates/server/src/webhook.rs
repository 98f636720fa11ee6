//! Inbound call-lifecycle webhook ingestion.
//!
//! One delivery is handled start to finish inside one request: signature
//! gate, envelope classification, outcome construction, backend delivery.
//! Nothing is shared between deliveries and nothing survives them. The
//! endpoint always answers HTTP 200; the calling platform keys redelivery
//! off the JSON `status` field in the body.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::HeaderMap, response::Json, routing::post, Router};
use haggler_agent::summarizer::{ExtractionError, Summarizer};
use haggler_core::domain::outcome::CallOutcomeReport;
use haggler_core::domain::webhook::{WebhookEnvelope, WebhookType};
use haggler_core::signature;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::{DeliveryError, OutcomeReporter};

pub const SIGNATURE_HEADER: &str = "elevenlabs-signature";

#[derive(Clone)]
pub struct WebhookState {
    pub webhook_secret: SecretString,
    pub summarizer: Arc<dyn Summarizer>,
    pub reporter: Arc<OutcomeReporter>,
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid webhook signature")]
    SignatureInvalid,
    #[error("invalid webhook payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("unrecognized webhook type")]
    UnknownType,
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl WebhookError {
    fn sender_message(&self) -> String {
        match self {
            Self::SignatureInvalid => "Invalid signature".to_string(),
            Self::Payload(_) => "Invalid webhook payload".to_string(),
            Self::UnknownType => "Invalid webhook type".to_string(),
            Self::Extraction(error) => format!("Failed to summarize transcript: {error}"),
            Self::Delivery(_) => "Failed to call backend".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    pub message: String,
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/calls/webhook", post(ingest)).with_state(state)
}

/// Classifies a verified envelope and builds the report for it. Unknown
/// types are terminal: no report, no backend call.
pub async fn route_webhook(
    envelope: &WebhookEnvelope,
    summarizer: &dyn Summarizer,
) -> Result<CallOutcomeReport, WebhookError> {
    match envelope.event_type {
        WebhookType::PostCallTranscription => {
            let outcome = summarizer.summarize(&envelope.data.transcript).await?;
            Ok(CallOutcomeReport::from_outcome(envelope.data.user_id.clone(), outcome))
        }
        WebhookType::CallInitiationFailure => {
            Ok(CallOutcomeReport::initiation_failure(envelope.data.user_id.clone()))
        }
        WebhookType::Unknown => Err(WebhookError::UnknownType),
    }
}

async fn ingest(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookResponse> {
    let correlation_id = Uuid::new_v4().to_string();

    match handle_delivery(&state, &headers, &body, &correlation_id).await {
        Ok(()) => Json(WebhookResponse {
            status: "success",
            message: "Backend called successfully".to_string(),
        }),
        Err(error) => {
            warn!(
                event_name = "webhook.delivery_rejected",
                correlation_id = %correlation_id,
                error = %error,
                "webhook delivery rejected"
            );
            Json(WebhookResponse { status: "error", message: error.sender_message() })
        }
    }
}

async fn handle_delivery(
    state: &WebhookState,
    headers: &HeaderMap,
    payload: &[u8],
    correlation_id: &str,
) -> Result<(), WebhookError> {
    let signature_header = headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok());
    if !signature::verify(
        payload,
        signature_header,
        state.webhook_secret.expose_secret(),
        signature::DEFAULT_TOLERANCE_SECS,
    ) {
        return Err(WebhookError::SignatureInvalid);
    }

    // The envelope is only ever parsed from bytes the verifier accepted.
    let envelope: WebhookEnvelope = serde_json::from_slice(payload)?;
    info!(
        event_name = "webhook.received",
        correlation_id = %correlation_id,
        webhook_type = ?envelope.event_type,
        conversation_id = %envelope.data.conversation_id,
        "verified webhook delivery"
    );

    let report = route_webhook(&envelope, state.summarizer.as_ref()).await?;
    state.reporter.report(&report).await?;

    info!(
        event_name = "webhook.report_delivered",
        correlation_id = %correlation_id,
        user_id = %report.user_id,
        "call outcome reported to backend"
    );
    Ok(())
}
