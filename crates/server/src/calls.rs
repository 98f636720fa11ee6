//! Outbound batch-call initiation via the calling platform.

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::post, Router};
use haggler_core::config::ElevenLabsConfig;
use haggler_core::domain::dealer::DealerQuery;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

const BATCH_SUBMIT_PATH: &str = "/v1/convai/batch-calling/submit";
const BATCH_CALL_NAME: &str = "dealer-outreach";

#[derive(Debug, Error)]
pub enum CallInitiationError {
    #[error("batch must contain at least one dealer query")]
    EmptyBatch,
    #[error("calling platform request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("calling platform returned status {status}: {body}")]
    Platform { status: u16, body: String },
}

/// One scheduled recipient of a batch call. `dynamic_variables` feed the
/// voice agent's conversation template; `user_id` round-trips through the
/// platform so the completion webhook can attribute the call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchCallRecipient {
    pub phone_number: String,
    pub conversation_initiation_client_data: ConversationInitiationClientData,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConversationInitiationClientData {
    pub user_id: String,
    pub dynamic_variables: DynamicVariables,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DynamicVariables {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub zipcode: String,
    pub dealer_name: String,
    pub msrp: i64,
    pub listing_price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competing_price: Option<i64>,
}

#[derive(Serialize)]
struct BatchCallRequest<'a> {
    call_name: &'a str,
    agent_id: &'a str,
    agent_phone_number_id: &'a str,
    recipients: &'a [BatchCallRecipient],
}

pub struct CallInitiator {
    client: Client,
    submit_url: String,
    api_key: SecretString,
    first_call_agent_id: String,
    negotiating_agent_id: String,
    phone_number_pool_id: String,
}

impl CallInitiator {
    pub fn from_config(config: &ElevenLabsConfig) -> Self {
        Self {
            client: Client::new(),
            submit_url: format!(
                "{}{BATCH_SUBMIT_PATH}",
                config.base_url.trim_end_matches('/')
            ),
            api_key: config.api_key.clone(),
            first_call_agent_id: config.first_call_agent_id.clone(),
            negotiating_agent_id: config.negotiating_agent_id.clone(),
            phone_number_pool_id: config.phone_number_pool_id.clone(),
        }
    }

    /// Builds one recipient per query. `competing_price` rides along only
    /// once a negotiation round is in play.
    pub fn recipients(queries: &[DealerQuery]) -> Vec<BatchCallRecipient> {
        queries
            .iter()
            .map(|query| BatchCallRecipient {
                phone_number: query.phone_number.clone(),
                conversation_initiation_client_data: ConversationInitiationClientData {
                    user_id: query.user_id.clone(),
                    dynamic_variables: DynamicVariables {
                        make: query.make.clone(),
                        model: query.model.clone(),
                        year: query.year,
                        zipcode: query.zipcode.clone(),
                        dealer_name: query.dealer_name.clone(),
                        msrp: query.msrp,
                        listing_price: query.listing_price,
                        competing_price: if query.is_dealing {
                            query.competing_price
                        } else {
                            None
                        },
                    },
                },
            })
            .collect()
    }

    // Agent identity comes from the first query alone; batches are assumed
    // homogeneous in `is_dealing` upstream.
    fn agent_for(&self, batch: &[DealerQuery]) -> &str {
        if batch[0].is_dealing {
            &self.negotiating_agent_id
        } else {
            &self.first_call_agent_id
        }
    }

    /// Submits one batch-call creation request and returns the platform's
    /// response verbatim.
    pub async fn submit(&self, queries: &[DealerQuery]) -> Result<Value, CallInitiationError> {
        if queries.is_empty() {
            return Err(CallInitiationError::EmptyBatch);
        }

        let recipients = Self::recipients(queries);
        let request = BatchCallRequest {
            call_name: BATCH_CALL_NAME,
            agent_id: self.agent_for(queries),
            agent_phone_number_id: &self.phone_number_pool_id,
            recipients: &recipients,
        };

        let response = self
            .client
            .post(&self.submit_url)
            .header("xi-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallInitiationError::Platform { status: status.as_u16(), body });
        }

        info!(
            event_name = "calls.batch_submitted",
            recipients = recipients.len(),
            "batch call submitted to platform"
        );
        Ok(response.json().await?)
    }
}

#[derive(Clone)]
pub struct CallsState {
    pub initiator: Arc<CallInitiator>,
}

pub fn router(state: CallsState) -> Router {
    Router::new().route("/calls/init", post(init_calls)).with_state(state)
}

async fn init_calls(
    State(state): State<CallsState>,
    Json(queries): Json<Vec<DealerQuery>>,
) -> Json<Value> {
    match state.initiator.submit(&queries).await {
        Ok(platform_response) => Json(json!({
            "status": "success",
            "platform_response": platform_response,
            "recipients_count": queries.len(),
        })),
        Err(error) => {
            warn!(
                event_name = "calls.batch_rejected",
                error = %error,
                "batch call submission failed"
            );
            Json(json!({ "status": "error", "error": error.to_string() }))
        }
    }
}
