use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of an inbound call-lifecycle webhook.
///
/// Wire values the platform does not document yet land on `Unknown` so that
/// deserialization never fails on the type field alone; the router rejects
/// `Unknown` deliveries explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookType {
    PostCallTranscription,
    CallInitiationFailure,
    #[serde(other)]
    Unknown,
}

/// One conversational turn of a completed call, in chronological order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub role: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WebhookData {
    pub agent_id: String,
    pub conversation_id: String,
    pub status: String,
    pub user_id: String,
    /// Empty for call-initiation failures.
    #[serde(default)]
    pub transcript: Vec<TranscriptTurn>,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub analysis: Value,
    #[serde(default)]
    pub conversation_initiation_client_data: Value,
}

/// A parsed webhook delivery. Only ever constructed from a payload that
/// already passed signature verification; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "type")]
    pub event_type: WebhookType,
    pub data: WebhookData,
}
