use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structured negotiation result extracted from a completed call's
/// transcript. Doubles as the schema contract handed to the generative
/// backend, so the field set here IS the wire contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NegotiationOutcome {
    pub is_available: bool,
    pub deal_price: i64,
    pub remarks: String,
}

/// Final report delivered to the backend for one call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOutcomeReport {
    pub user_id: String,
    pub is_available: bool,
    pub deal_price: i64,
    pub remarks: String,
}

impl CallOutcomeReport {
    pub fn from_outcome(user_id: impl Into<String>, outcome: NegotiationOutcome) -> Self {
        Self {
            user_id: user_id.into(),
            is_available: outcome.is_available,
            deal_price: outcome.deal_price,
            remarks: outcome.remarks,
        }
    }

    /// Fixed template for calls that never connected. Invariant:
    /// `deal_price` is zero whenever this path reports unavailability.
    pub fn initiation_failure(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_available: false,
            deal_price: 0,
            remarks: "Call initiation failed".to_string(),
        }
    }
}
