//! Transcript summarization into a structured negotiation outcome.

use async_trait::async_trait;
use haggler_core::domain::outcome::NegotiationOutcome;
use haggler_core::domain::webhook::TranscriptTurn;
use serde_json::Value;
use thiserror::Error;

use crate::llm::{LlmClient, LlmError};

const SYSTEM_PROMPT: &str = include_str!("../prompts/transcript_summary.md");
const SCHEMA_NAME: &str = "NegotiationOutcome";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("model output failed outcome validation: {source}; raw content: {raw}")]
    Schema {
        #[source]
        source: serde_json::Error,
        raw: String,
    },
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        transcript: &[TranscriptTurn],
    ) -> Result<NegotiationOutcome, ExtractionError>;
}

/// Schema-constrained extraction over a pluggable completion client.
pub struct TranscriptSummarizer<C> {
    client: C,
    schema: Value,
}

impl<C> TranscriptSummarizer<C>
where
    C: LlmClient,
{
    pub fn new(client: C) -> Self {
        Self { client, schema: schemars::schema_for!(NegotiationOutcome).to_value() }
    }
}

#[async_trait]
impl<C> Summarizer for TranscriptSummarizer<C>
where
    C: LlmClient,
{
    async fn summarize(
        &self,
        transcript: &[TranscriptTurn],
    ) -> Result<NegotiationOutcome, ExtractionError> {
        let rendered = render_transcript(transcript);
        let content = self
            .client
            .complete_structured(SYSTEM_PROMPT, &rendered, SCHEMA_NAME, &self.schema)
            .await?;

        serde_json::from_value(content.clone())
            .map_err(|source| ExtractionError::Schema { source, raw: content.to_string() })
    }
}

/// Renders the chronological transcript as one `LABEL: message` line per
/// turn. Order is load-bearing: it is the conversation.
pub fn render_transcript(transcript: &[TranscriptTurn]) -> String {
    transcript
        .iter()
        .map(|turn| format!("{}: {}", display_label(&turn.role), turn.message))
        .collect::<Vec<_>>()
        .join("\n")
}

// The called party is the dealer; our calling agent is the advisor. Roles
// outside the known pair are upcased as-is rather than aborting the
// delivery.
fn display_label(role: &str) -> String {
    match role {
        "user" => "DEALER".to_string(),
        "agent" => "ADVISOR".to_string(),
        other => other.to_ascii_uppercase(),
    }
}
