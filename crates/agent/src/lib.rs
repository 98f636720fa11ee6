//! Transcript intelligence for completed dealer calls.
//!
//! This crate turns the raw transcript of a finished phone call into a
//! structured negotiation outcome:
//! - `llm` — pluggable client for an OpenAI-compatible chat-completions API
//!   with a schema-constrained response contract
//! - `summarizer` — transcript rendering, the fixed extraction prompt, and
//!   validation of the model's answer into `NegotiationOutcome`
//!
//! # Safety principle
//!
//! The model is strictly an extractor. It never invents prices or decides
//! what gets reported; it restates what the dealer said on the call, and
//! anything that fails the output schema is a typed error, never a default.

pub mod llm;
pub mod summarizer;

pub use llm::{LlmClient, LlmError, OpenAiCompatClient};
pub use summarizer::{ExtractionError, Summarizer, TranscriptSummarizer};
