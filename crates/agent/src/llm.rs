use std::time::Duration;

use async_trait::async_trait;
use haggler_core::config::LlmConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// Sampling and deliberation budgets are part of the extraction contract,
// not operator configuration.
const TEMPERATURE: f32 = 0.6;
const TOP_P: f32 = 0.95;
const MAX_TOKENS: u32 = 2048;
const MIN_THINKING_TOKENS: u32 = 1024;
const MAX_THINKING_TOKENS: u32 = 2048;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion API returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("completion response carried no message content")]
    MissingContent,
    #[error("completion content is not valid JSON: {0}")]
    MalformedContent(#[source] serde_json::Error),
}

/// Chat completion constrained to a caller-supplied JSON Schema. Returns
/// the parsed JSON content of the first choice; schema-level validation of
/// the value is the caller's concern.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete_structured(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema_name: &str,
        schema: &Value,
    ) -> Result<Value, LlmError>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint (the
/// deployment targets an NVIDIA-hosted model). Explicitly constructed from
/// config; holds no global state.
pub struct OpenAiCompatClient {
    client: Client,
    completions_url: String,
    api_key: SecretString,
    model: String,
}

impl OpenAiCompatClient {
    /// The configured timeout bounds the whole completion call; expiry
    /// cancels the in-flight request and surfaces as `LlmError::Transport`.
    pub fn from_config(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        let client =
            Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self {
            client,
            completions_url: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn complete_structured(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema_name: &str,
        schema: &Value,
    ) -> Result<Value, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
            temperature: TEMPERATURE,
            top_p: TOP_P,
            max_tokens: MAX_TOKENS,
            min_thinking_tokens: MIN_THINKING_TOKENS,
            max_thinking_tokens: MAX_THINKING_TOKENS,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaSpec { name: schema_name, schema },
            },
        };

        let response = self
            .client
            .post(&self.completions_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status: status.as_u16(), body });
        }

        let completion: ChatResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::MissingContent)?;

        serde_json::from_str(&content).map_err(LlmError::MalformedContent)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    min_thinking_tokens: u32,
    max_thinking_tokens: u32,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    json_schema: JsonSchemaSpec<'a>,
}

#[derive(Serialize)]
struct JsonSchemaSpec<'a> {
    name: &'a str,
    schema: &'a Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
