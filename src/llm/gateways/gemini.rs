//! Gemini gateway for text generation.
//!
//! Speaks the `models/{model}:generateContent` REST shape: a `contents` list
//! holding the prompt and an optional `systemInstruction`, answered by a
//! `candidates` list whose first part carries the generated text.

use crate::error::{InternMatchError, Result};
use crate::llm::gateway::{GenerateRequest, TextGateway};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-09-2025";

/// Configuration for connecting to the Gemini API.
///
/// Built from the environment by [`AssistantConfig`](crate::config::AssistantConfig).
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Option<Duration>,
}

/// Gateway for the Gemini text-generation service.
///
/// Holds no mutable state; one instance can be shared by every session.
pub struct GeminiGateway {
    client: Client,
    config: GeminiConfig,
}

impl GeminiGateway {
    /// Create a new Gemini gateway with custom configuration
    pub fn with_config(config: GeminiConfig) -> Self {
        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder.build().unwrap_or_else(|e| {
            warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        });

        Self { client, config }
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl TextGateway for GeminiGateway {
    async fn generate_content(&self, request: &GenerateRequest) -> Result<String> {
        debug!(model = %self.config.model, "Sending generateContent request");

        let body = build_request_body(request);

        let mut http_request = self.client.post(self.generate_url()).json(&body);
        if !self.config.api_key.is_empty() {
            http_request = http_request.header("x-goog-api-key", &self.config.api_key);
        }

        let response = http_request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InternMatchError::Transport(format!("Gemini API error: {}", status)));
        }

        let raw = response.text().await?;
        let response_body: Value = serde_json::from_str(&raw)?;

        extract_text(&response_body)
    }
}

/// Build the JSON body for a generateContent call.
fn build_request_body(request: &GenerateRequest) -> Value {
    let mut body = serde_json::json!({
        "contents": [{ "parts": [{ "text": request.prompt }] }]
    });

    if let Some(instruction) = &request.system_instruction {
        body["systemInstruction"] = serde_json::json!({ "parts": [{ "text": instruction }] });
    }

    body
}

/// Pull `candidates[0].content.parts[0].text` out of a response.
fn extract_text(response_body: &Value) -> Result<String> {
    let text = response_body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| {
            InternMatchError::MalformedResponse("No text in first candidate".to_string())
        })?;

    if text.is_empty() {
        return Err(InternMatchError::MalformedResponse("Empty candidate text".to_string()));
    }

    Ok(text.to_string())
}
