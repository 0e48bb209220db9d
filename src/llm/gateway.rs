use crate::error::Result;
use async_trait::async_trait;

/// A single text-generation request as seen by a gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Steering text; `None` means the field is omitted from the wire body.
    pub system_instruction: Option<String>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, system_instruction: &str) -> Self {
        let system_instruction = if system_instruction.is_empty() {
            None
        } else {
            Some(system_instruction.to_string())
        };

        Self {
            prompt: prompt.into(),
            system_instruction,
        }
    }
}

/// Abstract interface for remote text-generation endpoints.
///
/// Implementations perform exactly one attempt per call. Retrying is the
/// job of [`RequestClient`](crate::llm::RequestClient).
#[async_trait]
pub trait TextGateway: Send + Sync {
    /// Send the request once and return the generated text
    async fn generate_content(&self, request: &GenerateRequest) -> Result<String>;
}
