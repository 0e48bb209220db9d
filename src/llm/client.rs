use crate::error::{InternMatchError, Result};
use crate::llm::gateway::{GenerateRequest, TextGateway};
use crate::llm::retry::{RetryPolicy, RetryState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Returned in place of generated text once every attempt has failed.
pub const FALLBACK_TEXT: &str =
    "I'm having trouble connecting to the AI network right now. Please try again.";

/// Upper bound on a single network attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one logical `generate` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub was_fallback: bool,
    pub attempts: u32,
}

/// Retrying front for a [`TextGateway`].
///
/// Every transport or response-shape failure is retried per the
/// [`RetryPolicy`]; once the budget is spent the caller gets
/// [`FALLBACK_TEXT`] instead of an error. The client is cheap to clone and
/// holds no per-call state, so many sessions may share one.
#[derive(Clone)]
pub struct RequestClient {
    gateway: Arc<dyn TextGateway>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl RequestClient {
    pub fn new(gateway: Arc<dyn TextGateway>, policy: RetryPolicy) -> Self {
        Self {
            gateway,
            policy,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Override the per-attempt timeout
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Generate text for `prompt`, steering with `system_instruction` when non-empty.
    ///
    /// Only fails for an empty prompt; network trouble yields [`FALLBACK_TEXT`].
    pub async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String> {
        Ok(self.generate_detailed(prompt, system_instruction).await?.text)
    }

    /// Like [`generate`](Self::generate), but reports whether the text is the
    /// fallback and how many attempts were made.
    pub async fn generate_detailed(
        &self,
        prompt: &str,
        system_instruction: &str,
    ) -> Result<Generation> {
        if prompt.trim().is_empty() {
            return Err(InternMatchError::InvalidArgument("prompt must not be empty".to_string()));
        }

        let request = GenerateRequest::new(prompt, system_instruction);
        let mut state = RetryState::start();
        let mut attempts = 0;
        let mut generated = None;

        while !state.is_terminal() {
            match state {
                RetryState::Attempting(attempt) => {
                    attempts = attempt;
                    debug!(attempt, max_attempts = self.policy.max_attempts(), "Generation attempt");

                    match self.attempt(&request).await {
                        Ok(text) => {
                            generated = Some(text);
                            state = state.succeed();
                        }
                        Err(e) => {
                            warn!(attempt, error = %e, "Generation attempt failed");
                            state = state.fail(&self.policy);
                        }
                    }
                }
                RetryState::Waiting(attempt) => {
                    let delay = self.policy.delay_for_retry(attempt);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off");
                    tokio::time::sleep(delay).await;
                    state = state.resume();
                }
                RetryState::Succeeded | RetryState::Exhausted => {}
            }
        }

        match generated {
            Some(text) => Ok(Generation {
                text,
                was_fallback: false,
                attempts,
            }),
            None => {
                warn!(attempts, "Retries exhausted, using fallback text");
                Ok(Generation {
                    text: FALLBACK_TEXT.to_string(),
                    was_fallback: true,
                    attempts,
                })
            }
        }
    }

    async fn attempt(&self, request: &GenerateRequest) -> Result<String> {
        match tokio::time::timeout(self.attempt_timeout, self.gateway.generate_content(request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(InternMatchError::Timeout(self.attempt_timeout)),
        }
    }
}
