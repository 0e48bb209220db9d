//! Startup configuration for the assistant.
//!
//! Values come from the process environment (a `.env` file is honoured) and
//! are fixed once loaded. Unset variables fall back to the defaults below;
//! set-but-unparseable ones are a [`InternMatchError::Config`] error.

use crate::error::{InternMatchError, Result};
use crate::llm::gateways::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::llm::gateways::{GeminiConfig, GeminiGateway};
use crate::llm::retry::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS,
};
use crate::llm::{RequestClient, RetryPolicy, DEFAULT_ATTEMPT_TIMEOUT};
use crate::user_cache::UserCache;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CACHE_DIR: &str = ".internmatch";

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub gemini: GeminiConfig,
    pub retry: RetryPolicy,
    pub attempt_timeout: Duration,
    pub cache_dir: PathBuf,
}

impl AssistantConfig {
    /// Load from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let gemini = GeminiConfig {
            api_key: lookup("GEMINI_API_KEY").unwrap_or_default(),
            base_url: lookup("GEMINI_API_ENDPOINT").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: None,
        };

        let max_attempts =
            parse_var(&lookup, "INTERNMATCH_MAX_RETRIES")?.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        let initial_backoff = parse_var::<u64>(&lookup, "INTERNMATCH_INITIAL_BACKOFF_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_INITIAL_BACKOFF);
        let multiplier = parse_var(&lookup, "INTERNMATCH_BACKOFF_MULTIPLIER")?
            .unwrap_or(DEFAULT_BACKOFF_MULTIPLIER);
        let mut retry = RetryPolicy::new(max_attempts, initial_backoff, multiplier)?;
        if let Some(cap) = parse_var::<u64>(&lookup, "INTERNMATCH_MAX_BACKOFF_MS")? {
            retry = retry.with_max_backoff(Duration::from_millis(cap))?;
        }

        let attempt_timeout = parse_var::<u64>(&lookup, "INTERNMATCH_ATTEMPT_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_ATTEMPT_TIMEOUT);
        if attempt_timeout.is_zero() {
            return Err(InternMatchError::Config("attempt timeout must be positive".to_string()));
        }

        let cache_dir = lookup("INTERNMATCH_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));

        Ok(Self {
            gemini,
            retry,
            attempt_timeout,
            cache_dir,
        })
    }

    /// Build the shared request client for this configuration
    pub fn request_client(&self) -> RequestClient {
        let gateway = Arc::new(GeminiGateway::with_config(self.gemini.clone()));
        RequestClient::new(gateway, self.retry.clone()).with_attempt_timeout(self.attempt_timeout)
    }

    pub fn user_cache(&self) -> UserCache {
        UserCache::new(&self.cache_dir)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| InternMatchError::Config(format!("{key} has invalid value {raw:?}"))),
    }
}
