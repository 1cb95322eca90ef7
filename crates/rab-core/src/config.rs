//! Service configuration
//!
//! All configuration is read from the environment exactly once at startup
//! into an immutable `RagConfig` value; components receive the values they
//! need through their constructors and never read process state themselves.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};
use crate::types::RetryConfig;

/// Connection settings for one external backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub model_id: String,
    pub api_key: Option<String>,
}

/// Immutable service configuration, constructed once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    pub index_path: PathBuf,
    pub embedding: BackendConfig,
    pub embedding_dimension: usize,
    pub embed_batch_size: usize,
    pub generation: BackendConfig,
    pub max_answer_tokens: u32,
    pub trace_url: String,
    pub top_k: usize,
    pub context_budget: usize,
    pub retry: RetryConfig,
    pub backend_timeout: Duration,
    pub request_timeout: Duration,
}

impl RagConfig {
    /// Read configuration from environment variables
    ///
    /// Fails fast with a configuration error before any traffic is accepted.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            index_path: PathBuf::from(required("RAB_INDEX_PATH")?),
            embedding: BackendConfig {
                url: required("RAB_EMBEDDING_URL")?,
                model_id: required("RAB_EMBEDDING_MODEL")?,
                api_key: optional("RAB_EMBEDDING_API_KEY"),
            },
            embedding_dimension: parsed("RAB_EMBEDDING_DIMENSION", 384)?,
            embed_batch_size: parsed("RAB_EMBED_BATCH_SIZE", 32)?,
            generation: BackendConfig {
                url: required("RAB_GENERATION_URL")?,
                model_id: required("RAB_GENERATION_MODEL")?,
                api_key: optional("RAB_GENERATION_API_KEY"),
            },
            max_answer_tokens: parsed("RAB_MAX_ANSWER_TOKENS", 300)?,
            trace_url: required("RAB_TRACE_URL")?,
            top_k: parsed("RAB_TOP_K", 5)?,
            context_budget: parsed("RAB_CONTEXT_BUDGET", 2000)?,
            retry: RetryConfig {
                max_attempts: parsed("RAB_RETRY_MAX_ATTEMPTS", 3)?,
                base_delay: Duration::from_millis(parsed("RAB_RETRY_BASE_MS", 500)?),
                max_delay: Duration::from_millis(parsed("RAB_RETRY_MAX_MS", 8000)?),
            },
            backend_timeout: Duration::from_secs(parsed("RAB_BACKEND_TIMEOUT_SECS", 30)?),
            request_timeout: Duration::from_secs(parsed("RAB_REQUEST_TIMEOUT_SECS", 60)?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate invariants that cannot be expressed in types
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::Config("RAB_TOP_K must be at least 1".to_string()));
        }
        if self.context_budget == 0 {
            return Err(Error::Config("RAB_CONTEXT_BUDGET must be at least 1".to_string()));
        }
        if self.embedding_dimension == 0 {
            return Err(Error::Config("RAB_EMBEDDING_DIMENSION must be at least 1".to_string()));
        }
        if self.embed_batch_size == 0 {
            return Err(Error::Config("RAB_EMBED_BATCH_SIZE must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("RAB_RETRY_MAX_ATTEMPTS must be at least 1".to_string()));
        }
        if self.index_path.as_os_str().is_empty() {
            return Err(Error::Config("RAB_INDEX_PATH must not be empty".to_string()));
        }

        for (name, value) in [
            ("RAB_EMBEDDING_URL", &self.embedding.url),
            ("RAB_GENERATION_URL", &self.generation.url),
            ("RAB_TRACE_URL", &self.trace_url),
        ] {
            Url::parse(value)
                .map_err(|e| Error::Config(format!("{} is not a valid URL: {}", name, e)))?;
        }

        Ok(())
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name)
        .map_err(|_| Error::Config(format!("{} environment variable not found", name)))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", name, value))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> RagConfig {
        RagConfig {
            index_path: PathBuf::from("/tmp/rab/index.bin"),
            embedding: BackendConfig {
                url: "http://localhost:8100".to_string(),
                model_id: "all-minilm-l6-v2".to_string(),
                api_key: None,
            },
            embedding_dimension: 384,
            embed_batch_size: 32,
            generation: BackendConfig {
                url: "http://localhost:8200".to_string(),
                model_id: "answer-model".to_string(),
                api_key: Some("key".to_string()),
            },
            max_answer_tokens: 300,
            trace_url: "http://localhost:8300/traces".to_string(),
            top_k: 5,
            context_budget: 2000,
            retry: RetryConfig::default(),
            backend_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let mut config = sample_config();
        config.top_k = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut config = sample_config();
        config.trace_url = "not a url".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_zero_budget_rejected() {
        let mut config = sample_config();
        config.context_budget = 0;
        assert!(config.validate().is_err());
    }
}
