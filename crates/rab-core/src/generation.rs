//! Generation backend trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Result;

/// Per-call options for text generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub model_id: String,
    pub max_tokens: u32,
    pub stop_sequences: Vec<String>,
    pub timeout: Duration,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model_id: String::new(),
            max_tokens: 300,
            stop_sequences: vec!["Question:".to_string()],
            timeout: Duration::from_secs(30),
        }
    }
}

/// Result of a text generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub model_id: String,
    pub tokens_used: Option<u32>,
}

/// Trait for the external generation collaborator
///
/// The answer service composes the prompt; the backend only turns a prompt
/// into text. Reachability failures must be classified as transient.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a completion for the prompt
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<GenerationResult>;

    /// Model identifier used by this backend
    fn model_id(&self) -> &str;
}
