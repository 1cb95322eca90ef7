//! Common data model types used across the answer backend

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cleaned text unit produced by the external cleaner
///
/// Consumed exactly once by the embedder at build time and not retained
/// afterward; only the fields needed for citations and context survive into
/// the index artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUnit {
    pub id: String,
    pub source: String,
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// A fixed-dimension embedding for one document unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingVector {
    pub unit_id: String,
    pub vector: Vec<f32>,
}

/// A document unit joined with its embedding, ready for the index builder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedUnit {
    pub unit_id: String,
    pub source: String,
    pub text: String,
    pub vector: Vec<f32>,
}

/// One ranked nearest-neighbor hit
///
/// Results are ordered by descending similarity; ties break by ascending
/// unit id so repeated queries return identical orderings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    pub unit_id: String,
    pub score: f32,
    pub rank: usize,
}

/// A retrieval hit joined with its passage text, input to context assembly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub unit_id: String,
    pub source: String,
    pub text: String,
    pub score: f32,
}

/// One snippet accepted into the context payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnippet {
    pub unit_id: String,
    pub source: String,
    pub text: String,
}

/// Ordered context snippets under the configured character budget
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextPayload {
    pub snippets: Vec<ContextSnippet>,
    pub total_chars: usize,
}

impl ContextPayload {
    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Render the payload as numbered passages for prompt composition
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, snippet) in self.snippets.iter().enumerate() {
            out.push_str(&format!("{}. [{}] {}\n", i + 1, snippet.source, snippet.text));
        }
        out
    }
}

/// Citation attached to an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub unit_id: String,
    pub source: String,
    pub score: f32,
    pub rank: usize,
}

/// Final response returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub trace_id: String,
    pub degraded: bool,
}

/// Configuration for bounded exponential-backoff retry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryConfig {
    /// Delay before the given retry attempt (1-based), capped at max_delay
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << shift);
        delay.min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_bounded_and_exponential() {
        let retry = RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        };

        assert_eq!(retry.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(retry.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(retry.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(retry.backoff_delay(10), Duration::from_millis(1000));
    }

    #[test]
    fn test_context_payload_render() {
        let payload = ContextPayload {
            snippets: vec![
                ContextSnippet {
                    unit_id: "a".to_string(),
                    source: "faq".to_string(),
                    text: "cats nap often".to_string(),
                },
                ContextSnippet {
                    unit_id: "b".to_string(),
                    source: "guide".to_string(),
                    text: "dogs need walks".to_string(),
                },
            ],
            total_chars: 29,
        };

        let rendered = payload.render();
        assert!(rendered.starts_with("1. [faq] cats nap often\n"));
        assert!(rendered.contains("2. [guide] dogs need walks\n"));
    }
}
