//! HTTP generation backend client

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use rab_core::{BackendConfig, Error, GenerationBackend, GenerationOptions, GenerationResult, Result};

use crate::classify::{is_transient_status, is_transient_transport, short_body};

/// Generation client for completion-style endpoints
pub struct HttpGenerationBackend {
    client: Client,
    endpoint: String,
    model_id: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

#[derive(Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    completion_tokens: Option<u32>,
}

impl HttpGenerationBackend {
    /// Create a new generation client from backend configuration
    pub fn new(config: &BackendConfig, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(ref api_key) = config.api_key {
            let auth = format!("Bearer {}", api_key.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth)
                    .map_err(|_| Error::Config("RAB_GENERATION_API_KEY contains invalid characters".to_string()))?,
            );
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Generation(format!("failed to build HTTP client: {}", e)))?;

        let endpoint = format!("{}/completions", config.url.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            model_id: config.model_id.clone(),
        })
    }

    async fn perform_generation(&self, prompt: &str, options: &GenerationOptions) -> Result<GenerationResult> {
        let model = if options.model_id.is_empty() {
            &self.model_id
        } else {
            &options.model_id
        };

        let request = CompletionRequest {
            model,
            prompt,
            max_tokens: options.max_tokens,
            stop: options.stop_sequences.clone(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if is_transient_transport(&e) {
                    Error::TransientBackend(format!("generation backend unreachable: {}", e))
                } else {
                    Error::Generation(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_transient_status(status) {
                return Err(Error::TransientBackend(format!(
                    "generation backend returned {}: {}",
                    status,
                    short_body(&body)
                )));
            }
            return Err(Error::Generation(format!(
                "generation request failed with {}: {}",
                status,
                short_body(&body)
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("bad generation response: {}", e)))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| Error::Generation("generation backend returned no choices".to_string()))?;

        tracing::debug!(model_id = %model, chars = text.len(), "generation completed");

        Ok(GenerationResult {
            text,
            model_id: model.to_string(),
            tokens_used: parsed.usage.and_then(|usage| usage.completion_tokens),
        })
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerationBackend {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<GenerationResult> {
        match timeout(options.timeout, self.perform_generation(prompt, options)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout("generation call exceeded its budget".to_string())),
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = CompletionRequest {
            model: "answer-model",
            prompt: "Question: why?\nAnswer:",
            max_tokens: 100,
            stop: vec!["Question:".to_string()],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "answer-model");
        assert_eq!(json["max_tokens"], 100);
        assert_eq!(json["stop"][0], "Question:");
    }

    #[test]
    fn test_response_parses_first_choice() {
        let raw = r#"{"choices": [{"text": " Cats nap a lot."}], "usage": {"completion_tokens": 6}}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].text, " Cats nap a lot.");
        assert_eq!(parsed.usage.unwrap().completion_tokens, Some(6));
    }

    #[test]
    fn test_response_without_usage() {
        let raw = r#"{"choices": [{"text": "ok"}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.usage.is_none());
    }
}
