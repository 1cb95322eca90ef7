//! HTTP embedding backend client

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use rab_core::{BackendConfig, EmbeddingBackend, Error, Result};

use crate::classify::{is_transient_status, is_transient_transport, short_body};

/// Embedding client for OpenAI-compatible `/embeddings` endpoints
///
/// Performs a single attempt per call; the embedder component owns the
/// retry/backoff policy.
pub struct HttpEmbeddingBackend {
    client: Client,
    endpoint: String,
    model_id: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl HttpEmbeddingBackend {
    /// Create a new embedding client from backend configuration
    pub fn new(config: &BackendConfig, dimension: usize, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(ref api_key) = config.api_key {
            let auth = format!("Bearer {}", api_key.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth)
                    .map_err(|_| Error::Config("RAB_EMBEDDING_API_KEY contains invalid characters".to_string()))?,
            );
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Embedding(format!("failed to build HTTP client: {}", e)))?;

        let endpoint = format!("{}/embeddings", config.url.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            model_id: config.model_id.clone(),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingBackend for HttpEmbeddingBackend {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model_id,
            input: texts,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if is_transient_transport(&e) {
                    Error::TransientBackend(format!("embedding backend unreachable: {}", e))
                } else {
                    Error::Embedding(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_transient_status(status) {
                return Err(Error::TransientBackend(format!(
                    "embedding backend returned {}: {}",
                    status,
                    short_body(&body)
                )));
            }
            return Err(Error::Embedding(format!(
                "embedding request failed with {}: {}",
                status,
                short_body(&body)
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("bad embedding response: {}", e)))?;

        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "backend returned {} embeddings for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        for entry in &parsed.data {
            if entry.embedding.len() != self.dimension {
                return Err(Error::Embedding(format!(
                    "backend returned dimension {} where {} was configured",
                    entry.embedding.len(),
                    self.dimension
                )));
            }
        }

        tracing::debug!(batch = texts.len(), model_id = %self.model_id, "embedded batch");
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
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
        let input = vec!["cat sits on mat".to_string()];
        let request = EmbeddingRequest {
            model: "all-minilm-l6-v2",
            input: &input,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "all-minilm-l6-v2");
        assert_eq!(json["input"][0], "cat sits on mat");
    }

    #[test]
    fn test_response_parses_out_of_order_entries() {
        let raw = r#"{"data": [
            {"embedding": [0.0, 1.0], "index": 1},
            {"embedding": [1.0, 0.0], "index": 0}
        ]}"#;

        let mut parsed: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        parsed.data.sort_by_key(|entry| entry.index);
        assert_eq!(parsed.data[0].embedding, vec![1.0, 0.0]);
        assert_eq!(parsed.data[1].embedding, vec![0.0, 1.0]);
    }
}
