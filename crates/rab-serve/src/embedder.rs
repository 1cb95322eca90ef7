//! Embedder component: batching and retry around the embedding backend

use std::sync::Arc;

use rab_core::{
    DocumentUnit, EmbeddedUnit, EmbeddingBackend, Error, Result, RetryConfig, with_retry,
};

/// Batches text units through the embedding backend
///
/// Batches amortize backend round-trips; transient failures are retried with
/// bounded exponential backoff and exhaustion surfaces to the caller, which
/// aborts the build stage or fails the request.
pub struct Embedder<B: EmbeddingBackend> {
    backend: Arc<B>,
    batch_size: usize,
    retry: RetryConfig,
}

/// Outcome of embedding one batch of document units
///
/// Units skipped for empty text are counted, never silently dropped.
#[derive(Debug)]
pub struct EmbedReport {
    pub embedded: Vec<EmbeddedUnit>,
    pub skipped: usize,
}

impl<B: EmbeddingBackend> Embedder<B> {
    /// Create a new embedder over the given backend
    pub fn new(backend: Arc<B>, batch_size: usize, retry: RetryConfig) -> Self {
        Self {
            backend,
            batch_size,
            retry,
        }
    }

    /// Embed a full batch of document units for index building
    pub async fn embed_units(&self, units: Vec<DocumentUnit>) -> Result<EmbedReport> {
        let total = units.len();
        let usable: Vec<DocumentUnit> = units
            .into_iter()
            .filter(|unit| !unit.text.trim().is_empty())
            .collect();
        let skipped = total - usable.len();
        if skipped > 0 {
            tracing::warn!(skipped, total, "skipping document units with empty text");
        }

        let mut embedded = Vec::with_capacity(usable.len());
        for chunk in usable.chunks(self.batch_size.max(1)) {
            let texts: Vec<String> = chunk.iter().map(|unit| unit.text.clone()).collect();
            let vectors = with_retry(&self.retry, "embed_batch", || {
                self.backend.embed_batch(&texts)
            })
            .await?;

            if vectors.len() != chunk.len() {
                return Err(Error::Embedding(format!(
                    "backend returned {} vectors for {} texts",
                    vectors.len(),
                    chunk.len()
                )));
            }

            for (unit, vector) in chunk.iter().zip(vectors) {
                embedded.push(EmbeddedUnit {
                    unit_id: unit.id.clone(),
                    source: unit.source.clone(),
                    text: unit.text.clone(),
                    vector,
                });
            }
        }

        Ok(EmbedReport { embedded, skipped })
    }

    /// Embed a single query text
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let texts = vec![text.to_string()];
        let vectors = with_retry(&self.retry, "embed_query", || {
            self.backend.embed_batch(&texts)
        })
        .await?;

        vectors
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("backend returned no embedding for query".to_string()))
    }

    pub fn dimension(&self) -> usize {
        self.backend.dimension()
    }

    pub fn model_id(&self) -> &str {
        self.backend.model_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::{CountingEmbedder, FlakyEmbedder, KeywordEmbedder, fast_retry, unit};

    #[tokio::test]
    async fn test_embeds_all_units_in_batches() {
        let backend = Arc::new(CountingEmbedder::new(4));
        let embedder = Embedder::new(backend.clone(), 2, fast_retry(3));

        let units = vec![
            unit("a", "one"),
            unit("b", "two"),
            unit("c", "three"),
            unit("d", "four"),
            unit("e", "five"),
        ];

        let report = embedder.embed_units(units).await.unwrap();
        assert_eq!(report.embedded.len(), 5);
        assert_eq!(report.skipped, 0);
        assert_eq!(backend.batch_sizes(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_empty_text_units_are_skipped_and_counted() {
        let embedder = Embedder::new(Arc::new(KeywordEmbedder), 8, fast_retry(3));

        let units = vec![unit("a", "cat sits"), unit("b", "   "), unit("c", "")];
        let report = embedder.embed_units(units).await.unwrap();

        assert_eq!(report.embedded.len(), 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.embedded[0].unit_id, "a");
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let backend = Arc::new(FlakyEmbedder::failing_times(2));
        let embedder = Embedder::new(backend.clone(), 8, fast_retry(3));

        let vector = embedder.embed_query("cat behavior").await.unwrap();
        assert_eq!(vector.len(), backend.dimension());
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_abort() {
        let backend = Arc::new(FlakyEmbedder::failing_times(10));
        let embedder = Embedder::new(backend.clone(), 8, fast_retry(2));

        let err = embedder.embed_query("cat behavior").await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(backend.calls(), 2);
    }
}
