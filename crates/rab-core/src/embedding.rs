//! Embedding backend trait

use async_trait::async_trait;

use crate::Result;

/// Trait for embedding backends
///
/// Maps text units to fixed-dimension vectors. Implementations must be
/// deterministic for a fixed model/version and classify reachability
/// failures as transient so callers can retry with backoff.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Fixed output dimension of this backend's model
    fn dimension(&self) -> usize;

    /// Model identifier, recorded in the index artifact
    fn model_id(&self) -> &str;
}
