//! HTTP backend integrations for the retrieval-augmented answer backend
//!
//! This crate provides the single concrete implementation of each capability
//! trait: the embedding backend, the generation backend, and the trace sink.

mod classify;
mod embedding_client;
mod generation_client;
mod trace_client;

pub use embedding_client::HttpEmbeddingBackend;
pub use generation_client::HttpGenerationBackend;
pub use trace_client::HttpTraceSink;

// Re-export core types for convenience
pub use rab_core::{
    EmbeddingBackend, Error, GenerationBackend, GenerationOptions, GenerationResult, Result,
    TraceEvent, TraceSink,
};
