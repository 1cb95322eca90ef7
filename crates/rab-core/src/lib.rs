//! Core traits and types for the retrieval-augmented answer backend
//!
//! This crate defines the capability interfaces for the external backends
//! (embedding, generation, trace sink), the shared data model, the error
//! taxonomy, and the immutable service configuration. Concrete backend
//! implementations live in `rab-backends`; the index and serving pipeline
//! live in `rab-index` and `rab-serve`.

pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod retry;
pub mod trace;
pub mod types;

pub use config::{BackendConfig, RagConfig};
pub use embedding::EmbeddingBackend;
pub use error::{Error, ErrorPayload, Result};
pub use generation::{GenerationBackend, GenerationOptions, GenerationResult};
pub use retry::with_retry;
pub use trace::{RequestStage, TraceEvent, TraceSink, TraceStatus};
pub use types::*;
