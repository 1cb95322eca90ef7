//! Vector index for the retrieval-augmented answer backend
//!
//! This crate owns the persisted artifact format, the one-shot builder with
//! atomic publish and readiness marker, and the read-only retriever.

mod artifact;
mod builder;
mod retriever;

pub use artifact::{
    ARTIFACT_FORMAT_VERSION, IndexArtifact, IndexEntry, ReadyMarker, marker_path, normalize,
    probe_ready,
};
pub use builder::{IndexBuildSummary, IndexBuilder};
pub use retriever::Retriever;

// Re-export core types for convenience
pub use rab_core::{EmbeddedUnit, Error, Result, RetrievalResult};
