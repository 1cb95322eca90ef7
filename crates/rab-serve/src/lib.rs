//! Serving pipeline for the retrieval-augmented answer backend
//!
//! This crate provides the embedder, context assembler, input/output guards,
//! answer cache, the answer service that orchestrates one request
//! end-to-end, and the pipeline orchestrator that sequences the build stages
//! behind a readiness gate.

mod answer;
mod assembler;
mod cache;
mod embedder;
mod guard;
mod pipeline;


pub use answer::{AnswerOptions, AnswerService};
pub use assembler::ContextAssembler;
pub use cache::AnswerCache;
pub use embedder::{EmbedReport, Embedder};
pub use guard::{AnswerGuard, FALLBACK_ANSWER, QueryGuard};
pub use pipeline::{BuildReport, PipelineOrchestrator, PipelineStage, ServiceStatus, StageToken};

// Re-export core types for convenience
pub use rab_core::{
    AnswerResponse, Citation, ContextPayload, DocumentUnit, Error, Result, RetrievalResult,
};
