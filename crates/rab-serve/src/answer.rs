//! Answer service: one request end-to-end

use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use rab_core::{
    AnswerResponse, Citation, ContextPayload, EmbeddingBackend, GenerationBackend,
    GenerationOptions, RagConfig, RequestStage, Result, RetrievalResult, RetryConfig,
    ScoredPassage, TraceEvent, TraceSink, TraceStatus, with_retry,
};
use rab_index::Retriever;

use crate::assembler::ContextAssembler;
use crate::cache::AnswerCache;
use crate::embedder::Embedder;
use crate::guard::{AnswerGuard, QueryGuard};

const ANSWER_PROMPT: &str = "You are a knowledgeable and careful assistant. \
Answer the question using the passages below.\n\n\
Passages:\n{context}\n\
Question: {question}\nAnswer:";

const DEGRADED_PROMPT: &str = "You are a knowledgeable and careful assistant. \
No reference passages are available; answer from general knowledge and say so \
when you are unsure.\n\n\
Question: {question}\nAnswer:";

const CACHE_CAPACITY: usize = 256;

/// Tuning for the answer pipeline, taken from the immutable service config
#[derive(Debug, Clone)]
pub struct AnswerOptions {
    pub top_k: usize,
    pub context_budget: usize,
    pub max_answer_tokens: u32,
    pub retry: RetryConfig,
    pub backend_timeout: Duration,
}

impl AnswerOptions {
    pub fn from_config(config: &RagConfig) -> Self {
        Self {
            top_k: config.top_k,
            context_budget: config.context_budget,
            max_answer_tokens: config.max_answer_tokens,
            retry: config.retry.clone(),
            backend_timeout: config.backend_timeout,
        }
    }
}

/// Orchestrates one request: embed, retrieve, assemble, generate
///
/// Each request walks the stage machine
/// `Received → Embedding → Retrieving → Assembling → Generating` and
/// terminates in `Completed`, `Degraded`, or `Failed`. A missing index or
/// zero retrieval results route to degraded-mode answering; only embedding
/// or generation failure after exhausted retries fails the request. A trace
/// event is emitted at every stage boundary, best-effort.
pub struct AnswerService<E: EmbeddingBackend, G: GenerationBackend, T: TraceSink> {
    embedder: Embedder<E>,
    retriever: Option<Arc<Retriever>>,
    assembler: ContextAssembler,
    generation: Arc<G>,
    trace: Arc<T>,
    query_guard: QueryGuard,
    answer_guard: AnswerGuard,
    cache: AnswerCache,
    options: AnswerOptions,
}

impl<E: EmbeddingBackend, G: GenerationBackend, T: TraceSink> AnswerService<E, G, T> {
    /// Create a new answer service
    ///
    /// `retriever` is `None` when no index could be loaded at startup; the
    /// service then answers every request in degraded mode until the process
    /// is replaced with one that loads a fresh artifact.
    pub fn new(
        embedder: Embedder<E>,
        retriever: Option<Arc<Retriever>>,
        generation: Arc<G>,
        trace: Arc<T>,
        options: AnswerOptions,
    ) -> Self {
        Self {
            embedder,
            retriever,
            assembler: ContextAssembler::new(options.context_budget),
            generation,
            trace,
            query_guard: QueryGuard::new(),
            answer_guard: AnswerGuard::new(),
            cache: AnswerCache::new(CACHE_CAPACITY),
            options,
        }
    }

    /// Whether an index is loaded and retrieval-backed answers are possible
    pub fn is_ready(&self) -> bool {
        self.retriever.is_some()
    }

    /// Handle one query end-to-end
    pub async fn handle(&self, query: &str) -> Result<AnswerResponse> {
        let trace_id = Uuid::new_v4().to_string();
        let request_started = Instant::now();
        self.emit(&trace_id, RequestStage::Received, TraceStatus::Ok, 0).await;

        let question = match self.query_guard.inspect(query) {
            Ok(question) => question,
            Err(e) => {
                self.emit_elapsed(&trace_id, RequestStage::Failed, TraceStatus::Error, request_started)
                    .await;
                return Err(e);
            }
        };

        if let Some(mut cached) = self.cache.get(&question) {
            tracing::debug!(trace_id, "answer served from cache");
            cached.trace_id = trace_id.clone();
            self.emit_elapsed(&trace_id, RequestStage::Completed, TraceStatus::Ok, request_started)
                .await;
            return Ok(cached);
        }

        // Embedding
        let stage_started = Instant::now();
        let query_vector = match self.embedder.embed_query(&question).await {
            Ok(vector) => {
                self.emit_elapsed(&trace_id, RequestStage::Embedding, TraceStatus::Ok, stage_started)
                    .await;
                vector
            }
            Err(e) => {
                self.emit_elapsed(&trace_id, RequestStage::Embedding, TraceStatus::Error, stage_started)
                    .await;
                self.emit_elapsed(&trace_id, RequestStage::Failed, TraceStatus::Error, request_started)
                    .await;
                return Err(e);
            }
        };

        // Retrieving; failure here degrades, never fails
        let stage_started = Instant::now();
        let results = match &self.retriever {
            Some(retriever) => match retriever.query(&query_vector, self.options.top_k) {
                Ok(results) => {
                    self.emit_elapsed(&trace_id, RequestStage::Retrieving, TraceStatus::Ok, stage_started)
                        .await;
                    results
                }
                Err(e) => {
                    tracing::warn!(trace_id, error = %e, "retrieval failed, continuing degraded");
                    self.emit_elapsed(&trace_id, RequestStage::Retrieving, TraceStatus::Error, stage_started)
                        .await;
                    Vec::new()
                }
            },
            None => {
                self.emit_elapsed(&trace_id, RequestStage::Retrieving, TraceStatus::Skipped, stage_started)
                    .await;
                Vec::new()
            }
        };
        let degraded = results.is_empty();

        // Assembling
        let stage_started = Instant::now();
        let context = if degraded {
            self.emit_elapsed(&trace_id, RequestStage::Assembling, TraceStatus::Skipped, stage_started)
                .await;
            ContextPayload::default()
        } else {
            let payload = self.assembler.assemble(&self.scored_passages(&results));
            self.emit_elapsed(&trace_id, RequestStage::Assembling, TraceStatus::Ok, stage_started)
                .await;
            payload
        };

        // Generating
        let prompt = compose_prompt(&question, &context, degraded);
        let gen_options = GenerationOptions {
            model_id: String::new(),
            max_tokens: self.options.max_answer_tokens,
            stop_sequences: vec!["Question:".to_string()],
            timeout: self.options.backend_timeout,
        };
        let stage_started = Instant::now();
        let generated = match with_retry(&self.options.retry, "generate", || {
            self.generation.generate(&prompt, &gen_options)
        })
        .await
        {
            Ok(result) => {
                self.emit_elapsed(&trace_id, RequestStage::Generating, TraceStatus::Ok, stage_started)
                    .await;
                result
            }
            Err(e) => {
                self.emit_elapsed(&trace_id, RequestStage::Generating, TraceStatus::Error, stage_started)
                    .await;
                self.emit_elapsed(&trace_id, RequestStage::Failed, TraceStatus::Error, request_started)
                    .await;
                return Err(e);
            }
        };

        let answer = self.answer_guard.sanitize(&generated.text);
        let citations = self.citations(&results);

        let response = AnswerResponse {
            answer,
            citations,
            trace_id: trace_id.clone(),
            degraded,
        };

        if !degraded {
            self.cache.put(&question, &response);
        }

        let final_stage = if degraded {
            RequestStage::Degraded
        } else {
            RequestStage::Completed
        };
        self.emit_elapsed(&trace_id, final_stage, TraceStatus::Ok, request_started)
            .await;

        Ok(response)
    }

    fn scored_passages(&self, results: &[RetrievalResult]) -> Vec<ScoredPassage> {
        let Some(retriever) = &self.retriever else {
            return Vec::new();
        };

        results
            .iter()
            .filter_map(|result| {
                retriever.passage(&result.unit_id).map(|entry| ScoredPassage {
                    unit_id: entry.unit_id.clone(),
                    source: entry.source.clone(),
                    text: entry.text.clone(),
                    score: result.score,
                })
            })
            .collect()
    }

    fn citations(&self, results: &[RetrievalResult]) -> Vec<Citation> {
        results
            .iter()
            .map(|result| {
                let source = self
                    .retriever
                    .as_ref()
                    .and_then(|retriever| retriever.passage(&result.unit_id))
                    .map(|entry| entry.source.clone())
                    .unwrap_or_default();
                Citation {
                    unit_id: result.unit_id.clone(),
                    source,
                    score: result.score,
                    rank: result.rank,
                }
            })
            .collect()
    }

    async fn emit(&self, trace_id: &str, stage: RequestStage, status: TraceStatus, latency_ms: u64) {
        let event = TraceEvent::new(trace_id, stage, latency_ms, status);
        if let Err(e) = self.trace.record(event).await {
            tracing::warn!(trace_id, stage = stage.as_str(), error = %e, "trace emission failed");
        }
    }

    async fn emit_elapsed(
        &self,
        trace_id: &str,
        stage: RequestStage,
        status: TraceStatus,
        started: Instant,
    ) {
        self.emit(trace_id, stage, status, started.elapsed().as_millis() as u64)
            .await;
    }
}

fn compose_prompt(question: &str, context: &ContextPayload, degraded: bool) -> String {
    if degraded {
        DEGRADED_PROMPT.replace("{question}", question)
    } else {
        ANSWER_PROMPT
            .replace("{context}", &context.render())
            .replace("{question}", question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rab_core::{ContextSnippet, ContextPayload};

    #[test]
    fn test_prompt_includes_context_and_question() {
        let context = ContextPayload {
            snippets: vec![ContextSnippet {
                unit_id: "a".to_string(),
                source: "faq".to_string(),
                text: "cats nap often".to_string(),
            }],
            total_chars: 14,
        };

        let prompt = compose_prompt("how do cats behave?", &context, false);
        assert!(prompt.contains("1. [faq] cats nap often"));
        assert!(prompt.contains("Question: how do cats behave?"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn test_degraded_prompt_has_no_context_slot() {
        let prompt = compose_prompt("how do cats behave?", &ContextPayload::default(), true);
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("Passages:"));
        assert!(prompt.contains("Question: how do cats behave?"));
    }
}
