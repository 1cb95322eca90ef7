//! Trace events and the trace sink trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Per-request pipeline stage
///
/// `Received → Embedding → Retrieving → Assembling → Generating` terminates
/// in exactly one of `Completed`, `Degraded`, or `Failed`. Retrieval failure
/// alone routes to `Degraded`, never `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStage {
    Received,
    Embedding,
    Retrieving,
    Assembling,
    Generating,
    Completed,
    Degraded,
    Failed,
}

impl RequestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStage::Received => "received",
            RequestStage::Embedding => "embedding",
            RequestStage::Retrieving => "retrieving",
            RequestStage::Assembling => "assembling",
            RequestStage::Generating => "generating",
            RequestStage::Completed => "completed",
            RequestStage::Degraded => "degraded",
            RequestStage::Failed => "failed",
        }
    }
}

/// Outcome of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Ok,
    Error,
    Skipped,
}

/// Structured observability record for one stage of request execution
///
/// Sent to the external sink, never persisted locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub trace_id: String,
    pub stage: RequestStage,
    pub latency_ms: u64,
    pub status: TraceStatus,
    pub timestamp: DateTime<Utc>,
}

impl TraceEvent {
    pub fn new(trace_id: &str, stage: RequestStage, latency_ms: u64, status: TraceStatus) -> Self {
        Self {
            trace_id: trace_id.to_string(),
            stage,
            latency_ms,
            status,
            timestamp: Utc::now(),
        }
    }
}

/// Trait for the external trace sink
///
/// Callers treat emission as best-effort: a failed `record` is logged and
/// never fails the request that produced the event.
#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn record(&self, event: TraceEvent) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serializes_snake_case() {
        let event = TraceEvent::new("t-1", RequestStage::Retrieving, 12, TraceStatus::Ok);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stage"], "retrieving");
        assert_eq!(json["status"], "ok");
        assert_eq!(json["latency_ms"], 12);
    }
}
