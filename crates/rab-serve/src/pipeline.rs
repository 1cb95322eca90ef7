//! Pipeline orchestrator: staged build with persisted completion signals

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use rab_core::{DocumentUnit, EmbeddingBackend, Error, Result};
use rab_index::{IndexBuilder, ReadyMarker, marker_path, probe_ready};

use crate::embedder::Embedder;

/// Build pipeline stages, sequenced fail-closed
///
/// A stage starts only after its predecessor's persisted completion signal
/// exists; a failure blocks everything downstream rather than serving stale
/// or partial data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Clean,
    Build,
    Serve,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Clean => "clean",
            PipelineStage::Build => "build",
            PipelineStage::Serve => "serve",
        }
    }
}

/// Persisted completion token for one stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageToken {
    pub stage: String,
    pub completed_at: DateTime<Utc>,
    pub detail: serde_json::Value,
}

/// Summary of one full build run
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub units_received: usize,
    pub units_skipped: usize,
    pub units_embedded: usize,
    pub entries: usize,
    pub artifact_path: PathBuf,
}

/// Health surface reported to dependents
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub ready: bool,
    pub entry_count: Option<usize>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Sequences clean → embed/build → serve
///
/// The external cleaner's output is validated and acknowledged with a clean
/// token; the build stage embeds and publishes the index atomically; the
/// serve stage is gated on the readiness probe, which dependents poll before
/// accepting traffic.
pub struct PipelineOrchestrator<E: EmbeddingBackend> {
    embedder: Embedder<E>,
    builder: IndexBuilder,
    index_path: PathBuf,
    state_dir: PathBuf,
}

impl<E: EmbeddingBackend> PipelineOrchestrator<E> {
    /// Create an orchestrator targeting the given artifact path
    pub fn new(
        embedder: Embedder<E>,
        index_path: impl Into<PathBuf>,
        model_id: impl Into<String>,
        dimension: usize,
    ) -> Self {
        let index_path = index_path.into();
        let state_dir = index_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            embedder,
            builder: IndexBuilder::new(&index_path, model_id, dimension),
            index_path,
            state_dir,
        }
    }

    /// Run the full build pipeline over the cleaner's output
    pub async fn run_build(&self, units: Vec<DocumentUnit>) -> Result<BuildReport> {
        // A rebuild in progress withdraws the previous readiness signal
        // before anything else happens.
        let _ = fs::remove_file(marker_path(&self.index_path));
        self.clear_token(PipelineStage::Clean);

        let units_received = units.len();
        self.run_clean_stage(&units)?;
        let report = self.run_build_stage(units).await?;

        tracing::info!(
            units_received,
            units_skipped = report.units_skipped,
            entries = report.entries,
            "build pipeline completed"
        );

        Ok(BuildReport {
            units_received,
            ..report
        })
    }

    /// Validate the external cleaner's output and persist the clean token
    fn run_clean_stage(&self, units: &[DocumentUnit]) -> Result<()> {
        if units.is_empty() {
            return Err(Error::Build("cleaner produced no document units".to_string()));
        }
        for unit in units {
            if unit.id.trim().is_empty() {
                return Err(Error::Build("cleaner produced a unit with an empty id".to_string()));
            }
        }

        self.write_token(PipelineStage::Clean, json!({ "units": units.len() }))?;
        tracing::info!(units = units.len(), "clean stage completed");
        Ok(())
    }

    /// Embed and build, gated on the clean stage's completion token
    async fn run_build_stage(&self, units: Vec<DocumentUnit>) -> Result<BuildReport> {
        if !self.stage_completed(PipelineStage::Clean) {
            return Err(Error::Build("clean stage has not signaled completion".to_string()));
        }

        let report = self.embedder.embed_units(units).await?;
        if report.embedded.is_empty() {
            return Err(Error::Build("no document units with text to index".to_string()));
        }

        let units_embedded = report.embedded.len();
        let summary = self.builder.build(report.embedded)?;
        self.write_token(PipelineStage::Build, json!({ "entries": summary.entries }))?;

        Ok(BuildReport {
            units_received: 0,
            units_skipped: report.skipped,
            units_embedded,
            entries: summary.entries,
            artifact_path: summary.artifact_path,
        })
    }

    /// Readiness probe: completion marker present and artifact present
    pub fn readiness_probe(&self) -> bool {
        probe_ready(&self.index_path)
    }

    /// Health surface: ready plus marker details when available
    pub fn status(&self) -> ServiceStatus {
        if !self.readiness_probe() {
            return ServiceStatus {
                ready: false,
                entry_count: None,
                completed_at: None,
            };
        }

        let marker = fs::read_to_string(marker_path(&self.index_path))
            .ok()
            .and_then(|body| serde_json::from_str::<ReadyMarker>(&body).ok());

        ServiceStatus {
            ready: true,
            entry_count: marker.as_ref().map(|m| m.entry_count),
            completed_at: marker.map(|m| m.completed_at),
        }
    }

    /// Whether a stage's persisted completion token exists
    pub fn stage_completed(&self, stage: PipelineStage) -> bool {
        self.token_path(stage).is_file()
    }

    fn token_path(&self, stage: PipelineStage) -> PathBuf {
        self.state_dir.join(format!("{}.token.json", stage.as_str()))
    }

    fn write_token(&self, stage: PipelineStage, detail: serde_json::Value) -> Result<()> {
        let token = StageToken {
            stage: stage.as_str().to_string(),
            completed_at: Utc::now(),
            detail,
        };
        let body = serde_json::to_string_pretty(&token)
            .map_err(|e| Error::Build(format!("failed to serialize stage token: {}", e)))?;

        if let Some(parent) = self.token_path(stage).parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Build(format!("cannot create state directory: {}", e)))?;
        }
        fs::write(self.token_path(stage), body)
            .map_err(|e| Error::Build(format!("cannot write stage token: {}", e)))?;
        Ok(())
    }

    fn clear_token(&self, stage: PipelineStage) {
        let _ = fs::remove_file(self.token_path(stage));
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }
}
