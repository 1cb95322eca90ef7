//! One-shot index builder with atomic publish

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use tempfile::NamedTempFile;

use rab_core::{EmbeddedUnit, Error, Result};

use crate::artifact::{
    ARTIFACT_FORMAT_VERSION, IndexArtifact, IndexEntry, ReadyMarker, marker_path, normalize,
};

/// Builds the vector index from a fully accumulated batch of embedded units
///
/// The build is all-or-nothing: the artifact is serialized into a temp file
/// in the destination directory and atomically renamed into place, so a
/// concurrently probing reader observes either no artifact or a fully valid
/// one. The readiness marker is cleared before the build starts and written
/// only after the publish succeeds.
pub struct IndexBuilder {
    index_path: PathBuf,
    model_id: String,
    dimension: usize,
}

/// Summary of a successful build
#[derive(Debug, Clone)]
pub struct IndexBuildSummary {
    pub entries: usize,
    pub dimension: usize,
    pub artifact_path: PathBuf,
}

impl IndexBuilder {
    /// Create a new builder targeting the given artifact path
    pub fn new(index_path: impl Into<PathBuf>, model_id: impl Into<String>, dimension: usize) -> Self {
        Self {
            index_path: index_path.into(),
            model_id: model_id.into(),
            dimension,
        }
    }

    /// Build and atomically publish the index
    pub fn build(&self, units: Vec<EmbeddedUnit>) -> Result<IndexBuildSummary> {
        // Any rebuild attempt invalidates the previous readiness signal
        // before new data is touched, so a failed or interrupted build
        // leaves the probe reporting not-ready.
        let marker = marker_path(&self.index_path);
        let _ = fs::remove_file(&marker);

        if units.is_empty() {
            return Err(Error::Build("no embedded units to index".to_string()));
        }

        let mut seen = HashSet::with_capacity(units.len());
        for unit in &units {
            if !seen.insert(unit.unit_id.as_str()) {
                return Err(Error::Build(format!("duplicate unit id: {}", unit.unit_id)));
            }
            if unit.vector.len() != self.dimension {
                return Err(Error::Build(format!(
                    "unit {} has dimension {} where {} was expected",
                    unit.unit_id,
                    unit.vector.len(),
                    self.dimension
                )));
            }
        }

        let mut entries: Vec<IndexEntry> = units
            .into_iter()
            .map(|unit| {
                let mut vector = unit.vector;
                normalize(&mut vector);
                IndexEntry {
                    unit_id: unit.unit_id,
                    source: unit.source,
                    text: unit.text,
                    vector,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.unit_id.cmp(&b.unit_id));

        let artifact = IndexArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            model_id: self.model_id.clone(),
            dimension: self.dimension,
            entries,
        };

        let encoded = bincode::serialize(&artifact)
            .map_err(|e| Error::Build(format!("failed to serialize artifact: {}", e)))?;

        let parent = self
            .index_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent)
            .map_err(|e| Error::Build(format!("cannot create index directory: {}", e)))?;

        let mut tmp = NamedTempFile::new_in(&parent)
            .map_err(|e| Error::Build(format!("cannot create temp artifact: {}", e)))?;
        tmp.write_all(&encoded)
            .and_then(|_| tmp.flush())
            .map_err(|e| Error::Build(format!("cannot write artifact: {}", e)))?;
        tmp.persist(&self.index_path)
            .map_err(|e| Error::Build(format!("cannot publish artifact: {}", e)))?;

        let ready = ReadyMarker {
            completed_at: Utc::now(),
            entry_count: artifact.entries.len(),
            model_id: artifact.model_id.clone(),
            dimension: artifact.dimension,
        };
        let marker_body = serde_json::to_string_pretty(&ready)
            .map_err(|e| Error::Build(format!("failed to serialize marker: {}", e)))?;
        fs::write(&marker, marker_body)
            .map_err(|e| Error::Build(format!("cannot write readiness marker: {}", e)))?;

        tracing::info!(
            entries = artifact.entries.len(),
            dimension = artifact.dimension,
            path = %self.index_path.display(),
            "index built and published"
        );

        Ok(IndexBuildSummary {
            entries: artifact.entries.len(),
            dimension: artifact.dimension,
            artifact_path: self.index_path.clone(),
        })
    }
}
