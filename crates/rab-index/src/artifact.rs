//! Index artifact format and readiness marker
//!
//! The artifact is a single bincode file: serialized vectors plus the id
//! mapping (unit id, source, passage text). It is loadable by the retriever
//! independently of the builder process that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// One indexed passage: id mapping entry plus its vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub unit_id: String,
    pub source: String,
    pub text: String,
    pub vector: Vec<f32>,
}

/// The persisted vector index
///
/// Entries are sorted by unit id and hold L2-normalized vectors; ids are
/// unique, 1:1 with the embedded document units of one build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexArtifact {
    pub format_version: u32,
    pub model_id: String,
    pub dimension: usize,
    pub entries: Vec<IndexEntry>,
}

/// Completion marker written next to the artifact after a successful publish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyMarker {
    pub completed_at: DateTime<Utc>,
    pub entry_count: usize,
    pub model_id: String,
    pub dimension: usize,
}

/// Path of the completion marker for a given artifact path
pub fn marker_path(index_path: &Path) -> PathBuf {
    let mut os = index_path.as_os_str().to_os_string();
    os.push(".ready");
    PathBuf::from(os)
}

/// Readiness signal: marker present and artifact present
///
/// Absence of either means not-ready; a fresh successful build is the only
/// way back to ready.
pub fn probe_ready(index_path: &Path) -> bool {
    index_path.is_file() && marker_path(index_path).is_file()
}

/// L2-normalize a vector in place; zero vectors are left as-is
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_path_appends_ready_suffix() {
        let marker = marker_path(Path::new("/data/index.bin"));
        assert_eq!(marker, PathBuf::from("/data/index.bin.ready"));
    }

    #[test]
    fn test_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_untouched() {
        let mut v = vec![0.0, 0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }
}
