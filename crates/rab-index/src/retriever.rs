//! Read-only retriever over a persisted index artifact

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rab_core::{Error, Result, RetrievalResult};

use crate::artifact::{ARTIFACT_FORMAT_VERSION, IndexArtifact, IndexEntry, normalize};

/// Nearest-neighbor retriever, loaded once at serving startup
///
/// Similarity metric: cosine similarity, computed as the inner product of
/// L2-normalized vectors (entries are normalized at build time, the query at
/// query time). The metric is fixed for the lifetime of an index and matches
/// the embedding model's cosine training objective.
///
/// The loaded index is immutable, so concurrent queries need no locking.
/// Replacing the index means replacing the process that loaded it.
#[derive(Debug)]
pub struct Retriever {
    entries: Vec<IndexEntry>,
    by_id: HashMap<String, usize>,
    dimension: usize,
    model_id: String,
}

impl Retriever {
    /// Load a persisted artifact
    ///
    /// A missing, corrupt, or incompatible artifact fails with
    /// `IndexUnavailable`; this is never retried automatically and requires
    /// a fresh successful build.
    pub fn load(index_path: &Path) -> Result<Self> {
        let bytes = fs::read(index_path).map_err(|e| {
            Error::IndexUnavailable(format!(
                "cannot read artifact {}: {}",
                index_path.display(),
                e
            ))
        })?;

        let artifact: IndexArtifact = bincode::deserialize(&bytes)
            .map_err(|e| Error::IndexUnavailable(format!("corrupt artifact: {}", e)))?;

        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(Error::IndexUnavailable(format!(
                "artifact format version {} is not supported",
                artifact.format_version
            )));
        }

        let mut by_id = HashMap::with_capacity(artifact.entries.len());
        for (i, entry) in artifact.entries.iter().enumerate() {
            if entry.vector.len() != artifact.dimension {
                return Err(Error::IndexUnavailable(format!(
                    "entry {} has dimension {} where the artifact declares {}",
                    entry.unit_id,
                    entry.vector.len(),
                    artifact.dimension
                )));
            }
            if by_id.insert(entry.unit_id.clone(), i).is_some() {
                return Err(Error::IndexUnavailable(format!(
                    "artifact contains duplicate unit id: {}",
                    entry.unit_id
                )));
            }
        }

        tracing::info!(
            entries = artifact.entries.len(),
            dimension = artifact.dimension,
            model_id = %artifact.model_id,
            "index loaded"
        );

        Ok(Self {
            entries: artifact.entries,
            by_id,
            dimension: artifact.dimension,
            model_id: artifact.model_id,
        })
    }

    /// Query the k nearest neighbors of the given vector
    ///
    /// Results are ordered by descending similarity, ties broken by
    /// ascending unit id. A `k` larger than the index returns exactly the
    /// available entries.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        if vector.len() != self.dimension {
            return Err(Error::InvalidInput(format!(
                "query vector has dimension {} where the index expects {}",
                vector.len(),
                self.dimension
            )));
        }

        let mut query = vector.to_vec();
        normalize(&mut query);

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let score: f32 = entry
                    .vector
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| a * b)
                    .sum();
                (i, score)
            })
            .collect();

        scored.sort_by(|(ia, a), (ib, b)| {
            b.partial_cmp(a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| self.entries[*ia].unit_id.cmp(&self.entries[*ib].unit_id))
        });
        scored.truncate(k.min(self.entries.len()));

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(rank, (i, score))| RetrievalResult {
                unit_id: self.entries[i].unit_id.clone(),
                score,
                rank: rank + 1,
            })
            .collect())
    }

    /// Look up the indexed passage for a retrieval hit
    pub fn passage(&self, unit_id: &str) -> Option<&IndexEntry> {
        self.by_id.get(unit_id).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IndexBuilder;
    use rab_core::EmbeddedUnit;

    fn unit(id: &str, vector: Vec<f32>) -> EmbeddedUnit {
        EmbeddedUnit {
            unit_id: id.to_string(),
            source: "test".to_string(),
            text: format!("passage {}", id),
            vector,
        }
    }

    fn build_index(units: Vec<EmbeddedUnit>, dimension: usize) -> (tempfile::TempDir, Retriever) {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("index.bin");
        IndexBuilder::new(&index_path, "test-model", dimension)
            .build(units)
            .unwrap();
        let retriever = Retriever::load(&index_path).unwrap();
        (dir, retriever)
    }

    #[test]
    fn test_load_missing_artifact() {
        let err = Retriever::load(Path::new("/nonexistent/index.bin")).unwrap_err();
        assert_eq!(err.kind(), "index_unavailable");
    }

    #[test]
    fn test_load_corrupt_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("index.bin");
        fs::write(&index_path, b"definitely not bincode").unwrap();

        let err = Retriever::load(&index_path).unwrap_err();
        assert_eq!(err.kind(), "index_unavailable");
    }

    #[test]
    fn test_query_orders_by_descending_similarity() {
        let (_dir, retriever) = build_index(
            vec![
                unit("far", vec![0.0, 1.0]),
                unit("near", vec![1.0, 0.0]),
                unit("mid", vec![1.0, 1.0]),
            ],
            2,
        );

        let results = retriever.query(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.unit_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
        assert!(results[0].score > results[1].score);
        assert!(results[1].score > results[2].score);
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[2].rank, 3);
    }

    #[test]
    fn test_query_is_deterministic() {
        let (_dir, retriever) = build_index(
            vec![
                unit("a", vec![0.4, 0.6]),
                unit("b", vec![0.9, 0.1]),
                unit("c", vec![0.5, 0.5]),
            ],
            2,
        );

        let first = retriever.query(&[0.7, 0.3], 3).unwrap();
        let second = retriever.query(&[0.7, 0.3], 3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let (_dir, retriever) = build_index(
            vec![
                unit("zeta", vec![1.0, 0.0]),
                unit("alpha", vec![1.0, 0.0]),
                unit("mu", vec![1.0, 0.0]),
            ],
            2,
        );

        let results = retriever.query(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.unit_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mu", "zeta"]);
    }

    #[test]
    fn test_k_larger_than_index_returns_all() {
        let (_dir, retriever) = build_index(
            vec![unit("a", vec![1.0, 0.0]), unit("b", vec![0.0, 1.0])],
            2,
        );

        let results = retriever.query(&[1.0, 0.0], 50).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let (_dir, retriever) = build_index(vec![unit("a", vec![1.0, 0.0])], 2);
        let err = retriever.query(&[1.0, 0.0, 0.0], 1).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_passage_lookup() {
        let (_dir, retriever) = build_index(vec![unit("a", vec![1.0, 0.0])], 2);
        assert_eq!(retriever.passage("a").unwrap().text, "passage a");
        assert!(retriever.passage("missing").is_none());
    }
}
