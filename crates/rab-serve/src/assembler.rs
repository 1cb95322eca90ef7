//! Context assembler: dedup and budget-bounded snippet selection

use std::collections::HashSet;

use rab_core::{ContextPayload, ContextSnippet, ScoredPassage};

const NEAR_DUPLICATE_JACCARD: f32 = 0.8;

/// Turns ranked passages into a bounded context payload
///
/// Exact duplicates are dropped by normalized-text hash, near-duplicates by
/// word-overlap Jaccard similarity against already-accepted snippets. The
/// payload never exceeds the character budget; descending-relevance order is
/// preserved. Empty input yields an empty payload.
pub struct ContextAssembler {
    budget: usize,
}

impl ContextAssembler {
    /// Create an assembler with the given character budget
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    /// Assemble the context payload from passages in relevance order
    pub fn assemble(&self, passages: &[ScoredPassage]) -> ContextPayload {
        let mut snippets = Vec::new();
        let mut total_chars = 0usize;
        let mut seen_digests = HashSet::new();
        let mut accepted_words: Vec<HashSet<String>> = Vec::new();

        for passage in passages {
            let normalized = normalize_text(&passage.text);
            if normalized.is_empty() {
                continue;
            }

            let digest = format!("{:x}", md5::compute(normalized.as_bytes()));
            if !seen_digests.insert(digest) {
                continue;
            }

            let words: HashSet<String> = normalized
                .split_whitespace()
                .map(str::to_string)
                .collect();
            if accepted_words
                .iter()
                .any(|accepted| jaccard(accepted, &words) >= NEAR_DUPLICATE_JACCARD)
            {
                continue;
            }

            let text_chars = passage.text.chars().count();
            if total_chars + text_chars > self.budget {
                // A top-ranked passage larger than the whole budget is
                // truncated rather than dropped; once something is in the
                // payload, later passages must fit whole.
                if snippets.is_empty() {
                    let truncated: String = passage.text.chars().take(self.budget).collect();
                    total_chars = truncated.chars().count();
                    snippets.push(ContextSnippet {
                        unit_id: passage.unit_id.clone(),
                        source: passage.source.clone(),
                        text: truncated,
                    });
                }
                break;
            }

            total_chars += text_chars;
            accepted_words.push(words);
            snippets.push(ContextSnippet {
                unit_id: passage.unit_id.clone(),
                source: passage.source.clone(),
                text: passage.text.clone(),
            });
        }

        ContextPayload {
            snippets,
            total_chars,
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}
