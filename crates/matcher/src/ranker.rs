use std::cmp::Ordering;

use embedding::{normalize, score, validate, Embedding, ValidationError};
use serde_json::Value;
use store::StoredDocument;
use tracing::warn;

use crate::types::{CandidateMetadata, Match};

/// Ranked matches plus bookkeeping about the scanned candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct RankOutcome {
    pub matches: Vec<Match>,
    pub scanned: usize,
    pub skipped: usize,
}

/// Validate and normalize the `embedding` field of a stored document.
///
/// Documents that are not objects, or that lack the field, fail as
/// `NotASequence`.
pub fn candidate_embedding(
    doc: &StoredDocument,
    expected_dim: usize,
) -> Result<Embedding, ValidationError> {
    let label = format!("record {}", doc.id);
    let raw = doc.document.get("embedding").unwrap_or(&Value::Null);
    normalize(validate(raw, expected_dim, &label)?)
}

/// Score candidates against `query`, keep those at or above `threshold`, and
/// return at most `top_k` of them ordered by descending similarity.
///
/// Candidates must share the query's dimension. A candidate whose embedding is
/// unusable is logged and skipped; it never fails the whole ranking. Equal
/// scores keep the order in which the store returned them.
pub fn rank(
    query: &Embedding,
    candidates: &[StoredDocument],
    threshold: f32,
    top_k: usize,
) -> RankOutcome {
    let expected_dim = query.dim();
    let mut skipped = 0usize;
    let mut matches = Vec::new();

    for doc in candidates {
        let candidate = match candidate_embedding(doc, expected_dim) {
            Ok(embedding) => embedding,
            Err(err) => {
                skipped += 1;
                warn!(
                    record_id = %doc.id,
                    kind = err.kind(),
                    error = %err,
                    "candidate_skipped"
                );
                continue;
            }
        };

        let similarity = score(query, &candidate);
        if similarity >= threshold {
            matches.push(Match {
                person_id: doc.id.clone(),
                similarity,
                metadata: CandidateMetadata::from_document(&doc.document),
            });
        }
    }

    // `sort_by` is stable, which keeps store order for ties.
    matches.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });
    matches.truncate(top_k);

    RankOutcome {
        matches,
        scanned: candidates.len(),
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedding::validate_slice;
    use serde_json::json;

    const DIM: usize = 8;

    fn unit(values: &[f32]) -> Embedding {
        normalize(validate_slice(values, values.len(), "t").unwrap()).unwrap()
    }

    fn query() -> Embedding {
        let mut v = vec![0.0; DIM];
        v[0] = 1.0;
        unit(&v)
    }

    /// Raw vector whose cosine similarity to `query()` is `s`.
    fn at_similarity(s: f32) -> Vec<f32> {
        let mut v = vec![0.0; DIM];
        v[0] = s;
        v[1] = (1.0 - s * s).sqrt();
        v
    }

    fn doc(id: &str, embedding: Vec<f32>) -> StoredDocument {
        StoredDocument::new(id, json!({ "embedding": embedding, "name": id }))
    }

    #[test]
    fn filters_sorts_and_keeps_metadata() {
        let candidates = vec![
            doc("low", at_similarity(0.3)),
            doc("high", at_similarity(0.9)),
            doc("mid", at_similarity(0.6)),
        ];
        let out = rank(&query(), &candidates, 0.5, 5);
        let ids: Vec<_> = out.matches.iter().map(|m| m.person_id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid"]);
        assert!((out.matches[0].similarity - 0.9).abs() < 1e-5);
        assert!((out.matches[1].similarity - 0.6).abs() < 1e-5);
        assert_eq!(out.matches[0].metadata.name.as_deref(), Some("high"));
        assert_eq!(out.scanned, 3);
        assert_eq!(out.skipped, 0);
    }

    #[test]
    fn threshold_is_inclusive() {
        let candidates = vec![doc("exact", at_similarity(1.0))];
        let out = rank(&query(), &candidates, 1.0, 5);
        assert_eq!(out.matches.len(), 1);
    }

    #[test]
    fn ties_keep_store_order() {
        let candidates = vec![
            doc("c", at_similarity(0.8)),
            doc("a", at_similarity(0.8)),
            doc("b", at_similarity(0.8)),
        ];
        let out = rank(&query(), &candidates, 0.0, 5);
        let ids: Vec<_> = out.matches.iter().map(|m| m.person_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn truncates_to_top_k() {
        let candidates: Vec<_> = (0..20)
            .map(|i| doc(&format!("p{i}"), at_similarity(0.5 + i as f32 * 0.02)))
            .collect();
        let out = rank(&query(), &candidates, 0.0, 5);
        assert_eq!(out.matches.len(), 5);
        assert_eq!(out.matches[0].person_id, "p19");
        assert!(out
            .matches
            .windows(2)
            .all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn malformed_candidates_are_skipped() {
        let candidates = vec![
            doc("ok-1", at_similarity(0.9)),
            StoredDocument::new("short", json!({ "embedding": vec![1.0; 10] })),
            StoredDocument::new("missing", json!({ "name": "no vector" })),
            StoredDocument::new("scalar", json!(17)),
            StoredDocument::new("zero", json!({ "embedding": vec![0.0; DIM] })),
            StoredDocument::new("text", json!({ "embedding": "0.1,0.2" })),
            doc("ok-2", at_similarity(0.7)),
        ];
        let out = rank(&query(), &candidates, 0.5, 5);
        let ids: Vec<_> = out.matches.iter().map(|m| m.person_id.as_str()).collect();
        assert_eq!(ids, vec!["ok-1", "ok-2"]);
        assert_eq!(out.scanned, 7);
        assert_eq!(out.skipped, 5);
    }

    #[test]
    fn candidate_embedding_labels_errors_with_record_id() {
        let err = candidate_embedding(&StoredDocument::new("p9", json!({})), DIM).unwrap_err();
        assert_eq!(err.label(), "record p9");
        assert_eq!(err.kind(), "NotASequence");
    }

    #[test]
    fn raising_threshold_never_adds_matches() {
        let candidates: Vec<_> = (0..40)
            .map(|i| doc(&format!("p{i}"), at_similarity((i as f32 * 0.37) % 1.0)))
            .collect();
        let mut previous = usize::MAX;
        for step in 0..=20 {
            let threshold = step as f32 * 0.05;
            let found = rank(&query(), &candidates, threshold, usize::MAX).matches.len();
            assert!(found <= previous, "threshold {threshold}: {found} > {previous}");
            previous = found;
        }
    }

    #[test]
    fn empty_store_ranks_to_nothing() {
        let out = rank(&query(), &[], 0.0, 5);
        assert!(out.matches.is_empty());
        assert_eq!(out.scanned, 0);
    }
}
