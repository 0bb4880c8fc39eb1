//! Reciprocal Rank Fusion: score = Σ 1/(k + rank + 1), rank zero-based.
//!
//! Scores are accumulated list by list in the order given. Equal scores keep
//! first-seen order, so the first list wins ties.

use std::collections::HashMap;

use crate::types::DocId;

/// A document after fusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedCandidate {
    pub id: DocId,
    pub score: f64,
}

/// Fuse ranked id lists into one ranking, best first.
pub fn fuse(ranked_lists: &[&[DocId]], k: u32) -> Vec<FusedCandidate> {
    let mut position: HashMap<DocId, usize> = HashMap::new();
    let mut candidates: Vec<FusedCandidate> = Vec::new();

    for list in ranked_lists {
        for (rank, &id) in list.iter().enumerate() {
            let rrf = 1.0 / (k as f64 + rank as f64 + 1.0);
            match position.get(&id) {
                Some(&slot) => candidates[slot].score += rrf,
                None => {
                    position.insert(id, candidates.len());
                    candidates.push(FusedCandidate { id, score: rrf });
                }
            }
        }
    }

    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    candidates
}

/// Fuse the two ranker outputs, dense first, keeping the top `width` ids.
pub fn rrf_fuse(lexical: &[DocId], dense: &[DocId], k: u32, width: usize) -> Vec<DocId> {
    let fused = fuse(&[dense, lexical], k);
    tracing::debug!(
        "Fused {} lexical and {} dense results into {} candidates",
        lexical.len(),
        dense.len(),
        fused.len()
    );
    fused.into_iter().take(width).map(|c| c.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tie_resolves_to_dense_order() {
        let (a, b, c, d) = (0, 1, 2, 3);
        let fused = rrf_fuse(&[a, b, c], &[b, a, d], 60, 50);
        assert_eq!(fused, vec![b, a, d, c]);
    }

    #[test]
    fn test_scores_are_monotonic() {
        let fused = fuse(&[&[5, 3, 9], &[3, 7]], 60);
        for pair in fused.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(fused[0].id, 3);
    }

    #[test]
    fn test_single_list_keeps_order() {
        assert_eq!(rrf_fuse(&[4, 2, 8], &[], 60, 50), vec![4, 2, 8]);
        assert_eq!(rrf_fuse(&[], &[], 60, 50), Vec::<DocId>::new());
    }

    #[test]
    fn test_width_truncates() {
        assert_eq!(rrf_fuse(&[1, 2, 3], &[4, 5, 6], 60, 2), vec![4, 1]);
    }

    #[test]
    fn test_score_formula() {
        let fused = fuse(&[&[42]], 60);
        assert!((fused[0].score - 1.0 / 61.0).abs() < 1e-12);
    }
}
