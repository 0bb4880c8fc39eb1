//! Relevance reranking of fused candidates.

use std::collections::HashSet;
use std::sync::Arc;

use crate::corpus::DocumentStore;
use crate::lexical::tokenize;
use crate::types::DocId;

/// Scores how well a candidate text answers a query. Higher is better.
pub trait RelevanceScorer: Send + Sync {
    fn score(&self, query: &str, candidate: &str) -> f32;
}

/// Local scorer: share of query terms present plus half the share of query bigrams present.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermOverlapScorer;

impl RelevanceScorer for TermOverlapScorer {
    fn score(&self, query: &str, candidate: &str) -> f32 {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return 0.0;
        }
        let doc_tokens = tokenize(candidate);

        let doc_terms: HashSet<&str> = doc_tokens.iter().map(String::as_str).collect();
        let query_terms: HashSet<&str> = query_tokens.iter().map(String::as_str).collect();
        let covered = query_terms.iter().filter(|t| doc_terms.contains(*t)).count();
        let coverage = covered as f32 / query_terms.len() as f32;

        let doc_bigrams: HashSet<(&str, &str)> = doc_tokens
            .windows(2)
            .map(|w| (w[0].as_str(), w[1].as_str()))
            .collect();
        let query_bigrams: HashSet<(&str, &str)> = query_tokens
            .windows(2)
            .map(|w| (w[0].as_str(), w[1].as_str()))
            .collect();
        let bigram_share = if query_bigrams.is_empty() {
            0.0
        } else {
            query_bigrams.iter().filter(|b| doc_bigrams.contains(*b)).count() as f32
                / query_bigrams.len() as f32
        };

        coverage + 0.5 * bigram_share
    }
}

/// Reorders candidates by scorer output and keeps the best.
#[derive(Clone)]
pub struct Reranker {
    scorer: Arc<dyn RelevanceScorer>,
}

impl Default for Reranker {
    fn default() -> Self {
        Self::new(Arc::new(TermOverlapScorer))
    }
}

impl Reranker {
    pub fn new(scorer: Arc<dyn RelevanceScorer>) -> Self {
        Self { scorer }
    }

    /// Stable descending sort by score, truncated to `keep`. Ids missing from the store are dropped.
    pub fn rerank(&self, query: &str, ids: &[DocId], store: &DocumentStore, keep: usize) -> Vec<DocId> {
        let mut scored: Vec<(DocId, f32)> = ids
            .iter()
            .filter_map(|&id| store.get(id).map(|doc| (id, self.scorer.score(query, &doc.text))))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(keep);

        tracing::debug!("Reranked {} candidates, kept {}", ids.len(), scored.len());
        scored.into_iter().map(|(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;

    fn store(texts: &[&str]) -> DocumentStore {
        DocumentStore::from_documents(
            texts
                .iter()
                .map(|t| Document {
                    text: t.to_string(),
                    source: "s".into(),
                    ..Default::default()
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_overlap_scorer() {
        let scorer = TermOverlapScorer;
        let full = scorer.score("seed rate wheat", "Wheat seed rate is 40 kg per acre");
        let partial = scorer.score("seed rate wheat", "Wheat sowing in November");
        let none = scorer.score("seed rate wheat", "Cotton pest management");
        assert!(full > partial && partial > none);
        assert_eq!(none, 0.0);
        assert_eq!(scorer.score("", "anything"), 0.0);
    }

    #[test]
    fn test_bigram_bonus() {
        let scorer = TermOverlapScorer;
        let adjacent = scorer.score("seed rate", "the seed rate");
        let apart = scorer.score("seed rate", "rate of seed");
        assert!((adjacent - 1.5).abs() < 1e-6);
        assert!((apart - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rerank_is_stable_permutation() {
        let store = store(&["cotton", "wheat seed rate", "wheat", "maize", "seed rate wheat"]);
        let reranker = Reranker::default();
        let ids = vec![3, 0, 2, 1, 4];

        let out = reranker.rerank("wheat seed rate", &ids, &store, 10);
        let mut sorted_out = out.clone();
        sorted_out.sort();
        assert_eq!(sorted_out, vec![0, 1, 2, 3, 4]);

        // 1 and 4 tie on coverage but only 1 has both bigrams in order
        assert_eq!(out[0], 1);
        assert_eq!(out[1], 4);
        assert_eq!(out[2], 2);
        // zero scores keep input order
        assert_eq!(&out[3..], &[3, 0]);
    }

    #[test]
    fn test_rerank_truncates() {
        let store = store(&["a", "b", "c"]);
        let out = Reranker::default().rerank("a", &[0, 1, 2], &store, 2);
        assert_eq!(out, vec![0, 1]);
    }
}
