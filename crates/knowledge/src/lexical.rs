//! Okapi BM25 lexical ranking.
//!
//! Term statistics come from the whole corpus; scoring only visits pool members.

use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

use crate::corpus::DocumentStore;
use crate::pool::CandidatePool;
use crate::types::DocId;

/// BM25 parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
    /// Negative IDFs are floored to `epsilon * mean_idf`
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

/// Lower-cased Unicode word tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// Precomputed corpus statistics.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    params: Bm25Params,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    avg_doc_len: f64,
    idf: HashMap<String, f64>,
}

impl Bm25Index {
    pub fn build(store: &DocumentStore) -> Self {
        Self::with_params(store, Bm25Params::default())
    }

    pub fn with_params(store: &DocumentStore, params: Bm25Params) -> Self {
        let mut term_freqs = Vec::with_capacity(store.len());
        let mut doc_lens = Vec::with_capacity(store.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for (_, doc) in store.iter() {
            let tokens = tokenize(&doc.text);
            doc_lens.push(tokens.len());

            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }

        let n = doc_lens.len() as f64;
        let total_len: usize = doc_lens.iter().sum();
        let avg_doc_len = if doc_lens.is_empty() {
            0.0
        } else {
            total_len as f64 / n
        };

        let mut idf: HashMap<String, f64> = doc_freq
            .into_iter()
            .map(|(term, df)| {
                let df = df as f64;
                (term, (n - df + 0.5).ln() - (df + 0.5).ln())
            })
            .collect();

        if !idf.is_empty() {
            let mean_idf = idf.values().sum::<f64>() / idf.len() as f64;
            let floor = params.epsilon * mean_idf;
            for value in idf.values_mut() {
                if *value < 0.0 {
                    *value = floor;
                }
            }
        }

        tracing::debug!(
            "BM25 index: {} documents, {} terms, avg length {:.1}",
            doc_lens.len(),
            idf.len(),
            avg_doc_len
        );

        Self {
            params,
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
        }
    }

    /// BM25 score of one document for pre-tokenised query terms.
    pub fn score(&self, query_terms: &[String], id: DocId) -> f64 {
        let (Some(tf), Some(&len)) = (self.term_freqs.get(id), self.doc_lens.get(id)) else {
            return 0.0;
        };
        if self.avg_doc_len == 0.0 {
            return 0.0;
        }

        let Bm25Params { k1, b, .. } = self.params;
        let norm = k1 * (1.0 - b + b * len as f64 / self.avg_doc_len);

        query_terms
            .iter()
            .map(|term| {
                let freq = tf.get(term).copied().unwrap_or(0) as f64;
                if freq == 0.0 {
                    return 0.0;
                }
                let idf = self.idf.get(term).copied().unwrap_or(0.0);
                idf * freq * (k1 + 1.0) / (freq + norm)
            })
            .sum()
    }

    /// Rank every pool member by descending score, ties in corpus order.
    pub fn rank(&self, query: &str, pool: &CandidatePool, width: usize) -> Vec<DocId> {
        let terms = tokenize(query);
        let mut scored: Vec<(DocId, f64)> = pool
            .ids()
            .iter()
            .map(|&id| (id, self.score(&terms, id)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(width);
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

    fn pool_of(store: &DocumentStore) -> CandidatePool {
        crate::pool::filter_pool(
            store,
            &crate::vocab::Vocabulary::from_store(store),
            &Default::default(),
        )
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Wheat: sow 1-15 Nov, seed-rate 40kg."),
            vec!["wheat", "sow", "1", "15", "nov", "seed", "rate", "40kg"]
        );
    }

    #[test]
    fn test_term_match_outranks_non_match() {
        let store = store(&[
            "cotton sowing in april",
            "wheat sowing in november",
            "wheat seed rate forty kilograms",
        ]);
        let index = Bm25Index::build(&store);
        let ranked = index.rank("wheat seed rate", &pool_of(&store), 10);
        assert_eq!(ranked[0], 2);
        assert_eq!(ranked[1], 1);
        assert_eq!(ranked[2], 0);
    }

    #[test]
    fn test_ties_keep_corpus_order() {
        let store = store(&["alpha", "beta", "gamma"]);
        let index = Bm25Index::build(&store);
        let ranked = index.rank("delta", &pool_of(&store), 10);
        assert_eq!(ranked, vec![0, 1, 2]);
    }

    #[test]
    fn test_negative_idf_is_floored() {
        // "wheat" appears in every document, so its raw idf is negative
        let store = store(&["wheat punjab", "wheat haryana", "wheat bihar"]);
        let index = Bm25Index::build(&store);

        let raw_wheat = 0.5f64.ln() - 3.5f64.ln();
        let raw_other = 2.5f64.ln() - 1.5f64.ln();
        let mean = (raw_wheat + 3.0 * raw_other) / 4.0;

        assert!((index.idf["wheat"] - 0.25 * mean).abs() < 1e-12);
        assert!((index.idf["punjab"] - raw_other).abs() < 1e-12);
    }

    #[test]
    fn test_width_truncates() {
        let store = store(&["a b", "b c", "c d", "d e"]);
        let index = Bm25Index::build(&store);
        assert_eq!(index.rank("b", &pool_of(&store), 2).len(), 2);
    }
}
