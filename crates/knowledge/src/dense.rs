//! Dense ranking: nearest neighbours of the query embedding, restricted to the pool.

use agri_core::{AppError, AppResult};
use std::sync::Arc;

use crate::embeddings::EmbeddingProvider;
use crate::pool::CandidatePool;
use crate::types::DocId;

/// Nearest-neighbour search over document embeddings.
pub trait DenseIndex: Send + Sync {
    /// Up to `top_k` `(id, score)` pairs, best first.
    fn search(&self, query: &[f32], top_k: usize) -> Vec<(DocId, f32)>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dimensions(&self) -> usize;
}

/// Exhaustive cosine-similarity index held in memory.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    vectors: Vec<Vec<f32>>,
    dimensions: usize,
}

impl FlatIndex {
    pub fn new(vectors: Vec<Vec<f32>>, dimensions: usize) -> AppResult<Self> {
        if let Some((id, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimensions) {
            return Err(AppError::Index(format!(
                "Vector {} has {} dimensions, expected {}",
                id,
                v.len(),
                dimensions
            )));
        }
        Ok(Self { vectors, dimensions })
    }
}

impl DenseIndex for FlatIndex {
    fn search(&self, query: &[f32], top_k: usize) -> Vec<(DocId, f32)> {
        let mut scored: Vec<(DocId, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, v)| (id, cosine_similarity(query, v)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Cosine similarity; zero for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Embeds queries and ranks pool members by similarity.
#[derive(Clone)]
pub struct DenseRanker {
    index: Arc<dyn DenseIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    overfetch: usize,
}

impl DenseRanker {
    pub fn new(index: Arc<dyn DenseIndex>, embedder: Arc<dyn EmbeddingProvider>, overfetch: usize) -> Self {
        Self {
            index,
            embedder,
            overfetch: overfetch.max(1),
        }
    }

    /// Search `width * overfetch` neighbours corpus-wide, keep pool members, truncate to `width`.
    pub async fn rank(&self, query: &str, pool: &CandidatePool, width: usize) -> AppResult<Vec<DocId>> {
        let query_vector = self.embedder.embed(query).await?;
        let top_k = width.saturating_mul(self.overfetch).min(self.index.len());

        let ranked: Vec<DocId> = self
            .index
            .search(&query_vector, top_k)
            .into_iter()
            .map(|(id, _)| id)
            .filter(|id| pool.contains(*id))
            .take(width)
            .collect();

        tracing::debug!(
            "Dense ranking: {} of {} neighbours in pool",
            ranked.len(),
            top_k
        );
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::DocumentStore;
    use crate::embeddings::providers::TrigramProvider;
    use crate::pool::filter_pool;
    use crate::types::{Document, Intent, QuerySignals};
    use crate::vocab::Vocabulary;

    #[test]
    fn test_flat_search_order() {
        let index = FlatIndex::new(
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
            2,
        )
        .unwrap();
        let hits = index.search(&[1.0, 0.1], 2);
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_flat_rejects_wrong_dimensions() {
        assert!(FlatIndex::new(vec![vec![1.0, 0.0], vec![1.0]], 2).is_err());
    }

    #[test]
    fn test_cosine_edge_cases() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[2.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_rank_keeps_pool_members_only() {
        let docs: Vec<Document> = [
            ("wheat sowing punjab", Some("practice")),
            ("wheat news punjab", Some("news")),
            ("wheat rainfall punjab", Some("rainfall")),
        ]
        .iter()
        .map(|(text, metric)| Document {
            text: text.to_string(),
            source: "s".into(),
            metric: metric.map(String::from),
            ..Default::default()
        })
        .collect();
        let store = DocumentStore::from_documents(docs).unwrap();
        let vocab = Vocabulary::from_store(&store);

        let embedder = Arc::new(TrigramProvider::new(64));
        let texts: Vec<String> = store.iter().map(|(_, d)| d.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        let index = Arc::new(FlatIndex::new(vectors, 64).unwrap());
        let ranker = DenseRanker::new(index, embedder, 2);

        let signals = QuerySignals {
            intent: Intent::General,
            ..Default::default()
        };
        let pool = filter_pool(&store, &vocab, &signals);
        let ranked = ranker.rank("wheat news", &pool, 10).await.unwrap();

        assert!(!ranked.contains(&1));
        assert_eq!(ranked.len(), 2);
    }
}
