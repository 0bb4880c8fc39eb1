//! Hybrid retrieval and grounding engine for agriculture questions.
//!
//! A query is turned into structured signals, the corpus is narrowed by
//! metadata, BM25 and dense rankings are fused with RRF and reranked, and
//! the assembled evidence decides whether to answer, ask, or disclose that
//! no grounded answer is possible.

pub mod corpus;
pub mod dense;
pub mod embeddings;
pub mod engine;
pub mod evidence;
pub mod fusion;
pub mod grounding;
pub mod index_store;
pub mod lexical;
pub mod pool;
pub mod rerank;
pub mod signals;
pub mod synthesis;
pub mod types;
pub mod vocab;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use corpus::DocumentStore;
pub use engine::Engine;
pub use evidence::Evidence;
pub use grounding::Decision;
pub use index_store::IndexManifest;
pub use types::{
    BuildStats, DocId, Document, IndexStats, Intent, Month, QueryOutcome, QueryRequest, QueryResponse,
    QuerySignals, SessionContext,
};

use agri_core::{AppConfig, AppError, AppResult};
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::time::Instant;

use crate::corpus::fingerprint_file;
use crate::embeddings::create_provider;
use crate::vocab::Vocabulary;

/// Embedding batches in flight during an index build.
const EMBED_CONCURRENCY: usize = 4;

/// Merge the corpus shards into a snapshot and embed every document into the dense index.
pub async fn build_index(config: &AppConfig) -> AppResult<BuildStats> {
    let start = Instant::now();
    let data_dir = config.data_dir();
    tracing::info!("Building index from {:?}", data_dir);

    let store = DocumentStore::load_shards(&data_dir)?;
    let snapshot_path = config.snapshot_path();
    store.write_snapshot(&snapshot_path)?;
    let fingerprint = fingerprint_file(&snapshot_path)?;

    let provider = create_provider(&config.embedding).await?;
    let batch_size = config.embedding.batch_size.max(1);
    let texts: Vec<String> = store.iter().map(|(_, doc)| doc.text.clone()).collect();

    // Batches run concurrently but complete in corpus order
    let mut batches = stream::iter(texts.chunks(batch_size))
        .map(|batch| provider.embed_batch(batch))
        .buffered(EMBED_CONCURRENCY);

    let mut embeddings = Vec::with_capacity(texts.len());
    while let Some(vectors) = batches.try_next().await? {
        embeddings.extend(vectors);
        tracing::info!("Embedded {}/{} documents", embeddings.len(), texts.len());
    }

    let manifest = IndexManifest {
        count: store.len(),
        dimensions: provider.dimensions(),
        provider: provider.provider_name().to_string(),
        model: provider.model_name().to_string(),
        fingerprint: fingerprint.clone(),
        built_at: Utc::now(),
    };

    let mut conn = index_store::init_index(&config.index_path())?;
    index_store::write_index(&mut conn, &manifest, &embeddings)?;

    let stats = BuildStats {
        documents: manifest.count,
        dimensions: manifest.dimensions,
        provider: manifest.provider,
        model: manifest.model,
        fingerprint,
        duration_secs: start.elapsed().as_secs_f64(),
    };

    tracing::info!(
        "Index build complete: {} documents in {:.2}s",
        stats.documents,
        stats.duration_secs
    );
    Ok(stats)
}

/// Describe the built snapshot and index.
pub fn index_stats(config: &AppConfig) -> AppResult<IndexStats> {
    let index_path = config.index_path();
    if !index_path.exists() {
        return Err(AppError::Index(format!(
            "Dense index not found at {:?}. Run 'agri index build' first.",
            index_path
        )));
    }

    let conn = index_store::init_index(&index_path)?;
    let manifest = index_store::read_manifest(&conn)?;
    let store = DocumentStore::load_snapshot(&config.snapshot_path())?;
    let vocab = Vocabulary::from_store(&store);

    let db_size_bytes = std::fs::metadata(&index_path)
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(IndexStats {
        manifest,
        metrics: store.metric_breakdown(),
        districts_by_state: vocab.districts_by_state(),
        db_size_bytes,
    })
}
