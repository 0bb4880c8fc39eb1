//! Query pipeline: signals, pool, concurrent ranking, fusion, rerank,
//! evidence, grounding decision and synthesis.

use agri_core::{AppConfig, AppError, AppResult, RetrievalConfig};
use agri_llm::create_client;
use agri_prompt::{load_prompt_or_default, ANSWER_PROMPT_ID};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

use crate::corpus::{fingerprint_file, DocumentStore};
use crate::dense::{DenseIndex, DenseRanker, FlatIndex};
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::evidence::{assemble, EvidenceLimits};
use crate::fusion::rrf_fuse;
use crate::grounding::{clarify_question, mismatch_question, ungrounded_message, Decision, GroundingPolicy};
use crate::index_store::load_index;
use crate::lexical::Bm25Index;
use crate::pool::filter_pool;
use crate::rerank::Reranker;
use crate::signals::SignalExtractor;
use crate::synthesis::{AnswerGateway, SynthesisSettings};
use crate::types::{DocId, QueryOutcome, QueryRequest, QueryResponse, SessionContext};
use crate::vocab::Vocabulary;

/// Read-only retrieval state plus the collaborators needed to answer queries.
///
/// Everything inside is immutable after construction; one engine serves any
/// number of concurrent conversations, each with its own [`SessionContext`].
#[derive(Clone)]
pub struct Engine {
    store: Arc<DocumentStore>,
    extractor: Arc<SignalExtractor>,
    bm25: Arc<Bm25Index>,
    dense: DenseRanker,
    reranker: Reranker,
    gateway: AnswerGateway,
    policy: GroundingPolicy,
    retrieval: RetrievalConfig,
}

impl Engine {
    /// Assemble an engine from already-loaded parts.
    pub fn new(
        store: DocumentStore,
        dense_index: Arc<dyn DenseIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Reranker,
        gateway: AnswerGateway,
        retrieval: RetrievalConfig,
    ) -> AppResult<Self> {
        if dense_index.len() != store.len() {
            return Err(AppError::Index(format!(
                "Dense index holds {} vectors but the corpus has {} documents",
                dense_index.len(),
                store.len()
            )));
        }
        if dense_index.dimensions() != embedder.dimensions() {
            return Err(AppError::Index(format!(
                "Dense index has {} dimensions but the embedding provider produces {}",
                dense_index.dimensions(),
                embedder.dimensions()
            )));
        }

        let vocab = Arc::new(Vocabulary::from_store(&store));
        let extractor = SignalExtractor::new(vocab)?;
        let bm25 = Bm25Index::build(&store);
        let dense = DenseRanker::new(dense_index, embedder, retrieval.dense_overfetch);

        Ok(Self {
            store: Arc::new(store),
            extractor: Arc::new(extractor),
            bm25: Arc::new(bm25),
            dense,
            reranker,
            gateway,
            policy: GroundingPolicy {
                evidence_min: retrieval.evidence_min,
                mismatch_window: retrieval.mismatch_window,
            },
            retrieval,
        })
    }

    /// Load the snapshot and index built by `agri index build` and connect the providers.
    ///
    /// Any inconsistency between snapshot, index and configuration is fatal.
    pub async fn open(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let snapshot_path = config.snapshot_path();
        let store = DocumentStore::load_snapshot(&snapshot_path)?;
        let fingerprint = fingerprint_file(&snapshot_path)?;
        let (manifest, vectors) = load_index(&config.index_path())?;

        if manifest.fingerprint != fingerprint {
            return Err(AppError::Index(format!(
                "Index was built from a different corpus snapshot ({} != {}). Run 'agri index build'.",
                short(&manifest.fingerprint),
                short(&fingerprint)
            )));
        }
        if manifest.count != store.len() || vectors.len() != store.len() {
            return Err(AppError::Index(format!(
                "Index holds {} vectors but the snapshot has {} documents. Run 'agri index build'.",
                vectors.len(),
                store.len()
            )));
        }
        let embedding = &config.embedding;
        if manifest.provider != embedding.provider
            || manifest.model != embedding.model
            || manifest.dimensions != embedding.dimensions
        {
            return Err(AppError::Index(format!(
                "Index was built with {}/{} ({} dims) but the configuration uses {}/{} ({} dims). Run 'agri index build'.",
                manifest.provider,
                manifest.model,
                manifest.dimensions,
                embedding.provider,
                embedding.model,
                embedding.dimensions
            )));
        }

        let embedder = create_provider(embedding).await?;
        let index = FlatIndex::new(vectors, manifest.dimensions)?;

        let endpoint = config.provider_endpoint(&config.provider);
        let api_key = config.resolve_api_key(&config.provider);
        let client = create_client(&config.provider, endpoint.as_deref(), api_key.as_deref())
            .map_err(AppError::Config)?;
        let prompt = load_prompt_or_default(&config.workspace, ANSWER_PROMPT_ID)?;

        let retrieval = config.retrieval.clone();
        let gateway = AnswerGateway::new(
            client,
            prompt,
            SynthesisSettings {
                model: config.model.clone(),
                temperature: retrieval.temperature,
                max_tokens: retrieval.max_tokens,
                timeout: Duration::from_secs(retrieval.synthesis_timeout_secs),
            },
        );

        tracing::info!(
            "Engine ready: {} documents, {}-dim vectors from {}/{}, answers from {}",
            store.len(),
            manifest.dimensions,
            manifest.provider,
            manifest.model,
            config.provider
        );

        Self::new(
            store,
            Arc::new(index),
            embedder,
            Reranker::default(),
            gateway,
            retrieval,
        )
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        self.extractor.vocabulary()
    }

    /// Answer one turn and record the merged signals in `session`.
    pub async fn answer(&self, request: &QueryRequest, session: &mut SessionContext) -> AppResult<QueryOutcome> {
        let span = tracing::info_span!("query", session = %session.id);
        self.answer_inner(request, session).instrument(span).await
    }

    async fn answer_inner(&self, request: &QueryRequest, session: &mut SessionContext) -> AppResult<QueryOutcome> {
        let started = Instant::now();
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::Retrieval("query is empty".to_string()));
        }

        let prior = request.session_signals.as_ref().or(session.last.as_ref());
        let signals = self.extractor.extract(prompt, prior);
        session.last = Some(signals.clone());
        tracing::debug!(
            "Signals: intent={} state={:?} district={:?} crop={:?} month={:?} year={:?}",
            signals.intent,
            signals.state,
            signals.district,
            signals.crop,
            signals.month,
            signals.year
        );

        let missing = self.policy.missing_slots(&signals);
        if !missing.is_empty() {
            let decision = Decision::Clarify { missing };
            tracing::info!("Decision {} in {:?}", decision, started.elapsed());
            return Ok(QueryOutcome {
                response: reply(&decision, String::new(), Vec::new()),
                signals,
                decision,
            });
        }

        let pool = filter_pool(&self.store, self.extractor.vocabulary(), &signals);
        let width = self.retrieval.fusion_width;
        let stage_timeout = Duration::from_secs(self.retrieval.stage_timeout_secs);

        let lexical = {
            let bm25 = Arc::clone(&self.bm25);
            let pool = pool.clone();
            let query = signals.raw.clone();
            async move {
                tokio::task::spawn_blocking(move || bm25.rank(&query, &pool, width))
                    .await
                    .map_err(|e| AppError::Retrieval(format!("lexical ranking task failed: {}", e)))
            }
        };
        let dense = self.dense.rank(&signals.raw, &pool, width);

        let (lexical, dense) = tokio::join!(
            bounded("lexical", stage_timeout, lexical),
            bounded("dense", stage_timeout, dense)
        );

        let fused = rrf_fuse(
            &lexical,
            &dense,
            self.retrieval.rrf_k,
            width.max(self.retrieval.rerank_keep),
        );
        let reranked = self
            .reranker
            .rerank(&signals.raw, &fused, &self.store, self.retrieval.rerank_keep);

        let limits = EvidenceLimits {
            cap: self.retrieval.evidence_cap,
            snippet_max_chars: self.retrieval.snippet_max_chars,
            dedup_prefix_chars: self.retrieval.dedup_prefix_chars,
        };
        let evidence = assemble(&self.store, &reranked, &limits);

        let decision = self.policy.decide(
            &signals,
            evidence.len(),
            &reranked,
            &self.store,
            self.extractor.vocabulary(),
        );

        let response = match decision {
            Decision::Proceed => {
                let answer = self
                    .gateway
                    .synthesize(prompt, &signals, &evidence, request.language.as_deref())
                    .await;
                let sources = evidence.iter().map(|e| e.source.clone()).collect();
                reply(&decision, answer, sources)
            }
            _ => reply(&decision, String::new(), Vec::new()),
        };

        tracing::info!(
            "Decision {}: pool {}, lexical {}, dense {}, evidence {}, {:?}",
            decision,
            pool.len(),
            lexical.len(),
            dense.len(),
            evidence.len(),
            started.elapsed()
        );

        Ok(QueryOutcome {
            response,
            signals,
            decision,
        })
    }
}

/// User-facing response for a decision. `answer` and `sources` are only used for PROCEED.
fn reply(decision: &Decision, answer: String, sources: Vec<String>) -> QueryResponse {
    match decision {
        Decision::Clarify { missing } => QueryResponse::Clarify {
            clarifying_question: clarify_question(missing),
        },
        Decision::Mismatch {
            user_crop,
            majority_crop,
        } => QueryResponse::Clarify {
            clarifying_question: mismatch_question(user_crop, majority_crop),
        },
        Decision::Ungrounded => QueryResponse::Answer {
            answer: ungrounded_message(),
            evidence_sources: Vec::new(),
        },
        Decision::Proceed => QueryResponse::Answer {
            answer,
            evidence_sources: sources,
        },
    }
}

/// Run a ranking stage under a time budget. Failure or timeout yields no results.
async fn bounded<F>(stage: &str, budget: Duration, ranking: F) -> Vec<DocId>
where
    F: Future<Output = AppResult<Vec<DocId>>>,
{
    match tokio::time::timeout(budget, ranking).await {
        Ok(Ok(ids)) => ids,
        Ok(Err(e)) => {
            tracing::warn!("{} ranking failed: {}", stage, e);
            Vec::new()
        }
        Err(_) => {
            tracing::warn!("{} ranking timed out after {:?}", stage, budget);
            Vec::new()
        }
    }
}

fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}
