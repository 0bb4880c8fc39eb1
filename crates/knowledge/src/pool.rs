//! Candidate pool filter: narrows the corpus by metadata before ranking.
//!
//! Every stage is soft (an empty intersection leaves the pool unchanged)
//! except the crop stage, which always replaces the pool. An empty pool at
//! the end falls back to the whole corpus, so the pool is never empty.

use crate::corpus::DocumentStore;
use crate::signals::{normalize_for_match, Keyword};
use crate::types::{DocId, Document, Intent, QuerySignals};
use crate::vocab::Vocabulary;

/// Metric tags never used as evidence when anything else is available.
pub const LOW_TRUST_METRICS: &[&str] = &["news"];

/// State values that mark a document as nation-wide.
const NATIONWIDE_STATES: &[&str] = &["india", "all india", "all-india"];

const CENTRAL_KEYWORDS: &[Keyword] = &[
    Keyword::Word("central"),
    Keyword::Word("centre"),
    Keyword::Word("center"),
    Keyword::Word("national"),
    Keyword::Word("union"),
    Keyword::Word("pm"),
    Keyword::Word("pradhan mantri"),
];

/// Ordered, non-empty set of document ids eligible for ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePool {
    ids: Vec<DocId>,
}

impl CandidatePool {
    pub fn ids(&self) -> &[DocId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids are kept in corpus order, so membership is a binary search.
    pub fn contains(&self, id: DocId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }
}

/// Scheme jurisdiction requested by a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeLevel {
    Central,
    State,
}

impl SchemeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemeLevel::Central => "central",
            SchemeLevel::State => "state",
        }
    }
}

/// Metric tags an intent prefers. Empty for `General`.
pub fn intent_metrics(intent: Intent) -> &'static [&'static str] {
    match intent {
        Intent::Rainfall => &["rainfall"],
        Intent::Market => &["market_price", "price"],
        Intent::Stats => &["crop_stats", "stats"],
        Intent::CropEnv => &["crop_env"],
        Intent::Scheme => &["scheme"],
        Intent::PopPractice | Intent::SowingWindow | Intent::Variety => &["practice", "pop"],
        Intent::General => &[],
    }
}

/// State-level when a state is known, central when the query says so.
pub fn scheme_level(signals: &QuerySignals) -> Option<SchemeLevel> {
    if signals.state.is_some() {
        return Some(SchemeLevel::State);
    }
    let normalized = normalize_for_match(&signals.raw);
    if CENTRAL_KEYWORDS.iter().any(|k| k.matches(&normalized)) {
        Some(SchemeLevel::Central)
    } else {
        None
    }
}

/// Run the filter stages for `signals` over the whole store.
pub fn filter_pool(store: &DocumentStore, vocab: &Vocabulary, signals: &QuerySignals) -> CandidatePool {
    let doc = |id: &DocId| store.get(*id);
    let mut pool = store.all_ids();

    pool = soft(pool, |id| {
        doc(id).is_some_and(|d| {
            d.metric
                .as_deref()
                .map_or(true, |m| !LOW_TRUST_METRICS.contains(&m))
        })
    });

    let metrics = intent_metrics(signals.intent);
    if !metrics.is_empty() {
        pool = soft(pool, |id| {
            doc(id).is_some_and(|d| d.metric.as_deref().is_some_and(|m| metrics.contains(&m)))
        });
    }

    if signals.intent == Intent::Scheme {
        if let Some(level) = scheme_level(signals) {
            pool = soft(pool, |id| {
                doc(id).is_some_and(|d| d.level.as_deref() == Some(level.as_str()))
            });
            if level == SchemeLevel::State {
                pool = soft(pool, |id| {
                    doc(id).is_some_and(|d| d.state.is_some() && d.state == signals.state)
                });
            }
        }
    }

    if let Some(year) = signals.year {
        pool = soft(pool, |id| doc(id).is_some_and(|d| d.year == Some(year)));
    }

    if let Some(ref state) = signals.state {
        let narrowed: Vec<DocId> = pool
            .iter()
            .copied()
            .filter(|id| doc(id).is_some_and(|d| d.state.as_deref() == Some(state.as_str())))
            .collect();

        if !narrowed.is_empty() {
            pool = narrowed;
        } else if signals.intent == Intent::Rainfall {
            tracing::debug!("No rainfall records for {}, trying nation-wide records", state);
            pool = soft(pool, |id| doc(id).is_some_and(is_nationwide));
        }
    }

    if let Some(ref crop) = signals.crop {
        // Carried signals may hold an alias ("paddy")
        let crop = vocab.canonical_crop(crop);
        pool.retain(|id| {
            doc(id).is_some_and(|d| {
                d.crop
                    .as_deref()
                    .is_some_and(|c| vocab.canonical_crop(c) == crop)
            })
        });
    }

    if let Some(month) = signals.month {
        pool = soft(pool, |id| doc(id).is_some_and(|d| d.has_month(month)));
    }

    if pool.is_empty() {
        tracing::debug!("Candidate pool empty after filters, using full corpus");
        pool = store.all_ids();
    }

    tracing::debug!("Candidate pool: {} of {} documents", pool.len(), store.len());
    CandidatePool { ids: pool }
}

fn is_nationwide(doc: &Document) -> bool {
    match doc.state.as_deref() {
        None => true,
        Some(state) => NATIONWIDE_STATES.contains(&state),
    }
}

/// Keep the ids matching `pred`, unless none do.
fn soft<F>(pool: Vec<DocId>, pred: F) -> Vec<DocId>
where
    F: Fn(&DocId) -> bool,
{
    let narrowed: Vec<DocId> = pool.iter().copied().filter(|id| pred(id)).collect();
    if narrowed.is_empty() {
        pool
    } else {
        narrowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Month;

    fn doc(text: &str) -> Document {
        Document {
            text: text.into(),
            source: "src".into(),
            ..Default::default()
        }
    }

    fn signals(intent: Intent) -> QuerySignals {
        QuerySignals {
            intent,
            ..Default::default()
        }
    }

    fn fixture() -> (DocumentStore, Vocabulary) {
        let docs = vec![
            // 0
            Document {
                state: Some("punjab".into()),
                crop: Some("wheat".into()),
                metric: Some("practice".into()),
                months: vec![Month::Nov],
                ..doc("wheat sowing punjab")
            },
            // 1
            Document {
                state: Some("punjab".into()),
                crop: Some("paddy".into()),
                metric: Some("practice".into()),
                months: vec![Month::Jun],
                ..doc("paddy transplanting punjab")
            },
            // 2
            Document {
                state: Some("india".into()),
                metric: Some("rainfall".into()),
                year: Some(2022),
                ..doc("all india rainfall")
            },
            // 3
            Document {
                state: Some("odisha".into()),
                crop: Some("rice".into()),
                metric: Some("market_price".into()),
                year: Some(2022),
                ..doc("rice price odisha 2022")
            },
            // 4
            Document {
                state: Some("odisha".into()),
                crop: Some("rice".into()),
                metric: Some("market_price".into()),
                year: Some(2021),
                ..doc("rice price odisha 2021")
            },
            // 5
            Document {
                metric: Some("news".into()),
                crop: Some("wheat".into()),
                ..doc("wheat news")
            },
            // 6
            Document {
                metric: Some("scheme".into()),
                level: Some("central".into()),
                ..doc("pm kisan central scheme")
            },
            // 7
            Document {
                metric: Some("scheme".into()),
                level: Some("state".into()),
                state: Some("punjab".into()),
                ..doc("punjab state scheme")
            },
        ];
        let store = DocumentStore::from_documents(docs).unwrap();
        let vocab = Vocabulary::from_store(&store);
        (store, vocab)
    }

    #[test]
    fn test_general_query_drops_news_only() {
        let (store, vocab) = fixture();
        let pool = filter_pool(&store, &vocab, &signals(Intent::General));
        assert_eq!(pool.ids(), &[0, 1, 2, 3, 4, 6, 7]);
    }

    #[test]
    fn test_market_year_state_crop() {
        let (store, vocab) = fixture();
        let s = QuerySignals {
            state: Some("odisha".into()),
            crop: Some("rice".into()),
            year: Some(2022),
            ..signals(Intent::Market)
        };
        let pool = filter_pool(&store, &vocab, &s);
        assert_eq!(pool.ids(), &[3]);
    }

    #[test]
    fn test_crop_filter_matches_canonical_form() {
        let (store, vocab) = fixture();
        let s = QuerySignals {
            state: Some("punjab".into()),
            crop: Some("rice".into()),
            ..signals(Intent::PopPractice)
        };
        let pool = filter_pool(&store, &vocab, &s);
        assert_eq!(pool.ids(), &[1]);
    }

    #[test]
    fn test_crop_filter_canonicalises_alias_signal() {
        let store = DocumentStore::from_documents(vec![
            Document {
                crop: Some("wheat".into()),
                ..doc("wheat sowing")
            },
            Document {
                crop: Some("paddy".into()),
                ..doc("paddy transplanting")
            },
        ])
        .unwrap();
        let vocab = Vocabulary::from_store(&store);

        for crop in ["paddy", "Paddy", "rice", "dhan"] {
            let s = QuerySignals {
                crop: Some(crop.into()),
                ..signals(Intent::General)
            };
            assert_eq!(filter_pool(&store, &vocab, &s).ids(), &[1], "crop {}", crop);
        }
    }

    #[test]
    fn test_crop_filter_is_hard() {
        let (store, vocab) = fixture();
        // punjab practice docs exist, but none for cotton: the crop stage empties
        // the pool and the final fallback restores the full corpus
        let s = QuerySignals {
            state: Some("punjab".into()),
            crop: Some("cotton".into()),
            ..signals(Intent::PopPractice)
        };
        let pool = filter_pool(&store, &vocab, &s);
        assert_eq!(pool.len(), store.len());
    }

    #[test]
    fn test_rainfall_falls_back_to_nationwide() {
        let (store, vocab) = fixture();
        let s = QuerySignals {
            state: Some("kerala".into()),
            ..signals(Intent::Rainfall)
        };
        let pool = filter_pool(&store, &vocab, &s);
        assert_eq!(pool.ids(), &[2]);
    }

    #[test]
    fn test_soft_filters_keep_pool_when_nothing_matches() {
        let (store, vocab) = fixture();
        let s = QuerySignals {
            year: Some(1999),
            month: Some(Month::Feb),
            ..signals(Intent::Variety)
        };
        let pool = filter_pool(&store, &vocab, &s);
        assert_eq!(pool.ids(), &[0, 1]);
    }

    #[test]
    fn test_scheme_levels() {
        let (store, vocab) = fixture();

        let central = QuerySignals {
            raw: "central govt scheme for farmers".into(),
            ..signals(Intent::Scheme)
        };
        assert_eq!(scheme_level(&central), Some(SchemeLevel::Central));
        assert_eq!(filter_pool(&store, &vocab, &central).ids(), &[6]);

        let state = QuerySignals {
            state: Some("punjab".into()),
            raw: "schemes in punjab".into(),
            ..signals(Intent::Scheme)
        };
        assert_eq!(filter_pool(&store, &vocab, &state).ids(), &[7]);

        let unspecified = QuerySignals {
            raw: "any subsidy".into(),
            ..signals(Intent::Scheme)
        };
        assert_eq!(scheme_level(&unspecified), None);
        assert_eq!(filter_pool(&store, &vocab, &unspecified).ids(), &[6, 7]);
    }

    #[test]
    fn test_contains() {
        let (store, vocab) = fixture();
        let pool = filter_pool(&store, &vocab, &signals(Intent::Market));
        assert!(pool.contains(3));
        assert!(!pool.contains(0));
    }
}
