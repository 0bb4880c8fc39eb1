//! Grounding decisions: whether to answer, ask, or disclose missing evidence.
//!
//! CLARIFY is decided from the merged signals before retrieval. After
//! retrieval the order is UNGROUNDED, then MISMATCH, then PROCEED.

use serde::Serialize;
use std::fmt;

use crate::corpus::DocumentStore;
use crate::types::{DocId, Intent, QuerySignals};
use crate::vocab::Vocabulary;

/// Fixed disclosure shown whenever evidence is insufficient. Never translated.
pub const UNGROUNDED_NOTICE: &str =
    "⚠️ This answer is not grounded in the retrieved data. Please verify independently.";

const SPECIFICITY_REQUEST: &str = "I need your district and whether you are irrigated/rainfed to answer precisely. Try: 'What should I plant in May in Punjab, irrigated, for fodder?'";

/// Slot a sowing-window question cannot be answered without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    State,
    Month,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::State => "state",
            Slot::Month => "month",
        }
    }
}

/// Outcome of the grounding policy for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Clarify { missing: Vec<Slot> },
    Ungrounded,
    Mismatch { user_crop: String, majority_crop: String },
    Proceed,
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Clarify { .. } => "CLARIFY",
            Decision::Ungrounded => "UNGROUNDED",
            Decision::Mismatch { .. } => "MISMATCH",
            Decision::Proceed => "PROCEED",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Thresholds for the post-retrieval decisions.
#[derive(Debug, Clone, Copy)]
pub struct GroundingPolicy {
    pub evidence_min: usize,
    /// Reranked candidates considered for the majority crop
    pub mismatch_window: usize,
}

impl Default for GroundingPolicy {
    fn default() -> Self {
        Self {
            evidence_min: 2,
            mismatch_window: 10,
        }
    }
}

impl GroundingPolicy {
    /// Slots a sowing-window question still needs. Empty for every other intent.
    pub fn missing_slots(&self, signals: &QuerySignals) -> Vec<Slot> {
        let mut missing = Vec::new();
        if signals.intent != Intent::SowingWindow {
            return missing;
        }
        if signals.state.is_none() {
            missing.push(Slot::State);
        }
        if signals.month.is_none() {
            missing.push(Slot::Month);
        }
        missing
    }

    /// Decide after evidence assembly.
    pub fn decide(
        &self,
        signals: &QuerySignals,
        evidence_count: usize,
        reranked: &[DocId],
        store: &DocumentStore,
        vocab: &Vocabulary,
    ) -> Decision {
        if evidence_count < self.evidence_min {
            return Decision::Ungrounded;
        }

        if let Some(ref crop) = signals.crop {
            let user_crop = vocab.canonical_crop(crop);
            let window = &reranked[..reranked.len().min(self.mismatch_window)];
            if let Some(majority) = majority_crop(store, vocab, window) {
                if !user_crop.is_empty() && majority != user_crop {
                    return Decision::Mismatch {
                        user_crop,
                        majority_crop: majority,
                    };
                }
            }
        }

        Decision::Proceed
    }
}

/// Most frequent canonical crop among `ids`; ties go to the crop seen first.
pub fn majority_crop(store: &DocumentStore, vocab: &Vocabulary, ids: &[DocId]) -> Option<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for doc in ids.iter().filter_map(|&id| store.get(id)) {
        let Some(ref crop) = doc.crop else { continue };
        let canonical = vocab.canonical_crop(crop);
        match counts.iter_mut().find(|(c, _)| *c == canonical) {
            Some((_, n)) => *n += 1,
            None => counts.push((canonical, 1)),
        }
    }

    let mut best: Option<(String, usize)> = None;
    for (crop, n) in counts {
        if best.as_ref().map_or(true, |(_, b)| n > *b) {
            best = Some((crop, n));
        }
    }
    best.map(|(crop, _)| crop)
}

/// Question naming exactly the missing slots.
pub fn clarify_question(missing: &[Slot]) -> String {
    let names: Vec<&str> = missing.iter().map(Slot::as_str).collect();
    format!(
        "I need your {} to be precise. For example: 'What should I plant in May in Punjab (irrigated or rainfed?)'.",
        names.join(" and ")
    )
}

/// Disclosure plus a request for a more specific question.
pub fn ungrounded_message() -> String {
    format!("{}\n{}", UNGROUNDED_NOTICE, SPECIFICITY_REQUEST)
}

pub fn mismatch_question(user_crop: &str, majority_crop: &str) -> String {
    format!(
        "Did you mean {} or {}? Most of the matching records I found are about {}, not {}.",
        user_crop, majority_crop, majority_crop, user_crop
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Document, Month};

    fn sowing(state: Option<&str>, month: Option<Month>) -> QuerySignals {
        QuerySignals {
            intent: Intent::SowingWindow,
            state: state.map(String::from),
            month,
            ..Default::default()
        }
    }

    fn crop_store(crops: &[Option<&str>]) -> DocumentStore {
        DocumentStore::from_documents(
            crops
                .iter()
                .map(|c| Document {
                    text: "t".into(),
                    source: "s".into(),
                    crop: c.map(String::from),
                    ..Default::default()
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_clarify_names_missing_slots() {
        let policy = GroundingPolicy::default();
        assert_eq!(policy.missing_slots(&sowing(Some("punjab"), None)), vec![Slot::Month]);
        assert_eq!(
            policy.missing_slots(&sowing(None, None)),
            vec![Slot::State, Slot::Month]
        );
        assert!(policy
            .missing_slots(&sowing(Some("punjab"), Some(Month::May)))
            .is_empty());
        assert!(policy.missing_slots(&QuerySignals::default()).is_empty());

        let q = clarify_question(&[Slot::State, Slot::Month]);
        assert!(q.starts_with("I need your state and month to be precise."));
    }

    #[test]
    fn test_ungrounded_below_minimum() {
        let store = crop_store(&[Some("wheat")]);
        let vocab = Vocabulary::from_store(&store);
        let policy = GroundingPolicy::default();
        let decision = policy.decide(&QuerySignals::default(), 1, &[0], &store, &vocab);
        assert_eq!(decision, Decision::Ungrounded);
        assert!(ungrounded_message().starts_with(UNGROUNDED_NOTICE));
    }

    #[test]
    fn test_majority_ties_go_to_first_seen() {
        let store = crop_store(&[Some("cotton"), Some("wheat"), Some("wheat"), Some("cotton"), None]);
        let vocab = Vocabulary::from_store(&store);
        assert_eq!(majority_crop(&store, &vocab, &[0, 1, 2, 3, 4]), Some("cotton".into()));
        assert_eq!(majority_crop(&store, &vocab, &[2, 0, 1, 3]), Some("wheat".into()));
        assert_eq!(majority_crop(&store, &vocab, &[4]), None);
    }

    #[test]
    fn test_mismatch_uses_canonical_crops() {
        let store = crop_store(&[Some("paddy"), Some("paddy"), Some("wheat")]);
        let vocab = Vocabulary::from_store(&store);
        let policy = GroundingPolicy::default();

        let rice = QuerySignals {
            crop: Some("rice".into()),
            ..Default::default()
        };
        assert_eq!(policy.decide(&rice, 3, &[0, 1, 2], &store, &vocab), Decision::Proceed);

        let wheat = QuerySignals {
            crop: Some("wheat".into()),
            ..Default::default()
        };
        assert_eq!(
            policy.decide(&wheat, 3, &[0, 1, 2], &store, &vocab),
            Decision::Mismatch {
                user_crop: "wheat".into(),
                majority_crop: "rice".into()
            }
        );
    }

    #[test]
    fn test_mismatch_window_limits_candidates() {
        let store = crop_store(&[Some("wheat"), Some("cotton"), Some("cotton"), Some("cotton")]);
        let vocab = Vocabulary::from_store(&store);
        let policy = GroundingPolicy {
            evidence_min: 2,
            mismatch_window: 1,
        };
        let signals = QuerySignals {
            crop: Some("wheat".into()),
            ..Default::default()
        };
        assert_eq!(policy.decide(&signals, 4, &[0, 1, 2, 3], &store, &vocab), Decision::Proceed);
    }

    #[test]
    fn test_decision_serializes_with_label() {
        let json = serde_json::to_value(Decision::Clarify {
            missing: vec![Slot::Month],
        })
        .unwrap();
        assert_eq!(json["state"], "CLARIFY");
        assert_eq!(json["missing"][0], "month");
        assert_eq!(Decision::Proceed.to_string(), "PROCEED");
    }
}
