//! Signal extraction: intent, location, time and crop slots from a query.
//!
//! Extraction is pure. Conversation memory is handled by [`merge`], which the
//! caller drives with the signals it persisted from the previous turn.

use agri_core::{AppError, AppResult};
use regex::Regex;
use std::sync::Arc;

use crate::types::{Intent, Month, QuerySignals};
use crate::vocab::{Vocabulary, CROP_SYNONYMS, STATE_ALIASES};

/// How a keyword matches the normalised query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// Whole word or phrase
    Word(&'static str),
    /// Word or phrase prefix ("irrigat" matches "irrigation")
    Stem(&'static str),
}

impl Keyword {
    /// Match against text produced by [`normalize_for_match`].
    pub fn matches(&self, normalized: &str) -> bool {
        match self {
            Keyword::Word(w) => normalized.contains(&format!(" {} ", w)),
            Keyword::Stem(s) => normalized.contains(&format!(" {}", s)),
        }
    }
}

/// One row of the intent table.
#[derive(Debug, Clone, Copy)]
pub struct IntentRule {
    pub intent: Intent,
    pub keywords: &'static [Keyword],
}

impl IntentRule {
    pub fn matches(&self, normalized: &str) -> bool {
        self.keywords.iter().any(|k| k.matches(normalized))
    }
}

use Keyword::{Stem, Word};

/// Intent rules in priority order. The first matching rule wins.
pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        intent: Intent::SowingWindow,
        keywords: &[
            Word("when should i plant"),
            Word("when should i sow"),
            Word("when to plant"),
            Word("when to sow"),
            Word("best time to sow"),
            Word("sowing time"),
            Word("time of sowing"),
            Word("sowing window"),
            Word("sow window"),
            Word("plant in"),
        ],
    },
    IntentRule {
        intent: Intent::Variety,
        keywords: &[
            Stem("variet"),
            Word("seed variety"),
            Stem("hybrid"),
            Word("cv"),
            Stem("cultivar"),
        ],
    },
    IntentRule {
        intent: Intent::Rainfall,
        keywords: &[
            Stem("rainfall"),
            Word("rain"),
            Word("rains"),
            Stem("monsoon"),
            Stem("precipitation"),
        ],
    },
    IntentRule {
        intent: Intent::Market,
        keywords: &[
            Stem("price"),
            Stem("mandi"),
            Word("sell"),
            Word("selling"),
            Stem("market"),
            Word("msp"),
        ],
    },
    IntentRule {
        intent: Intent::PopPractice,
        keywords: &[
            Stem("fertili"),
            Word("dose"),
            Word("dosage"),
            Word("seed rate"),
            Stem("irrigat"),
            Word("spacing"),
            Stem("pest"),
            Stem("disease"),
            Stem("weed"),
            Word("urea"),
            Stem("manure"),
        ],
    },
    IntentRule {
        intent: Intent::Stats,
        keywords: &[
            Word("production"),
            Stem("yield"),
            Word("area under"),
            Word("acreage"),
            Word("statistics"),
            Word("stats"),
        ],
    },
    IntentRule {
        intent: Intent::CropEnv,
        keywords: &[
            Stem("soil"),
            Stem("temperature"),
            Stem("climat"),
            Stem("humid"),
            Stem("suitab"),
        ],
    },
    IntentRule {
        intent: Intent::Scheme,
        keywords: &[
            Stem("scheme"),
            Stem("subsid"),
            Stem("yojana"),
            Stem("insurance"),
            Stem("loan"),
            Stem("kisan"),
        ],
    },
];

/// Lower-case, replace punctuation with spaces, collapse runs of whitespace,
/// and pad with one space on each side so keywords can anchor on word starts.
pub fn normalize_for_match(text: &str) -> String {
    let mapped: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let words: Vec<&str> = mapped.split_whitespace().collect();
    format!(" {} ", words.join(" "))
}

/// First matching rule's intent, or `General`.
pub fn detect_intent(normalized: &str, rules: &[IntentRule]) -> Intent {
    rules
        .iter()
        .find(|rule| rule.matches(normalized))
        .map(|rule| rule.intent)
        .unwrap_or(Intent::General)
}

/// Append crop synonyms as ` (a, b)`: canonical names for aliases present and
/// aliases for canonical names present, in table order.
pub fn expand_synonyms(query: &str) -> String {
    let normalized = normalize_for_match(query);
    let present = |term: &str| contains_word(&normalized, term);

    let mut extra: Vec<&str> = Vec::new();
    for (canonical, aliases) in CROP_SYNONYMS {
        let canonical_present = present(canonical);
        for alias in aliases {
            if present(*alias) && !canonical_present {
                extra.push(canonical);
            }
        }
        if canonical_present {
            extra.extend(aliases.iter().copied().filter(|a| !present(*a)));
        }
    }

    let mut unique: Vec<&str> = Vec::new();
    for term in extra {
        if !unique.contains(&term) {
            unique.push(term);
        }
    }

    if unique.is_empty() {
        query.to_string()
    } else {
        format!("{} ({})", query, unique.join(", "))
    }
}

/// Pure signal extraction over a fixed vocabulary.
#[derive(Debug, Clone)]
pub struct SignalExtractor {
    vocab: Arc<Vocabulary>,
    month_re: Regex,
    year_re: Regex,
}

impl SignalExtractor {
    pub fn new(vocab: Arc<Vocabulary>) -> AppResult<Self> {
        let month_re = Regex::new(
            r"\b(january|february|march|april|may|june|july|august|september|sept|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|oct|nov|dec)\b",
        )
        .map_err(|e| AppError::Other(format!("Invalid month pattern: {}", e)))?;
        let year_re = Regex::new(r"\b(?:19|20)\d{2}\b")
            .map_err(|e| AppError::Other(format!("Invalid year pattern: {}", e)))?;

        Ok(Self {
            vocab,
            month_re,
            year_re,
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Extract signals from `query` and merge them over `prior`.
    pub fn extract(&self, query: &str, prior: Option<&QuerySignals>) -> QuerySignals {
        merge(prior, self.extract_turn(query))
    }

    /// Signals present in this query alone.
    pub fn extract_turn(&self, query: &str) -> QuerySignals {
        let raw = expand_synonyms(query);
        let normalized = normalize_for_match(&raw);
        let lower = raw.to_lowercase();

        let district = self.find_district(&normalized);
        let state = self.find_state(&normalized, query).or_else(|| {
            district
                .as_deref()
                .and_then(|d| self.vocab.unique_state_for_district(d))
                .map(str::to_string)
        });

        QuerySignals {
            intent: detect_intent(&normalized, INTENT_RULES),
            state,
            district,
            crop: self.find_crop(&normalized),
            month: self.find_month(&lower),
            year: self.find_year(&lower),
            raw,
        }
    }

    fn find_state(&self, normalized: &str, original: &str) -> Option<String> {
        if let Some(state) = self
            .vocab
            .states()
            .iter()
            .find(|s| contains_word(normalized, s))
        {
            return Some(state.clone());
        }

        original
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '&'))
            .find_map(|token| {
                STATE_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == token)
                    .map(|(_, state)| state.to_string())
            })
    }

    fn find_district(&self, normalized: &str) -> Option<String> {
        self.vocab
            .districts()
            .iter()
            .find(|d| contains_word(normalized, d))
            .cloned()
    }

    fn find_crop(&self, normalized: &str) -> Option<String> {
        if let Some(crop) = self
            .vocab
            .crops()
            .iter()
            .find(|c| contains_word(normalized, c))
        {
            return Some(crop.clone());
        }

        self.vocab
            .aliases_longest_first()
            .into_iter()
            .find(|(alias, _)| contains_word(normalized, alias))
            .map(|(_, canonical)| canonical.to_string())
    }

    fn find_month(&self, lower: &str) -> Option<Month> {
        self.month_re
            .find(lower)
            .and_then(|m| Month::parse(m.as_str()))
    }

    fn find_year(&self, lower: &str) -> Option<i32> {
        self.year_re
            .find(lower)
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Whole-word containment for vocabulary entries that may hold punctuation.
fn contains_word(normalized: &str, term: &str) -> bool {
    let term = normalize_for_match(term);
    !term.trim().is_empty() && normalized.contains(term.as_str())
}

/// Merge this turn's signals over the previous turn's.
///
/// Present fields override, absent fields inherit. Intent and raw text always
/// come from the new turn. A market question that names no crop clears the
/// carried crop.
pub fn merge(prior: Option<&QuerySignals>, fresh: QuerySignals) -> QuerySignals {
    let Some(prior) = prior else {
        return fresh;
    };

    let crop = if fresh.intent == Intent::Market && fresh.crop.is_none() {
        None
    } else {
        fresh.crop.or_else(|| prior.crop.clone())
    };

    QuerySignals {
        intent: fresh.intent,
        state: fresh.state.or_else(|| prior.state.clone()),
        district: fresh.district.or_else(|| prior.district.clone()),
        crop,
        month: fresh.month.or(prior.month),
        year: fresh.year.or(prior.year),
        raw: fresh.raw,
    }
}
