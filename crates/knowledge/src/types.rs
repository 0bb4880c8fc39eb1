//! Core types for the retrieval engine.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::grounding::Decision;
use crate::index_store::IndexManifest;

/// Position of a document in the store.
pub type DocId = usize;

/// Calendar month tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    /// Parse a three-letter or full English month name, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        let month = match s.trim().to_lowercase().as_str() {
            "jan" | "january" => Month::Jan,
            "feb" | "february" => Month::Feb,
            "mar" | "march" => Month::Mar,
            "apr" | "april" => Month::Apr,
            "may" => Month::May,
            "jun" | "june" => Month::Jun,
            "jul" | "july" => Month::Jul,
            "aug" | "august" => Month::Aug,
            "sep" | "sept" | "september" => Month::Sep,
            "oct" | "october" => Month::Oct,
            "nov" | "november" => Month::Nov,
            "dec" | "december" => Month::Dec,
            _ => return None,
        };
        Some(month)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Month::Jan => "Jan",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Apr => "Apr",
            Month::May => "May",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Aug => "Aug",
            Month::Sep => "Sep",
            Month::Oct => "Oct",
            Month::Nov => "Nov",
            Month::Dec => "Dec",
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable corpus entry.
///
/// String metadata is lower-cased and trimmed at load; empty values become `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub text: String,
    /// Citation locator, `"unknown"` when the record has none
    pub source: String,
    pub state: Option<String>,
    pub district: Option<String>,
    pub crop: Option<String>,
    pub season: Option<String>,
    pub year: Option<i32>,
    pub months: Vec<Month>,
    /// Coarse topical tag (crop_env, market_price, rainfall, scheme, ...)
    pub metric: Option<String>,
    /// Scheme jurisdiction ("central" or "state")
    pub level: Option<String>,
}

impl Document {
    /// Normalise a raw record. Returns `None` when the record has no text.
    pub fn from_record(record: CorpusRecord) -> Option<Self> {
        let text = record.text.trim().to_string();
        if text.is_empty() {
            return None;
        }

        let months = record
            .months
            .iter()
            .filter_map(|token| {
                let parsed = Month::parse(token);
                if parsed.is_none() {
                    tracing::debug!("Ignoring unknown month token {:?}", token);
                }
                parsed
            })
            .fold(Vec::new(), |mut acc, m| {
                if !acc.contains(&m) {
                    acc.push(m);
                }
                acc
            });

        Some(Self {
            text,
            source: record
                .source
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
            state: normalize_tag(record.state),
            district: normalize_tag(record.district),
            crop: normalize_tag(record.crop),
            season: normalize_tag(record.season),
            year: record.year,
            months,
            metric: normalize_tag(record.metric),
            level: normalize_tag(record.level),
        })
    }

    /// Serializable form written to the corpus snapshot.
    pub fn to_record(&self) -> CorpusRecord {
        CorpusRecord {
            text: self.text.clone(),
            source: Some(self.source.clone()),
            state: self.state.clone(),
            district: self.district.clone(),
            crop: self.crop.clone(),
            season: self.season.clone(),
            year: self.year,
            months: self.months.iter().map(|m| m.as_str().to_string()).collect(),
            metric: self.metric.clone(),
            level: self.level.clone(),
        }
    }

    pub fn has_month(&self, month: Month) -> bool {
        self.months.contains(&month)
    }
}

fn normalize_tag(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

/// One JSON line of a corpus shard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusRecord {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_year",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<i32>,
    #[serde(
        default,
        deserialize_with = "lenient_months",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub months: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// Accepts integers and numeric strings ("2022", "2022-23").
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawYear {
        Int(i64),
        Float(f64),
        Text(String),
    }

    let year = match Option::<RawYear>::deserialize(deserializer)? {
        Some(RawYear::Int(y)) => i32::try_from(y).ok(),
        Some(RawYear::Float(y)) if y.fract() == 0.0 => Some(y as i32),
        Some(RawYear::Float(_)) => None,
        Some(RawYear::Text(s)) => {
            let s = s.trim();
            s.parse::<i32>().ok().or_else(|| {
                s.get(..4)
                    .filter(|p| p.chars().all(|c| c.is_ascii_digit()))
                    .and_then(|p| p.parse().ok())
            })
        }
        None => None,
    };
    Ok(year)
}

/// Accepts a list of tokens or a single token.
fn lenient_months<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawMonths {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<RawMonths>::deserialize(deserializer)? {
        Some(RawMonths::One(m)) => vec![m],
        Some(RawMonths::Many(ms)) => ms,
        None => Vec::new(),
    })
}

/// Coarse query intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SowingWindow,
    Variety,
    Rainfall,
    Market,
    PopPractice,
    Stats,
    CropEnv,
    Scheme,
    #[default]
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::SowingWindow => "sowing_window",
            Intent::Variety => "variety",
            Intent::Rainfall => "rainfall",
            Intent::Market => "market",
            Intent::PopPractice => "pop_practice",
            Intent::Stats => "stats",
            Intent::CropEnv => "crop_env",
            Intent::Scheme => "scheme",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured signals extracted from a query, merged across turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySignals {
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<Month>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Synonym-expanded query text
    pub raw: String,
}

impl QuerySignals {
    /// Human-readable summary of the extracted slots, if any are set.
    pub fn focus_line(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(ref crop) = self.crop {
            parts.push(format!("crop: {}", crop));
        }
        if let Some(ref state) = self.state {
            parts.push(format!("state: {}", state));
        }
        if let Some(ref district) = self.district {
            parts.push(format!("district: {}", district));
        }
        if let Some(month) = self.month {
            parts.push(format!("month: {}", month));
        }
        if let Some(year) = self.year {
            parts.push(format!("year: {}", year));
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

/// Per-conversation state owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    /// Correlation id for logs
    pub id: String,
    /// Signals merged at the end of the previous turn
    pub last: Option<QuerySignals>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            last: None,
        }
    }

    /// Resume a conversation from persisted signals.
    pub fn with_signals(signals: Option<QuerySignals>) -> Self {
        Self {
            last: signals,
            ..Self::new()
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A single query turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    pub prompt: String,
    /// Signals carried from the previous turn; overrides the session's own
    #[serde(default)]
    pub session_signals: Option<QuerySignals>,
    /// Requested answer language (e.g. "hi", "Punjabi")
    #[serde(default)]
    pub language: Option<String>,
}

impl QueryRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            session_signals: None,
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Wire response for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Answer {
        answer: String,
        evidence_sources: Vec<String>,
    },
    Clarify {
        clarifying_question: String,
    },
}

impl QueryResponse {
    /// The text to show the user.
    pub fn text(&self) -> &str {
        match self {
            QueryResponse::Answer { answer, .. } => answer,
            QueryResponse::Clarify {
                clarifying_question,
            } => clarifying_question,
        }
    }
}

/// Everything a turn produced: the response plus what the caller should persist and log.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub response: QueryResponse,
    pub signals: QuerySignals,
    pub decision: Decision,
}

/// Result of an index build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildStats {
    /// Documents in the snapshot
    pub documents: usize,

    pub dimensions: usize,

    pub provider: String,

    pub model: String,

    /// SHA-256 of the written snapshot
    pub fingerprint: String,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Description of a built index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub manifest: IndexManifest,

    /// Document counts per metric tag
    pub metrics: BTreeMap<String, usize>,

    /// Districts known per state
    pub districts_by_state: BTreeMap<String, usize>,

    /// Database size in bytes
    pub db_size_bytes: u64,
}
