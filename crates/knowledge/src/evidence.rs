//! Evidence assembly: bounded, deduplicated snippets with their sources.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::corpus::DocumentStore;
use crate::types::DocId;

/// One snippet of corpus text and the source it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub snippet: String,
    pub source: String,
}

/// Snippet length and dedup key limits, in characters.
#[derive(Debug, Clone, Copy)]
pub struct EvidenceLimits {
    pub cap: usize,
    pub snippet_max_chars: usize,
    pub dedup_prefix_chars: usize,
}

impl Default for EvidenceLimits {
    fn default() -> Self {
        Self {
            cap: 6,
            snippet_max_chars: 800,
            dedup_prefix_chars: 100,
        }
    }
}

/// Walk `ids` in order, building evidence until `limits.cap` items.
pub fn assemble(store: &DocumentStore, ids: &[DocId], limits: &EvidenceLimits) -> Vec<Evidence> {
    let items = ids.iter().filter_map(|&id| store.get(id)).map(|doc| Evidence {
        snippet: doc.text.clone(),
        source: doc.source.clone(),
    });
    collect(items, limits)
}

/// Normalise and deduplicate already-built evidence under the same rules.
pub fn dedup_evidence(items: &[Evidence], limits: &EvidenceLimits) -> Vec<Evidence> {
    collect(items.iter().cloned(), limits)
}

fn collect(items: impl Iterator<Item = Evidence>, limits: &EvidenceLimits) -> Vec<Evidence> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut evidence = Vec::new();

    for item in items {
        if evidence.len() >= limits.cap {
            break;
        }
        let snippet = normalize_snippet(&item.snippet, limits.snippet_max_chars);
        if snippet.is_empty() {
            continue;
        }
        let key: String = snippet.chars().take(limits.dedup_prefix_chars).collect();
        if !seen.insert((key, item.source.clone())) {
            continue;
        }
        evidence.push(Evidence {
            snippet,
            source: item.source,
        });
    }
    evidence
}

/// Trim, flatten line breaks, truncate to `max_chars`.
fn normalize_snippet(text: &str, max_chars: usize) -> String {
    let flat = text.trim().replace("\r\n", " ").replace(['\n', '\r'], " ");
    let truncated: String = flat.chars().take(max_chars).collect();
    truncated.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;

    fn store(items: &[(&str, &str)]) -> DocumentStore {
        DocumentStore::from_documents(
            items
                .iter()
                .map(|(text, source)| Document {
                    text: text.to_string(),
                    source: source.to_string(),
                    ..Default::default()
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_flatten_and_dedup() {
        let store = store(&[
            ("  Wheat sowing\nNov 1-15 ", "pop.pdf p3"),
            ("Wheat sowing Nov 1-15", "pop.pdf p3"),
            ("Wheat sowing Nov 1-15", "other.pdf"),
        ]);
        let evidence = assemble(&store, &[0, 1, 2], &EvidenceLimits::default());
        assert_eq!(evidence.len(), 2);
        assert_eq!(evidence[0].snippet, "Wheat sowing Nov 1-15");
        assert_eq!(evidence[1].source, "other.pdf");
    }

    #[test]
    fn test_dedup_key_is_prefix() {
        let prefix = "x".repeat(100);
        let a = format!("{}aaa", prefix);
        let b = format!("{}bbb", prefix);
        let store = store(&[(a.as_str(), "s"), (b.as_str(), "s")]);
        let evidence = assemble(&store, &[0, 1], &EvidenceLimits::default());
        assert_eq!(evidence.len(), 1);
    }

    #[test]
    fn test_cap_walks_past_duplicates() {
        let store = store(&[("a", "s"), ("a", "s"), ("b", "s"), ("c", "s")]);
        let limits = EvidenceLimits {
            cap: 2,
            ..Default::default()
        };
        let evidence = assemble(&store, &[0, 1, 2, 3], &limits);
        let snippets: Vec<&str> = evidence.iter().map(|e| e.snippet.as_str()).collect();
        assert_eq!(snippets, vec!["a", "b"]);
    }

    #[test]
    fn test_truncates_snippet() {
        let long = "é".repeat(900);
        let store = store(&[(long.as_str(), "s")]);
        let evidence = assemble(&store, &[0], &EvidenceLimits::default());
        assert_eq!(evidence[0].snippet.chars().count(), 800);
    }

    #[test]
    fn test_idempotent() {
        let long = format!("{}   tail", "w ".repeat(400));
        let store = store(&[
            (long.as_str(), "a"),
            ("line one\nline two", "b"),
            ("line one line two", "b"),
            ("  spaced  ", "c"),
        ]);
        let limits = EvidenceLimits::default();
        let once = assemble(&store, &[0, 1, 2, 3], &limits);
        let twice = dedup_evidence(&once, &limits);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }
}
