//! Load-time lookup tables: states, districts, crops and crop synonyms.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::corpus::DocumentStore;

/// States and union territories, lower-case.
pub const INDIA_STATES: [&str; 37] = [
    "andaman and nicobar islands",
    "andhra pradesh",
    "arunachal pradesh",
    "assam",
    "bihar",
    "chandigarh",
    "chhattisgarh",
    "dadra and nagar haveli",
    "daman and diu",
    "delhi",
    "goa",
    "gujarat",
    "haryana",
    "himachal pradesh",
    "jammu and kashmir",
    "jharkhand",
    "karnataka",
    "kerala",
    "ladakh",
    "lakshadweep",
    "madhya pradesh",
    "maharashtra",
    "manipur",
    "meghalaya",
    "mizoram",
    "nagaland",
    "odisha",
    "puducherry",
    "punjab",
    "rajasthan",
    "sikkim",
    "tamil nadu",
    "telangana",
    "tripura",
    "uttar pradesh",
    "uttarakhand",
    "west bengal",
];

/// Upper-case short forms, matched only as tokens of the original query.
pub const STATE_ALIASES: [(&str, &str); 8] = [
    ("UP", "uttar pradesh"),
    ("MP", "madhya pradesh"),
    ("HP", "himachal pradesh"),
    ("J&K", "jammu and kashmir"),
    ("JK", "jammu and kashmir"),
    ("TN", "tamil nadu"),
    ("AP", "andhra pradesh"),
    ("WB", "west bengal"),
];

/// Canonical crop name and its regional aliases, in expansion order.
pub const CROP_SYNONYMS: [(&str, &[&str]); 12] = [
    ("sorghum", &["jowar"]),
    ("pearl millet", &["bajra"]),
    ("pigeonpea", &["arhar", "tur", "toor"]),
    ("black gram", &["urad"]),
    ("green gram", &["moong"]),
    ("sesame", &["til"]),
    ("cotton", &["kapas"]),
    ("maize", &["corn"]),
    ("rice", &["paddy", "dhan"]),
    ("wheat", &["gehun"]),
    ("mustard", &["sarson"]),
    ("chickpea", &["chana"]),
];

/// Immutable lookup structure built once from the corpus.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    /// Full state names, longest first
    states: Vec<String>,
    /// District names seen in the corpus, longest first
    districts: Vec<String>,
    /// States each district appears under
    district_states: HashMap<String, BTreeSet<String>>,
    /// Crop names seen in the corpus plus canonical synonym names, longest first
    crops: Vec<String>,
    /// alias -> canonical
    crop_aliases: HashMap<String, String>,
}

impl Vocabulary {
    /// Collect districts and crops from the store.
    pub fn from_store(store: &DocumentStore) -> Self {
        let mut district_states: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut crops: BTreeSet<String> = BTreeSet::new();

        for (_, doc) in store.iter() {
            if let Some(ref district) = doc.district {
                let states = district_states.entry(district.clone()).or_default();
                if let Some(ref state) = doc.state {
                    states.insert(state.clone());
                }
            }
            if let Some(ref crop) = doc.crop {
                crops.insert(crop.clone());
            }
        }

        let mut crop_aliases = HashMap::new();
        for (canonical, aliases) in CROP_SYNONYMS {
            crops.insert(canonical.to_string());
            for alias in aliases {
                crop_aliases.insert(alias.to_string(), canonical.to_string());
            }
        }

        // Corpus crops tagged with an alias ("paddy") are matched through the alias table
        let crops: Vec<String> = crops
            .into_iter()
            .filter(|c| !crop_aliases.contains_key(c))
            .collect();

        let vocab = Self {
            states: longest_first(INDIA_STATES.iter().map(|s| s.to_string())),
            districts: longest_first(district_states.keys().cloned()),
            district_states,
            crops: longest_first(crops.into_iter()),
            crop_aliases,
        };

        tracing::debug!(
            "Vocabulary: {} states, {} districts, {} crops",
            vocab.states.len(),
            vocab.districts.len(),
            vocab.crops.len()
        );
        vocab
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn districts(&self) -> &[String] {
        &self.districts
    }

    pub fn crops(&self) -> &[String] {
        &self.crops
    }

    /// Aliases sorted longest first, paired with their canonical crop.
    pub fn aliases_longest_first(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .crop_aliases
            .iter()
            .map(|(a, c)| (a.as_str(), c.as_str()))
            .collect();
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));
        pairs
    }

    /// Map a crop name to its canonical form ("paddy" -> "rice").
    pub fn canonical_crop(&self, crop: &str) -> String {
        let lower = crop.trim().to_lowercase();
        match self.crop_aliases.get(&lower) {
            Some(canonical) => canonical.clone(),
            None => lower,
        }
    }

    /// The state a district belongs to, when the corpus places it in exactly one.
    pub fn unique_state_for_district(&self, district: &str) -> Option<&str> {
        let states = self.district_states.get(district)?;
        if states.len() == 1 {
            states.iter().next().map(String::as_str)
        } else {
            None
        }
    }

    /// Districts per state, for diagnostics.
    pub fn districts_by_state(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for states in self.district_states.values() {
            for state in states {
                *counts.entry(state.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}

fn longest_first(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut items: Vec<String> = items.collect();
    items.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    items.dedup();
    items
}
