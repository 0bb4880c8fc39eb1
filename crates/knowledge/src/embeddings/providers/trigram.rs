//! Offline hashed-feature embeddings.

use crate::embeddings::provider::EmbeddingProvider;
use agri_core::AppResult;
use std::collections::BTreeMap;
use unicode_segmentation::UnicodeSegmentation;

const MODEL_NAME: &str = "trigram-v1";

/// Deterministic embedding from hashed words and padded character trigrams.
///
/// Each word contributes its own bucket plus one bucket per trigram of
/// `" word "`, so inflections and regional spellings ("paddy", "paddies")
/// land close together. Vectors are L2-normalised; empty text maps to zeros.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return embedding;
        }

        // Ordered so float sums are identical between build and query
        let mut word_freq: BTreeMap<String, u32> = BTreeMap::new();
        for word in text.unicode_words() {
            *word_freq.entry(word.to_lowercase()).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let weight = (*freq as f32).sqrt();
            embedding[self.bucket(b"w:", word.as_bytes())] += weight;

            let padded: Vec<char> = format!(" {} ", word).chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                embedding[self.bucket(b"t:", trigram.as_bytes())] += 0.5 * weight;
            }
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }
        embedding
    }

    /// FNV-1a over a namespace prefix and the feature bytes.
    fn bucket(&self, namespace: &[u8], feature: &[u8]) -> usize {
        let hash = namespace
            .iter()
            .chain(feature)
            .fold(0xcbf2_9ce4_8422_2325u64, |acc, &b| {
                (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3)
            });
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
