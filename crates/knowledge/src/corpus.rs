//! Document store: loading corpus shards and the merged snapshot.

use agri_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::types::{CorpusRecord, DocId, Document};

/// Immutable, ordered collection of documents. A document's id is its position.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    docs: Vec<Document>,
}

impl DocumentStore {
    /// Build a store from documents. An empty corpus is an error.
    pub fn from_documents(docs: Vec<Document>) -> AppResult<Self> {
        if docs.is_empty() {
            return Err(AppError::Corpus("corpus contains no documents".to_string()));
        }
        Ok(Self { docs })
    }

    /// Load every `*.jsonl` shard under `data_dir`, in sorted path order.
    pub fn load_shards(data_dir: &Path) -> AppResult<Self> {
        let shards = discover_shards(data_dir)?;
        if shards.is_empty() {
            return Err(AppError::Corpus(format!(
                "No .jsonl shards found under {:?}",
                data_dir
            )));
        }

        let mut docs = Vec::new();
        for shard in &shards {
            let before = docs.len();
            read_jsonl(shard, &mut docs)?;
            tracing::debug!("Loaded {} documents from {:?}", docs.len() - before, shard);
        }

        tracing::info!(
            "Loaded {} documents from {} shards",
            docs.len(),
            shards.len()
        );
        Self::from_documents(docs)
    }

    /// Load the merged snapshot written by [`DocumentStore::write_snapshot`].
    pub fn load_snapshot(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::Corpus(format!(
                "Corpus snapshot not found at {:?}. Run 'agri index build' first.",
                path
            )));
        }

        let mut docs = Vec::new();
        read_jsonl(path, &mut docs)?;
        tracing::info!("Loaded {} documents from snapshot {:?}", docs.len(), path);
        Self::from_documents(docs)
    }

    /// Write the store as one normalised JSON record per line.
    pub fn write_snapshot(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::File::create(path)?;
        let mut writer = BufWriter::new(file);
        for doc in &self.docs {
            serde_json::to_writer(&mut writer, &doc.to_record())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        tracing::info!("Wrote snapshot of {} documents to {:?}", self.docs.len(), path);
        Ok(())
    }

    pub fn get(&self, id: DocId) -> Option<&Document> {
        self.docs.get(id)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &Document)> {
        self.docs.iter().enumerate()
    }

    /// All document ids in corpus order.
    pub fn all_ids(&self) -> Vec<DocId> {
        (0..self.docs.len()).collect()
    }

    /// Document counts per metric tag (`"untagged"` for documents without one).
    pub fn metric_breakdown(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for doc in &self.docs {
            let key = doc.metric.clone().unwrap_or_else(|| "untagged".to_string());
            *counts.entry(key).or_insert(0) += 1;
        }
        counts
    }
}

/// SHA-256 of a file's bytes, hex encoded.
pub fn fingerprint_file(path: &Path) -> AppResult<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

fn discover_shards(data_dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !data_dir.is_dir() {
        return Err(AppError::Corpus(format!(
            "Data directory does not exist: {:?}",
            data_dir
        )));
    }

    let mut shards: Vec<PathBuf> = WalkDir::new(data_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("jsonl"))
        .collect();

    shards.sort();
    Ok(shards)
}

/// Append the documents of one JSONL file. Malformed and text-less lines are skipped.
fn read_jsonl(path: &Path, docs: &mut Vec<Document>) -> AppResult<()> {
    let file = std::fs::File::open(path)
        .map_err(|e| AppError::Corpus(format!("Failed to open {:?}: {}", path, e)))?;
    let reader = BufReader::new(file);

    let mut skipped = 0usize;
    for (line_no, bytes) in reader.split(b'\n').enumerate() {
        let bytes = bytes?;
        let Ok(line) = std::str::from_utf8(&bytes) else {
            skipped += 1;
            tracing::warn!("{:?}:{}: line is not valid UTF-8, skipping", path, line_no + 1);
            continue;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<CorpusRecord>(trimmed) {
            Ok(record) => match Document::from_record(record) {
                Some(doc) => docs.push(doc),
                None => {
                    skipped += 1;
                    tracing::warn!("{:?}:{}: record has no text, skipping", path, line_no + 1);
                }
            },
            Err(e) => {
                skipped += 1;
                tracing::warn!("{:?}:{}: malformed record ({}), skipping", path, line_no + 1, e);
            }
        }
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} lines in {:?}", skipped, path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_shards_sorted_and_lenient() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "b.jsonl",
            "{\"text\":\"second shard\",\"crop\":\"Wheat\"}\n",
        );
        write(
            temp.path(),
            "a.jsonl",
            "{\"text\":\"first\"}\nnot json\n{\"source\":\"no text\"}\n\n{\"text\":\"also first\"}\n",
        );
        write(temp.path(), "notes.txt", "{\"text\":\"ignored\"}\n");
        write(temp.path(), "nested/c.jsonl", "{\"text\":\"nested\"}\n");

        let store = DocumentStore::load_shards(temp.path()).unwrap();
        let texts: Vec<&str> = store.iter().map(|(_, d)| d.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "also first", "second shard", "nested"]);
        assert_eq!(store.get(2).unwrap().crop.as_deref(), Some("wheat"));
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let temp = TempDir::new().unwrap();
        let mut shard = b"{\"text\":\"good one\"}\n".to_vec();
        shard.extend_from_slice(b"{\"text\":\"bad \xff\xfe line\"}\r\n");
        shard.extend_from_slice(b"{\"text\":\"good two\"}\r\n");
        std::fs::write(temp.path().join("a.jsonl"), shard).unwrap();

        let store = DocumentStore::load_shards(temp.path()).unwrap();
        let texts: Vec<&str> = store.iter().map(|(_, d)| d.text.as_str()).collect();
        assert_eq!(texts, vec!["good one", "good two"]);
    }

    #[test]
    fn test_no_shards_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            DocumentStore::load_shards(temp.path()),
            Err(AppError::Corpus(_))
        ));
    }

    #[test]
    fn test_only_invalid_lines_is_empty_corpus_error() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.jsonl", "garbage\n{\"text\":\"\"}\n");
        assert!(matches!(
            DocumentStore::load_shards(temp.path()),
            Err(AppError::Corpus(_))
        ));
    }

    #[test]
    fn test_snapshot_round_trip_and_fingerprint() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "data/a.jsonl",
            "{\"text\":\"Paddy transplanting\",\"state\":\"Punjab\",\"months\":\"Jun\",\"year\":\"2023\",\"metric\":\"crop_env\"}\n",
        );

        let store = DocumentStore::load_shards(&temp.path().join("data")).unwrap();
        let snapshot = temp.path().join("artifacts/corpus.jsonl");
        store.write_snapshot(&snapshot).unwrap();

        let reloaded = DocumentStore::load_snapshot(&snapshot).unwrap();
        assert_eq!(reloaded.get(0), store.get(0));

        let first = fingerprint_file(&snapshot).unwrap();
        assert_eq!(first.len(), 64);
        reloaded.write_snapshot(&snapshot).unwrap();
        assert_eq!(fingerprint_file(&snapshot).unwrap(), first);
    }

    #[test]
    fn test_metric_breakdown() {
        let docs = vec![
            Document {
                text: "a".into(),
                metric: Some("rainfall".into()),
                ..Default::default()
            },
            Document {
                text: "b".into(),
                ..Default::default()
            },
            Document {
                text: "c".into(),
                metric: Some("rainfall".into()),
                ..Default::default()
            },
        ];
        let store = DocumentStore::from_documents(docs).unwrap();
        let counts = store.metric_breakdown();
        assert_eq!(counts.get("rainfall"), Some(&2));
        assert_eq!(counts.get("untagged"), Some(&1));
    }
}
