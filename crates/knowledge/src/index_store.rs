//! SQLite-backed storage for document embeddings and the build manifest.

use agri_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Describes the snapshot an index was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Documents embedded
    pub count: usize,
    pub dimensions: usize,
    pub provider: String,
    pub model: String,
    /// SHA-256 of the corpus snapshot
    pub fingerprint: String,
    pub built_at: DateTime<Utc>,
}

/// Open the index database and create tables if needed.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY,
            embedding BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS manifest (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )
    .map_err(|e| AppError::Index(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Replace the index contents with `embeddings` (id = position) and `manifest`.
pub fn write_index(conn: &mut Connection, manifest: &IndexManifest, embeddings: &[Vec<f32>]) -> AppResult<()> {
    if embeddings.len() != manifest.count {
        return Err(AppError::Index(format!(
            "Manifest count {} does not match {} embeddings",
            manifest.count,
            embeddings.len()
        )));
    }

    let tx = conn
        .transaction()
        .map_err(|e| AppError::Index(format!("Failed to start transaction: {}", e)))?;

    tx.execute("DELETE FROM documents", [])
        .map_err(|e| AppError::Index(format!("Failed to clear documents: {}", e)))?;
    tx.execute("DELETE FROM manifest", [])
        .map_err(|e| AppError::Index(format!("Failed to clear manifest: {}", e)))?;

    {
        let mut stmt = tx
            .prepare("INSERT INTO documents (id, embedding) VALUES (?1, ?2)")
            .map_err(|e| AppError::Index(format!("Failed to prepare insert: {}", e)))?;
        for (id, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != manifest.dimensions {
                return Err(AppError::Index(format!(
                    "Document {} has {} dimensions, expected {}",
                    id,
                    embedding.len(),
                    manifest.dimensions
                )));
            }
            stmt.execute(params![id as i64, embedding_to_bytes(embedding)])
                .map_err(|e| AppError::Index(format!("Failed to insert embedding: {}", e)))?;
        }
    }

    let manifest_json = serde_json::to_string(manifest)?;
    tx.execute(
        "INSERT INTO manifest (key, value) VALUES ('manifest', ?1)",
        params![manifest_json],
    )
    .map_err(|e| AppError::Index(format!("Failed to write manifest: {}", e)))?;

    tx.commit()
        .map_err(|e| AppError::Index(format!("Failed to commit index: {}", e)))?;

    tracing::info!(
        "Stored {} embeddings ({} dims, {}/{})",
        manifest.count,
        manifest.dimensions,
        manifest.provider,
        manifest.model
    );
    Ok(())
}

/// Read the manifest without loading vectors.
pub fn read_manifest(conn: &Connection) -> AppResult<IndexManifest> {
    let json: String = conn
        .query_row(
            "SELECT value FROM manifest WHERE key = 'manifest'",
            [],
            |row| row.get(0),
        )
        .map_err(|e| AppError::Index(format!("Index has no manifest: {}", e)))?;
    Ok(serde_json::from_str(&json)?)
}

/// Load the manifest and every vector, in document order.
pub fn load_index(db_path: &Path) -> AppResult<(IndexManifest, Vec<Vec<f32>>)> {
    if !db_path.exists() {
        return Err(AppError::Index(format!(
            "Dense index not found at {:?}. Run 'agri index build' first.",
            db_path
        )));
    }

    let conn = init_index(db_path)?;
    let manifest = read_manifest(&conn)?;

    let mut stmt = conn
        .prepare("SELECT id, embedding FROM documents ORDER BY id")
        .map_err(|e| AppError::Index(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)))
        .map_err(|e| AppError::Index(format!("Failed to query embeddings: {}", e)))?;

    let mut embeddings = Vec::with_capacity(manifest.count);
    for row in rows {
        let (id, bytes) = row.map_err(|e| AppError::Index(format!("Failed to read row: {}", e)))?;
        if id as usize != embeddings.len() {
            return Err(AppError::Index(format!(
                "Index ids are not contiguous: expected {}, found {}",
                embeddings.len(),
                id
            )));
        }
        embeddings.push(bytes_to_embedding(&bytes)?);
    }

    tracing::debug!("Loaded {} embeddings from {:?}", embeddings.len(), db_path);
    Ok((manifest, embeddings))
}

/// Convert embedding vector to little-endian bytes for storage.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to an embedding vector.
pub fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index("Invalid embedding bytes length".to_string()));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
