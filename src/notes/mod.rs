//! Note store: the assistant's retrieval-augmented memory.
//!
//! Notes are written once and never mutated. [`NoteStore`] is the capability
//! the orchestrator consumes; [`SqliteNoteStore`] backs it with sqlite +
//! sqlite-vec. The synchronous write and read paths live in [`store`] and
//! [`search`].

pub mod search;
pub mod sqlite;
pub mod store;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

pub use sqlite::SqliteNoteStore;

/// Free-form note metadata. The `source` key, when a string, is also indexed.
pub type NoteMetadata = serde_json::Map<String, serde_json::Value>;

/// A note returned by retrieval, ranked by similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedNote {
    pub id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Cosine similarity to the query in `[-1.0, 1.0]`.
    pub similarity: f64,
    pub created_at: String,
}

/// The embedding model could not produce a vector for a note or query.
///
/// Carried inside the `anyhow::Error` a [`NoteStore`] returns so callers can
/// tell a missing embedding capability apart from a storage failure.
#[derive(Debug, thiserror::Error)]
#[error("embedding unavailable: {0}")]
pub struct EmbeddingUnavailable(pub String);

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Top-`k` notes by semantic similarity to `query`, best first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedNote>>;

    /// Persist a new note. Returns its id.
    async fn insert(&self, text: &str, metadata: Option<&NoteMetadata>) -> Result<String>;
}

/// Build metadata carrying only a `source` tag.
pub fn source_metadata(source: &str) -> NoteMetadata {
    let mut metadata = NoteMetadata::new();
    metadata.insert("source".into(), serde_json::Value::String(source.into()));
    metadata
}

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            std::mem::size_of_val(embedding),
        )
    }
}

/// L2 distance between unit vectors → cosine similarity.
pub fn l2_to_cosine(distance: f64) -> f64 {
    1.0 - (distance * distance) / 2.0
}

/// Cosine similarity threshold → maximum L2 distance between unit vectors.
pub fn cosine_threshold_to_l2(threshold: f64) -> f64 {
    (2.0 - 2.0 * threshold).max(0.0).sqrt()
}
