//! [`NoteStore`] over a shared sqlite connection.
//!
//! Embedding and database work are blocking, so both run on
//! `spawn_blocking`. The connection sits behind a mutex; concurrent inserts
//! from different sessions serialize there in arbitrary order.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{search, store, EmbeddingUnavailable, NoteMetadata, NoteStore, RetrievedNote};
use crate::db::meta::{self, ModelBinding};
use crate::embedding::EmbeddingProvider;

#[derive(Clone)]
pub struct SqliteNoteStore {
    db: Arc<Mutex<Connection>>,
    embedding: Arc<dyn EmbeddingProvider>,
    relevance_floor: f64,
}

impl SqliteNoteStore {
    /// Open (or create) the note database at `db_path` and bind it to the
    /// embedding model. A store written by another model opens with a warning.
    pub fn open(db_path: impl AsRef<Path>, embedding: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let conn = crate::db::open_database(db_path)?;
        let store = Self::from_connection(conn, embedding);

        match store.bind_embedding_model()? {
            ModelBinding::Recorded => {
                tracing::info!(model = %store.embedding.model_id(), "note store bound to embedding model")
            }
            ModelBinding::Matches => {}
            ModelBinding::Mismatch { stored } => tracing::warn!(
                stored = %stored,
                configured = %store.embedding.model_id(),
                "embedding model changed; existing notes will retrieve poorly"
            ),
        }
        Ok(store)
    }

    /// Wrap an already initialized connection.
    pub fn from_connection(conn: Connection, embedding: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            embedding,
            relevance_floor: 0.0,
        }
    }

    /// Minimum cosine similarity for retrieval. `0.0` disables the floor.
    pub fn with_relevance_floor(mut self, floor: f64) -> Self {
        self.relevance_floor = floor;
        self
    }

    /// Record this store's embedding model, or compare against the recorded one.
    pub fn bind_embedding_model(&self) -> Result<ModelBinding> {
        let conn = self.db.lock().map_err(|e| anyhow!("db lock poisoned: {e}"))?;
        Ok(meta::bind_embedding_model(&conn, self.embedding.model_id())?)
    }

    /// Shared handle to the underlying connection (diagnostics, stats).
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.db)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let provider = Arc::clone(&self.embedding);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || provider.embed(&text))
            .await
            .context("embedding task failed")?
            .map_err(|e| EmbeddingUnavailable(format!("{e:#}")).into())
    }
}

#[async_trait]
impl NoteStore for SqliteNoteStore {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedNote>> {
        let embedding = self.embed(query).await?;

        let db = Arc::clone(&self.db);
        let floor = self.relevance_floor;
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|e| anyhow!("db lock poisoned: {e}"))?;
            search::search_notes(&conn, &embedding, k, floor)
        })
        .await
        .context("note search task failed")?
        .context("note search failed")
    }

    async fn insert(&self, text: &str, metadata: Option<&NoteMetadata>) -> Result<String> {
        let embedding = self.embed(text).await?;

        let db = Arc::clone(&self.db);
        let content = text.to_string();
        let metadata = metadata.cloned();
        let id = tokio::task::spawn_blocking(move || {
            let mut conn = db.lock().map_err(|e| anyhow!("db lock poisoned: {e}"))?;
            store::insert_note(&mut conn, &content, metadata.as_ref(), &embedding)
        })
        .await
        .context("note insert task failed")?
        .context("note insert failed")?;

        tracing::debug!(id = %id, "note stored");
        Ok(id)
    }
}
