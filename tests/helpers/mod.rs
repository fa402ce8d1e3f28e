#![allow(dead_code)]

use async_trait::async_trait;
use rusqlite::Connection;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use studymate::completion::{
    CompletionError, CompletionProvider, CompletionRequest, OutputMode, PromptMessage,
    StructuredResponse,
};
use studymate::db;
use studymate::embedding::hashed::HashedEmbeddingProvider;
use studymate::notes::{NoteMetadata, NoteStore, RetrievedNote, SqliteNoteStore};
use studymate::StudyAssistant;

/// Open a fresh in-memory database with the schema applied.
pub fn test_db() -> Connection {
    db::load_sqlite_vec();
    let conn = Connection::open_in_memory().unwrap();
    db::schema::init_schema(&conn).unwrap();
    conn
}

/// Generate a deterministic 384-dim embedding with a spike at position `seed`.
pub fn test_embedding(seed: u8) -> Vec<f32> {
    let mut v = vec![0.0f32; 384];
    v[seed as usize % 384] = 1.0;
    v
}

/// In-memory note store embedding with the deterministic hashed provider.
pub fn hashed_store() -> Arc<SqliteNoteStore> {
    let conn = db::open_memory_database().unwrap();
    Arc::new(SqliteNoteStore::from_connection(
        conn,
        Arc::new(HashedEmbeddingProvider),
    ))
}

/// `(content, source)` of every stored note, oldest first.
pub fn stored_notes(store: &SqliteNoteStore) -> Vec<(String, Option<String>)> {
    let conn = store.connection();
    let conn = conn.lock().unwrap();
    let mut stmt = conn
        .prepare("SELECT content, source FROM notes ORDER BY created_at, rowid")
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

pub fn structured(answer: &str) -> StructuredResponse {
    StructuredResponse {
        answer: answer.into(),
        key_points: vec!["first point".into()],
        suggested_questions: vec!["What next?".into()],
        references: vec![],
    }
}

/// Completion provider that replays scripted results and records every call.
///
/// Once the script runs out it answers `"Answer N"` for the N-th call.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<StructuredResponse, CompletionError>>>,
    calls: Mutex<Vec<(OutputMode, CompletionRequest)>>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn scripted(
        results: impl IntoIterator<Item = Result<StructuredResponse, CompletionError>>,
    ) -> Arc<Self> {
        let provider = Self::default();
        provider.script.lock().unwrap().extend(results);
        Arc::new(provider)
    }

    pub fn calls(&self) -> Vec<(OutputMode, CompletionRequest)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn modes(&self) -> Vec<OutputMode> {
        self.calls().into_iter().map(|(mode, _)| mode).collect()
    }

    /// Messages of the `i`-th recorded request.
    pub fn messages(&self, i: usize) -> Vec<PromptMessage> {
        self.calls()[i].1.messages.clone()
    }

    /// System prompt of the `i`-th recorded request.
    pub fn system_prompt(&self, i: usize) -> String {
        self.messages(i)[0].content.clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
        mode: OutputMode,
    ) -> Result<StructuredResponse, CompletionError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((mode, request.clone()));
            calls.len()
        };
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(structured(&format!("Answer {n}"))))
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

/// Note store whose reads or writes fail.
pub struct FailingNoteStore {
    pub fail_retrieve: bool,
    pub fail_insert: bool,
}

#[async_trait]
impl NoteStore for FailingNoteStore {
    async fn retrieve(&self, _query: &str, _k: usize) -> anyhow::Result<Vec<RetrievedNote>> {
        if self.fail_retrieve {
            anyhow::bail!("database is locked");
        }
        Ok(Vec::new())
    }

    async fn insert(&self, _text: &str, _metadata: Option<&NoteMetadata>) -> anyhow::Result<String> {
        if self.fail_insert {
            anyhow::bail!("disk I/O error");
        }
        Ok("note-id".into())
    }
}

pub fn assistant(provider: &Arc<ScriptedProvider>, store: &Arc<SqliteNoteStore>) -> StudyAssistant {
    StudyAssistant::new(provider.clone(), store.clone())
}
