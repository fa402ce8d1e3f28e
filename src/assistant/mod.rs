//! The conversation orchestrator.
//!
//! One [`StudyAssistant::ask`] retrieves related notes, composes the prompt
//! with the session's history, asks the completion provider (JSON mode first,
//! strict schema once on a shape failure), sanitizes the answer, writes a
//! derived note, and records the turn in the session log.

pub mod prompt;
pub mod sanitize;

use std::sync::Arc;

use crate::completion::{
    self, CompletionError, CompletionProvider, CompletionRequest, OutputMode, StructuredResponse,
};
use crate::config::StudyConfig;
use crate::embedding;
use crate::error::AssistantError;
use crate::notes::{
    source_metadata, EmbeddingUnavailable, NoteStore, RetrievedNote, SqliteNoteStore,
};
use crate::session::{Message, SessionStore};

pub use prompt::Style;
pub use sanitize::sanitize_answer;

/// Source tag on notes the assistant writes about its own exchanges.
pub const NOTE_SOURCE: &str = "assistant_session_memory";

pub const DEFAULT_TOP_K: usize = 4;

pub struct StudyAssistant {
    completion: Arc<dyn CompletionProvider>,
    notes: Arc<dyn NoteStore>,
    sessions: SessionStore,
    top_k: usize,
    default_session: String,
}

impl StudyAssistant {
    pub fn new(completion: Arc<dyn CompletionProvider>, notes: Arc<dyn NoteStore>) -> Self {
        Self {
            completion,
            notes,
            sessions: SessionStore::new(),
            top_k: DEFAULT_TOP_K,
            default_session: "default".into(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_default_session(mut self, session_id: impl Into<String>) -> Self {
        self.default_session = session_id.into();
        self
    }

    /// Wire up the configured completion provider, embedding model and note store.
    ///
    /// Fails with [`AssistantError::Configuration`] when the API key is missing
    /// or the embedding model cannot be loaded, and [`AssistantError::Storage`]
    /// when the note database cannot be opened.
    pub fn from_config(config: &StudyConfig) -> Result<Self, AssistantError> {
        let completion = completion::create_provider(&config.completion)?;

        let embedder = embedding::create_provider(&config.embedding).map_err(|e| {
            AssistantError::Configuration(format!("failed to load embedding model: {e:#}"))
        })?;

        let db_path = config.resolved_db_path();
        let notes = SqliteNoteStore::open(&db_path, Arc::from(embedder))
            .map_err(|e| AssistantError::storage(&e))?
            .with_relevance_floor(config.retrieval.relevance_floor);
        tracing::info!(path = %db_path.display(), "note store opened");

        Ok(Self::new(completion, Arc::new(notes))
            .with_top_k(config.retrieval.top_k)
            .with_default_session(config.storage.default_session.clone()))
    }

    pub fn default_session(&self) -> &str {
        &self.default_session
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Answer `message` within `session_id`.
    ///
    /// Calls on the same session run one at a time. On error nothing is
    /// recorded: no note is written and the session log is unchanged.
    pub async fn ask(
        &self,
        message: &str,
        session_id: &str,
        style: &str,
    ) -> Result<StructuredResponse, AssistantError> {
        let handle = self.sessions.get_or_create(session_id);
        let mut log = handle.lock().await;

        let retrieved = self
            .notes
            .retrieve(message, self.top_k)
            .await
            .map_err(|e| note_store_error(&e))?;
        let notes_context = render_notes_context(&retrieved);

        let style = Style::normalize(style);
        let request = prompt::compose(style, &notes_context, log.messages(), message);

        tracing::debug!(
            session_id = %session_id,
            style = %style,
            notes = retrieved.len(),
            history = log.len(),
            "asking"
        );

        let response = self.invoke(&request).await?;

        let note = derived_note_text(message, &response);
        self.notes
            .insert(&note, Some(&source_metadata(NOTE_SOURCE)))
            .await
            .map_err(|e| note_store_error(&e))?;

        log.push(Message::user(message));
        log.push(Message::assistant(response.answer.clone()));

        tracing::info!(
            session_id = %session_id,
            style = %style,
            key_points = response.key_points.len(),
            "answered"
        );
        Ok(response)
    }

    /// Forget the session's conversation. Notes already written are kept.
    pub fn reset_session(&self, session_id: &str) {
        self.sessions.delete(session_id);
        tracing::info!(session_id = %session_id, "session reset");
    }

    async fn invoke(&self, request: &CompletionRequest) -> Result<StructuredResponse, AssistantError> {
        match self.attempt(request, OutputMode::Json).await {
            Ok(response) => Ok(response),
            Err(e) if e.kind.allows_fallback() => {
                tracing::warn!(
                    kind = ?e.kind,
                    error = %e.message,
                    "json mode failed, retrying with strict schema"
                );
                Ok(self.attempt(request, OutputMode::JsonSchema).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// One completion call with the answer sanitized. An answer that is
    /// nothing but reasoning text counts as malformed.
    async fn attempt(
        &self,
        request: &CompletionRequest,
        mode: OutputMode,
    ) -> Result<StructuredResponse, CompletionError> {
        let mut response = self.completion.complete(request, mode).await?;
        response.answer = sanitize_answer(&response.answer);
        if response.answer.trim().is_empty() {
            return Err(CompletionError::malformed(
                "answer was empty after removing reasoning text",
            ));
        }
        Ok(response)
    }
}

/// Embedding failures are the embedding capability being unavailable;
/// anything else from the note store is storage.
fn note_store_error(err: &anyhow::Error) -> AssistantError {
    if err.downcast_ref::<EmbeddingUnavailable>().is_some() {
        AssistantError::ProviderUnavailable(format!("{err:#}"))
    } else {
        AssistantError::storage(err)
    }
}

/// `[Note i] source=<src>` header plus text per note, separated by blank lines.
pub fn render_notes_context(notes: &[RetrievedNote]) -> String {
    notes
        .iter()
        .enumerate()
        .map(|(i, note)| {
            let header = match &note.source {
                Some(source) => format!("[Note {}] source={}", i + 1, source),
                None => format!("[Note {}]", i + 1),
            };
            format!("{header}\n{}", note.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The note written back after every successful exchange.
pub fn derived_note_text(message: &str, response: &StructuredResponse) -> String {
    let join_or_none = |items: &[String]| {
        if items.is_empty() {
            "None".to_string()
        } else {
            items.join(", ")
        }
    };
    format!(
        "Question: {message}\nAnswer: {}\nKey points: {}\nFollow-ups: {}",
        response.answer,
        join_or_none(&response.key_points),
        join_or_none(&response.suggested_questions)
    )
}
