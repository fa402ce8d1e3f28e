//! Completion capability: structured chat completions from an LLM.
//!
//! A [`CompletionProvider`] answers a [`CompletionRequest`] with a validated
//! [`StructuredResponse`] under one of two [`OutputMode`]s, or fails with a
//! classified [`CompletionError`]. The orchestrator owns the fallback between
//! modes; providers never retry on their own.

pub mod openai;
pub mod schema;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::CompletionConfig;
use crate::error::AssistantError;

pub use schema::StructuredResponse;

/// How the provider is asked to shape its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Free JSON object, validated client-side.
    Json,
    /// Provider-enforced strict JSON schema, still validated client-side.
    JsonSchema,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::JsonSchema => "json_schema",
        }
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::Assistant,
            content: content.into(),
        }
    }
}

/// Fully composed prompt: system instructions, prior turns, then the new user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<PromptMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionErrorKind {
    /// Output violated the structured contract.
    MalformedOutput,
    /// Provider refused the request shape (e.g. HTTP 400).
    ProviderRejected,
    /// Unreachable, timed out, rate-limited, unauthorized, or 5xx.
    ProviderUnavailable,
}

impl CompletionErrorKind {
    /// Whether the orchestrator should retry with the other output mode.
    pub fn allows_fallback(&self) -> bool {
        matches!(self, Self::MalformedOutput | Self::ProviderRejected)
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct CompletionError {
    pub kind: CompletionErrorKind,
    pub message: String,
}

impl CompletionError {
    pub fn new(kind: CompletionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(CompletionErrorKind::MalformedOutput, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(CompletionErrorKind::ProviderRejected, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(CompletionErrorKind::ProviderUnavailable, message)
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest,
        mode: OutputMode,
    ) -> Result<StructuredResponse, CompletionError>;

    fn model_id(&self) -> &str;
}

/// Logs duration and outcome of every completion call.
pub struct LoggingProvider {
    inner: Arc<dyn CompletionProvider>,
}

impl LoggingProvider {
    pub fn new(inner: Arc<dyn CompletionProvider>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl CompletionProvider for LoggingProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
        mode: OutputMode,
    ) -> Result<StructuredResponse, CompletionError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request, mode).await;
        let duration_ms = start.elapsed().as_millis();

        match &result {
            Ok(response) => tracing::info!(
                model = %self.inner.model_id(),
                mode = %mode,
                duration_ms = %duration_ms,
                key_points = response.key_points.len(),
                "completion succeeded"
            ),
            Err(e) => tracing::warn!(
                model = %self.inner.model_id(),
                mode = %mode,
                duration_ms = %duration_ms,
                kind = ?e.kind,
                error = %e.message,
                "completion failed"
            ),
        }

        result
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

/// Build the configured completion provider, wrapped in [`LoggingProvider`].
pub fn create_provider(config: &CompletionConfig) -> Result<Arc<dyn CompletionProvider>, AssistantError> {
    match config.provider.as_str() {
        "groq" | "openai" => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    AssistantError::Configuration(
                        "GROQ_API_KEY is not set. Add it to your environment or .env file".into(),
                    )
                })?;
            let inner = openai::OpenAiCompatibleProvider::new(
                api_key,
                config.model.clone(),
                &config.base_url,
                config.temperature,
                Duration::from_secs(config.timeout_secs),
            )
            .map_err(|e| AssistantError::Configuration(format!("failed to build HTTP client: {e}")))?;

            tracing::info!(provider = %config.provider, model = %config.model, "completion provider ready");
            Ok(Arc::new(LoggingProvider::new(Arc::new(inner))))
        }
        other => Err(AssistantError::Configuration(format!(
            "unknown completion provider: {other}. Supported: groq, openai"
        ))),
    }
}
