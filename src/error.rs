//! Error taxonomy surfaced by the assistant core.
//!
//! Every failure of [`StudyAssistant::ask`](crate::assistant::StudyAssistant::ask)
//! is one [`AssistantError`] carrying the original diagnostic message. Transports
//! map it to a generic failure via [`AssistantError::kind`].

use serde::Serialize;
use thiserror::Error;

use crate::completion::{CompletionError, CompletionErrorKind};

#[derive(Debug, Error)]
pub enum AssistantError {
    /// Required credential or setting missing. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Completion or embedding service unreachable, rate-limited, or failing.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Model output did not match the structured response shape.
    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    /// Provider refused the request shape.
    #[error("provider rejected request: {0}")]
    ProviderRejected(String),

    /// Note store could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    ProviderUnavailable,
    MalformedOutput,
    ProviderRejected,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::MalformedOutput => "malformed_output",
            Self::ProviderRejected => "provider_rejected",
            Self::Storage => "storage",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AssistantError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            Self::MalformedOutput(_) => ErrorKind::MalformedOutput,
            Self::ProviderRejected(_) => ErrorKind::ProviderRejected,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Wrap a note store failure, keeping the full context chain.
    pub fn storage(err: &anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }
}

impl From<CompletionError> for AssistantError {
    fn from(err: CompletionError) -> Self {
        match err.kind {
            CompletionErrorKind::MalformedOutput => Self::MalformedOutput(err.message),
            CompletionErrorKind::ProviderRejected => Self::ProviderRejected(err.message),
            CompletionErrorKind::ProviderUnavailable => Self::ProviderUnavailable(err.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_errors_keep_kind_and_message() {
        let err: AssistantError = CompletionError::rejected("schema not supported").into();
        assert_eq!(err.kind(), ErrorKind::ProviderRejected);
        assert_eq!(
            err.to_string(),
            "provider rejected request: schema not supported"
        );

        let err: AssistantError = CompletionError::unavailable("429 slow down").into();
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    }

    #[test]
    fn storage_error_includes_context_chain() {
        let inner = anyhow::anyhow!("disk full").context("failed to insert note");
        let err = AssistantError::storage(&inner);
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().contains("failed to insert note"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::MalformedOutput).unwrap();
        assert_eq!(json, "\"malformed_output\"");
    }
}
