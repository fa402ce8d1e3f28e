//! MCP `ask` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `ask` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AskParams {
    /// The study question or follow-up.
    #[schemars(description = "The question or follow-up to answer")]
    pub message: String,

    /// Conversation to continue. Defaults to the configured session.
    #[schemars(description = "Session id whose history to continue. Defaults to the configured default session.")]
    pub session_id: Option<String>,

    /// `"short"` or `"detailed"`. Anything else is treated as `"short"`.
    #[schemars(description = "Answer style: 'short' (2-4 sentences, up to 3 key points) or 'detailed' (thorough, up to 7 key points). Defaults to 'short'.")]
    pub style: Option<String>,
}
