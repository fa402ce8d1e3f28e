//! MCP `reset_session` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ResetSessionParams {
    #[schemars(description = "Session id whose conversation history to clear. Stored notes are kept.")]
    pub session_id: String,
}
