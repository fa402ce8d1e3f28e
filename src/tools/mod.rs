pub mod ask;
pub mod reset_session;

use ask::AskParams;
use reset_session::ResetSessionParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::Arc;

use crate::assistant::StudyAssistant;

/// The MCP tool handler. Shares one [`StudyAssistant`] (and so one set of
/// sessions and one note store) across all tool calls.
#[derive(Clone)]
pub struct AssistantTools {
    tool_router: ToolRouter<Self>,
    assistant: Arc<StudyAssistant>,
}

#[tool_router]
impl AssistantTools {
    pub fn new(assistant: Arc<StudyAssistant>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            assistant,
        }
    }

    /// Answer a study question, continuing the session's conversation.
    #[tool(description = "Ask the study assistant a question. Returns JSON with answer, key_points, suggested_questions and references. Prior turns in the same session_id are used as context.")]
    pub async fn ask(&self, Parameters(params): Parameters<AskParams>) -> Result<String, String> {
        if params.message.trim().is_empty() {
            return Err("message must not be empty".into());
        }

        let session_id = params
            .session_id
            .as_deref()
            .unwrap_or(self.assistant.default_session());
        let style = params.style.as_deref().unwrap_or("short");

        tracing::info!(session_id = %session_id, style = %style, "ask called");

        let response = self
            .assistant
            .ask(&params.message, session_id, style)
            .await
            .map_err(|e| format!("{}: {e}", e.kind()))?;

        serde_json::to_string(&response).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Clear a session's conversation history.
    #[tool(description = "Forget the conversation history of a session. Notes the assistant already stored stay retrievable.")]
    pub async fn reset_session(
        &self,
        Parameters(params): Parameters<ResetSessionParams>,
    ) -> Result<String, String> {
        self.assistant.reset_session(&params.session_id);
        Ok(serde_json::json!({ "ok": true }).to_string())
    }
}

#[tool_handler]
impl ServerHandler for AssistantTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "A study assistant with memory. Use ask to get structured answers and \
                 reset_session to start a conversation over."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
