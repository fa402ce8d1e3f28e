//! Builds the chat prompt for one exchange.

use serde::{Deserialize, Serialize};

use crate::completion::{CompletionRequest, PromptMessage};
use crate::session::{Message, Role};

/// Requested answer verbosity. Anything unrecognized is [`Style::Short`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    #[default]
    Short,
    Detailed,
}

impl Style {
    pub fn normalize(raw: &str) -> Self {
        match raw {
            "detailed" => Self::Detailed,
            _ => Self::Short,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Detailed => "detailed",
        }
    }
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn system_text(style: Style, notes: &str) -> String {
    format!(
        "You are a kind, rigorous study assistant. Be helpful, cite facts, and help users learn. \
         Explain the answer in a way that is easy to understand and follow.\n\
         Use prior study notes when relevant. If you do not know, say so.\n\
         Never reveal chain-of-thought, analysis notes, hidden reasoning, or step-by-step traces.\n\
         Only provide final answers according to the style and brief bullet points.\n\
         Always include follow-up questions on the topic.\n\
         Adjust verbosity based on the user's chosen style: {style}.\n\
         - If style is 'short': keep answers to 2-4 sentences and at most 3 key points.\n\
         - If style is 'detailed': provide thorough explanations, examples, and up to 7 key points.\n\
         Respond only with a JSON object with the keys \"answer\" (string), \"key_points\", \
         \"suggested_questions\" and \"references\" (arrays of strings), and nothing else.\n\n\
         Prior notes (may be empty):\n{notes}"
    )
}

fn user_text(message: &str) -> String {
    format!(
        "Follow the JSON schema strictly. Do not include extra text before or after the JSON.\n\
         Respond to the user's message and return a JSON object that matches the schema.\n\
         User message: {message}"
    )
}

/// System instructions, then prior turns in order, then the new user turn.
///
/// Prior turns are replayed as recorded; only the new message gets the
/// output-format wrapper.
pub fn compose(style: Style, notes: &str, history: &[Message], message: &str) -> CompletionRequest {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(PromptMessage::system(system_text(style, notes)));
    messages.extend(history.iter().map(|m| match m.role {
        Role::User => PromptMessage::user(m.content.clone()),
        Role::Assistant => PromptMessage::assistant(m.content.clone()),
    }));
    messages.push(PromptMessage::user(user_text(message)));
    CompletionRequest { messages }
}
