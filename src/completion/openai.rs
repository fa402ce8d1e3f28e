//! OpenAI-compatible chat completions client (Groq by default).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::schema::{parse_structured, response_json_schema, RESPONSE_SCHEMA_NAME};
use super::{
    CompletionError, CompletionProvider, CompletionRequest, OutputMode, PromptMessage,
    StructuredResponse,
};

pub struct OpenAiCompatibleProvider {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            temperature,
        })
    }

    fn build_request<'a>(&'a self, request: &'a CompletionRequest, mode: OutputMode) -> ChatRequest<'a> {
        let response_format = match mode {
            OutputMode::Json => serde_json::json!({ "type": "json_object" }),
            OutputMode::JsonSchema => serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": RESPONSE_SCHEMA_NAME,
                    "strict": true,
                    "schema": response_json_schema(),
                }
            }),
        };

        ChatRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: self.temperature,
            response_format,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
        mode: OutputMode,
    ) -> Result<StructuredResponse, CompletionError> {
        let body = self.build_request(request, mode);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::unavailable(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    CompletionError::unavailable(format!("connection failed: {e}"))
                } else {
                    CompletionError::unavailable(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CompletionError::unavailable(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|env| env.error.message)
                .unwrap_or(text);
            return Err(classify_status(status, &message));
        }

        let envelope: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            CompletionError::malformed(format!("failed to parse completion envelope: {e}"))
        })?;

        let content = envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| CompletionError::malformed("completion has no message content"))?;

        parse_structured(&content)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// 400/422 mean the request shape was refused (e.g. unsupported
/// `response_format`, or the provider's own JSON validation failed).
/// Everything else is treated as the provider being unavailable.
fn classify_status(status: StatusCode, message: &str) -> CompletionError {
    match status.as_u16() {
        400 | 422 => CompletionError::rejected(format!("HTTP {status}: {message}")),
        401 | 403 => CompletionError::unavailable(format!("authentication failed: {message}")),
        429 => CompletionError::unavailable(format!("rate limit exceeded: {message}")),
        500..=599 => CompletionError::unavailable(format!("server error: {message}")),
        _ => CompletionError::unavailable(format!("HTTP {status}: {message}")),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    temperature: f32,
    response_format: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
