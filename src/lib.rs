//! A conversational study assistant with retrieval-augmented memory.
//!
//! Every question is answered with a structured response (answer, key points,
//! suggested follow-up questions, references), conditioned on the session's
//! prior turns and on notes the assistant wrote about earlier exchanges.
//!
//! # Architecture
//!
//! - **Completion**: any OpenAI-compatible chat endpoint (Groq by default),
//!   JSON mode with a one-shot fallback to a strict JSON schema
//! - **Notes**: SQLite with [sqlite-vec](https://github.com/asg017/sqlite-vec)
//!   for vector search over notes that persist across restarts
//! - **Embeddings**: Local ONNX Runtime with all-MiniLM-L6-v2 (384 dimensions)
//! - **Sessions**: in-memory per-session history, serialized per session id
//! - **Transport**: HTTP (axum), MCP over stdio, or the console
//!
//! # Modules
//!
//! - [`assistant`]: The orchestrator, prompt composer, and answer sanitizer
//! - [`completion`]: Completion provider trait, structured output contract, OpenAI-compatible client
//! - [`config`]: Configuration loading from TOML files, `.env`, and environment variables
//! - [`db`]: SQLite database initialization, schema, store metadata, and health checks
//! - [`embedding`]: Text-to-vector embedding pipeline via ONNX Runtime
//! - [`notes`]: The persistent note store used for retrieval
//! - [`session`]: Volatile conversation history per session id
//! - [`api`]: HTTP routes
//! - [`tools`]: MCP tools

pub mod api;
pub mod assistant;
pub mod completion;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod notes;
pub mod session;
pub mod tools;

pub use assistant::StudyAssistant;
pub use completion::StructuredResponse;
pub use error::{AssistantError, ErrorKind};
