use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the sqlite file created inside `storage.persist_path`.
pub const NOTES_DB_FILE: &str = "notes.db";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StudyConfig {
    pub server: ServerConfig,
    pub completion: CompletionConfig,
    pub embedding: EmbeddingConfig,
    pub storage: StorageConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub cors_allow_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompletionConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub persist_path: String,
    pub default_session: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Minimum cosine similarity a note needs to be retrieved. `0.0` disables the floor.
    pub relevance_floor: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "http".into(),
            host: "0.0.0.0".into(),
            port: 8000,
            log_level: "info".into(),
            cors_allow_origins: vec!["*".into()],
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: "groq".into(),
            model: "llama-3.3-70b-versatile".into(),
            base_url: "https://api.groq.com/openai/v1".into(),
            api_key: None,
            temperature: 0.2,
            timeout_secs: 60,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_studymate_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persist_path: "./storage/memory_db".into(),
            default_session: "default".into(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            relevance_floor: 0.0,
        }
    }
}

/// Returns `~/.studymate/`, or `./.studymate` when no home directory is known.
pub fn default_studymate_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".studymate")
}

/// Returns the default config file path: `~/.studymate/config.toml`
pub fn default_config_path() -> PathBuf {
    default_studymate_dir().join("config.toml")
}

impl StudyConfig {
    /// Load `.env`, then the TOML file at the default path (if it exists), then env overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        // A missing .env is the normal case.
        let _ = dotenvy::dotenv();

        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            StudyConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a key lookup. Split out from the process
    /// environment so tests don't have to mutate global state.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("GROQ_API_KEY") {
            self.completion.api_key = Some(val);
        }
        if let Some(val) = lookup("GROQ_MODEL") {
            self.completion.model = val;
        }
        if let Some(val) = lookup("GROQ_BASE_URL") {
            self.completion.base_url = val;
        }
        if let Some(val) = lookup("EMBED_MODEL") {
            self.embedding.model = val;
        }
        if let Some(val) = lookup("PERSIST_PATH") {
            self.storage.persist_path = val;
        }
        if let Some(val) = lookup("STUDYMATE_SESSION") {
            self.storage.default_session = val;
        }
        if let Some(val) = lookup("STUDYMATE_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Some(val) = lookup("CORS_ALLOW_ORIGINS") {
            self.server.cors_allow_origins = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    /// Directory holding the note store, with `~` expanded.
    pub fn resolved_persist_path(&self) -> PathBuf {
        expand_tilde(&self.storage.persist_path)
    }

    /// Full path of the note store's sqlite file.
    pub fn resolved_db_path(&self) -> PathBuf {
        self.resolved_persist_path().join(NOTES_DB_FILE)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
