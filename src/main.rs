mod cli;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use studymate::config::StudyConfig;
use studymate::StudyAssistant;

#[derive(Parser)]
#[command(name = "studymate", version, about = "Conversational study assistant with note memory")]
struct Cli {
    /// Config file (defaults to ~/.studymate/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API or the MCP stdio server
    Serve {
        /// Overrides `server.transport` from config
        #[arg(long, value_enum)]
        transport: Option<Transport>,
    },
    /// Ask questions from the terminal
    Ask {
        /// Ask one question and exit instead of starting the interactive loop
        #[arg(long, value_name = "QUESTION")]
        once: Option<String>,
        /// Session id (defaults to `storage.default_session`)
        #[arg(long)]
        session: Option<String>,
        /// Answer style: short or detailed
        #[arg(long, default_value = "short")]
        style: String,
    },
    /// Inspect the note store
    Notes {
        #[command(subcommand)]
        action: NotesAction,
    },
    /// Check configuration, model files, and note store health
    Doctor,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum NotesAction {
    /// Search notes by similarity
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Show note counts by source
    Stats,
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to the configured cache dir
    Download,
}

#[derive(Clone, Copy, ValueEnum)]
enum Transport {
    Http,
    Stdio,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => StudyConfig::load_from(path)?,
        None => StudyConfig::load()?,
    };

    // Log to stderr so stdout stays clean for MCP JSON-RPC and console answers.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { transport } => {
            let transport = match transport {
                Some(t) => t,
                None => match config.server.transport.as_str() {
                    "http" => Transport::Http,
                    "stdio" => Transport::Stdio,
                    other => anyhow::bail!("unknown transport: {other}. Supported: http, stdio"),
                },
            };
            match transport {
                Transport::Http => server::serve_http(config).await?,
                Transport::Stdio => server::serve_stdio(config).await?,
            }
        }
        Command::Ask { once, session, style } => {
            let assistant = StudyAssistant::from_config(&config)?;
            let session_id = session.unwrap_or_else(|| assistant.default_session().to_string());
            match once {
                Some(question) => cli::chat::ask_once(&assistant, &question, &session_id, &style).await?,
                None => cli::chat::interactive(&assistant, &session_id, &style).await?,
            }
        }
        Command::Notes { action } => match action {
            NotesAction::Search { query, limit } => {
                cli::notes::search(&config, &query, limit).await?;
            }
            NotesAction::Stats => cli::notes::stats(&config)?,
        },
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}
