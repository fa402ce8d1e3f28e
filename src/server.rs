//! Server entry points for the HTTP and MCP stdio transports.
//!
//! Both build one [`StudyAssistant`] from config and share it across requests.

use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::Arc;

use studymate::api;
use studymate::config::StudyConfig;
use studymate::tools::AssistantTools;
use studymate::StudyAssistant;

/// Build the assistant. Opening the note store warns when its notes were
/// embedded with a different model.
fn setup_assistant(config: &StudyConfig) -> Result<Arc<StudyAssistant>> {
    let assistant = StudyAssistant::from_config(config)?;
    tracing::info!(
        db = %config.resolved_db_path().display(),
        default_session = %assistant.default_session(),
        "assistant ready"
    );
    Ok(Arc::new(assistant))
}

/// Serve the HTTP API until ctrl-c.
pub async fn serve_http(config: StudyConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting studymate HTTP server");

    let assistant = setup_assistant(&config)?;
    let router = api::app(assistant, &config.server.cors_allow_origins);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening at http://{bind_addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}

/// Serve the `ask` and `reset_session` tools over MCP stdio.
pub async fn serve_stdio(config: StudyConfig) -> Result<()> {
    tracing::info!("starting studymate MCP server on stdio");

    let assistant = setup_assistant(&config)?;
    let tools = AssistantTools::new(assistant);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}
