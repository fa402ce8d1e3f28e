//! CLI `doctor` command: configuration and note store diagnostics.

use anyhow::{Context, Result};

use studymate::config::StudyConfig;
use studymate::db;
use studymate::embedding::{self, local};

pub fn doctor(config: &StudyConfig) -> Result<()> {
    println!("studymate Health Report");
    println!("=======================");
    println!();
    println!("Completion:");
    println!("  Provider:        {}", config.completion.provider);
    println!("  Model:           {}", config.completion.model);
    println!("  Endpoint:        {}", config.completion.base_url);
    let key_status = match config.completion.api_key.as_deref() {
        Some(k) if !k.trim().is_empty() => "set",
        _ => "MISSING (set GROQ_API_KEY)",
    };
    println!("  API key:         {key_status}");
    println!();

    println!("Embedding:");
    println!("  Provider:        {}", config.embedding.provider);
    println!("  Model:           {}", config.embedding.model);
    let configured_model = embedding::configured_model_id(&config.embedding);
    if config.embedding.provider == "local" {
        match local::model_dir(&config.embedding) {
            Ok(dir) => {
                let present = dir.join(local::MODEL_FILE).exists()
                    && dir.join(local::TOKENIZER_FILE).exists();
                println!("  Model dir:       {}", dir.display());
                if present {
                    println!("  Files:           OK");
                } else {
                    println!("  Files:           missing, run `studymate model download`");
                }
            }
            Err(e) => println!("  ERROR: {e}"),
        }
    }
    println!();

    let db_path = config.resolved_db_path();
    if !db_path.exists() {
        println!("Note store: not found at {}", db_path.display());
        println!("It is created on first `studymate serve` or `studymate ask`.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Note store:");
    println!("  Database:        {}", db_path.display());
    println!("  File size:       {}", format_bytes(file_size));
    match report.schema_version {
        Some(version) => println!("  Schema version:  {version}"),
        None => println!("  Schema version:  (not set)"),
    }
    println!("  sqlite-vec:      v{}", report.sqlite_vec_version);
    println!("  Notes:           {}", report.note_count);
    println!("  Vectors:         {}", report.vector_count);
    if report.note_count != report.vector_count {
        println!("  WARNING: note and vector counts differ");
    }
    println!(
        "  Embedded with:   {}",
        report.embedding_model.as_deref().unwrap_or("(not set)")
    );
    if let Some(ref stored) = report.embedding_model {
        if stored != &configured_model {
            println!("  WARNING: configured embedding model is {configured_model}; existing notes will retrieve poorly.");
        }
    }
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery: move {} aside and restart; notes will start empty.", db_path.display());
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
