use anyhow::Result;
use std::sync::Arc;

use studymate::config::StudyConfig;
use studymate::db;
use studymate::embedding;
use studymate::notes::search::note_stats;
use studymate::notes::{NoteStore, SqliteNoteStore};

/// Search stored notes the way the assistant retrieves them.
pub async fn search(config: &StudyConfig, query: &str, limit: usize) -> Result<()> {
    let embedder = embedding::create_provider(&config.embedding)?;
    let store = SqliteNoteStore::open(config.resolved_db_path(), Arc::from(embedder))?
        .with_relevance_floor(config.retrieval.relevance_floor);

    let results = store.retrieve(query, limit).await?;

    if results.is_empty() {
        println!("No notes found.");
        return Ok(());
    }

    println!("Found {} note(s)\n", results.len());

    for (i, note) in results.iter().enumerate() {
        println!(
            "  {}. {} (source: {}, similarity: {:.4}, {})",
            i + 1,
            note.id,
            note.source.as_deref().unwrap_or("-"),
            note.similarity,
            note.created_at,
        );
        println!("     {}", preview(&note.content, 120));
        println!();
    }

    Ok(())
}

/// Print note counts and age range.
pub fn stats(config: &StudyConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;

    let stats = note_stats(&conn)?;

    println!("Note Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total notes:         {}", stats.total_notes);
    println!();

    if !stats.by_source.is_empty() {
        println!("By Source:");
        for (source, count) in &stats.by_source {
            println!("  {:<28} {}", source, count);
        }
        println!();
    }

    if let Some(ref oldest) = stats.oldest_note {
        println!("Oldest note:           {oldest}");
    }
    if let Some(ref newest) = stats.newest_note {
        println!("Newest note:           {newest}");
    }

    Ok(())
}

/// First `max_chars` characters on one line, with `...` when cut.
fn preview(content: &str, max_chars: usize) -> String {
    let flat = content.replace('\n', " | ");
    if flat.chars().count() > max_chars {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("Question: a\nAnswer: b", 120), "Question: a | Answer: b");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("ééééé", 2), "éé...");
    }
}
