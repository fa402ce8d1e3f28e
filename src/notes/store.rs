//! Write path: insert a note row and its embedding vector in one transaction.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Transaction};

use super::{embedding_to_bytes, NoteMetadata};

/// Insert a note and its vector atomically. Returns the new note id (UUID v7).
pub fn insert_note(
    conn: &mut Connection,
    content: &str,
    metadata: Option<&NoteMetadata>,
    embedding: &[f32],
) -> Result<String> {
    let tx = conn.transaction()?;

    let id = uuid::Uuid::now_v7().to_string();
    insert_row(&tx, &id, content, metadata)?;
    insert_vec(&tx, &id, embedding)?;

    tx.commit().context("failed to commit note")?;
    Ok(id)
}

fn insert_row(
    tx: &Transaction,
    id: &str,
    content: &str,
    metadata: Option<&NoteMetadata>,
) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let source = metadata
        .and_then(|m| m.get("source"))
        .and_then(|v| v.as_str());
    let metadata_json = metadata.map(serde_json::to_string).transpose()?;

    tx.execute(
        "INSERT INTO notes (id, content, source, metadata, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, content, source, metadata_json, now],
    )
    .context("failed to insert note row")?;
    Ok(())
}

fn insert_vec(tx: &Transaction, id: &str, embedding: &[f32]) -> Result<()> {
    tx.execute(
        "INSERT INTO notes_vec (id, embedding) VALUES (?1, ?2)",
        params![id, embedding_to_bytes(embedding)],
    )
    .context("failed to insert note vector")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::notes::source_metadata;

    fn unit(dim: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; 384];
        v[dim] = 1.0;
        v
    }

    #[test]
    fn insert_writes_row_and_vector() {
        let mut conn = db::open_memory_database().unwrap();
        let meta = source_metadata("assistant_session_memory");

        let id = insert_note(&mut conn, "Question: what is a limit?", Some(&meta), &unit(0)).unwrap();

        let (content, source, metadata): (String, Option<String>, Option<String>) = conn
            .query_row(
                "SELECT content, source, metadata FROM notes WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(content, "Question: what is a limit?");
        assert_eq!(source.as_deref(), Some("assistant_session_memory"));
        assert!(metadata.unwrap().contains("assistant_session_memory"));

        let vec_id: String = conn
            .query_row("SELECT id FROM notes_vec WHERE id = ?1", params![id], |row| row.get(0))
            .unwrap();
        assert_eq!(vec_id, id);
    }

    #[test]
    fn insert_without_metadata_leaves_source_null() {
        let mut conn = db::open_memory_database().unwrap();
        let id = insert_note(&mut conn, "loose note", None, &unit(3)).unwrap();

        let source: Option<String> = conn
            .query_row("SELECT source FROM notes WHERE id = ?1", params![id], |row| row.get(0))
            .unwrap();
        assert!(source.is_none());
    }

    #[test]
    fn identical_notes_are_both_kept() {
        let mut conn = db::open_memory_database().unwrap();
        let a = insert_note(&mut conn, "same text", None, &unit(1)).unwrap();
        let b = insert_note(&mut conn, "same text", None, &unit(1)).unwrap();
        assert_ne!(a, b);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn wrong_dimension_rolls_back_row() {
        let mut conn = db::open_memory_database().unwrap();
        let result = insert_note(&mut conn, "bad vector", None, &[1.0, 0.0]);
        assert!(result.is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
