//! Read path: vector KNN over `notes_vec` joined back to `notes`, plus store statistics.

use anyhow::Result;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::BTreeMap;

use super::{cosine_threshold_to_l2, embedding_to_bytes, l2_to_cosine, RetrievedNote};

/// Top-`k` notes nearest to `query_embedding`.
///
/// `relevance_floor` is a minimum cosine similarity; `0.0` or below disables it.
pub fn search_notes(
    conn: &Connection,
    query_embedding: &[f32],
    k: usize,
    relevance_floor: f64,
) -> Result<Vec<RetrievedNote>> {
    if k == 0 {
        return Ok(Vec::new());
    }

    // vec0 wants a literal LIMIT on the KNN scan; k is a usize so inlining is safe.
    let sql = format!(
        "SELECT knn.id, knn.distance, n.content, n.source, n.created_at \
         FROM (SELECT id, distance FROM notes_vec WHERE embedding MATCH ?1 ORDER BY distance LIMIT {k}) AS knn \
         JOIN notes n ON n.id = knn.id \
         ORDER BY knn.distance"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![embedding_to_bytes(query_embedding)], |row| {
            Ok((
                row.get::<_, f64>(1)?,
                RetrievedNote {
                    id: row.get(0)?,
                    content: row.get(2)?,
                    source: row.get(3)?,
                    similarity: 0.0,
                    created_at: row.get(4)?,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let max_distance = (relevance_floor > 0.0).then(|| cosine_threshold_to_l2(relevance_floor));

    Ok(rows
        .into_iter()
        .take_while(|(distance, _)| max_distance.map_or(true, |max| *distance <= max))
        .map(|(distance, mut note)| {
            note.similarity = l2_to_cosine(distance);
            note
        })
        .collect())
}

/// Aggregate counts for `studymate notes stats`.
#[derive(Debug, Serialize)]
pub struct NoteStats {
    pub total_notes: i64,
    /// Note counts keyed by source tag; untagged notes are counted under `"(none)"`.
    pub by_source: BTreeMap<String, i64>,
    pub oldest_note: Option<String>,
    pub newest_note: Option<String>,
}

pub fn note_stats(conn: &Connection) -> Result<NoteStats> {
    let (total_notes, oldest_note, newest_note) = conn.query_row(
        "SELECT COUNT(*), MIN(created_at), MAX(created_at) FROM notes",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    let mut stmt = conn.prepare(
        "SELECT COALESCE(source, '(none)'), COUNT(*) FROM notes GROUP BY source ORDER BY source",
    )?;
    let by_source = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    Ok(NoteStats {
        total_notes,
        by_source,
        oldest_note,
        newest_note,
    })
}
