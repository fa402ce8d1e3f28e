//! Store metadata kept in `schema_meta`.
//!
//! Two keys: `schema_version`, written when the schema is created, and
//! `embedding_model`, bound the first time a store is opened with an
//! embedding provider. Vectors from different models are not comparable, so
//! later opens report whether the configured model still matches.

use anyhow::{bail, Result};
use rusqlite::{Connection, OptionalExtension};

/// Schema layout this binary creates and reads.
pub const SCHEMA_VERSION: u32 = 1;

pub fn schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map(|value| value.and_then(|v| v.parse().ok()))
}

/// Refuse stores written by a newer layout.
pub fn check_schema_version(conn: &Connection) -> Result<u32> {
    match schema_version(conn)? {
        Some(version) if version > SCHEMA_VERSION => bail!(
            "note store has schema version {version}, this build reads up to {SCHEMA_VERSION}"
        ),
        Some(version) => Ok(version),
        None => bail!("note store has no schema version"),
    }
}

pub fn embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'embedding_model'",
        [],
        |row| row.get::<_, String>(0),
    )
    .optional()
}

/// Outcome of [`bind_embedding_model`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelBinding {
    /// The store had no model yet and now records this one.
    Recorded,
    Matches,
    Mismatch { stored: String },
}

/// Record `model_id` as the store's embedding model if none is set, else
/// compare against the recorded one. The recorded model is never replaced.
pub fn bind_embedding_model(conn: &Connection, model_id: &str) -> rusqlite::Result<ModelBinding> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('embedding_model', ?1)",
        [model_id],
    )?;
    if inserted == 1 {
        return Ok(ModelBinding::Recorded);
    }
    match embedding_model(conn)? {
        Some(stored) if stored == model_id => Ok(ModelBinding::Matches),
        Some(stored) => Ok(ModelBinding::Mismatch { stored }),
        None => Ok(ModelBinding::Recorded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        crate::db::open_memory_database().unwrap()
    }

    #[test]
    fn new_store_has_current_version_and_no_model() {
        let conn = fresh();
        assert_eq!(check_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(embedding_model(&conn).unwrap().is_none());
    }

    #[test]
    fn first_bind_records_then_matches() {
        let conn = fresh();
        assert_eq!(
            bind_embedding_model(&conn, "local/all-MiniLM-L6-v2").unwrap(),
            ModelBinding::Recorded
        );
        assert_eq!(
            bind_embedding_model(&conn, "local/all-MiniLM-L6-v2").unwrap(),
            ModelBinding::Matches
        );
    }

    #[test]
    fn other_model_is_reported_and_not_recorded() {
        let conn = fresh();
        bind_embedding_model(&conn, "hashed/fnv-bow-384").unwrap();

        let binding = bind_embedding_model(&conn, "local/all-MiniLM-L6-v2").unwrap();
        assert_eq!(
            binding,
            ModelBinding::Mismatch {
                stored: "hashed/fnv-bow-384".into()
            }
        );
        assert_eq!(
            embedding_model(&conn).unwrap().as_deref(),
            Some("hashed/fnv-bow-384")
        );
    }

    #[test]
    fn newer_schema_is_refused() {
        let conn = fresh();
        conn.execute(
            "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
            [(SCHEMA_VERSION + 1).to_string()],
        )
        .unwrap();
        let err = check_schema_version(&conn).unwrap_err();
        assert!(err.to_string().contains("this build reads up to"));
    }
}
