mod helpers;

use studymate::notes::embedding_to_bytes;

#[test]
fn full_schema_creates_all_tables_and_indexes() {
    let conn = helpers::test_db();

    let tables: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert!(tables.contains(&"notes".to_string()), "notes table missing");
    assert!(tables.contains(&"notes_vec".to_string()), "notes_vec table missing");
    assert!(tables.contains(&"schema_meta".to_string()), "schema_meta table missing");

    let indexes: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert!(indexes.contains(&"idx_notes_source".to_string()));
    assert!(indexes.contains(&"idx_notes_created".to_string()));

    let vec_version: String = conn
        .query_row("SELECT vec_version()", [], |r| r.get(0))
        .unwrap();
    assert!(!vec_version.is_empty());
}

#[test]
fn vec0_table_accepts_384_dim_vectors() {
    let conn = helpers::test_db();
    let embedding = helpers::test_embedding(3);

    conn.execute(
        "INSERT INTO notes_vec (id, embedding) VALUES (?, ?)",
        rusqlite::params!["test-vec", embedding_to_bytes(&embedding)],
    )
    .unwrap();

    let count: i64 = conn
        .query_row("SELECT count(*) FROM notes_vec", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);

    let short = vec![0.5f32; 16];
    let result = conn.execute(
        "INSERT INTO notes_vec (id, embedding) VALUES (?, ?)",
        rusqlite::params!["bad-vec", embedding_to_bytes(&short)],
    );
    assert!(result.is_err(), "wrong dimension should be rejected by vec0");
}

#[test]
fn notes_require_content() {
    let conn = helpers::test_db();
    let result = conn.execute(
        "INSERT INTO notes (id, content, created_at) VALUES ('n1', NULL, '2026-01-01T00:00:00Z')",
        [],
    );
    assert!(result.is_err(), "content is NOT NULL");
}
