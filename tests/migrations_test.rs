//! Tests for the file-based migrations runner.

use quartermaster::db::{create_in_memory_pool, migrations};
use std::fs;

#[test]
fn test_migrations_apply_in_name_order_and_once() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(
        dir.path().join("0001_groups.sql"),
        "CREATE TABLE groups (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
    )
    .unwrap();
    fs::write(
        dir.path().join("0002_seed.sql"),
        "INSERT INTO groups (name) VALUES ('alpha');",
    )
    .unwrap();

    let pool = create_in_memory_pool().unwrap();
    let conn = pool.get().unwrap();

    migrations::run_migrations(&conn, dir.path()).expect("First run failed");

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM groups", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);

    // Re-running must be a no-op, not a duplicate insert.
    migrations::run_migrations(&conn, dir.path()).expect("Second run failed");
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM groups", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);

    let applied: i64 = conn
        .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
        .unwrap();
    assert_eq!(applied, 2);
}

#[test]
fn test_new_migration_applies_on_next_run() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(
        dir.path().join("0001_groups.sql"),
        "CREATE TABLE groups (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
    )
    .unwrap();

    let pool = create_in_memory_pool().unwrap();
    let conn = pool.get().unwrap();
    migrations::run_migrations(&conn, dir.path()).unwrap();

    fs::write(
        dir.path().join("0002_members.sql"),
        "CREATE TABLE members (id INTEGER PRIMARY KEY, group_id INTEGER REFERENCES groups(id));",
    )
    .unwrap();
    migrations::run_migrations(&conn, dir.path()).unwrap();

    // Both tables exist afterwards
    conn.execute("INSERT INTO groups (name) VALUES ('beta')", [])
        .unwrap();
    conn.execute("INSERT INTO members (group_id) VALUES (1)", [])
        .unwrap();
}

#[test]
fn test_missing_migrations_dir_is_tolerated() {
    let pool = create_in_memory_pool().unwrap();
    let conn = pool.get().unwrap();

    migrations::run_migrations(&conn, std::path::Path::new("does/not/exist"))
        .expect("Missing dir should not be an error");
}
