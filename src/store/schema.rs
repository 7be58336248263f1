//! SQLite schema, versioned with `PRAGMA user_version`.

use rusqlite::Connection;
use tracing::info;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

const MIGRATIONS: &[&str] = &[
    // Version 1: events, eras, review staging
    r#"
    CREATE TABLE IF NOT EXISTS eras (
        id           TEXT PRIMARY KEY,
        name         TEXT NOT NULL UNIQUE,
        start_date   TEXT NOT NULL,
        end_date     TEXT,
        color_code   TEXT NOT NULL,
        description  TEXT
    );

    CREATE TABLE IF NOT EXISTS events (
        id           TEXT PRIMARY KEY,
        title        TEXT NOT NULL,
        description  TEXT,
        start_date   TEXT NOT NULL,
        end_date     TEXT,
        category     TEXT NOT NULL,
        era_id       TEXT REFERENCES eras(id) ON DELETE SET NULL,
        created_at   TEXT NOT NULL,
        updated_at   TEXT NOT NULL,
        CHECK (end_date IS NULL OR end_date >= start_date)
    );

    CREATE INDEX IF NOT EXISTS idx_events_start ON events(start_date);

    CREATE TABLE IF NOT EXISTS pending_events (
        id                   TEXT PRIMARY KEY,
        queue_item_id        TEXT,
        title                TEXT NOT NULL,
        description          TEXT,
        start_date           TEXT NOT NULL,
        end_date             TEXT,
        category             TEXT,
        tags                 TEXT NOT NULL DEFAULT '[]',
        people               TEXT NOT NULL DEFAULT '[]',
        locations            TEXT NOT NULL DEFAULT '[]',
        confidence_score     REAL NOT NULL,
        extracted_data_json  TEXT NOT NULL,
        is_approved          INTEGER NOT NULL DEFAULT 0,
        created_at           TEXT NOT NULL,
        reviewed_at          TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_pending_approved ON pending_events(is_approved);
    "#,
    // Version 2: many-to-many labels
    r#"
    CREATE TABLE IF NOT EXISTS tags (
        id    INTEGER PRIMARY KEY AUTOINCREMENT,
        name  TEXT NOT NULL UNIQUE COLLATE NOCASE
    );
    CREATE TABLE IF NOT EXISTS event_tags (
        event_id  TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
        label_id  INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
        PRIMARY KEY (event_id, label_id)
    );

    CREATE TABLE IF NOT EXISTS people (
        id    INTEGER PRIMARY KEY AUTOINCREMENT,
        name  TEXT NOT NULL UNIQUE COLLATE NOCASE
    );
    CREATE TABLE IF NOT EXISTS event_people (
        event_id  TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
        label_id  INTEGER NOT NULL REFERENCES people(id) ON DELETE CASCADE,
        PRIMARY KEY (event_id, label_id)
    );

    CREATE TABLE IF NOT EXISTS locations (
        id    INTEGER PRIMARY KEY AUTOINCREMENT,
        name  TEXT NOT NULL UNIQUE COLLATE NOCASE
    );
    CREATE TABLE IF NOT EXISTS event_locations (
        event_id  TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
        label_id  INTEGER NOT NULL REFERENCES locations(id) ON DELETE CASCADE,
        PRIMARY KEY (event_id, label_id)
    );
    "#,
];

/// Bring the database up to [`SCHEMA_VERSION`]
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0)).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }
}
