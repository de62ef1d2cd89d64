//! Database schema migrations for focustimer.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{info, warn};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    if current_version < CURRENT_SCHEMA_VERSION {
        info!(
            from = current_version,
            to = CURRENT_SCHEMA_VERSION,
            "database schema migrated"
        );
    }
    Ok(())
}

/// Create the schema_version table if it doesn't exist.
fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: sessions and the two derived statistics tables.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS study_sessions (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            date             TEXT NOT NULL,
            start_time       TEXT NOT NULL,
            end_time         TEXT,
            timer_type       TEXT NOT NULL,
            planned_duration INTEGER NOT NULL,
            actual_duration  INTEGER,
            completed        INTEGER NOT NULL DEFAULT 0,
            notes            TEXT,
            created_at       TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS daily_stats (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            date             TEXT UNIQUE NOT NULL,
            total_study_time INTEGER NOT NULL DEFAULT 0,
            total_rest_time  INTEGER NOT NULL DEFAULT 0,
            session_count    INTEGER NOT NULL DEFAULT 0,
            completion_rate  REAL NOT NULL DEFAULT 0.0,
            updated_at       TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS timer_type_stats (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            timer_type  TEXT NOT NULL,
            date        TEXT NOT NULL,
            usage_count INTEGER NOT NULL DEFAULT 0,
            total_time  INTEGER NOT NULL DEFAULT 0,
            UNIQUE (timer_type, date)
        );

        CREATE INDEX IF NOT EXISTS idx_study_sessions_date ON study_sessions(date);
        CREATE INDEX IF NOT EXISTS idx_study_sessions_timer_type ON study_sessions(timer_type);
        CREATE INDEX IF NOT EXISTS idx_daily_stats_date ON daily_stats(date);
        CREATE INDEX IF NOT EXISTS idx_timer_type_stats_date ON timer_type_stats(date);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: todo items and session -> todo links.
///
/// The todo content is copied into the session row so the link survives
/// deletion of the todo.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS todo_items (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            date         TEXT NOT NULL,
            content      TEXT NOT NULL,
            completed    INTEGER NOT NULL DEFAULT 0,
            priority     INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL,
            completed_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_todo_items_date ON todo_items(date);

        ALTER TABLE study_sessions ADD COLUMN todo_id INTEGER;
        ALTER TABLE study_sessions ADD COLUMN todo_content TEXT;",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn v1_database_gains_todo_columns() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute(
            "INSERT INTO study_sessions (date, start_time, timer_type, planned_duration)
             VALUES ('2024-01-01', '2024-01-01 09:00:00', 'study', 1500)",
            [],
        )
        .unwrap();

        migrate(&conn).unwrap();

        let todo_id: Option<i64> = conn
            .query_row("SELECT todo_id FROM study_sessions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(todo_id, None);
        assert_eq!(get_schema_version(&conn), 2);
    }
}
