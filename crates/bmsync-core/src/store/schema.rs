//! SQLite schema for structured app state
//!
//! Two tables hold everything the primitive plugin cannot:
//!
//! - `app` - a single row (id 1) with one TEXT column per structured key
//! - `traceLog` - the diagnostic log, one row per entry, keyed by timestamp
//!
//! `schema_info` records the schema version. Databases that already hold an
//! `app` table but no version were written by earlier releases; they are
//! adopted in place rather than recreated.

use rusqlite::{params, Connection, Result};

use super::key::StoreKey;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Synthetic id of the single app row
pub const APP_ROW_ID: i64 = 1;

pub const APP_TABLE: &str = "app";
pub const TRACE_LOG_TABLE: &str = "traceLog";

/// Drop and recreate both tables and the seed row in one transaction
///
/// Used on first open and by a full store reset; existing data is lost.
pub fn init_schema(conn: &mut Connection) -> Result<()> {
    let columns: Vec<String> = StoreKey::STRUCTURED
        .iter()
        .map(|key| format!("\"{}\" TEXT", key.as_str()))
        .collect();

    let tx = conn.transaction()?;

    tx.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        DROP TABLE IF EXISTS {app};
        CREATE TABLE {app} (
            id INTEGER PRIMARY KEY,
            {columns}
        );

        DROP TABLE IF EXISTS {log};
        CREATE TABLE {log} (
            timestamp INTEGER PRIMARY KEY,
            level INTEGER,
            message TEXT
        );
        "#,
        app = APP_TABLE,
        log = TRACE_LOG_TABLE,
        columns = columns.join(",\n            "),
    ))?;

    tx.execute(
        &format!("INSERT INTO {} (id) VALUES (?1)", APP_TABLE),
        params![APP_ROW_ID],
    )?;

    tx.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

fn table_exists(conn: &Connection, name: &str) -> bool {
    conn.prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1")
        .and_then(|mut stmt| stmt.exists([name]))
        .unwrap_or(false)
}

/// Whether the database is new, i.e. has no app table yet
pub fn needs_init(conn: &Connection) -> bool {
    !table_exists(conn, APP_TABLE)
}

/// Whether an existing database lacks a current version record
///
/// Databases written before `schema_info` existed hold data but no version.
pub fn needs_upgrade(conn: &Connection) -> bool {
    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}

/// Record the schema version on an existing database, keeping its data
///
/// Missing tables and the seed row are created; existing rows are left alone.
pub fn adopt_schema(conn: &mut Connection) -> Result<()> {
    let columns: Vec<String> = StoreKey::STRUCTURED
        .iter()
        .map(|key| format!("\"{}\" TEXT", key.as_str()))
        .collect();

    let tx = conn.transaction()?;

    tx.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS {app} (
            id INTEGER PRIMARY KEY,
            {columns}
        );

        CREATE TABLE IF NOT EXISTS {log} (
            timestamp INTEGER PRIMARY KEY,
            level INTEGER,
            message TEXT
        );
        "#,
        app = APP_TABLE,
        log = TRACE_LOG_TABLE,
        columns = columns.join(",\n            "),
    ))?;

    tx.execute(
        &format!("INSERT OR IGNORE INTO {} (id) VALUES (?1)", APP_TABLE),
        params![APP_ROW_ID],
    )?;

    tx.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}
