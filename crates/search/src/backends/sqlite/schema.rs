//! Inventory tables for the SQLite store, versioned through `schema_version`.

use rusqlite::Connection;

use crate::error::{BackendError, StorageError, StorageResult};

/// Version this build reads and writes.
pub const SCHEMA_VERSION: i32 = 1;

/// Creates the tables on first use and checks the version afterwards.
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    match get_schema_version(conn)? {
        0 => {
            create_schema_v1(conn)?;
            set_schema_version(conn, SCHEMA_VERSION)?;
        }
        SCHEMA_VERSION => {}
        other => {
            return Err(migration(format!(
                "Unsupported schema version {} (expected {})",
                other, SCHEMA_VERSION
            )));
        }
    }

    tracing::info!(version = SCHEMA_VERSION, "sqlite schema ready");
    Ok(())
}

/// Get the current schema version, 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| migration(format!("Failed to create schema_version table: {}", e)))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| migration(format!("Failed to clear schema_version: {}", e)))?;

    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| migration(format!("Failed to set schema_version: {}", e)))?;

    Ok(())
}

/// Version 1: inventory and its related tables.
fn create_schema_v1(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS inventories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            sku TEXT,
            description TEXT,
            price REAL NOT NULL DEFAULT 0,
            quantity INTEGER NOT NULL DEFAULT 0,
            status INTEGER NOT NULL DEFAULT 0,
            low_stock_threshold INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS batches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            inventory_id INTEGER NOT NULL REFERENCES inventories(id) ON DELETE CASCADE,
            lot_code TEXT,
            quantity INTEGER NOT NULL DEFAULT 0,
            expires_on TEXT,
            received_on TEXT
        );

        CREATE TABLE IF NOT EXISTS shipments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            inventory_id INTEGER NOT NULL REFERENCES inventories(id) ON DELETE CASCADE,
            status INTEGER NOT NULL DEFAULT 0,
            destination TEXT,
            quantity INTEGER NOT NULL DEFAULT 0,
            shipped_at TEXT
        );

        CREATE TABLE IF NOT EXISTS receipts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            inventory_id INTEGER NOT NULL REFERENCES inventories(id) ON DELETE CASCADE,
            status INTEGER NOT NULL DEFAULT 0,
            source TEXT,
            quantity INTEGER NOT NULL DEFAULT 0,
            received_at TEXT
        );

        CREATE TABLE IF NOT EXISTS change_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            inventory_id INTEGER NOT NULL REFERENCES inventories(id) ON DELETE CASCADE,
            field_name TEXT NOT NULL,
            old_value TEXT,
            new_value TEXT,
            changed_by TEXT,
            changed_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS audit_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            inventory_id INTEGER NOT NULL REFERENCES inventories(id) ON DELETE CASCADE,
            action TEXT NOT NULL,
            actor TEXT,
            performed_at TEXT NOT NULL
        );",
    )
    .map_err(|e| migration(format!("Failed to create inventory tables: {}", e)))
}

fn migration(message: String) -> StorageError {
    StorageError::Backend(BackendError::MigrationError { message })
}
