//! SQLite result assembler.
//!
//! Renders a [`QueryContext`](crate::search::QueryContext) into a single
//! parameterized `SELECT` plus a `COUNT(DISTINCT ...)` and runs both on one
//! pooled connection. Supports in-memory databases (tests) and files.
//!
//! # Example
//!
//! ```no_run
//! use stockroom_search::backends::sqlite::SqliteBackend;
//! use stockroom_search::search::QueryContext;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::open("./stockroom.db")?;
//! backend.init_schema()?;
//!
//! let page = QueryContext::new()
//!     .search_keywords("bolt", &["name", "sku"])
//!     .paginate(1, 20)
//!     .results(&backend)?;
//! println!("{} matches", page.total_count);
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE inventories (
//!     id INTEGER PRIMARY KEY,
//!     name TEXT NOT NULL,
//!     sku TEXT,
//!     description TEXT,
//!     price REAL NOT NULL DEFAULT 0,
//!     quantity INTEGER NOT NULL DEFAULT 0,
//!     status INTEGER NOT NULL DEFAULT 0,
//!     low_stock_threshold INTEGER,
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//!
//! -- One-to-many relations, each keyed by inventory_id
//! CREATE TABLE batches (id, inventory_id, lot_code, quantity, expires_on, received_on);
//! CREATE TABLE shipments (id, inventory_id, status, destination, quantity, shipped_at);
//! CREATE TABLE receipts (id, inventory_id, status, source, quantity, received_at);
//! CREATE TABLE change_logs (id, inventory_id, field_name, old_value, new_value, changed_by, changed_at);
//! CREATE TABLE audit_logs (id, inventory_id, action, actor, performed_at);
//! ```
//!
//! Timestamps are stored as `YYYY-MM-DDTHH:MM:SSZ` text and dates as
//! `YYYY-MM-DD`, so text comparison orders them chronologically.

mod backend;
pub mod query_builder;
pub(crate) mod schema;
mod search_impl;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use query_builder::{SqlFragment, SqlParam, SqliteQueryBuilder};
pub use schema::SCHEMA_VERSION;
