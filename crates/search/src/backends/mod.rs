//! Stores that can materialize a [`QueryContext`](crate::QueryContext).
//!
//! | Store | Feature | Notes |
//! |-------|---------|-------|
//! | SQLite | `sqlite` | In-memory or file-based; the default |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use stockroom_search::backends::sqlite::SqliteBackend;
//!
//! let scratch = SqliteBackend::in_memory()?;
//! scratch.init_schema()?;
//!
//! let shared = SqliteBackend::open("./data/stockroom.db")?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "sqlite")]
pub mod sqlite;
