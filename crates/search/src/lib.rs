//! Stockroom Search
//!
//! A dynamic, safe query-composition engine for advanced inventory search.
//! Callers compose arbitrary AND/OR filter trees across inventory and its
//! related entities (stock batches, shipments, receipts, change logs, audit
//! trail) and get back a page of inventory records.
//!
//! # Guarantees
//!
//! - **Whitelisted fields**: no caller-supplied field name reaches the store
//!   without passing the [`FieldWhitelist`](search::FieldWhitelist).
//! - **Literal text matching**: every contains/starts-with value is escaped.
//! - **Idempotent joins**: each related entity is joined at most once, and
//!   duplicate rows are suppressed exactly once.
//! - **Deferred execution**: building a query has no side effects; only
//!   materialization touches the store.
//! - **Fail-open filtering**: a rejected field, operator or value is logged
//!   and dropped, so a result can be too broad but never too narrow.
//!
//! # Architecture
//!
//! - [`types`] - parameter bag, statuses, pagination and records
//! - [`search`] - whitelist, predicates, joins, relation builders, the
//!   fluent [`QueryContext`] and the [`SearchDispatcher`]
//! - [`core`] - the [`ResultAssembler`] trait stores implement
//! - [`backends`] - store implementations (SQLite)
//! - [`error`] - error types
//!
//! # Quick Start
//!
//! ```
//! use stockroom_search::search::{QueryContext, SortDirection};
//!
//! let ctx = QueryContext::new()
//!     .search_keywords("bolt", &["name", "sku"])
//!     .in_range("price", Some(10.0), Some(30.0))
//!     .with_batch_conditions(|b| {
//!         b.lot_code("L-7");
//!     })
//!     .order_by("price", SortDirection::Ascending)
//!     .paginate(1, 20);
//!
//! // Nothing has run yet; the query can be inspected.
//! assert!(ctx.joins().is_distinct());
//! println!("{}", ctx.to_debug_query_string());
//! ```
//!
//! # Dispatching a parameter bag
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use stockroom_search::backends::sqlite::SqliteBackend;
//! use stockroom_search::types::SearchParams;
//! use stockroom_search::{SearchConfig, SearchDispatcher};
//!
//! let backend = SqliteBackend::open("./stockroom.db")?;
//! backend.init_schema()?;
//!
//! let params = SearchParams::from_json(r#"{"stockFilter": "outOfStock"}"#)?;
//! let page = SearchDispatcher::new(SearchConfig::default()).dispatch(&params, &backend)?;
//! println!("{} of {}", page.records.len(), page.total_count);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;
pub mod search;
pub mod types;

// Re-export commonly used types at crate root
pub use core::ResultAssembler;
pub use error::{StorageError, StorageResult};
pub use search::{QueryContext, SearchConfig, SearchDispatcher};
pub use types::{InventoryRecord, Pagination, SearchPage, SearchParams};
