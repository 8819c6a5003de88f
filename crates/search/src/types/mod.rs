//! Core types for the search engine.
//!
//! - [`SearchParams`] - the flat parameter bag of a search request
//! - [`ConditionSpec`] - a caller-supplied AND/OR condition tree
//! - [`InventoryStatus`], [`ShipmentStatus`], [`ReceiptStatus`] - typed statuses
//! - [`Pagination`], [`SearchPage`] - pagination intent and materialized pages
//! - [`InventoryRecord`] - a materialized inventory row
//!
//! # Example
//!
//! ```
//! use stockroom_search::types::{SearchParams, StockFilter};
//!
//! let params = SearchParams::from_json(r#"{"stockFilter": "outOfStock", "page": 2}"#).unwrap();
//! assert_eq!(params.stock_filter, Some(StockFilter::OutOfStock));
//! assert_eq!(params.page, Some(2));
//! ```

mod pagination;
mod record;
mod search_params;
mod status;

pub use pagination::{DEFAULT_PER_PAGE, MAX_PER_PAGE, Pagination, SearchPage};
pub use record::InventoryRecord;
pub use search_params::{
    AndNode, ConditionSpec, LeafCondition, OrNode, SearchParams, StockFilter,
};
pub use status::{InventoryStatus, ReceiptStatus, ShipmentStatus};
