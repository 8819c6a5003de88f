//! Store abstraction.
//!
//! The engine never talks to a database directly. A [`QueryContext`] is a
//! description of a query; a [`ResultAssembler`] turns that description into
//! records. Implementations must bind every operand as a parameter and may
//! only use column names taken from the context's validated fields.
//!
//! ```ignore
//! use stockroom_search::core::ResultAssembler;
//! use stockroom_search::search::QueryContext;
//!
//! fn first_page<S: ResultAssembler>(store: &S) {
//!     let ctx = QueryContext::new().paginate(1, 10);
//!     let page = ctx.results(store).unwrap();
//!     println!("{} of {} records", page.records.len(), page.total_count);
//! }
//! ```

use crate::error::StorageResult;
use crate::search::QueryContext;
use crate::types::SearchPage;

/// Materializes query contexts against a store.
///
/// Each call executes the context's condition tree once. Calling twice with
/// the same context issues the same query again; counts may differ if the
/// underlying data changed in between.
pub trait ResultAssembler {
    /// Returns a short name for the store, used in logs and errors.
    fn backend_name(&self) -> &'static str;

    /// Returns the requested page and the total number of matching records.
    fn materialize(&self, ctx: &QueryContext) -> StorageResult<SearchPage>;

    /// Returns the number of distinct matching records.
    fn count(&self, ctx: &QueryContext) -> StorageResult<u64>;

    /// Renders the query the store would run, with its bound values.
    fn debug_query(&self, ctx: &QueryContext) -> String;
}
