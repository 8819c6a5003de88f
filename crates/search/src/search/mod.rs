//! Query composition.
//!
//! - [`whitelist`] - resolves raw field names to [`QualifiedField`]s
//! - [`sanitize`] - escapes text used in pattern matches
//! - [`predicate`] - [`Predicate`] and the [`ConditionGroup`] tree
//! - [`joins`] - the [`JoinSet`] and duplicate suppression
//! - [`relations`] - per-entity condition builders
//! - [`context`] - the fluent [`QueryContext`]
//! - [`dispatcher`] - [`SearchDispatcher`], parameter bag to query

pub mod context;
pub mod dispatcher;
pub mod joins;
pub mod predicate;
pub mod relations;
pub mod sanitize;
pub mod whitelist;

pub use context::{ConditionGroupBuilder, Ordering, QueryContext, SortDirection};
pub use dispatcher::{KEYWORD_FIELDS, SearchConfig, SearchDispatcher};
pub use joins::JoinSet;
pub use predicate::{ConditionGroup, Operator, Predicate, Value};
pub use relations::{
    AuditConditions, BatchConditions, ChangeLogConditions, ReceiptConditions, RelationBuilder,
    RelationBuilderState, ShipmentConditions,
};
pub use sanitize::sanitize_contains_input;
pub use whitelist::{Entity, FieldKind, FieldWhitelist, QualifiedField};
