//! The fluent query context.
//!
//! [`QueryContext`] accumulates a condition tree, joins, ordering and
//! pagination. Building it never touches a store; only
//! [`QueryContext::results`], [`QueryContext::count`] and
//! [`QueryContext::to_debug_query_string`] look at what was built.
//!
//! Every method takes and returns the context by value, so calls chain:
//!
//! ```
//! use stockroom_search::search::{FieldWhitelist, Predicate, QueryContext, SortDirection};
//!
//! let quantity = FieldWhitelist::standard().validate("quantity").unwrap();
//! let ctx = QueryContext::new()
//!     .and_where(Predicate::eq(quantity, 0_i64))
//!     .search_keywords("bolt", &["name", "sku"])
//!     .in_range("price", Some(10.0), None)
//!     .order_by("price", SortDirection::Ascending)
//!     .paginate(2, 20);
//!
//! assert_eq!(ctx.conditions().len(), 3);
//! assert_eq!(ctx.pagination().offset(), 20);
//! ```
//!
//! Field names given as strings are resolved through the context's
//! [`FieldWhitelist`]. Names it does not know are logged and skipped, so the
//! query is the same as if the argument had not been passed.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value as JsonValue;

use crate::core::ResultAssembler;
use crate::error::StorageResult;
use crate::types::{ConditionSpec, MAX_PER_PAGE, Pagination, SearchPage};

use super::joins::JoinSet;
use super::predicate::{ConditionGroup, Operator, Predicate, Value};
use super::relations::{
    AuditConditions, BatchConditions, ChangeLogConditions, ReceiptConditions, RelationBuilder,
    RelationBuilderState, ShipmentConditions,
};
use super::whitelist::{Entity, FieldKind, FieldWhitelist, QualifiedField};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl SortDirection {
    /// Parses `asc`/`desc` (and the long forms), ignoring case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Ascending),
            "desc" | "descending" => Some(SortDirection::Descending),
            _ => None,
        }
    }

    /// Returns `ASC` or `DESC`.
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One validated sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    field: QualifiedField,
    direction: SortDirection,
}

impl Ordering {
    /// The sort field.
    pub fn field(&self) -> QualifiedField {
        self.field
    }

    /// The sort direction.
    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

/// A composable, deferred inventory query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryContext {
    whitelist: &'static FieldWhitelist,
    conditions: Vec<ConditionGroup>,
    joins: JoinSet,
    orderings: Vec<Ordering>,
    pagination: Pagination,
    max_per_page: u32,
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryContext {
    /// Creates an unrestricted context over inventory using the standard whitelist.
    pub fn new() -> Self {
        Self {
            whitelist: FieldWhitelist::standard(),
            conditions: Vec::new(),
            joins: JoinSet::new(),
            orderings: Vec::new(),
            pagination: Pagination::default(),
            max_per_page: MAX_PER_PAGE,
        }
    }

    /// Sets the upper bound applied by [`paginate`](Self::paginate).
    pub fn with_max_per_page(mut self, max_per_page: u32) -> Self {
        self.max_per_page = max_per_page.max(1);
        self.pagination = Pagination::new(
            self.pagination.page,
            self.pagination.per_page,
            self.max_per_page,
        );
        self
    }

    // ------------------------------------------------------------------
    // Composition
    // ------------------------------------------------------------------

    /// ANDs a predicate into the root.
    pub fn and_where(self, predicate: Predicate) -> Self {
        self.push_group(ConditionGroup::Predicate(predicate))
    }

    /// Unions the query built so far with the records matching `predicate`.
    ///
    /// When nothing has been accumulated yet the query already matches every
    /// record, so this is a no-op. A `predicate` whose operand does not fit
    /// its field is unrestricted, which widens the query to every record.
    pub fn or_where(mut self, predicate: Predicate) -> Self {
        if self.conditions.is_empty() {
            tracing::debug!(predicate = %predicate, "or_where on an unrestricted query has no effect");
            return self;
        }
        let previous = std::mem::take(&mut self.conditions);
        let accumulated = match <[ConditionGroup; 1]>::try_from(previous) {
            Ok([only]) => only,
            Err(previous) => ConditionGroup::And(previous),
        };
        self.push_group(ConditionGroup::Or(vec![accumulated, predicate.into()]))
    }

    /// ORs the given groups together and ANDs the result into the root.
    ///
    /// An empty list, or a list containing a group that restricts nothing,
    /// leaves the query unchanged.
    pub fn where_any<I, G>(self, groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<ConditionGroup>,
    {
        let groups = groups.into_iter().map(Into::into).collect();
        self.push_group(ConditionGroup::Or(groups))
    }

    /// ANDs each group into the root, one after another.
    pub fn where_all<I, G>(self, groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<ConditionGroup>,
    {
        groups
            .into_iter()
            .fold(self, |ctx, group| ctx.push_group(group.into()))
    }

    /// Builds an explicitly nested condition tree and ANDs it into the root.
    ///
    /// The builder handed to `block` is itself an AND group. Mixed logic must
    /// be spelled out with [`ConditionGroupBuilder::and_group`] and
    /// [`ConditionGroupBuilder::or_group`]; there is no implicit precedence.
    pub fn complex_where(self, block: impl FnOnce(&mut ConditionGroupBuilder)) -> Self {
        let mut builder = ConditionGroupBuilder::new(Combinator::And, self.whitelist);
        block(&mut builder);
        let group = builder.build();
        self.push_group(group)
    }

    /// ANDs a parsed condition tree into the root.
    pub fn where_spec(self, spec: &ConditionSpec) -> Self {
        self.complex_where(|g| {
            g.spec(spec);
        })
    }

    /// Matches records where any of `fields` contains `keyword`.
    ///
    /// A blank keyword or an empty field list is a no-op. Unknown and
    /// non-text fields are skipped.
    pub fn search_keywords<S: AsRef<str>>(self, keyword: &str, fields: &[S]) -> Self {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return self;
        }
        let whitelist = self.whitelist;
        let predicates: Vec<ConditionGroup> = fields
            .iter()
            .filter_map(|raw| {
                let raw = raw.as_ref();
                let Some(field) = whitelist.validate(raw) else {
                    tracing::warn!(field = %raw, "ignoring unknown keyword search field");
                    return None;
                };
                if !field.kind().is_text() {
                    tracing::warn!(field = %field, "ignoring non-text keyword search field");
                    return None;
                }
                Some(Predicate::contains(field, keyword).into())
            })
            .collect();
        self.where_any(predicates)
    }

    /// Restricts a date or timestamp field to `from..=to`.
    ///
    /// Either bound may be absent; both absent is a no-op. On timestamp
    /// fields the bounds cover whole days.
    pub fn between_dates(self, field: &str, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        if from.is_none() && to.is_none() {
            return self;
        }
        let Some(field) = self.whitelist.validate(field) else {
            tracing::warn!(field = %field, "ignoring date range on unknown field");
            return self;
        };
        let (low, high) = match field.kind() {
            FieldKind::Date => (from.map(Value::Date), to.map(Value::Date)),
            FieldKind::Timestamp => (
                from.map(|d| Value::Timestamp(d.and_time(NaiveTime::MIN).and_utc())),
                to.and_then(|d| d.and_hms_opt(23, 59, 59))
                    .map(|dt| Value::Timestamp(dt.and_utc())),
            ),
            _ => {
                tracing::warn!(field = %field, "ignoring date range on non-date field");
                return self;
            }
        };
        self.range(field, low, high)
    }

    /// Restricts a numeric field to `min..=max`.
    ///
    /// Either bound may be absent; both absent is a no-op.
    pub fn in_range(self, field: &str, min: Option<f64>, max: Option<f64>) -> Self {
        let min = min.filter(|v| v.is_finite());
        let max = max.filter(|v| v.is_finite());
        if min.is_none() && max.is_none() {
            return self;
        }
        let Some(field) = self.whitelist.validate(field) else {
            tracing::warn!(field = %field, "ignoring range on unknown field");
            return self;
        };
        let (low, high) = match field.kind() {
            FieldKind::Integer => (
                min.map(|v| Value::Integer(v.ceil() as i64)),
                max.map(|v| Value::Integer(v.floor() as i64)),
            ),
            FieldKind::Real => (min.map(Value::Real), max.map(Value::Real)),
            _ => {
                tracing::warn!(field = %field, "ignoring numeric range on non-numeric field");
                return self;
            }
        };
        self.range(field, low, high)
    }

    fn range(self, field: QualifiedField, low: Option<Value>, high: Option<Value>) -> Self {
        let predicate = match (low, high) {
            (Some(low), Some(high)) => Predicate::between(field, low, high),
            (Some(low), None) => Predicate::gte(field, low),
            (None, Some(high)) => Predicate::lte(field, high),
            (None, None) => return self,
        };
        self.and_where(predicate)
    }

    // ------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------

    /// Runs a relation builder block and ANDs its predicates into the root.
    ///
    /// The related entity is joined once. A block that adds nothing leaves
    /// the query unchanged and does not join.
    pub fn with_relation<B: RelationBuilder>(self, block: impl FnOnce(&mut B)) -> Self {
        let mut builder = B::from_state(RelationBuilderState::new(B::ENTITY, self.whitelist));
        block(&mut builder);
        let predicates = builder.into_state().into_predicates();
        self.push_group(ConditionGroup::And(
            predicates.into_iter().map(Into::into).collect(),
        ))
    }

    /// Filters on stock batches.
    pub fn with_batch_conditions(self, block: impl FnOnce(&mut BatchConditions)) -> Self {
        self.with_relation(block)
    }

    /// Filters on shipments.
    pub fn with_shipment_conditions(self, block: impl FnOnce(&mut ShipmentConditions)) -> Self {
        self.with_relation(block)
    }

    /// Filters on receipts.
    pub fn with_receipt_conditions(self, block: impl FnOnce(&mut ReceiptConditions)) -> Self {
        self.with_relation(block)
    }

    /// Filters on change-log entries.
    pub fn with_change_log_conditions(self, block: impl FnOnce(&mut ChangeLogConditions)) -> Self {
        self.with_relation(block)
    }

    /// Filters on audit trail entries.
    pub fn with_audit_conditions(self, block: impl FnOnce(&mut AuditConditions)) -> Self {
        self.with_relation(block)
    }

    /// Turns on duplicate suppression. Safe to call repeatedly.
    pub fn distinct(mut self) -> Self {
        self.joins.apply_distinct();
        self
    }

    // ------------------------------------------------------------------
    // Ordering and pagination
    // ------------------------------------------------------------------

    /// Adds a sort key. Unknown and non-inventory fields are skipped.
    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        let Some(qualified) = self.whitelist.validate(field) else {
            tracing::warn!(field = %field, "ignoring sort on unknown field");
            return self;
        };
        if qualified.entity() != Entity::Inventory {
            tracing::warn!(field = %qualified, "ignoring sort on related field");
            return self;
        }
        if self.orderings.iter().any(|o| o.field == qualified) {
            return self;
        }
        self.orderings.push(Ordering {
            field: qualified,
            direction,
        });
        self
    }

    /// Adds several sort keys in order.
    pub fn order_by_multiple<I, S>(self, orderings: I) -> Self
    where
        I: IntoIterator<Item = (S, SortDirection)>,
        S: AsRef<str>,
    {
        orderings
            .into_iter()
            .fold(self, |ctx, (field, direction)| ctx.order_by(field.as_ref(), direction))
    }

    /// Records which page to return. Values are clamped, nothing is executed.
    pub fn paginate(mut self, page: u32, per_page: u32) -> Self {
        self.pagination = Pagination::new(page, per_page, self.max_per_page);
        self
    }

    /// Normalizes `group` and ANDs it into the root, joining what it needs.
    fn push_group(mut self, group: ConditionGroup) -> Self {
        let group = group.normalize();
        if group.is_always_true() {
            tracing::debug!("condition restricts nothing; leaving query unchanged");
            return self;
        }
        for entity in group.entities() {
            self.joins.ensure_joined(entity);
        }
        self.conditions.push(group);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The whitelist field names are resolved against.
    pub fn whitelist(&self) -> &'static FieldWhitelist {
        self.whitelist
    }

    /// Root conditions; they are ANDed together.
    pub fn conditions(&self) -> &[ConditionGroup] {
        &self.conditions
    }

    /// The joins and duplicate suppression state.
    pub fn joins(&self) -> &JoinSet {
        &self.joins
    }

    /// Sort keys added by the caller.
    pub fn orderings(&self) -> &[Ordering] {
        &self.orderings
    }

    /// Sort keys to apply: the caller's keys, or most recently updated first,
    /// always followed by `id` ascending as a tie-breaker.
    pub fn effective_orderings(&self) -> Vec<Ordering> {
        let mut out = self.orderings.clone();
        if out.is_empty() {
            if let Some(field) = self.whitelist.validate("inventory.updated_at") {
                out.push(Ordering {
                    field,
                    direction: SortDirection::Descending,
                });
            }
        }
        if let Some(id) = self.whitelist.validate("inventory.id") {
            if !out.iter().any(|o| o.field == id) {
                out.push(Ordering {
                    field: id,
                    direction: SortDirection::Ascending,
                });
            }
        }
        out
    }

    /// The pagination intent.
    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    // ------------------------------------------------------------------
    // Materialization
    // ------------------------------------------------------------------

    /// Runs the query and returns the requested page.
    pub fn results<S: ResultAssembler + ?Sized>(&self, store: &S) -> StorageResult<SearchPage> {
        store.materialize(self)
    }

    /// Counts the distinct matching records.
    pub fn count<S: ResultAssembler + ?Sized>(&self, store: &S) -> StorageResult<u64> {
        store.count(self)
    }

    /// Renders the query in a backend-neutral form for diagnostics.
    pub fn to_debug_query_string(&self) -> String {
        let mut out = String::from("SELECT ");
        if self.joins.is_distinct() {
            out.push_str("DISTINCT ");
        }
        out.push_str("inventory.* FROM inventory");
        for entity in self.joins.entities() {
            out.push_str(&format!(
                " LEFT JOIN {0} ON {0}.inventory_id = inventory.id",
                entity
            ));
        }
        if !self.conditions.is_empty() {
            out.push_str(&format!(
                " WHERE {}",
                ConditionGroup::And(self.conditions.clone())
            ));
        }
        let orderings: Vec<String> = self
            .effective_orderings()
            .iter()
            .map(|o| format!("{} {}", o.field, o.direction))
            .collect();
        if !orderings.is_empty() {
            out.push_str(&format!(" ORDER BY {}", orderings.join(", ")));
        }
        out.push_str(&format!(
            " LIMIT {} OFFSET {}",
            self.pagination.limit(),
            self.pagination.offset()
        ));
        out
    }
}

#[derive(Debug, Clone, Copy)]
enum Combinator {
    And,
    Or,
}

/// Builds one level of an explicitly nested condition tree.
///
/// Each builder has exactly one combinator, fixed when the group is opened.
/// Children added with [`predicate`](Self::predicate) or
/// [`condition`](Self::condition) are combined with it; a different
/// combinator needs a nested [`and_group`](Self::and_group) or
/// [`or_group`](Self::or_group).
///
/// Rejected fields restrict nothing. In an AND group they are dropped; an OR
/// group with such an alternative, or with no alternatives at all, matches
/// everything.
#[derive(Debug)]
pub struct ConditionGroupBuilder {
    combinator: Combinator,
    whitelist: &'static FieldWhitelist,
    children: Vec<ConditionGroup>,
}

impl ConditionGroupBuilder {
    fn new(combinator: Combinator, whitelist: &'static FieldWhitelist) -> Self {
        Self {
            combinator,
            whitelist,
            children: Vec::new(),
        }
    }

    /// Adds a validated predicate.
    pub fn predicate(&mut self, predicate: Predicate) -> &mut Self {
        self.children.push(predicate.into());
        self
    }

    /// Adds a comparison from untrusted input.
    pub fn condition(&mut self, field: &str, op: Operator, value: &JsonValue) -> &mut Self {
        let child = match self.whitelist.predicate(field, op, value) {
            Some(p) => p.into(),
            None => ConditionGroup::And(Vec::new()),
        };
        self.children.push(child);
        self
    }

    /// Adds a nested AND group.
    pub fn and_group(&mut self, block: impl FnOnce(&mut ConditionGroupBuilder)) -> &mut Self {
        self.nested(Combinator::And, block)
    }

    /// Adds a nested OR group.
    pub fn or_group(&mut self, block: impl FnOnce(&mut ConditionGroupBuilder)) -> &mut Self {
        self.nested(Combinator::Or, block)
    }

    /// Adds a parsed condition tree.
    pub fn spec(&mut self, spec: &ConditionSpec) -> &mut Self {
        match spec {
            ConditionSpec::Leaf(leaf) => self.condition(&leaf.field, leaf.op, &leaf.value),
            ConditionSpec::And(node) => self.and_group(|g| {
                for child in &node.and {
                    g.spec(child);
                }
            }),
            ConditionSpec::Or(node) => self.or_group(|g| {
                for child in &node.or {
                    g.spec(child);
                }
            }),
        }
    }

    fn nested(
        &mut self,
        combinator: Combinator,
        block: impl FnOnce(&mut ConditionGroupBuilder),
    ) -> &mut Self {
        let mut child = ConditionGroupBuilder::new(combinator, self.whitelist);
        block(&mut child);
        self.children.push(child.build());
        self
    }

    /// The raw tree; [`QueryContext`] normalizes it when it is added.
    fn build(self) -> ConditionGroup {
        match self.combinator {
            Combinator::And => ConditionGroup::And(self.children),
            Combinator::Or => ConditionGroup::Or(self.children),
        }
    }
}
