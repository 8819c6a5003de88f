//! Turns a parameter bag into a query and runs it.
//!
//! Requests that only use `keyword`, `status` and the boolean `lowStock`
//! flag take the simple path: a single-table query with no joins. Anything
//! else (ranges, relation filters, OR alternatives, condition trees, stock
//! filters that need a threshold) takes the advanced path, which chains the
//! full set of [`QueryContext`] operations. Both paths end with the same
//! ordering and pagination step.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::core::ResultAssembler;
use crate::error::StorageResult;
use crate::types::{DEFAULT_PER_PAGE, MAX_PER_PAGE, SearchPage, SearchParams, StockFilter};

use super::context::{QueryContext, SortDirection};
use super::predicate::{ConditionGroup, Operator};
use super::whitelist::FieldWhitelist;

/// Fields matched by the `keyword` parameter.
pub const KEYWORD_FIELDS: [&str; 3] = ["name", "sku", "description"];

/// Default low-stock threshold.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Page size used when the request does not give one.
    #[serde(default = "default_per_page")]
    pub default_per_page: u32,

    /// Largest page size a request may ask for.
    #[serde(default = "default_max_per_page")]
    pub max_per_page: u32,

    /// Threshold used when the request does not give one.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn default_max_per_page() -> u32 {
    MAX_PER_PAGE
}

fn default_low_stock_threshold() -> i64 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

impl SearchConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.default_per_page == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }

        if self.max_per_page == 0 {
            errors.push("Max page size cannot be 0".to_string());
        }

        if self.default_per_page > self.max_per_page {
            errors.push("Default page size cannot exceed max page size".to_string());
        }

        if self.low_stock_threshold < 0 {
            errors.push("Low stock threshold cannot be negative".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Builds and runs inventory searches from parameter bags.
#[derive(Debug, Clone, Default)]
pub struct SearchDispatcher {
    config: SearchConfig,
}

impl SearchDispatcher {
    /// Creates a dispatcher.
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    /// Returns true if `params` needs more than a single-table query.
    pub fn requires_advanced_path(&self, params: &SearchParams) -> bool {
        params.min_price.is_some()
            || params.max_price.is_some()
            || params.created_from.is_some()
            || params.created_to.is_some()
            || params.lot_code().is_some()
            || params.expires_before.is_some()
            || params.expires_after.is_some()
            || params.expiring_soon_days.is_some()
            || params.recently_updated_days.is_some()
            || params.shipment_status.is_some()
            || params.destination().is_some()
            || params.receipt_status.is_some()
            || params.source().is_some()
            || params.changed_field().is_some()
            || params.audit_action().is_some()
            || params.audit_actor().is_some()
            || !params.or_conditions.is_empty()
            || params.complex_condition.is_some()
            || params.low_stock_threshold.is_some()
            || matches!(
                params.stock_filter,
                Some(StockFilter::OutOfStock | StockFilter::InStock)
            )
    }

    /// Builds the query for `params`. `now` anchors the relative date filters.
    pub fn build_context(&self, params: &SearchParams, now: DateTime<Utc>) -> QueryContext {
        let ctx = QueryContext::new().with_max_per_page(self.config.max_per_page);

        let ctx = if self.requires_advanced_path(params) {
            tracing::debug!("dispatching search on the advanced path");
            self.advanced(ctx, params, now)
        } else {
            tracing::debug!("dispatching search on the simple path");
            self.simple(ctx, params)
        };

        self.finish(ctx, params)
    }

    /// Builds the query for `params` and materializes it against `store`.
    pub fn dispatch<S: ResultAssembler + ?Sized>(
        &self,
        params: &SearchParams,
        store: &S,
    ) -> StorageResult<SearchPage> {
        let ctx = self.build_context(params, Utc::now());
        tracing::debug!(backend = store.backend_name(), "dispatching inventory search");
        ctx.results(store)
    }

    fn threshold(&self, params: &SearchParams) -> i64 {
        params
            .low_stock_threshold
            .unwrap_or(self.config.low_stock_threshold)
    }

    fn simple(&self, ctx: QueryContext, params: &SearchParams) -> QueryContext {
        let mut ctx = self.base_filters(ctx, params);
        if params.stock_filter == Some(StockFilter::LowStock) && params.low_stock != Some(true) {
            ctx = stock_filter(ctx, StockFilter::LowStock, self.threshold(params));
        }
        ctx
    }

    fn advanced(&self, ctx: QueryContext, params: &SearchParams, now: DateTime<Utc>) -> QueryContext {
        let today = now.date_naive();
        let threshold = self.threshold(params);

        let mut ctx = self.base_filters(ctx, params);
        if let Some(filter) = params.stock_filter {
            ctx = stock_filter(ctx, filter, threshold);
        }

        ctx = ctx
            .in_range("price", params.min_price, params.max_price)
            .between_dates("created_at", params.created_from, params.created_to)
            .with_batch_conditions(|b| {
                if let Some(lot) = params.lot_code() {
                    b.lot_code(lot);
                }
                if let Some(date) = params.expires_before {
                    b.expires_before(date);
                }
                if let Some(date) = params.expires_after {
                    b.expires_after(date);
                }
                if let Some(days) = params.expiring_soon_days {
                    b.expiring_within(days, today);
                }
            })
            .with_shipment_conditions(|s| {
                if let Some(status) = params.shipment_status {
                    s.status(status);
                }
                if let Some(destination) = params.destination() {
                    s.destination(destination);
                }
            })
            .with_receipt_conditions(|r| {
                if let Some(status) = params.receipt_status {
                    r.status(status);
                }
                if let Some(source) = params.source() {
                    r.source(source);
                }
            })
            .with_change_log_conditions(|c| {
                if let Some(days) = params.recently_updated_days {
                    c.changed_after(now - Duration::days(i64::from(days)));
                }
                if let Some(field) = params.changed_field() {
                    c.field_name(field);
                }
            })
            .with_audit_conditions(|a| {
                if let Some(action) = params.audit_action() {
                    a.action(action);
                }
                if let Some(actor) = params.audit_actor() {
                    a.actor(actor);
                }
            });

        if !params.or_conditions.is_empty() {
            let whitelist = ctx.whitelist();
            let alternatives: Vec<ConditionGroup> = params
                .or_conditions
                .iter()
                .map(|conditions| equality_group(whitelist, conditions))
                .collect();
            ctx = ctx.where_any(alternatives);
        }

        if let Some(spec) = &params.complex_condition {
            ctx = ctx.where_spec(spec);
        }

        ctx
    }

    fn base_filters(&self, mut ctx: QueryContext, params: &SearchParams) -> QueryContext {
        if let Some(keyword) = params.keyword() {
            ctx = ctx.search_keywords(keyword, &KEYWORD_FIELDS);
        }
        if let Some(status) = params.status {
            ctx = ctx.complex_where(|g| {
                g.condition("status", Operator::Eq, &JsonValue::from(status.code()));
            });
        }
        match params.low_stock {
            Some(true) => stock_filter(ctx, StockFilter::LowStock, self.threshold(params)),
            Some(false) => stock_filter(ctx, StockFilter::InStock, self.threshold(params)),
            None => ctx,
        }
    }

    fn finish(&self, mut ctx: QueryContext, params: &SearchParams) -> QueryContext {
        if let Some(sort) = params.sort.as_deref() {
            let direction = match params.direction.as_deref() {
                None => SortDirection::Ascending,
                Some(raw) => SortDirection::parse(raw).unwrap_or_else(|| {
                    tracing::warn!(direction = %raw, "ignoring unknown sort direction");
                    SortDirection::Ascending
                }),
            };
            ctx = ctx.order_by(sort, direction);
        }

        ctx.paginate(
            params.page.unwrap_or(1),
            params.per_page.unwrap_or(self.config.default_per_page),
        )
    }
}

fn stock_filter(ctx: QueryContext, filter: StockFilter, threshold: i64) -> QueryContext {
    let threshold = threshold as f64;
    match filter {
        StockFilter::OutOfStock => ctx.in_range("quantity", None, Some(0.0)),
        StockFilter::LowStock => ctx.in_range("quantity", Some(1.0), Some(threshold)),
        StockFilter::InStock => ctx.in_range("quantity", Some(threshold + 1.0), None),
    }
}

/// ANDs one equality per entry. Entries the whitelist rejects are dropped,
/// so a map with no usable entry restricts nothing.
fn equality_group(
    whitelist: &FieldWhitelist,
    conditions: &BTreeMap<String, JsonValue>,
) -> ConditionGroup {
    ConditionGroup::And(
        conditions
            .iter()
            .filter_map(|(field, value)| whitelist.predicate(field, Operator::Eq, value))
            .map(ConditionGroup::from)
            .collect(),
    )
}
