//! The search parameter bag.
//!
//! [`SearchParams`] is the flat, all-optional input of a search request. It
//! can be deserialized from JSON (camelCase keys) or built from a map of
//! query-string pairs with [`SearchParams::from_map`]. Nothing in here is
//! trusted: field names inside `orConditions` and `complexCondition` are
//! only strings until the whitelist resolves them.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{StorageResult, ValidationError};
use crate::search::Operator;

use super::{InventoryStatus, ReceiptStatus, ShipmentStatus};

/// Stock-level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StockFilter {
    /// No units on hand.
    OutOfStock,
    /// Some units on hand, at or below the low-stock threshold.
    LowStock,
    /// More units on hand than the low-stock threshold.
    InStock,
}

impl fmt::Display for StockFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockFilter::OutOfStock => write!(f, "outOfStock"),
            StockFilter::LowStock => write!(f, "lowStock"),
            StockFilter::InStock => write!(f, "inStock"),
        }
    }
}

impl FromStr for StockFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "outofstock" => Ok(StockFilter::OutOfStock),
            "lowstock" => Ok(StockFilter::LowStock),
            "instock" => Ok(StockFilter::InStock),
            _ => Err(format!("unknown stock filter: {}", s)),
        }
    }
}

/// A node of a caller-supplied condition tree.
///
/// Every node is exactly one of an `and` group, an `or` group, or a leaf.
/// A JSON object carrying keys of more than one shape matches no variant and
/// is rejected when the parameter bag is parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionSpec {
    /// All children must hold.
    And(AndNode),
    /// At least one child must hold.
    Or(OrNode),
    /// A single field comparison.
    Leaf(LeafCondition),
}

/// `{"and": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AndNode {
    /// Child nodes.
    pub and: Vec<ConditionSpec>,
}

/// `{"or": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrNode {
    /// Child nodes.
    pub or: Vec<ConditionSpec>,
}

/// `{"field": "...", "op": "...", "value": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeafCondition {
    /// Raw, unvalidated field name.
    pub field: String,

    /// Comparison operator; equality when omitted.
    #[serde(default)]
    pub op: Operator,

    /// Raw value. `between` expects a two-element array.
    pub value: JsonValue,
}

impl ConditionSpec {
    /// Creates an `and` node.
    pub fn and(children: Vec<ConditionSpec>) -> Self {
        ConditionSpec::And(AndNode { and: children })
    }

    /// Creates an `or` node.
    pub fn or(children: Vec<ConditionSpec>) -> Self {
        ConditionSpec::Or(OrNode { or: children })
    }

    /// Creates a leaf node.
    pub fn leaf(field: impl Into<String>, op: Operator, value: impl Into<JsonValue>) -> Self {
        ConditionSpec::Leaf(LeafCondition {
            field: field.into(),
            op,
            value: value.into(),
        })
    }
}

/// The parameter bag of a search request. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParams {
    /// Free-text keyword matched against name, SKU and description.
    pub keyword: Option<String>,

    /// Inventory status.
    pub status: Option<InventoryStatus>,

    /// Boolean low-stock flag (`true` = low stock, `false` = above threshold).
    pub low_stock: Option<bool>,

    /// Stock-level filter.
    pub stock_filter: Option<StockFilter>,

    /// Threshold used by the low/in-stock filters.
    pub low_stock_threshold: Option<i64>,

    /// Lower price bound (inclusive).
    pub min_price: Option<f64>,

    /// Upper price bound (inclusive).
    pub max_price: Option<f64>,

    /// Earliest creation date (inclusive).
    pub created_from: Option<NaiveDate>,

    /// Latest creation date (inclusive).
    pub created_to: Option<NaiveDate>,

    /// Batch lot code (contains).
    pub lot_code: Option<String>,

    /// Batch expiry strictly before this date.
    pub expires_before: Option<NaiveDate>,

    /// Batch expiry strictly after this date.
    pub expires_after: Option<NaiveDate>,

    /// Batch expiring between today and today + N days.
    pub expiring_soon_days: Option<u32>,

    /// Change-log entry within the last N days.
    pub recently_updated_days: Option<u32>,

    /// Shipment status.
    pub shipment_status: Option<ShipmentStatus>,

    /// Shipment destination (contains).
    pub destination: Option<String>,

    /// Receipt status.
    pub receipt_status: Option<ReceiptStatus>,

    /// Receipt source (contains).
    pub source: Option<String>,

    /// Change-log field name (exact).
    pub changed_field: Option<String>,

    /// Audit trail action (exact).
    pub audit_action: Option<String>,

    /// Audit trail actor (contains).
    pub audit_actor: Option<String>,

    /// Alternatives; each map is an AND of equalities, the list is ORed.
    pub or_conditions: Vec<BTreeMap<String, JsonValue>>,

    /// Explicitly nested condition tree.
    pub complex_condition: Option<ConditionSpec>,

    /// Sort field.
    pub sort: Option<String>,

    /// Sort direction (`asc` or `desc`).
    pub direction: Option<String>,

    /// One-based page number.
    pub page: Option<u32>,

    /// Page size.
    pub per_page: Option<u32>,
}

impl SearchParams {
    /// Creates an empty parameter bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a parameter bag from JSON text.
    pub fn from_json(text: &str) -> StorageResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds a parameter bag from flat query-string pairs.
    ///
    /// Keys may be camelCase or snake_case. Scalars that fail to parse are
    /// dropped with a warning. `orConditions` and `complexCondition` carry
    /// JSON text; those two fail the whole request when malformed, since a
    /// half-understood condition tree cannot be narrowed safely.
    pub fn from_map(pairs: &HashMap<String, String>) -> StorageResult<Self> {
        let mut params = Self::default();

        for (key, raw) in pairs {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match camel_case(key).as_str() {
                "keyword" => params.keyword = Some(raw.to_string()),
                "status" => params.status = parse_or_warn(key, raw),
                "lowStock" => params.low_stock = parse_or_warn(key, raw),
                "stockFilter" => params.stock_filter = parse_or_warn(key, raw),
                "lowStockThreshold" => params.low_stock_threshold = parse_or_warn(key, raw),
                "minPrice" => params.min_price = parse_or_warn(key, raw),
                "maxPrice" => params.max_price = parse_or_warn(key, raw),
                "createdFrom" => params.created_from = parse_or_warn(key, raw),
                "createdTo" => params.created_to = parse_or_warn(key, raw),
                "lotCode" => params.lot_code = Some(raw.to_string()),
                "expiresBefore" => params.expires_before = parse_or_warn(key, raw),
                "expiresAfter" => params.expires_after = parse_or_warn(key, raw),
                "expiringSoonDays" => params.expiring_soon_days = parse_or_warn(key, raw),
                "recentlyUpdatedDays" => params.recently_updated_days = parse_or_warn(key, raw),
                "shipmentStatus" => params.shipment_status = parse_or_warn(key, raw),
                "destination" => params.destination = Some(raw.to_string()),
                "receiptStatus" => params.receipt_status = parse_or_warn(key, raw),
                "source" => params.source = Some(raw.to_string()),
                "changedField" => params.changed_field = Some(raw.to_string()),
                "auditAction" => params.audit_action = Some(raw.to_string()),
                "auditActor" => params.audit_actor = Some(raw.to_string()),
                "orConditions" => {
                    params.or_conditions = serde_json::from_str(raw).map_err(|e| {
                        ValidationError::InvalidParameters {
                            message: format!("orConditions: {}", e),
                        }
                    })?;
                }
                "complexCondition" => {
                    params.complex_condition = Some(serde_json::from_str(raw).map_err(|e| {
                        ValidationError::InvalidParameters {
                            message: format!("complexCondition: {}", e),
                        }
                    })?);
                }
                "sort" => params.sort = Some(raw.to_string()),
                "direction" => params.direction = Some(raw.to_string()),
                "page" => params.page = parse_or_warn(key, raw),
                "perPage" => params.per_page = parse_or_warn(key, raw),
                _ => tracing::debug!(parameter = %key, "ignoring unrecognized search parameter"),
            }
        }

        Ok(params)
    }

    /// Returns the keyword if it is not blank.
    pub fn keyword(&self) -> Option<&str> {
        non_blank(self.keyword.as_deref())
    }

    /// Returns the lot code if it is not blank.
    pub fn lot_code(&self) -> Option<&str> {
        non_blank(self.lot_code.as_deref())
    }

    /// Returns the shipment destination if it is not blank.
    pub fn destination(&self) -> Option<&str> {
        non_blank(self.destination.as_deref())
    }

    /// Returns the receipt source if it is not blank.
    pub fn source(&self) -> Option<&str> {
        non_blank(self.source.as_deref())
    }

    /// Returns the change-log field name if it is not blank.
    pub fn changed_field(&self) -> Option<&str> {
        non_blank(self.changed_field.as_deref())
    }

    /// Returns the audit action if it is not blank.
    pub fn audit_action(&self) -> Option<&str> {
        non_blank(self.audit_action.as_deref())
    }

    /// Returns the audit actor if it is not blank.
    pub fn audit_actor(&self) -> Option<&str> {
        non_blank(self.audit_actor.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_or_warn<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(parameter = %key, value = %raw, "ignoring unparseable search parameter");
            None
        }
    }
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
