//! Field whitelist.
//!
//! Every field reference that reaches the store passes through
//! [`FieldWhitelist::validate`]. The only way to obtain a [`QualifiedField`]
//! is from this module's static table, and a [`Predicate`] can only be built
//! from a [`QualifiedField`], so no caller-supplied string is ever used as a
//! column name.
//!
//! Names are written `entity.field` (`batches.lot_code`). A short-alias table
//! maps bare names to their qualified form (`price` → `inventory.price`).
//! Anything not in either table is rejected with `None`; rejection is not an
//! error, the caller logs a warning and skips that one field.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::Value as JsonValue;

use crate::types::{InventoryStatus, ReceiptStatus, ShipmentStatus};

use super::predicate::{Operator, Predicate, Value};

/// An entity that can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    /// The base entity every search returns.
    Inventory,
    /// Stock batches (lots) of an inventory item.
    Batches,
    /// Outbound shipments.
    Shipments,
    /// Inbound receipts.
    Receipts,
    /// Field-level change history.
    ChangeLogs,
    /// Audit trail entries.
    AuditLogs,
}

impl Entity {
    /// Every entity, base first.
    pub const ALL: [Entity; 6] = [
        Entity::Inventory,
        Entity::Batches,
        Entity::Shipments,
        Entity::Receipts,
        Entity::ChangeLogs,
        Entity::AuditLogs,
    ];

    /// Returns the name used in qualified field references.
    pub fn name(self) -> &'static str {
        match self {
            Entity::Inventory => "inventory",
            Entity::Batches => "batches",
            Entity::Shipments => "shipments",
            Entity::Receipts => "receipts",
            Entity::ChangeLogs => "change_logs",
            Entity::AuditLogs => "audit_logs",
        }
    }

    /// Returns the storage table name.
    pub fn table(self) -> &'static str {
        match self {
            Entity::Inventory => "inventories",
            Entity::Batches => "batches",
            Entity::Shipments => "shipments",
            Entity::Receipts => "receipts",
            Entity::ChangeLogs => "change_logs",
            Entity::AuditLogs => "audit_logs",
        }
    }

    /// Returns the column linking a related entity back to inventory.
    ///
    /// `None` for the base entity itself.
    pub fn foreign_key(self) -> Option<&'static str> {
        match self {
            Entity::Inventory => None,
            _ => Some("inventory_id"),
        }
    }

    /// Parses an entity name, accepting the table name as well.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.name() == name || e.table() == name)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The storage type of a whitelisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Whole number.
    Integer,
    /// Floating point number.
    Real,
    /// Free text.
    Text,
    /// Calendar date (`YYYY-MM-DD`).
    Date,
    /// UTC timestamp.
    Timestamp,
    /// [`InventoryStatus`] stored as its code.
    InventoryStatus,
    /// [`ShipmentStatus`] stored as its code.
    ShipmentStatus,
    /// [`ReceiptStatus`] stored as its code.
    ReceiptStatus,
}

impl FieldKind {
    /// Returns true for free-text fields.
    pub fn is_text(self) -> bool {
        matches!(self, FieldKind::Text)
    }

    /// Converts an already typed value to this kind's storage type.
    ///
    /// Accepts what [`coerce`](Self::coerce) accepts, so a status may be given
    /// by name or code and an integer widens to a real.
    pub fn conform(self, value: &Value) -> Option<Value> {
        let raw = match value {
            Value::Integer(v) => JsonValue::from(*v),
            Value::Real(v) => serde_json::Number::from_f64(*v).map(JsonValue::Number)?,
            Value::Text(v) => JsonValue::String(v.clone()),
            Value::Date(v) => JsonValue::String(v.format("%Y-%m-%d").to_string()),
            Value::Timestamp(v) => JsonValue::String(v.to_rfc3339()),
        };
        self.coerce(&raw)
    }

    /// Coerces an untrusted JSON value into a typed value for this kind.
    ///
    /// Returns `None` when the value does not make sense for the field.
    pub fn coerce(self, raw: &JsonValue) -> Option<Value> {
        match self {
            FieldKind::Integer => match raw {
                JsonValue::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                    .map(Value::Integer),
                JsonValue::String(s) => s.trim().parse().ok().map(Value::Integer),
                _ => None,
            },
            FieldKind::Real => match raw {
                JsonValue::Number(n) => n.as_f64().map(Value::Real),
                JsonValue::String(s) => s.trim().parse().ok().map(Value::Real),
                _ => None,
            },
            FieldKind::Text => match raw {
                JsonValue::String(s) => Some(Value::Text(s.clone())),
                JsonValue::Number(n) => Some(Value::Text(n.to_string())),
                _ => None,
            },
            FieldKind::Date => raw
                .as_str()
                .and_then(|s| s.trim().parse::<NaiveDate>().ok())
                .map(Value::Date),
            FieldKind::Timestamp => raw.as_str().and_then(parse_timestamp).map(Value::Timestamp),
            FieldKind::InventoryStatus => match raw {
                JsonValue::String(s) => s
                    .parse::<InventoryStatus>()
                    .ok()
                    .map(|st| Value::Integer(st.code())),
                JsonValue::Number(n) => n
                    .as_i64()
                    .and_then(InventoryStatus::from_code)
                    .map(|st| Value::Integer(st.code())),
                _ => None,
            },
            FieldKind::ShipmentStatus => match raw {
                JsonValue::String(s) => s
                    .parse::<ShipmentStatus>()
                    .ok()
                    .map(|st| Value::Integer(st.code())),
                JsonValue::Number(n) => n
                    .as_i64()
                    .and_then(ShipmentStatus::from_code)
                    .map(|st| Value::Integer(st.code())),
                _ => None,
            },
            FieldKind::ReceiptStatus => match raw {
                JsonValue::String(s) => s
                    .parse::<ReceiptStatus>()
                    .ok()
                    .map(|st| Value::Integer(st.code())),
                JsonValue::Number(n) => n
                    .as_i64()
                    .and_then(ReceiptStatus::from_code)
                    .map(|st| Value::Integer(st.code())),
                _ => None,
            },
        }
    }
}

/// Parses an RFC 3339 timestamp, or a bare date as midnight UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    raw.parse::<NaiveDate>()
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// A field reference that has passed whitelist validation.
///
/// Only constructible inside this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QualifiedField {
    entity: Entity,
    column: &'static str,
    kind: FieldKind,
}

impl QualifiedField {
    const fn new(entity: Entity, column: &'static str, kind: FieldKind) -> Self {
        Self {
            entity,
            column,
            kind,
        }
    }

    /// The entity owning the field.
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// The storage column name.
    pub fn column(&self) -> &'static str {
        self.column
    }

    /// The storage type.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Returns `table.column`, safe to embed in SQL.
    pub fn sql_column(&self) -> String {
        format!("{}.{}", self.entity.table(), self.column)
    }
}

impl fmt::Display for QualifiedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity.name(), self.column)
    }
}

use Entity as E;
use FieldKind as K;

static STANDARD_FIELDS: &[QualifiedField] = &[
    QualifiedField::new(E::Inventory, "id", K::Integer),
    QualifiedField::new(E::Inventory, "name", K::Text),
    QualifiedField::new(E::Inventory, "sku", K::Text),
    QualifiedField::new(E::Inventory, "description", K::Text),
    QualifiedField::new(E::Inventory, "price", K::Real),
    QualifiedField::new(E::Inventory, "quantity", K::Integer),
    QualifiedField::new(E::Inventory, "status", K::InventoryStatus),
    QualifiedField::new(E::Inventory, "low_stock_threshold", K::Integer),
    QualifiedField::new(E::Inventory, "created_at", K::Timestamp),
    QualifiedField::new(E::Inventory, "updated_at", K::Timestamp),
    QualifiedField::new(E::Batches, "lot_code", K::Text),
    QualifiedField::new(E::Batches, "quantity", K::Integer),
    QualifiedField::new(E::Batches, "expires_on", K::Date),
    QualifiedField::new(E::Batches, "received_on", K::Date),
    QualifiedField::new(E::Shipments, "status", K::ShipmentStatus),
    QualifiedField::new(E::Shipments, "destination", K::Text),
    QualifiedField::new(E::Shipments, "quantity", K::Integer),
    QualifiedField::new(E::Shipments, "shipped_at", K::Timestamp),
    QualifiedField::new(E::Receipts, "status", K::ReceiptStatus),
    QualifiedField::new(E::Receipts, "source", K::Text),
    QualifiedField::new(E::Receipts, "quantity", K::Integer),
    QualifiedField::new(E::Receipts, "received_at", K::Timestamp),
    QualifiedField::new(E::ChangeLogs, "field_name", K::Text),
    QualifiedField::new(E::ChangeLogs, "changed_by", K::Text),
    QualifiedField::new(E::ChangeLogs, "changed_at", K::Timestamp),
    QualifiedField::new(E::AuditLogs, "action", K::Text),
    QualifiedField::new(E::AuditLogs, "actor", K::Text),
    QualifiedField::new(E::AuditLogs, "performed_at", K::Timestamp),
];

static STANDARD_ALIASES: &[(&str, &str)] = &[
    ("id", "inventory.id"),
    ("name", "inventory.name"),
    ("sku", "inventory.sku"),
    ("description", "inventory.description"),
    ("price", "inventory.price"),
    ("quantity", "inventory.quantity"),
    ("status", "inventory.status"),
    ("low_stock_threshold", "inventory.low_stock_threshold"),
    ("created_at", "inventory.created_at"),
    ("updated_at", "inventory.updated_at"),
    ("lot_code", "batches.lot_code"),
    ("expires_on", "batches.expires_on"),
    ("destination", "shipments.destination"),
    ("source", "receipts.source"),
];

/// Backs [`FieldWhitelist::standard`].
static STANDARD_WHITELIST: FieldWhitelist = FieldWhitelist {
    fields: STANDARD_FIELDS,
    aliases: STANDARD_ALIASES,
};

/// A read-only table of fields that may be filtered and sorted on.
#[derive(Debug, PartialEq, Eq)]
pub struct FieldWhitelist {
    fields: &'static [QualifiedField],
    aliases: &'static [(&'static str, &'static str)],
}

impl FieldWhitelist {
    /// Returns the standard inventory whitelist.
    pub fn standard() -> &'static FieldWhitelist {
        &STANDARD_WHITELIST
    }

    /// Resolves a raw field name to a qualified field.
    ///
    /// Returns `None` for anything that is not whitelisted.
    pub fn validate(&self, raw: &str) -> Option<QualifiedField> {
        let raw = raw.trim();
        let name = self
            .aliases
            .iter()
            .find(|(alias, _)| *alias == raw)
            .map_or(raw, |(_, qualified)| *qualified);

        let (entity, column) = name.split_once('.')?;
        let entity = Entity::parse(entity)?;
        self.fields
            .iter()
            .find(|f| f.entity == entity && f.column == column)
            .copied()
    }

    /// Builds a predicate from untrusted input.
    ///
    /// Validates the field, checks the operator makes sense for the field's
    /// kind, and coerces the value. Any failure is logged and yields `None`.
    pub fn predicate(&self, raw_field: &str, op: Operator, raw_value: &JsonValue) -> Option<Predicate> {
        let Some(field) = self.validate(raw_field) else {
            tracing::warn!(field = %raw_field, "ignoring condition on unknown field");
            return None;
        };

        let predicate = match op {
            Operator::Contains | Operator::StartsWith => {
                if !field.kind().is_text() {
                    tracing::warn!(field = %field, operator = %op, "ignoring text match on non-text field");
                    return None;
                }
                raw_value.as_str().map(|text| {
                    if op == Operator::Contains {
                        Predicate::contains(field, text)
                    } else {
                        Predicate::starts_with(field, text)
                    }
                })
            }
            Operator::Between => match raw_value.as_array().map(Vec::as_slice) {
                Some([low, high]) => field
                    .kind()
                    .coerce(low)
                    .zip(field.kind().coerce(high))
                    .map(|(low, high)| Predicate::between(field, low, high)),
                _ => None,
            },
            _ => field
                .kind()
                .coerce(raw_value)
                .map(|value| Predicate::compare(field, op, value)),
        };

        if predicate.is_none() {
            tracing::warn!(field = %field, operator = %op, value = %raw_value, "ignoring condition with unusable value");
        }
        predicate
    }
}
