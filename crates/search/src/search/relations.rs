//! Per-relation condition builders.
//!
//! Each related entity has a builder with helpers for the filters that make
//! sense on it. A builder lives for exactly one
//! [`QueryContext::with_relation`](super::QueryContext::with_relation) block:
//! the block receives `&mut Builder`, calls helpers, and when it returns the
//! context joins the entity once and ANDs the collected predicates in.
//!
//! ```
//! use chrono::NaiveDate;
//! use stockroom_search::search::QueryContext;
//!
//! let cutoff = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//! let ctx = QueryContext::new().with_batch_conditions(|b| {
//!     b.lot_code("L-7").expires_before(cutoff);
//! });
//! assert_eq!(ctx.joins().entities().len(), 1);
//! ```

use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::types::{ReceiptStatus, ShipmentStatus};

use super::predicate::{Predicate, Value};
use super::whitelist::{Entity, FieldWhitelist, QualifiedField};

/// Predicates collected by one relation builder block.
#[derive(Debug, Clone)]
pub struct RelationBuilderState {
    entity: Entity,
    whitelist: &'static FieldWhitelist,
    predicates: Vec<Predicate>,
}

impl RelationBuilderState {
    /// Creates an empty state for `entity`.
    pub fn new(entity: Entity, whitelist: &'static FieldWhitelist) -> Self {
        Self {
            entity,
            whitelist,
            predicates: Vec::new(),
        }
    }

    /// The entity the predicates apply to.
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// The collected predicates.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Consumes the state, returning the collected predicates.
    pub fn into_predicates(self) -> Vec<Predicate> {
        self.predicates
    }

    fn push(&mut self, column: &str, build: impl FnOnce(QualifiedField) -> Predicate) {
        let name = format!("{}.{}", self.entity.name(), column);
        match self.whitelist.validate(&name) {
            Some(field) => self.predicates.push(build(field)),
            None => tracing::warn!(field = %name, "ignoring relation condition on unknown field"),
        }
    }

    fn push_text(&mut self, column: &str, text: &str, build: fn(QualifiedField, &str) -> Predicate) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.push(column, |field| build(field, text));
    }
}

/// A builder scoped to one related entity.
pub trait RelationBuilder {
    /// The entity this builder filters.
    const ENTITY: Entity;

    /// Wraps a fresh state.
    fn from_state(state: RelationBuilderState) -> Self;

    /// Returns the collected state.
    fn into_state(self) -> RelationBuilderState;
}

macro_rules! relation_builder {
    ($(#[$doc:meta])* $name:ident => $entity:expr) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name {
            state: RelationBuilderState,
        }

        impl RelationBuilder for $name {
            const ENTITY: Entity = $entity;

            fn from_state(state: RelationBuilderState) -> Self {
                Self { state }
            }

            fn into_state(self) -> RelationBuilderState {
                self.state
            }
        }
    };
}

relation_builder!(
    /// Conditions on stock batches.
    BatchConditions => Entity::Batches
);
relation_builder!(
    /// Conditions on outbound shipments.
    ShipmentConditions => Entity::Shipments
);
relation_builder!(
    /// Conditions on inbound receipts.
    ReceiptConditions => Entity::Receipts
);
relation_builder!(
    /// Conditions on change-log entries.
    ChangeLogConditions => Entity::ChangeLogs
);
relation_builder!(
    /// Conditions on audit trail entries.
    AuditConditions => Entity::AuditLogs
);

impl BatchConditions {
    /// Lot code contains `text`.
    pub fn lot_code(&mut self, text: &str) -> &mut Self {
        self.state.push_text("lot_code", text, Predicate::contains);
        self
    }

    /// Expires strictly before `date`.
    pub fn expires_before(&mut self, date: NaiveDate) -> &mut Self {
        self.state.push("expires_on", |f| Predicate::lt(f, date));
        self
    }

    /// Expires strictly after `date`.
    pub fn expires_after(&mut self, date: NaiveDate) -> &mut Self {
        self.state.push("expires_on", |f| Predicate::gt(f, date));
        self
    }

    /// Expires between `today` and `today + days`, both inclusive.
    pub fn expiring_within(&mut self, days: u32, today: NaiveDate) -> &mut Self {
        let Some(until) = today.checked_add_days(Days::new(u64::from(days))) else {
            tracing::warn!(days, "ignoring expiry window past the end of the calendar");
            return self;
        };
        self.state
            .push("expires_on", |f| Predicate::between(f, today, until));
        self
    }

    /// Batch quantity greater than `n`.
    pub fn quantity_greater_than(&mut self, n: i64) -> &mut Self {
        self.state.push("quantity", |f| Predicate::gt(f, n));
        self
    }

    /// Batch quantity less than `n`.
    pub fn quantity_less_than(&mut self, n: i64) -> &mut Self {
        self.state.push("quantity", |f| Predicate::lt(f, n));
        self
    }
}

impl ShipmentConditions {
    /// Shipment has `status`.
    pub fn status(&mut self, status: ShipmentStatus) -> &mut Self {
        self.state
            .push("status", |f| Predicate::eq(f, Value::Integer(status.code())));
        self
    }

    /// Destination contains `text`.
    pub fn destination(&mut self, text: &str) -> &mut Self {
        self.state.push_text("destination", text, Predicate::contains);
        self
    }

    /// Shipped strictly after `ts`.
    pub fn shipped_after(&mut self, ts: DateTime<Utc>) -> &mut Self {
        self.state.push("shipped_at", |f| Predicate::gt(f, ts));
        self
    }

    /// Shipped strictly before `ts`.
    pub fn shipped_before(&mut self, ts: DateTime<Utc>) -> &mut Self {
        self.state.push("shipped_at", |f| Predicate::lt(f, ts));
        self
    }

    /// Shipped quantity greater than `n`.
    pub fn quantity_greater_than(&mut self, n: i64) -> &mut Self {
        self.state.push("quantity", |f| Predicate::gt(f, n));
        self
    }
}

impl ReceiptConditions {
    /// Receipt has `status`.
    pub fn status(&mut self, status: ReceiptStatus) -> &mut Self {
        self.state
            .push("status", |f| Predicate::eq(f, Value::Integer(status.code())));
        self
    }

    /// Source contains `text`.
    pub fn source(&mut self, text: &str) -> &mut Self {
        self.state.push_text("source", text, Predicate::contains);
        self
    }

    /// Received strictly after `ts`.
    pub fn received_after(&mut self, ts: DateTime<Utc>) -> &mut Self {
        self.state.push("received_at", |f| Predicate::gt(f, ts));
        self
    }

    /// Received strictly before `ts`.
    pub fn received_before(&mut self, ts: DateTime<Utc>) -> &mut Self {
        self.state.push("received_at", |f| Predicate::lt(f, ts));
        self
    }
}

impl ChangeLogConditions {
    /// Changed field is exactly `name`.
    pub fn field_name(&mut self, name: &str) -> &mut Self {
        let name = name.trim();
        if !name.is_empty() {
            self.state.push("field_name", |f| Predicate::eq(f, name));
        }
        self
    }

    /// Changed by someone whose name contains `text`.
    pub fn changed_by(&mut self, text: &str) -> &mut Self {
        self.state.push_text("changed_by", text, Predicate::contains);
        self
    }

    /// Changed at or after `ts`.
    pub fn changed_after(&mut self, ts: DateTime<Utc>) -> &mut Self {
        self.state.push("changed_at", |f| Predicate::gte(f, ts));
        self
    }

    /// Changed strictly before `ts`.
    pub fn changed_before(&mut self, ts: DateTime<Utc>) -> &mut Self {
        self.state.push("changed_at", |f| Predicate::lt(f, ts));
        self
    }
}

impl AuditConditions {
    /// Audit action is exactly `action`.
    pub fn action(&mut self, action: &str) -> &mut Self {
        let action = action.trim();
        if !action.is_empty() {
            self.state.push("action", |f| Predicate::eq(f, action));
        }
        self
    }

    /// Actor contains `text`.
    pub fn actor(&mut self, text: &str) -> &mut Self {
        self.state.push_text("actor", text, Predicate::contains);
        self
    }

    /// Performed at or after `ts`.
    pub fn performed_after(&mut self, ts: DateTime<Utc>) -> &mut Self {
        self.state.push("performed_at", |f| Predicate::gte(f, ts));
        self
    }

    /// Performed strictly before `ts`.
    pub fn performed_before(&mut self, ts: DateTime<Utc>) -> &mut Self {
        self.state.push("performed_at", |f| Predicate::lt(f, ts));
        self
    }
}
