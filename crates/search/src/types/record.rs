//! Inventory records returned by materialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::InventoryStatus;

/// An inventory row as returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// Store-assigned identifier.
    pub id: i64,

    /// Display name.
    pub name: String,

    /// Stock keeping unit.
    pub sku: Option<String>,

    /// Unit price.
    pub price: f64,

    /// Units on hand.
    pub quantity: i64,

    /// Lifecycle status.
    pub status: InventoryStatus,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}
