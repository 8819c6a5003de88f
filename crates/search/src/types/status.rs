//! Status enumerations and their storage codes.
//!
//! Each status is stored as a small integer. The mapping lives in one
//! exhaustive `match` per enum, so adding a variant without a code is a
//! compile error rather than a silent mis-filter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of an inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    /// Item is stocked and sellable.
    Active,
    /// Item is temporarily not sellable.
    Inactive,
    /// Item has been retired.
    Archived,
}

impl InventoryStatus {
    /// Every variant, in storage-code order.
    pub const ALL: [InventoryStatus; 3] = [
        InventoryStatus::Active,
        InventoryStatus::Inactive,
        InventoryStatus::Archived,
    ];

    /// Returns the storage code for this status.
    pub fn code(self) -> i64 {
        match self {
            InventoryStatus::Active => 0,
            InventoryStatus::Inactive => 1,
            InventoryStatus::Archived => 2,
        }
    }

    /// Maps a storage code back to a status.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Returns the symbolic name.
    pub fn as_str(self) -> &'static str {
        match self {
            InventoryStatus::Active => "active",
            InventoryStatus::Inactive => "inactive",
            InventoryStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(InventoryStatus::Active),
            "inactive" => Ok(InventoryStatus::Inactive),
            "archived" => Ok(InventoryStatus::Archived),
            _ => Err(format!("unknown inventory status: {}", s)),
        }
    }
}

/// Status of an outbound shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    /// Created, not yet handed to a carrier.
    Pending,
    /// In transit.
    Shipped,
    /// Confirmed at destination.
    Delivered,
    /// Will not ship.
    Cancelled,
}

impl ShipmentStatus {
    /// Every variant, in storage-code order.
    pub const ALL: [ShipmentStatus; 4] = [
        ShipmentStatus::Pending,
        ShipmentStatus::Shipped,
        ShipmentStatus::Delivered,
        ShipmentStatus::Cancelled,
    ];

    /// Returns the storage code for this status.
    pub fn code(self) -> i64 {
        match self {
            ShipmentStatus::Pending => 0,
            ShipmentStatus::Shipped => 1,
            ShipmentStatus::Delivered => 2,
            ShipmentStatus::Cancelled => 3,
        }
    }

    /// Maps a storage code back to a status.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }
}

impl FromStr for ShipmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ShipmentStatus::Pending),
            "shipped" => Ok(ShipmentStatus::Shipped),
            "delivered" => Ok(ShipmentStatus::Delivered),
            "cancelled" | "canceled" => Ok(ShipmentStatus::Cancelled),
            _ => Err(format!("unknown shipment status: {}", s)),
        }
    }
}

/// Status of an inbound receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    /// Expected but not yet checked in.
    Pending,
    /// Checked in to stock.
    Received,
    /// Refused at intake.
    Rejected,
}

impl ReceiptStatus {
    /// Every variant, in storage-code order.
    pub const ALL: [ReceiptStatus; 3] = [
        ReceiptStatus::Pending,
        ReceiptStatus::Received,
        ReceiptStatus::Rejected,
    ];

    /// Returns the storage code for this status.
    pub fn code(self) -> i64 {
        match self {
            ReceiptStatus::Pending => 0,
            ReceiptStatus::Received => 1,
            ReceiptStatus::Rejected => 2,
        }
    }

    /// Maps a storage code back to a status.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }
}

impl FromStr for ReceiptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ReceiptStatus::Pending),
            "received" => Ok(ReceiptStatus::Received),
            "rejected" => Ok(ReceiptStatus::Rejected),
            _ => Err(format!("unknown receipt status: {}", s)),
        }
    }
}
