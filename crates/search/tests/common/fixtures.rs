//! Test fixtures for inventory search testing.
//!
//! [`seed_standard`] loads the five reference rows A-E used across the
//! integration tests:
//!
//! | Row | Price | Quantity | Status | Related rows |
//! |-----|-------|----------|--------|--------------|
//! | A | 5 | 0 | archived | - |
//! | B | 15 | 3 | active | delivered shipment, old change log |
//! | C | 25 | 10 | active | batches expiring in 5 and 60 days |
//! | D | 35 | 10 | archived | - |
//! | E | 45 | 50 | active | batch, shipment, receipt, recent change log, audit entry |
//!
//! `updated_at` increases from A to E, so the default ordering is E, D, C, B, A.

use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use rusqlite::{Connection, params};

use stockroom_search::backends::sqlite::SqliteBackend;
use stockroom_search::types::{InventoryStatus, ReceiptStatus, SearchPage, ShipmentStatus};

/// Formats a timestamp the way the store expects it.
pub fn ts(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Formats a date the way the store expects it.
pub fn day(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

/// Today's date in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// `today + n` days.
pub fn days_from_today(n: u64) -> NaiveDate {
    today()
        .checked_add_days(Days::new(n))
        .expect("date in range")
}

/// An inventory row for testing.
#[derive(Debug, Clone)]
pub struct InventoryFixture {
    /// Display name.
    pub name: String,
    /// Stock keeping unit.
    pub sku: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
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

impl InventoryFixture {
    /// Creates an active row with the given name, price and quantity.
    pub fn new(name: impl Into<String>, price: f64, quantity: i64) -> Self {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Self {
            name: name.into(),
            sku: None,
            description: None,
            price,
            quantity,
            status: InventoryStatus::Active,
            created_at: created,
            updated_at: created,
        }
    }

    /// Sets the SKU.
    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: InventoryStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the creation time.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Sets the modification time.
    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Inserts the row and returns its id.
    pub fn insert(&self, conn: &Connection) -> i64 {
        conn.execute(
            "INSERT INTO inventories (name, sku, description, price, quantity, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                self.name,
                self.sku,
                self.description,
                self.price,
                self.quantity,
                self.status.code(),
                ts(self.created_at),
                ts(self.updated_at),
            ],
        )
        .expect("insert inventory");
        conn.last_insert_rowid()
    }
}

/// Inserts a batch.
pub fn insert_batch(conn: &Connection, inventory_id: i64, lot_code: &str, quantity: i64, expires_on: NaiveDate) {
    conn.execute(
        "INSERT INTO batches (inventory_id, lot_code, quantity, expires_on, received_on)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![inventory_id, lot_code, quantity, day(expires_on), day(today())],
    )
    .expect("insert batch");
}

/// Inserts a shipment.
pub fn insert_shipment(
    conn: &Connection,
    inventory_id: i64,
    status: ShipmentStatus,
    destination: &str,
    shipped_at: DateTime<Utc>,
) {
    conn.execute(
        "INSERT INTO shipments (inventory_id, status, destination, quantity, shipped_at)
         VALUES (?1, ?2, ?3, 1, ?4)",
        params![inventory_id, status.code(), destination, ts(shipped_at)],
    )
    .expect("insert shipment");
}

/// Inserts a receipt.
pub fn insert_receipt(
    conn: &Connection,
    inventory_id: i64,
    status: ReceiptStatus,
    source: &str,
    received_at: DateTime<Utc>,
) {
    conn.execute(
        "INSERT INTO receipts (inventory_id, status, source, quantity, received_at)
         VALUES (?1, ?2, ?3, 1, ?4)",
        params![inventory_id, status.code(), source, ts(received_at)],
    )
    .expect("insert receipt");
}

/// Inserts a change-log entry.
pub fn insert_change_log(
    conn: &Connection,
    inventory_id: i64,
    field_name: &str,
    changed_by: &str,
    changed_at: DateTime<Utc>,
) {
    conn.execute(
        "INSERT INTO change_logs (inventory_id, field_name, old_value, new_value, changed_by, changed_at)
         VALUES (?1, ?2, NULL, NULL, ?3, ?4)",
        params![inventory_id, field_name, changed_by, ts(changed_at)],
    )
    .expect("insert change log");
}

/// Inserts an audit trail entry.
pub fn insert_audit_log(
    conn: &Connection,
    inventory_id: i64,
    action: &str,
    actor: &str,
    performed_at: DateTime<Utc>,
) {
    conn.execute(
        "INSERT INTO audit_logs (inventory_id, action, actor, performed_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![inventory_id, action, actor, ts(performed_at)],
    )
    .expect("insert audit log");
}

/// Ids of the standard rows.
#[derive(Debug, Clone, Copy)]
pub struct StandardIds {
    pub a: i64,
    pub b: i64,
    pub c: i64,
    pub d: i64,
    pub e: i64,
}

/// Loads rows A-E and their related rows.
pub fn seed_standard(backend: &SqliteBackend) -> StandardIds {
    let conn = backend.connection().expect("connection");
    let updated = |hour: u32| Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap();
    let created = |month: u32| Utc.with_ymd_and_hms(2024, month, 1, 9, 0, 0).unwrap();
    let now = Utc::now();

    let a = InventoryFixture::new("A", 5.0, 0)
        .with_sku("SKU-A")
        .with_description("Hex bolt, zinc")
        .with_status(InventoryStatus::Archived)
        .with_created_at(created(1))
        .with_updated_at(updated(10))
        .insert(&conn);
    let b = InventoryFixture::new("B", 15.0, 3)
        .with_sku("SKU-B")
        .with_description("Wood screw")
        .with_created_at(created(2))
        .with_updated_at(updated(11))
        .insert(&conn);
    let c = InventoryFixture::new("C", 25.0, 10)
        .with_sku("SKU-C")
        .with_description("Carriage bolt")
        .with_created_at(created(3))
        .with_updated_at(updated(12))
        .insert(&conn);
    let d = InventoryFixture::new("D", 35.0, 10)
        .with_sku("SKU-D")
        .with_description("Washer")
        .with_status(InventoryStatus::Archived)
        .with_created_at(created(4))
        .with_updated_at(updated(13))
        .insert(&conn);
    let e = InventoryFixture::new("E", 45.0, 50)
        .with_sku("SKU-E")
        .with_description("Anchor")
        .with_created_at(created(5))
        .with_updated_at(updated(14))
        .insert(&conn);

    insert_batch(&conn, c, "LOT-C1", 4, days_from_today(5));
    insert_batch(&conn, c, "LOT-C2", 6, days_from_today(60));
    insert_batch(&conn, e, "LOT-E1", 50, days_from_today(90));

    insert_shipment(&conn, b, ShipmentStatus::Delivered, "Bergen", now - Duration::days(20));
    insert_shipment(&conn, e, ShipmentStatus::Shipped, "Oslo", now - Duration::days(2));

    insert_receipt(&conn, e, ReceiptStatus::Received, "Acme Supply", now - Duration::days(10));

    insert_change_log(&conn, b, "price", "ops", now - Duration::days(30));
    insert_change_log(&conn, e, "quantity", "ops", now - Duration::days(1));
    insert_change_log(&conn, e, "price", "alice", now - Duration::days(1));

    insert_audit_log(&conn, e, "update", "alice", now - Duration::days(1));

    StandardIds { a, b, c, d, e }
}

/// Record names on a page, in page order.
pub fn names(page: &SearchPage) -> Vec<String> {
    page.records.iter().map(|r| r.name.clone()).collect()
}

/// Record names on a page, sorted.
pub fn sorted_names(page: &SearchPage) -> Vec<String> {
    let mut out = names(page);
    out.sort();
    out
}
