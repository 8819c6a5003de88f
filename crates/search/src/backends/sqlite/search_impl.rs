//! [`ResultAssembler`] implementation for SQLite.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, TransactionBehavior, params_from_iter};

use crate::core::ResultAssembler;
use crate::error::{SearchError, StorageResult};
use crate::search::QueryContext;
use crate::types::{InventoryRecord, InventoryStatus, SearchPage};

use super::SqliteBackend;
use super::backend::BACKEND_NAME;
use super::query_builder::{SqlFragment, SqliteQueryBuilder};

/// A row as stored, before status and timestamps are decoded.
struct RawRecord {
    id: i64,
    name: String,
    sku: Option<String>,
    price: f64,
    quantity: i64,
    status: i64,
    created_at: String,
    updated_at: String,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            sku: row.get(2)?,
            price: row.get(3)?,
            quantity: row.get(4)?,
            status: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn decode(self) -> StorageResult<InventoryRecord> {
        let status = InventoryStatus::from_code(self.status).ok_or_else(|| {
            SearchError::RecordDecode {
                id: self.id,
                message: format!("unknown status code {}", self.status),
            }
        })?;
        Ok(InventoryRecord {
            id: self.id,
            created_at: parse_timestamp(self.id, &self.created_at)?,
            updated_at: parse_timestamp(self.id, &self.updated_at)?,
            name: self.name,
            sku: self.sku,
            price: self.price,
            quantity: self.quantity,
            status,
        })
    }
}

fn parse_timestamp(id: i64, raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            SearchError::RecordDecode {
                id,
                message: format!("bad timestamp {:?}: {}", raw, e),
            }
            .into()
        })
}

fn fetch_records(conn: &Connection, frag: &SqlFragment) -> StorageResult<Vec<InventoryRecord>> {
    let mut stmt = conn.prepare(&frag.sql)?;
    let rows = stmt.query_map(params_from_iter(frag.params.iter()), RawRecord::from_row)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?.decode()?);
    }
    Ok(records)
}

fn fetch_count(conn: &Connection, frag: &SqlFragment) -> StorageResult<u64> {
    let count: i64 = conn.query_row(&frag.sql, params_from_iter(frag.params.iter()), |row| {
        row.get(0)
    })?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Runs `read` inside one deferred transaction.
///
/// SQLite fixes the transaction's snapshot at its first read, so every
/// statement `read` issues sees the same data even while other connections
/// commit.
fn read_snapshot<T>(
    conn: &mut Connection,
    read: impl FnOnce(&Connection) -> StorageResult<T>,
) -> StorageResult<T> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
    let out = read(&tx)?;
    tx.commit()?;
    Ok(out)
}

impl ResultAssembler for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn materialize(&self, ctx: &QueryContext) -> StorageResult<SearchPage> {
        let builder = SqliteQueryBuilder::new();
        let select = builder.build_select(ctx);
        let count = builder.build_count(ctx);

        tracing::debug!(sql = %select.sql, params = select.params.len(), "materializing inventory search");

        let mut conn = self.connection()?;
        let (records, total_count) = read_snapshot(&mut conn, |conn| {
            Ok((fetch_records(conn, &select)?, fetch_count(conn, &count)?))
        })?;

        let pagination = ctx.pagination();
        Ok(SearchPage {
            records,
            total_count,
            page: pagination.page,
            per_page: pagination.per_page,
        })
    }

    fn count(&self, ctx: &QueryContext) -> StorageResult<u64> {
        let frag = SqliteQueryBuilder::new().build_count(ctx);
        tracing::debug!(sql = %frag.sql, "counting inventory search");

        let conn = self.connection()?;
        fetch_count(&conn, &frag)
    }

    fn debug_query(&self, ctx: &QueryContext) -> String {
        SqliteQueryBuilder::new().build_select(ctx).to_debug_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    fn backend() -> SqliteBackend {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.init_schema().unwrap();
        backend
    }

    #[test]
    fn test_materialize_empty_store() {
        let page = QueryContext::new().results(&backend()).unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.total_count, 0);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn test_decode_failure_is_reported() {
        let backend = backend();
        backend
            .connection()
            .unwrap()
            .execute(
                "INSERT INTO inventories (name, price, quantity, status, created_at, updated_at)
                 VALUES ('broken', 1.0, 1, 9, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();

        let err = QueryContext::new().results(&backend).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Search(SearchError::RecordDecode { .. })
        ));
    }

    #[test]
    fn test_store_fault_is_surfaced() {
        let backend = SqliteBackend::in_memory().unwrap();
        let err = QueryContext::new().results(&backend).unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
    }

    #[test]
    fn test_page_and_total_share_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::open(dir.path().join("stock.db")).unwrap();
        backend.init_schema().unwrap();

        let insert = "INSERT INTO inventories (name, price, quantity, status, created_at, updated_at)
                      VALUES ('late', 1.0, 1, 0, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')";
        backend.connection().unwrap().execute(insert, []).unwrap();

        let ctx = QueryContext::new();
        let builder = SqliteQueryBuilder::new();
        let select = builder.build_select(&ctx);
        let count = builder.build_count(&ctx);

        let mut reader = backend.connection().unwrap();
        let (records, total) = read_snapshot(&mut reader, |conn| {
            let records = fetch_records(conn, &select)?;
            backend.connection()?.execute(insert, [])?;
            Ok((records, fetch_count(conn, &count)?))
        })
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(total, 1);
        drop(reader);
        assert_eq!(ctx.count(&backend).unwrap(), 2);
    }

    #[test]
    fn test_debug_query_includes_params() {
        let ctx = QueryContext::new().search_keywords("bolt", &["name"]);
        let text = backend().debug_query(&ctx);
        assert!(text.contains("inventories.name LIKE ?1 ESCAPE"));
        assert!(text.ends_with("-- [?1 = '%bolt%']"));
    }
}
