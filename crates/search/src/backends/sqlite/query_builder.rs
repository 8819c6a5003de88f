//! SQL query builder for inventory searches.
//!
//! Translates a [`QueryContext`] into SQLite statements. Column and table
//! names come only from [`QualifiedField`](crate::search::QualifiedField)s and [`Entity`] values, which are
//! fixed by the whitelist; every operand is bound as a numbered parameter.

use std::fmt;

use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};

use crate::search::{ConditionGroup, Entity, Operator, Predicate, QueryContext, Value};

/// Columns selected for every materialized record, in decode order.
pub const RECORD_COLUMNS: [&str; 8] = [
    "id",
    "name",
    "sku",
    "price",
    "quantity",
    "status",
    "created_at",
    "updated_at",
];

/// A fragment of SQL with bound parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    /// The SQL clause.
    pub sql: String,
    /// Bound parameter values.
    pub params: Vec<SqlParam>,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// String parameter.
    String(String),
    /// Integer parameter.
    Integer(i64),
    /// Float parameter.
    Float(f64),
}

impl SqlParam {
    /// Creates a string parameter.
    pub fn string(s: impl Into<String>) -> Self {
        SqlParam::String(s.into())
    }

    /// Creates an integer parameter.
    pub fn integer(i: i64) -> Self {
        SqlParam::Integer(i)
    }
}

impl From<&Value> for SqlParam {
    fn from(value: &Value) -> Self {
        match value {
            Value::Integer(v) => SqlParam::Integer(*v),
            Value::Real(v) => SqlParam::Float(*v),
            Value::Text(v) => SqlParam::String(v.clone()),
            Value::Date(v) => SqlParam::String(v.format("%Y-%m-%d").to_string()),
            Value::Timestamp(v) => SqlParam::String(v.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        }
    }
}

impl fmt::Display for SqlParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlParam::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            SqlParam::Integer(i) => write!(f, "{}", i),
            SqlParam::Float(v) => write!(f, "{}", v),
        }
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlParam::Integer(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            SqlParam::Float(v) => ToSqlOutput::Owned(SqliteValue::Real(*v)),
        })
    }
}

impl SqlFragment {
    /// Creates a new SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Adds a parameter placeholder and returns the placeholder string.
    pub fn add_param(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("?{}", self.params.len())
    }

    /// Returns true if this fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Renders the statement followed by its bound values, for diagnostics.
    pub fn to_debug_string(&self) -> String {
        if self.params.is_empty() {
            return self.sql.clone();
        }
        let params: Vec<String> = self
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| format!("?{} = {}", i + 1, p))
            .collect();
        format!("{} -- [{}]", self.sql, params.join(", "))
    }
}

/// Builds SQL statements from query contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteQueryBuilder;

impl SqliteQueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        Self
    }

    /// Builds the statement returning one page of records.
    pub fn build_select(&self, ctx: &QueryContext) -> SqlFragment {
        let base = Entity::Inventory.table();
        let columns: Vec<String> = RECORD_COLUMNS
            .iter()
            .map(|c| format!("{}.{}", base, c))
            .collect();

        let mut frag = SqlFragment::new("");
        let distinct = if ctx.joins().is_distinct() {
            "DISTINCT "
        } else {
            ""
        };
        let mut sql = format!(
            "SELECT {}{} {}",
            distinct,
            columns.join(", "),
            self.build_from(ctx)
        );

        let where_clause = self.build_where(ctx, &mut frag);
        if !where_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&where_clause);
        }

        sql.push(' ');
        sql.push_str(&self.build_order_by(ctx));
        sql.push(' ');
        sql.push_str(&self.build_limit(ctx));

        frag.sql = sql;
        frag
    }

    /// Builds the statement counting distinct matching records.
    pub fn build_count(&self, ctx: &QueryContext) -> SqlFragment {
        let mut frag = SqlFragment::new("");
        let mut sql = format!(
            "SELECT COUNT(DISTINCT {}.id) {}",
            Entity::Inventory.table(),
            self.build_from(ctx)
        );

        let where_clause = self.build_where(ctx, &mut frag);
        if !where_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&where_clause);
        }

        frag.sql = sql;
        frag
    }

    /// Builds the `FROM` clause with one `LEFT JOIN` per joined entity.
    ///
    /// Left joins keep inventory rows without related rows, so an OR that
    /// spans a relation still matches on its inventory-only branch.
    pub fn build_from(&self, ctx: &QueryContext) -> String {
        let base = Entity::Inventory.table();
        let mut sql = format!("FROM {}", base);
        for entity in ctx.joins().entities() {
            let Some(foreign_key) = entity.foreign_key() else {
                continue;
            };
            let table = entity.table();
            sql.push_str(&format!(
                " LEFT JOIN {table} ON {table}.{foreign_key} = {base}.id"
            ));
        }
        sql
    }

    /// Builds the `WHERE` clause, adding its operands to `frag`.
    ///
    /// Returns an empty string when the context has no conditions.
    pub fn build_where(&self, ctx: &QueryContext, frag: &mut SqlFragment) -> String {
        let clauses: Vec<String> = ctx
            .conditions()
            .iter()
            .map(|group| self.build_condition(group, frag))
            .collect();
        if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        }
    }

    fn build_condition(&self, group: &ConditionGroup, frag: &mut SqlFragment) -> String {
        let (children, joiner) = match group {
            ConditionGroup::Predicate(p) => return self.build_predicate(p, frag),
            ConditionGroup::And(children) => (children, " AND "),
            ConditionGroup::Or(children) => (children, " OR "),
        };
        if children.is_empty() {
            return "1 = 1".to_string();
        }
        let parts: Vec<String> = children
            .iter()
            .map(|child| self.build_condition(child, frag))
            .collect();
        format!("({})", parts.join(joiner))
    }

    fn build_predicate(&self, predicate: &Predicate, frag: &mut SqlFragment) -> String {
        let column = predicate.field().sql_column();
        match (predicate.operator(), predicate.values()) {
            (Operator::Between, [low, high]) => {
                let low = frag.add_param(low.into());
                let high = frag.add_param(high.into());
                format!("{} BETWEEN {} AND {}", column, low, high)
            }
            (Operator::Contains, [Value::Text(text)]) => {
                let p = frag.add_param(SqlParam::string(format!("%{}%", text)));
                format!("{} LIKE {} ESCAPE '\\'", column, p)
            }
            (Operator::StartsWith, [Value::Text(text)]) => {
                let p = frag.add_param(SqlParam::string(format!("{}%", text)));
                format!("{} LIKE {} ESCAPE '\\'", column, p)
            }
            (op, [value]) => {
                let p = frag.add_param(value.into());
                format!("{} {} {}", column, op.symbol(), p)
            }
            (op, values) => {
                tracing::warn!(
                    field = %predicate.field(),
                    operator = %op,
                    operands = values.len(),
                    "predicate has wrong operand count; ignoring it"
                );
                "1 = 1".to_string()
            }
        }
    }

    /// Builds the `ORDER BY` clause. Always ends with an `id` tie-breaker.
    pub fn build_order_by(&self, ctx: &QueryContext) -> String {
        let clauses: Vec<String> = ctx
            .effective_orderings()
            .iter()
            .map(|o| format!("{} {}", o.field().sql_column(), o.direction().as_sql()))
            .collect();
        format!("ORDER BY {}", clauses.join(", "))
    }

    /// Builds the `LIMIT`/`OFFSET` clause from the context's pagination.
    pub fn build_limit(&self, ctx: &QueryContext) -> String {
        let pagination = ctx.pagination();
        format!(
            "LIMIT {} OFFSET {}",
            pagination.limit(),
            pagination.offset()
        )
    }
}
