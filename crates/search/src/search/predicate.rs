//! Predicates and condition trees.
//!
//! A [`Predicate`] is one field comparison. It can only be built from a
//! [`QualifiedField`], and text-matching predicates escape their input on
//! construction, so a predicate that exists is safe to hand to any backend.
//! [`ConditionGroup`] combines predicates into an AND/OR tree.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::sanitize::sanitize_contains_input;
use super::whitelist::{Entity, QualifiedField};

/// A typed operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Whole number.
    Integer(i64),
    /// Floating point number.
    Real(f64),
    /// Text.
    Text(String),
    /// Calendar date.
    Date(NaiveDate),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%SZ")),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Equal.
    #[default]
    Eq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Inclusive range.
    Between,
    /// Substring match.
    Contains,
    /// Prefix match.
    StartsWith,
}

impl Operator {
    /// Returns the operator's symbol for diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Between => "BETWEEN",
            Operator::Contains => "CONTAINS",
            Operator::StartsWith => "STARTS WITH",
        }
    }

    /// Returns the operator's wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Between => "between",
            Operator::Contains => "contains",
            Operator::StartsWith => "starts_with",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eq" | "=" => Ok(Operator::Eq),
            "gt" | ">" => Ok(Operator::Gt),
            "gte" | ">=" => Ok(Operator::Gte),
            "lt" | "<" => Ok(Operator::Lt),
            "lte" | "<=" => Ok(Operator::Lte),
            "between" => Ok(Operator::Between),
            "contains" => Ok(Operator::Contains),
            "starts_with" | "startswith" => Ok(Operator::StartsWith),
            _ => Err(format!("unknown operator: {}", s)),
        }
    }
}

/// A single validated field comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    field: QualifiedField,
    operator: Operator,
    values: Vec<Value>,
}

impl Predicate {
    /// Builds a binary comparison. `operator` must not be a range or text match.
    pub(crate) fn compare(field: QualifiedField, operator: Operator, value: Value) -> Self {
        debug_assert!(matches!(
            operator,
            Operator::Eq | Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte
        ));
        Self {
            field,
            operator,
            values: vec![value],
        }
    }

    /// `field = value`
    pub fn eq(field: QualifiedField, value: impl Into<Value>) -> Self {
        Self::compare(field, Operator::Eq, value.into())
    }

    /// `field > value`
    pub fn gt(field: QualifiedField, value: impl Into<Value>) -> Self {
        Self::compare(field, Operator::Gt, value.into())
    }

    /// `field >= value`
    pub fn gte(field: QualifiedField, value: impl Into<Value>) -> Self {
        Self::compare(field, Operator::Gte, value.into())
    }

    /// `field < value`
    pub fn lt(field: QualifiedField, value: impl Into<Value>) -> Self {
        Self::compare(field, Operator::Lt, value.into())
    }

    /// `field <= value`
    pub fn lte(field: QualifiedField, value: impl Into<Value>) -> Self {
        Self::compare(field, Operator::Lte, value.into())
    }

    /// `low <= field <= high`
    pub fn between(field: QualifiedField, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self {
            field,
            operator: Operator::Between,
            values: vec![low.into(), high.into()],
        }
    }

    /// Substring match. The input is escaped, so it only matches literally.
    pub fn contains(field: QualifiedField, text: &str) -> Self {
        Self {
            field,
            operator: Operator::Contains,
            values: vec![Value::Text(sanitize_contains_input(text))],
        }
    }

    /// Prefix match. The input is escaped, so it only matches literally.
    pub fn starts_with(field: QualifiedField, text: &str) -> Self {
        Self {
            field,
            operator: Operator::StartsWith,
            values: vec![Value::Text(sanitize_contains_input(text))],
        }
    }

    /// The compared field.
    pub fn field(&self) -> QualifiedField {
        self.field
    }

    /// The operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The operands: two for `Between`, one otherwise. Text-match operands
    /// are already escaped.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Converts the operands to the field's storage type.
    ///
    /// Returns `None` when an operand has no meaning for the field, or when a
    /// text match targets a non-text field.
    pub fn conformed(self) -> Option<Self> {
        let kind = self.field.kind();
        if matches!(self.operator, Operator::Contains | Operator::StartsWith) {
            return kind.is_text().then_some(self);
        }
        let values = self
            .values
            .iter()
            .map(|v| kind.conform(v))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { values, ..self })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.values.as_slice() {
            [low, high] => write!(f, "{} BETWEEN {} AND {}", self.field, low, high),
            [value] => write!(f, "{} {} {}", self.field, self.operator.symbol(), value),
            _ => write!(f, "{} {}", self.field, self.operator.symbol()),
        }
    }
}

/// An AND/OR tree of predicates.
///
/// An empty group of either kind restricts nothing. For `Or` this follows
/// from rejected alternatives being dropped: when none survive, the group
/// degrades to no restriction rather than to an empty result.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionGroup {
    /// A single comparison.
    Predicate(Predicate),
    /// Every child holds.
    And(Vec<ConditionGroup>),
    /// At least one child holds.
    Or(Vec<ConditionGroup>),
}

impl ConditionGroup {
    /// Returns true if the group restricts nothing.
    pub fn is_always_true(&self) -> bool {
        match self {
            ConditionGroup::Predicate(_) => false,
            ConditionGroup::And(children) => children.iter().all(Self::is_always_true),
            ConditionGroup::Or(children) => {
                children.is_empty() || children.iter().any(Self::is_always_true)
            }
        }
    }

    /// Rewrites the tree into its canonical form.
    ///
    /// Predicates whose operands do not fit their field are logged and
    /// treated as unrestricted. Unrestricted children are removed from `And`
    /// groups; an `Or` with an unrestricted child becomes unrestricted.
    /// Single-child groups are unwrapped, and an unrestricted tree comes back
    /// as an empty `And`.
    pub fn normalize(self) -> ConditionGroup {
        match self {
            ConditionGroup::Predicate(p) => {
                let field = p.field();
                match p.conformed() {
                    Some(p) => ConditionGroup::Predicate(p),
                    None => {
                        tracing::warn!(
                            field = %field,
                            kind = ?field.kind(),
                            "ignoring predicate with a value of the wrong type"
                        );
                        ConditionGroup::And(Vec::new())
                    }
                }
            }
            ConditionGroup::And(children) => {
                let children: Vec<_> = children
                    .into_iter()
                    .map(Self::normalize)
                    .filter(|c| !c.is_always_true())
                    .collect();
                Self::collapse(children, ConditionGroup::And)
            }
            ConditionGroup::Or(children) => {
                let children: Vec<_> = children.into_iter().map(Self::normalize).collect();
                if children.is_empty() || children.iter().any(Self::is_always_true) {
                    return ConditionGroup::And(Vec::new());
                }
                Self::collapse(children, ConditionGroup::Or)
            }
        }
    }

    fn collapse(
        children: Vec<ConditionGroup>,
        wrap: fn(Vec<ConditionGroup>) -> ConditionGroup,
    ) -> ConditionGroup {
        match <[ConditionGroup; 1]>::try_from(children) {
            Ok([only]) => only,
            Err(children) => wrap(children),
        }
    }

    /// Returns every related (non-base) entity the group refers to.
    pub fn entities(&self) -> BTreeSet<Entity> {
        let mut out = BTreeSet::new();
        self.collect_entities(&mut out);
        out
    }

    fn collect_entities(&self, out: &mut BTreeSet<Entity>) {
        match self {
            ConditionGroup::Predicate(p) => {
                let entity = p.field().entity();
                if entity != Entity::Inventory {
                    out.insert(entity);
                }
            }
            ConditionGroup::And(children) | ConditionGroup::Or(children) => {
                for child in children {
                    child.collect_entities(out);
                }
            }
        }
    }
}

impl From<Predicate> for ConditionGroup {
    fn from(p: Predicate) -> Self {
        ConditionGroup::Predicate(p)
    }
}

impl fmt::Display for ConditionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (children, joiner) = match self {
            ConditionGroup::Predicate(p) => return write!(f, "{}", p),
            ConditionGroup::And(children) => (children, " AND "),
            ConditionGroup::Or(children) => (children, " OR "),
        };
        match children.as_slice() {
            [] => f.write_str("TRUE"),
            [only] => write!(f, "{}", only),
            _ => {
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(joiner)?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
        }
    }
}
