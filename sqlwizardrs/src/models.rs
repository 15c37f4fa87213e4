//! Typed records for the pieces a user assembles in the wizard.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::ColumnInfo;

/// Identifier of a join/filter/aggregation/order step within one builder.
pub type StepId = u64;

/// A selectable table or view, as offered by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub database: String,
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.name)
    }
}

/// A table reference with the alias assigned for one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasedTable {
    pub table: TableRef,
    pub alias: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        }
    }
}

/// One link in the left-to-right join chain.
///
/// The left side of step N is the table joined by step N-1 (the base table for
/// the first step).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinStep {
    pub id: StepId,
    pub right_table: Option<TableRef>,
    #[serde(default)]
    pub left_keys: Vec<String>,
    #[serde(default)]
    pub right_keys: Vec<String>,
    #[serde(default)]
    pub kind: JoinKind,
}

impl JoinStep {
    pub fn new(id: StepId) -> Self {
        Self {
            id,
            right_table: None,
            left_keys: Vec::new(),
            right_keys: Vec::new(),
            kind: JoinKind::default(),
        }
    }

    /// Table chosen and a non-empty, equal-length key list on both sides.
    pub fn is_complete(&self) -> bool {
        self.right_table.is_some()
            && !self.left_keys.is_empty()
            && self.left_keys.len() == self.right_keys.len()
    }
}

/// A column available for filtering/selection, derived from catalog metadata once
/// the table set is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    /// `<alias>.<column>`; the stable handle used by filters, selections and
    /// aggregations.
    pub fq_name: String,
    pub table_alias: String,
    pub table_name: String,
    pub column: String,
    /// Upper-cased warehouse type name.
    pub data_type: String,
    pub comment: String,
}

const NUMERIC_TYPE_MARKERS: [&str; 5] = ["NUMBER", "INT", "FLOAT", "DECIMAL", "DOUBLE"];

impl ColumnRef {
    pub fn from_catalog(alias: &str, table_name: &str, info: &ColumnInfo) -> Self {
        Self {
            fq_name: format!("{alias}.{}", info.name),
            table_alias: alias.to_string(),
            table_name: table_name.to_string(),
            column: info.name.clone(),
            data_type: info.data_type.to_uppercase(),
            comment: info.comment.clone().unwrap_or_default(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        NUMERIC_TYPE_MARKERS
            .iter()
            .any(|marker| self.data_type.contains(marker))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterOperator {
    #[default]
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "IS NULL")]
    IsNull,
    #[serde(rename = "IS NOT NULL")]
    IsNotNull,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 9] = [
        FilterOperator::Like,
        FilterOperator::Eq,
        FilterOperator::Neq,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::IsNull,
        FilterOperator::IsNotNull,
    ];

    pub fn as_sql(&self) -> &'static str {
        match self {
            FilterOperator::Like => "LIKE",
            FilterOperator::Eq => "=",
            FilterOperator::Neq => "!=",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
            FilterOperator::IsNull => "IS NULL",
            FilterOperator::IsNotNull => "IS NOT NULL",
        }
    }

    /// `IS NULL` / `IS NOT NULL` ignore the predicate value.
    pub fn takes_value(&self) -> bool {
        !matches!(self, FilterOperator::IsNull | FilterOperator::IsNotNull)
    }
}

/// `<column> <operator> <value>`; conjoined with the other predicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPredicate {
    pub id: StepId,
    /// Fully-qualified column name; `None` until the user picks one.
    pub column: Option<String>,
    #[serde(default)]
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFunction {
    #[default]
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggregateFunction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Min => "MIN",
        }
    }
}

/// `*` or a fully-qualified column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AggregateTarget {
    #[default]
    All,
    Column(String),
}

impl From<String> for AggregateTarget {
    fn from(value: String) -> Self {
        if value == "*" {
            AggregateTarget::All
        } else {
            AggregateTarget::Column(value)
        }
    }
}

impl From<&str> for AggregateTarget {
    fn from(value: &str) -> Self {
        AggregateTarget::from(value.to_string())
    }
}

impl From<AggregateTarget> for String {
    fn from(value: AggregateTarget) -> Self {
        match value {
            AggregateTarget::All => "*".to_string(),
            AggregateTarget::Column(name) => name,
        }
    }
}

impl fmt::Display for AggregateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateTarget::All => f.write_str("*"),
            AggregateTarget::Column(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationStep {
    pub id: StepId,
    pub function: AggregateFunction,
    pub target: AggregateTarget,
    /// Output column name.
    pub alias: String,
}

impl AggregationStep {
    pub fn new(id: StepId, function: AggregateFunction, target: AggregateTarget) -> Self {
        let alias = Self::default_alias(function, &target);
        Self {
            id,
            function,
            target,
            alias,
        }
    }

    /// `COUNT_ALL`, `SUM_ORDERS.AMOUNT`, ... (sanitized when embedded).
    pub fn default_alias(function: AggregateFunction, target: &AggregateTarget) -> String {
        match target {
            AggregateTarget::All => format!("{}_ALL", function.as_sql()),
            AggregateTarget::Column(name) => format!("{}_{name}", function.as_sql()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sorts by an output column name (selected column or aggregation alias).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderByStep {
    pub id: StepId,
    /// Empty until the user picks a column; empty steps are skipped.
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}
