use crate::dialect::Dialect;
use crate::models::{AggregateFunction, FilterOperator, JoinKind, SortDirection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlExpr {
    Column {
        table: Option<String>,
        name: String,
    },
    /// `*`, only meaningful as a `COUNT` argument.
    Wildcard,
    Aggregate {
        func: AggregateFunction,
        arg: Box<SqlExpr>,
    },
}

impl SqlExpr {
    pub fn column(table: impl Into<String>, name: impl Into<String>) -> Self {
        SqlExpr::Column {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// Unqualified reference to an output column.
    pub fn output(name: impl Into<String>) -> Self {
        SqlExpr::Column {
            table: None,
            name: name.into(),
        }
    }
}

/// A literal value; embedding is left to the dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlLiteral {
    String(String),
    /// Already checked to be a plain signed decimal.
    Number(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Compare {
        left: SqlExpr,
        op: FilterOperator,
        right: SqlLiteral,
    },
    /// Substring match on the raw (unescaped) value.
    LikeContains { expr: SqlExpr, value: String },
    IsNull { expr: SqlExpr, negated: bool },
    /// Column-to-column equality used by join conditions.
    ColumnsEqual { left: SqlExpr, right: SqlExpr },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    pub expr: SqlExpr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFactor {
    pub database: String,
    pub schema: String,
    pub name: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableFactor,
    pub on: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub expr: SqlExpr,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectQuery {
    pub select: Vec<SelectItem>,
    pub from: TableFactor,
    pub joins: Vec<Join>,
    pub filters: Vec<Predicate>,
    pub group_by: Vec<SqlExpr>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectQuery {
    /// Same FROM/JOIN/WHERE, projected to a single `COUNT(*)`.
    pub fn to_row_count(&self, alias: &str) -> SelectQuery {
        SelectQuery {
            select: vec![SelectItem {
                expr: SqlExpr::Aggregate {
                    func: AggregateFunction::Count,
                    arg: Box::new(SqlExpr::Wildcard),
                },
                alias: Some(alias.to_string()),
            }],
            from: self.from.clone(),
            joins: self.joins.clone(),
            filters: self.filters.clone(),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: u64, offset: Option<u64>) -> SelectQuery {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }
}

/// Clause separation used when rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Single line; what gets executed.
    #[default]
    Compact,
    /// One clause per line, continuation conditions indented; for display.
    Pretty,
}

pub struct SqlRenderer<'d> {
    dialect: &'d dyn Dialect,
    layout: Layout,
}

impl<'d> SqlRenderer<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            layout: Layout::Compact,
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn render_select(&self, query: &SelectQuery) -> String {
        let (sep, cont) = match self.layout {
            Layout::Compact => (" ", " "),
            Layout::Pretty => ("\n", "\n  "),
        };

        let select_items: Vec<String> = query
            .select
            .iter()
            .map(|item| {
                let expr_sql = self.render_expr(&item.expr);
                match &item.alias {
                    Some(alias) => format!("{expr_sql} AS {}", self.dialect.quote_ident(alias)),
                    None => expr_sql,
                }
            })
            .collect();

        let mut clauses = vec![
            format!("SELECT {}", select_items.join(", ")),
            format!("FROM {}", self.render_table(&query.from)),
        ];

        for join in &query.joins {
            let on_clause: Vec<String> = join.on.iter().map(|p| self.render_predicate(p)).collect();
            clauses.push(format!(
                "{} {}{cont}ON {}",
                join.kind.keyword(),
                self.render_table(&join.table),
                on_clause.join(&format!("{cont}AND "))
            ));
        }

        if !query.filters.is_empty() {
            let filters: Vec<String> = query
                .filters
                .iter()
                .map(|p| self.render_predicate(p))
                .collect();
            clauses.push(format!("WHERE {}", filters.join(&format!("{cont}AND "))));
        }

        if !query.group_by.is_empty() {
            let groups: Vec<String> = query.group_by.iter().map(|g| self.render_expr(g)).collect();
            clauses.push(format!("GROUP BY {}", groups.join(", ")));
        }

        if !query.order_by.is_empty() {
            let orders: Vec<String> = query
                .order_by
                .iter()
                .map(|o| format!("{} {}", self.render_expr(&o.expr), o.direction.as_sql()))
                .collect();
            clauses.push(format!("ORDER BY {}", orders.join(", ")));
        }

        if let Some(limit) = query.limit {
            clauses.push(self.dialect.render_limit(limit, query.offset));
        }

        clauses.join(sep)
    }

    fn render_table(&self, table: &TableFactor) -> String {
        format!(
            "{} AS {}",
            self.dialect
                .qualify_table(&table.database, &table.schema, &table.name),
            self.dialect.quote_ident(&table.alias)
        )
    }

    fn render_expr(&self, expr: &SqlExpr) -> String {
        match expr {
            SqlExpr::Column { table, name } => match table {
                Some(t) => format!(
                    "{}.{}",
                    self.dialect.quote_ident(t),
                    self.dialect.quote_ident(name)
                ),
                None => self.dialect.quote_ident(name),
            },
            SqlExpr::Wildcard => "*".to_string(),
            SqlExpr::Aggregate { func, arg } => {
                format!("{}({})", func.as_sql(), self.render_expr(arg))
            }
        }
    }

    fn render_literal(&self, literal: &SqlLiteral) -> String {
        match literal {
            SqlLiteral::String(s) => self.dialect.string_literal(s),
            SqlLiteral::Number(n) => n.clone(),
        }
    }

    fn render_predicate(&self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::Compare { left, op, right } => format!(
                "{} {} {}",
                self.render_expr(left),
                op.as_sql(),
                self.render_literal(right)
            ),
            Predicate::LikeContains { expr, value } => format!(
                "{} LIKE {}",
                self.render_expr(expr),
                self.dialect.like_contains(value)
            ),
            Predicate::IsNull { expr, negated } => {
                let kw = if *negated { "IS NOT NULL" } else { "IS NULL" };
                format!("{} {kw}", self.render_expr(expr))
            }
            Predicate::ColumnsEqual { left, right } => {
                format!("{} = {}", self.render_expr(left), self.render_expr(right))
            }
        }
    }
}
