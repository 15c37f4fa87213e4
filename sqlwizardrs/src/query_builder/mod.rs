use std::fmt;

use crate::dialect::Dialect;
use crate::error::{Result, WizardError};
use crate::sql_ast::{Layout, SelectQuery, SqlRenderer};
use crate::state::BuilderState;

mod aliases;
mod filters;
mod joins;
mod order;
mod projection;
mod validate;

pub use aliases::{assign_aliases, AliasResolver, TableAliases};

/// Output name of the row-count column.
pub const ROW_COUNT_ALIAS: &str = "CNT";

/// Non-fatal problems found while compiling. The statement is still produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileWarning {
    /// A filter on a numeric column whose value is not a plain signed decimal.
    DroppedNonNumericValue { column: String, value: String },
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileWarning::DroppedNonNumericValue { column, value } => write!(
                f,
                "filter on {column} dropped: '{value}' is not a number"
            ),
        }
    }
}

/// A compiled statement: the executable text plus the tree it was rendered from.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub sql: String,
    pub query: SelectQuery,
    pub aggregated: bool,
    pub warnings: Vec<CompileWarning>,
}

impl CompiledStatement {
    /// Re-render with a different layout and/or a row cap. `sql` itself never
    /// carries a cap.
    pub fn render(
        &self,
        dialect: &dyn Dialect,
        layout: Layout,
        limit: Option<(u64, Option<u64>)>,
    ) -> String {
        let renderer = SqlRenderer::new(dialect).with_layout(layout);
        match limit {
            Some((limit, offset)) => {
                renderer.render_select(&self.query.clone().with_limit(limit, offset))
            }
            None => renderer.render_select(&self.query),
        }
    }

    pub fn pretty(&self, dialect: &dyn Dialect) -> String {
        self.render(dialect, Layout::Pretty, None)
    }

    /// `SELECT COUNT(*)` over the same FROM/JOIN/WHERE.
    pub fn row_count_sql(&self, dialect: &dyn Dialect) -> String {
        SqlRenderer::new(dialect).render_select(&self.query.to_row_count(ROW_COUNT_ALIAS))
    }
}

pub struct SqlBuilder;

impl Default for SqlBuilder {
    fn default() -> Self {
        Self
    }
}

impl SqlBuilder {
    /// Validate the state, assign aliases, compile every clause and render.
    ///
    /// Pure function of `state`: compiling an unchanged state twice yields identical
    /// text.
    pub fn compile(&self, state: &BuilderState, dialect: &dyn Dialect) -> Result<CompiledStatement> {
        validate::validate(state)?;

        let base = state
            .base_table()
            .ok_or_else(|| WizardError::Validation("base table not selected".to_string()))?;
        let aliases = assign_aliases(base, state.join_steps())?;

        let projection = projection::compile_projection(state)?;
        let (from, joins) = joins::compile_from(state, &aliases)?;
        let mut warnings = Vec::new();
        let filters = filters::compile_filters(state, dialect, &mut warnings);
        let order_by = order::compile_order(state);

        let query = SelectQuery {
            select: projection.select,
            from,
            joins,
            filters,
            group_by: projection.group_by,
            order_by,
            limit: None,
            offset: None,
        };
        let sql = SqlRenderer::new(dialect).render_select(&query);
        tracing::debug!(
            sql = %sql,
            aggregated = state.is_aggregated(),
            warnings = warnings.len(),
            "compiled statement"
        );

        Ok(CompiledStatement {
            sql,
            query,
            aggregated: state.is_aggregated(),
            warnings,
        })
    }
}
