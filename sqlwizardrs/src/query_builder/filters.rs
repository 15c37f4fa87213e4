use crate::dialect::Dialect;
use crate::models::{FilterOperator, FilterPredicate};
use crate::sql_ast::{Predicate, SqlExpr, SqlLiteral};
use crate::state::BuilderState;

use super::CompileWarning;

/// WHERE predicates, conjoined by the renderer.
///
/// Predicates without a column or (for value-taking operators) without a value are
/// skipped. A value that is not a number on a numeric column drops that predicate and
/// records a warning; the rest of the statement still compiles.
pub(crate) fn compile_filters(
    state: &BuilderState,
    dialect: &dyn Dialect,
    warnings: &mut Vec<CompileWarning>,
) -> Vec<Predicate> {
    state
        .filters()
        .iter()
        .filter_map(|filter| compile_filter(state, dialect, filter, warnings))
        .collect()
}

fn compile_filter(
    state: &BuilderState,
    dialect: &dyn Dialect,
    filter: &FilterPredicate,
    warnings: &mut Vec<CompileWarning>,
) -> Option<Predicate> {
    let fq_name = filter.column.as_deref()?;
    let Some(col) = state.column(fq_name) else {
        tracing::debug!(column = %fq_name, "filter column no longer available, skipping");
        return None;
    };
    let expr = SqlExpr::column(&col.table_alias, &col.column);

    match filter.operator {
        FilterOperator::IsNull => return Some(Predicate::IsNull { expr, negated: false }),
        FilterOperator::IsNotNull => return Some(Predicate::IsNull { expr, negated: true }),
        _ => {}
    }

    if filter.value.is_empty() {
        return None;
    }

    if filter.operator == FilterOperator::Like {
        return Some(Predicate::LikeContains {
            expr,
            value: filter.value.clone(),
        });
    }

    let right = if col.is_numeric() {
        match dialect.numeric_literal(&filter.value) {
            Some(n) => SqlLiteral::Number(n),
            None => {
                tracing::warn!(
                    column = %col.fq_name,
                    data_type = %col.data_type,
                    value = %filter.value,
                    "non-numeric value on numeric column, predicate dropped"
                );
                warnings.push(CompileWarning::DroppedNonNumericValue {
                    column: col.fq_name.clone(),
                    value: filter.value.clone(),
                });
                return None;
            }
        }
    } else {
        SqlLiteral::String(filter.value.clone())
    };

    Some(Predicate::Compare {
        left: expr,
        op: filter.operator,
        right,
    })
}
