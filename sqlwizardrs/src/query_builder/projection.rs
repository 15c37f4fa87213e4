use crate::error::{Result, WizardError};
use crate::ident::sanitize_ident;
use crate::models::AggregateTarget;
use crate::sql_ast::{SelectItem, SqlExpr};
use crate::state::BuilderState;

pub(crate) struct Projection {
    pub select: Vec<SelectItem>,
    pub group_by: Vec<SqlExpr>,
}

/// SELECT list, plus GROUP BY when any aggregation is present.
///
/// In aggregation mode every selected column is also a grouping column.
pub(crate) fn compile_projection(state: &BuilderState) -> Result<Projection> {
    let aggregated = state.is_aggregated();
    let mut select = Vec::new();
    let mut group_by = Vec::new();

    for fq_name in state.selected_columns() {
        let Some(col) = state.column(fq_name) else {
            tracing::debug!(column = %fq_name, "selected column no longer available, skipping");
            continue;
        };
        let expr = SqlExpr::column(&col.table_alias, &col.column);
        if aggregated {
            group_by.push(expr.clone());
        }
        select.push(SelectItem {
            expr,
            alias: Some(col.fq_name.clone()),
        });
    }

    for step in state.aggregations() {
        let arg = match &step.target {
            AggregateTarget::All => SqlExpr::Wildcard,
            AggregateTarget::Column(fq) => {
                let col = state.column(fq).ok_or_else(|| {
                    WizardError::Validation(format!("aggregation column {fq} not found"))
                })?;
                SqlExpr::column(&col.table_alias, &col.column)
            }
        };
        select.push(SelectItem {
            expr: SqlExpr::Aggregate {
                func: step.function,
                arg: Box::new(arg),
            },
            alias: Some(sanitize_ident(&step.alias)),
        });
    }

    if select.is_empty() {
        return Err(WizardError::Validation(
            "nothing to select: no grouping columns and no aggregations".to_string(),
        ));
    }

    Ok(Projection { select, group_by })
}
