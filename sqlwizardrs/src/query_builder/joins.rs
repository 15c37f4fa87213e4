use crate::error::{Result, WizardError};
use crate::ident::sanitize_ident;
use crate::models::AliasedTable;
use crate::sql_ast::{Join, Predicate, SqlExpr, TableFactor};
use crate::state::BuilderState;

use super::aliases::TableAliases;

fn table_factor(aliased: &AliasedTable) -> TableFactor {
    TableFactor {
        database: sanitize_ident(&aliased.table.database),
        schema: sanitize_ident(&aliased.table.schema),
        name: sanitize_ident(&aliased.table.name),
        alias: aliased.alias.clone(),
    }
}

/// FROM plus the join chain, each step's left side being the previous step's alias.
pub(crate) fn compile_from(
    state: &BuilderState,
    aliases: &TableAliases,
) -> Result<(TableFactor, Vec<Join>)> {
    let from = table_factor(&aliases.base);
    let mut left_alias = aliases.base.alias.as_str();
    let mut joins = Vec::with_capacity(state.join_steps().len());

    for (step, right) in state.join_steps().iter().zip(&aliases.joins) {
        let right = right.as_ref().ok_or_else(|| {
            WizardError::Validation(format!("join step {} has no table selected", step.id))
        })?;
        let on = step
            .left_keys
            .iter()
            .zip(&step.right_keys)
            .map(|(lk, rk)| Predicate::ColumnsEqual {
                left: SqlExpr::column(left_alias, lk),
                right: SqlExpr::column(&right.alias, rk),
            })
            .collect();
        joins.push(Join {
            kind: step.kind,
            table: table_factor(right),
            on,
        });
        left_alias = right.alias.as_str();
    }

    Ok((from, joins))
}
