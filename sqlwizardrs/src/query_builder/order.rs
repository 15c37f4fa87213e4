use crate::ident::sanitize_ident;
use crate::sql_ast::{OrderItem, SqlExpr};
use crate::state::BuilderState;

/// ORDER BY over output names. Steps with no column, or naming something that is not
/// an output of this statement, are ignored.
pub(crate) fn compile_order(state: &BuilderState) -> Vec<OrderItem> {
    let mut items = Vec::new();
    for step in state.order_by() {
        if step.column.is_empty() {
            continue;
        }
        let output = if state.selected_columns().iter().any(|c| c == &step.column) {
            step.column.clone()
        } else if let Some(agg) = state
            .aggregations()
            .iter()
            .find(|a| !a.alias.is_empty() && a.alias == step.column)
        {
            sanitize_ident(&agg.alias)
        } else {
            tracing::debug!(column = %step.column, "order column is not an output, skipping");
            continue;
        };
        items.push(OrderItem {
            expr: SqlExpr::output(output),
            direction: step.direction,
        });
    }
    items
}
