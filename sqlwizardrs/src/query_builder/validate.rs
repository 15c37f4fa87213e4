use std::collections::HashSet;

use crate::error::{Result, WizardError};
use crate::ident::sanitize_ident;
use crate::models::{AggregateFunction, AggregateTarget};
use crate::state::BuilderState;

/// Rejects every structurally invalid combination before any clause is compiled.
pub(crate) fn validate(state: &BuilderState) -> Result<()> {
    let base = state
        .base_table()
        .ok_or_else(|| WizardError::Validation("base table not selected".to_string()))?;
    if base.database.is_empty() || base.schema.is_empty() {
        return Err(WizardError::Validation(format!(
            "base table {} is missing database/schema metadata",
            base.name
        )));
    }

    for (idx, step) in state.join_steps().iter().enumerate() {
        let n = idx + 1;
        let table = step.right_table.as_ref().ok_or_else(|| {
            WizardError::Validation(format!("join step {n} has no table selected"))
        })?;
        if step.left_keys.is_empty() || step.right_keys.is_empty() {
            return Err(WizardError::Validation(format!(
                "join step {n} ({}) needs at least one key pair",
                table.name
            )));
        }
        if step.left_keys.len() != step.right_keys.len() {
            return Err(WizardError::Validation(format!(
                "join step {n} ({}) has {} left keys but {} right keys",
                table.name,
                step.left_keys.len(),
                step.right_keys.len()
            )));
        }
        if table.database.is_empty() || table.schema.is_empty() {
            return Err(WizardError::Validation(format!(
                "join table {} is missing database/schema metadata",
                table.name
            )));
        }
    }

    if state.aggregations().is_empty() {
        if state.selected_columns().is_empty() {
            return Err(WizardError::Validation(
                "select at least one output column".to_string(),
            ));
        }
        return Ok(());
    }

    let mut output_names = HashSet::new();
    for step in state.aggregations() {
        let alias = sanitize_ident(&step.alias);
        if alias.is_empty() {
            return Err(WizardError::Validation(format!(
                "aggregation {}({}) needs an alias",
                step.function.as_sql(),
                step.target
            )));
        }
        if !output_names.insert(alias.clone()) {
            return Err(WizardError::Validation(format!(
                "duplicate output name {alias}; give each aggregation a distinct alias"
            )));
        }
        match &step.target {
            AggregateTarget::All if step.function != AggregateFunction::Count => {
                return Err(WizardError::Validation(format!(
                    "{} cannot be applied to *",
                    step.function.as_sql()
                )));
            }
            AggregateTarget::Column(fq) if state.column(fq).is_none() => {
                return Err(WizardError::Validation(format!(
                    "aggregation column {fq} not found"
                )));
            }
            _ => {}
        }
    }

    Ok(())
}
