//! Builder state and the wizard's state machine.
//!
//! A `BuilderState` is owned by exactly one session and mutated only through the
//! transition methods below. Each method checks that the current stage allows it
//! and applies the invalidation rules:
//!
//! * changing the table set (base table, adding/removing a join step, changing a
//!   join's table) drops the derived columns and everything that references them
//!   and returns to [`WizardStage::SelectingTables`];
//! * any other edit after compilation drops the compiled statement and preview and
//!   returns to [`WizardStage::DefiningAggregation`].

use std::fmt;

use crate::error::{Result, WizardError};
use crate::executor::QueryResult;
use crate::models::{
    AggregateFunction, AggregateTarget, AggregationStep, ColumnRef, FilterOperator,
    FilterPredicate, JoinKind, JoinStep, OrderByStep, SortDirection, StepId, TableRef,
};
use crate::query_builder::CompiledStatement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum WizardStage {
    #[default]
    SelectingTables,
    DefiningFilters,
    DefiningAggregation,
    Compiled,
}

impl fmt::Display for WizardStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WizardStage::SelectingTables => "selecting tables",
            WizardStage::DefiningFilters => "defining filters",
            WizardStage::DefiningAggregation => "defining aggregation",
            WizardStage::Compiled => "compiled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuilderState {
    stage: WizardStage,
    base_table: Option<TableRef>,
    join_steps: Vec<JoinStep>,
    available_columns: Vec<ColumnRef>,
    filters: Vec<FilterPredicate>,
    selected_columns: Vec<String>,
    aggregations: Vec<AggregationStep>,
    order_by: Vec<OrderByStep>,
    compiled: Option<CompiledStatement>,
    preview: Option<QueryResult>,
    next_id: StepId,
}

impl BuilderState {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn stage(&self) -> WizardStage {
        self.stage
    }

    pub fn base_table(&self) -> Option<&TableRef> {
        self.base_table.as_ref()
    }

    pub fn join_steps(&self) -> &[JoinStep] {
        &self.join_steps
    }

    pub fn available_columns(&self) -> &[ColumnRef] {
        &self.available_columns
    }

    pub fn filters(&self) -> &[FilterPredicate] {
        &self.filters
    }

    pub fn selected_columns(&self) -> &[String] {
        &self.selected_columns
    }

    pub fn aggregations(&self) -> &[AggregationStep] {
        &self.aggregations
    }

    pub fn order_by(&self) -> &[OrderByStep] {
        &self.order_by
    }

    pub fn compiled(&self) -> Option<&CompiledStatement> {
        self.compiled.as_ref()
    }

    pub fn preview(&self) -> Option<&QueryResult> {
        self.preview.as_ref()
    }

    pub fn is_aggregated(&self) -> bool {
        !self.aggregations.is_empty()
    }

    pub fn column(&self, fq_name: &str) -> Option<&ColumnRef> {
        self.available_columns.iter().find(|c| c.fq_name == fq_name)
    }

    /// Table on the left side of a join step: the previous step's table, or the base
    /// table for the first step.
    pub fn join_left_table(&self, id: StepId) -> Option<&TableRef> {
        let idx = self.join_steps.iter().position(|s| s.id == id)?;
        if idx == 0 {
            self.base_table.as_ref()
        } else {
            self.join_steps[idx - 1].right_table.as_ref()
        }
    }

    /// Output names ORDER BY may refer to: selected columns, then non-empty
    /// aggregation aliases.
    pub fn order_by_candidates(&self) -> Vec<String> {
        self.selected_columns
            .iter()
            .cloned()
            .chain(
                self.aggregations
                    .iter()
                    .filter(|a| !a.alias.is_empty())
                    .map(|a| a.alias.clone()),
            )
            .collect()
    }

    // ------------------------------------------------------------------
    // Table selection
    // ------------------------------------------------------------------

    /// Choosing a new base table discards the join chain.
    pub fn set_base_table(&mut self, table: TableRef) {
        tracing::debug!(table = %table, "base table selected");
        self.base_table = Some(table);
        self.join_steps.clear();
        self.reset_tables();
    }

    /// Appends an empty step to the end of the join chain.
    pub fn add_join_step(&mut self) -> StepId {
        let id = self.allocate_id();
        self.join_steps.push(JoinStep::new(id));
        self.reset_tables();
        id
    }

    pub fn remove_join_step(&mut self, id: StepId) -> Result<()> {
        let idx = self
            .join_steps
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| unknown_step("join", id))?;
        self.join_steps.remove(idx);
        self.reset_tables();
        Ok(())
    }

    pub fn set_join_table(&mut self, id: StepId, table: TableRef) -> Result<()> {
        let step = self.join_step_mut(id)?;
        step.right_table = Some(table);
        self.reset_tables();
        Ok(())
    }

    pub fn set_join_keys(
        &mut self,
        id: StepId,
        left_keys: Vec<String>,
        right_keys: Vec<String>,
    ) -> Result<()> {
        if !left_keys.is_empty() && !right_keys.is_empty() && left_keys.len() != right_keys.len() {
            tracing::warn!(
                step = id,
                left = left_keys.len(),
                right = right_keys.len(),
                "join key counts differ"
            );
        }
        let step = self.join_step_mut(id)?;
        step.left_keys = left_keys;
        step.right_keys = right_keys;
        self.invalidate_compiled();
        Ok(())
    }

    pub fn set_join_kind(&mut self, id: StepId, kind: JoinKind) -> Result<()> {
        self.join_step_mut(id)?.kind = kind;
        self.invalidate_compiled();
        Ok(())
    }

    /// Fix the table set: install the columns derived from it and move on to
    /// filtering. Filters, selections, aggregations and ordering start over.
    pub fn confirm_tables(&mut self, columns: Vec<ColumnRef>) -> Result<()> {
        if self.base_table.is_none() {
            return Err(WizardError::Validation(
                "base table not selected".to_string(),
            ));
        }
        self.reset_tables();
        tracing::debug!(columns = columns.len(), "table set confirmed");
        self.available_columns = columns;
        self.stage = WizardStage::DefiningFilters;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Filters and output columns
    // ------------------------------------------------------------------

    /// Appends a `LIKE` predicate with no column or value.
    pub fn add_filter(&mut self) -> Result<StepId> {
        self.require(WizardStage::DefiningFilters, "add a filter")?;
        let id = self.allocate_id();
        self.filters.push(FilterPredicate {
            id,
            column: None,
            operator: FilterOperator::default(),
            value: String::new(),
        });
        self.invalidate_compiled();
        Ok(id)
    }

    pub fn update_filter(
        &mut self,
        id: StepId,
        column: Option<String>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Result<()> {
        self.require(WizardStage::DefiningFilters, "edit a filter")?;
        if let Some(fq) = &column {
            self.require_column(fq)?;
        }
        let filter = self
            .filters
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| unknown_step("filter", id))?;
        filter.column = column;
        filter.operator = operator;
        filter.value = value.into();
        self.invalidate_compiled();
        Ok(())
    }

    pub fn remove_filter(&mut self, id: StepId) -> Result<()> {
        self.require(WizardStage::DefiningFilters, "remove a filter")?;
        let before = self.filters.len();
        self.filters.retain(|f| f.id != id);
        if self.filters.len() == before {
            return Err(unknown_step("filter", id));
        }
        self.invalidate_compiled();
        Ok(())
    }

    /// Adds an output column; selecting an already selected column is a no-op.
    pub fn select_column(&mut self, fq_name: &str) -> Result<()> {
        self.require(WizardStage::DefiningFilters, "select a column")?;
        self.require_column(fq_name)?;
        if !self.selected_columns.iter().any(|c| c == fq_name) {
            self.selected_columns.push(fq_name.to_string());
            self.invalidate_compiled();
        }
        Ok(())
    }

    pub fn deselect_column(&mut self, fq_name: &str) -> Result<()> {
        self.require(WizardStage::DefiningFilters, "deselect a column")?;
        let before = self.selected_columns.len();
        self.selected_columns.retain(|c| c != fq_name);
        if self.selected_columns.len() != before {
            self.invalidate_compiled();
        }
        Ok(())
    }

    pub fn confirm_filters(&mut self) -> Result<()> {
        self.require(WizardStage::DefiningFilters, "confirm filters")?;
        if self.stage == WizardStage::DefiningFilters {
            self.stage = WizardStage::DefiningAggregation;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Aggregation and ordering
    // ------------------------------------------------------------------

    /// Adds an aggregation with its default alias (e.g. `COUNT_ALL`).
    pub fn add_aggregation(
        &mut self,
        function: AggregateFunction,
        target: AggregateTarget,
    ) -> Result<StepId> {
        self.require(WizardStage::DefiningAggregation, "add an aggregation")?;
        let id = self.allocate_id();
        self.aggregations
            .push(AggregationStep::new(id, function, target));
        self.invalidate_compiled();
        Ok(id)
    }

    pub fn update_aggregation(
        &mut self,
        id: StepId,
        function: AggregateFunction,
        target: AggregateTarget,
        alias: impl Into<String>,
    ) -> Result<()> {
        self.require(WizardStage::DefiningAggregation, "edit an aggregation")?;
        let step = self
            .aggregations
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| unknown_step("aggregation", id))?;
        step.function = function;
        step.target = target;
        step.alias = alias.into();
        self.invalidate_compiled();
        Ok(())
    }

    pub fn remove_aggregation(&mut self, id: StepId) -> Result<()> {
        self.require(WizardStage::DefiningAggregation, "remove an aggregation")?;
        let before = self.aggregations.len();
        self.aggregations.retain(|a| a.id != id);
        if self.aggregations.len() == before {
            return Err(unknown_step("aggregation", id));
        }
        self.invalidate_compiled();
        Ok(())
    }

    pub fn add_order_by(&mut self) -> Result<StepId> {
        self.require(WizardStage::DefiningAggregation, "add an ordering")?;
        let id = self.allocate_id();
        self.order_by.push(OrderByStep {
            id,
            column: String::new(),
            direction: SortDirection::default(),
        });
        self.invalidate_compiled();
        Ok(id)
    }

    pub fn update_order_by(
        &mut self,
        id: StepId,
        column: impl Into<String>,
        direction: SortDirection,
    ) -> Result<()> {
        self.require(WizardStage::DefiningAggregation, "edit an ordering")?;
        let step = self
            .order_by
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| unknown_step("order", id))?;
        step.column = column.into();
        step.direction = direction;
        self.invalidate_compiled();
        Ok(())
    }

    pub fn remove_order_by(&mut self, id: StepId) -> Result<()> {
        self.require(WizardStage::DefiningAggregation, "remove an ordering")?;
        let before = self.order_by.len();
        self.order_by.retain(|o| o.id != id);
        if self.order_by.len() == before {
            return Err(unknown_step("order", id));
        }
        self.invalidate_compiled();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Compilation results
    // ------------------------------------------------------------------

    pub fn mark_compiled(&mut self, compiled: CompiledStatement) -> Result<()> {
        self.require(WizardStage::DefiningAggregation, "compile")?;
        self.compiled = Some(compiled);
        self.preview = None;
        self.stage = WizardStage::Compiled;
        Ok(())
    }

    pub fn record_preview(&mut self, preview: QueryResult) -> Result<()> {
        if self.stage != WizardStage::Compiled {
            return Err(WizardError::Transition(format!(
                "cannot record a preview while {}",
                self.stage
            )));
        }
        self.preview = Some(preview);
        Ok(())
    }

    /// A compile or execution attempt failed: back to "not yet generated".
    pub fn record_failure(&mut self) {
        self.invalidate_compiled();
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn allocate_id(&mut self) -> StepId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn join_step_mut(&mut self, id: StepId) -> Result<&mut JoinStep> {
        self.join_steps
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| unknown_step("join", id))
    }

    fn require(&self, at_least: WizardStage, action: &str) -> Result<()> {
        if self.stage < at_least {
            return Err(WizardError::Transition(format!(
                "cannot {action} while {}",
                self.stage
            )));
        }
        Ok(())
    }

    fn require_column(&self, fq_name: &str) -> Result<()> {
        if self.column(fq_name).is_none() {
            return Err(WizardError::Validation(format!(
                "unknown column {fq_name}"
            )));
        }
        Ok(())
    }

    fn reset_tables(&mut self) {
        self.available_columns.clear();
        self.filters.clear();
        self.selected_columns.clear();
        self.aggregations.clear();
        self.order_by.clear();
        self.compiled = None;
        self.preview = None;
        self.stage = WizardStage::SelectingTables;
    }

    fn invalidate_compiled(&mut self) {
        self.compiled = None;
        self.preview = None;
        if self.stage == WizardStage::Compiled {
            self.stage = WizardStage::DefiningAggregation;
        }
    }
}

fn unknown_step(kind: &str, id: StepId) -> WizardError {
    WizardError::Validation(format!("unknown {kind} step {id}"))
}
