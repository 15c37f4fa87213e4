//! One browsing session: the builder state plus the collaborators it talks to.
//!
//! State edits are synchronous and go through [`Session::state_mut`]; everything
//! that reaches the warehouse (column discovery, preview, paging, export) is an async
//! method here.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::catalog::{allowed_objects, ColumnInfo, SchemaCatalog};
use crate::config::WizardConfig;
use crate::error::{Result, WizardError};
use crate::executor::{QueryExecutor, QueryResult};
use crate::models::{ColumnRef, StepId, TableRef};
use crate::pagination::{compute_statement_hash, Cursor, Page};
use crate::query_builder::{assign_aliases, CompiledStatement, SqlBuilder};
use crate::sql_ast::Layout;
use crate::state::BuilderState;

/// Format tag handed to the export layer together with the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Tsv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Full, uncapped result of the compiled statement, ready for serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportBatch {
    pub format: ExportFormat,
    pub result: QueryResult,
}

pub struct Session {
    state: BuilderState,
    config: WizardConfig,
    executor: Arc<dyn QueryExecutor>,
    catalog: Arc<dyn SchemaCatalog>,
    builder: SqlBuilder,
}

impl Session {
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        catalog: Arc<dyn SchemaCatalog>,
        config: WizardConfig,
    ) -> Self {
        Self {
            state: BuilderState::new(),
            config,
            executor,
            catalog,
            builder: SqlBuilder::default(),
        }
    }

    /// Session over a backend that is both executor and catalog.
    pub fn with_backend<B>(backend: Arc<B>, config: WizardConfig) -> Self
    where
        B: QueryExecutor + SchemaCatalog + 'static,
    {
        Self::new(backend.clone(), backend, config)
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut BuilderState {
        &mut self.state
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    /// Every object the configured targets expose.
    pub async fn allowed_objects(&self) -> Vec<TableRef> {
        allowed_objects(self.catalog.as_ref(), &self.config.targets).await
    }

    /// Column names offered as join keys for a step: the previous table's on the left,
    /// the step's own table on the right.
    pub async fn join_key_candidates(&self, id: StepId) -> Result<(Vec<String>, Vec<String>)> {
        let step = self
            .state
            .join_steps()
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| WizardError::Validation(format!("unknown join step {id}")))?;
        let left = match self.state.join_left_table(id) {
            Some(table) => self.column_names(table).await?,
            None => Vec::new(),
        };
        let right = match &step.right_table {
            Some(table) => self.column_names(table).await?,
            None => Vec::new(),
        };
        Ok((left, right))
    }

    async fn column_names(&self, table: &TableRef) -> Result<Vec<String>> {
        Ok(self
            .catalog
            .list_columns(table)
            .await?
            .into_iter()
            .map(|c: ColumnInfo| c.name)
            .collect())
    }

    /// Fix the table set: look up every table's columns under the alias it will get
    /// in the statement and hand them to the state.
    pub async fn confirm_tables(&mut self) -> Result<()> {
        let base = self
            .state
            .base_table()
            .ok_or_else(|| WizardError::Validation("base table not selected".to_string()))?;
        let aliases = assign_aliases(base, self.state.join_steps())?;

        let mut columns = Vec::new();
        for aliased in aliases.tables() {
            let infos = self.catalog.list_columns(&aliased.table).await?;
            columns.extend(
                infos
                    .iter()
                    .map(|info| ColumnRef::from_catalog(&aliased.alias, &aliased.table.name, info)),
            );
        }
        self.state.confirm_tables(columns)
    }

    /// Compile the current state. On failure the previous statement and preview are
    /// discarded.
    pub fn compile(&mut self) -> Result<&CompiledStatement> {
        let compiled = match self.builder.compile(&self.state, self.executor.dialect()) {
            Ok(compiled) => compiled,
            Err(e) => {
                tracing::warn!(error = %e, "compile failed");
                self.state.record_failure();
                return Err(e);
            }
        };
        for warning in &compiled.warnings {
            tracing::warn!(%warning, "compile warning");
        }
        self.state.mark_compiled(compiled)?;
        self.compiled()
    }

    /// Compile and run a capped preview. Any failure clears the statement and
    /// preview; execution errors are returned with the backend's message.
    pub async fn generate(&mut self) -> Result<&QueryResult> {
        self.compile()?;
        let sql = {
            let compiled = self.compiled()?;
            compiled.render(
                self.executor.dialect(),
                Layout::Compact,
                Some((self.config.query.preview_row_limit, None)),
            )
        };

        let start = Instant::now();
        match self.executor.execute_sql(&sql).await {
            Ok(result) => {
                tracing::debug!(
                    rows = result.len(),
                    ms = start.elapsed().as_millis(),
                    "preview executed"
                );
                self.state.record_preview(result)?;
                self.state
                    .preview()
                    .ok_or_else(|| WizardError::Execution("preview not recorded".to_string()))
            }
            Err(e) => {
                tracing::error!(error = %e, sql = %sql, "preview execution failed");
                self.state.record_failure();
                Err(e)
            }
        }
    }

    /// The compiled statement laid out one clause per line.
    pub fn pretty_sql(&self) -> Option<String> {
        self.state
            .compiled()
            .map(|c| c.pretty(self.executor.dialect()))
    }

    /// Total rows the compiled statement returns, without fetching them.
    pub async fn count_rows(&self) -> Result<u64> {
        let compiled = self.compiled()?;
        if compiled.aggregated {
            return Err(WizardError::Validation(
                "row count is not available for aggregated statements".to_string(),
            ));
        }
        let sql = compiled.row_count_sql(self.executor.dialect());
        let result = self.run(&sql, "row count").await?;
        let count = result.scalar().and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        });
        count.ok_or_else(|| WizardError::Execution("row count returned no number".to_string()))
    }

    /// One page of the compiled statement. `cursor` must come from an earlier page of
    /// the same statement.
    pub async fn fetch_page(&self, page_size: Option<u32>, cursor: Option<&str>) -> Result<Page> {
        let compiled = self.compiled()?;
        let page_size = u64::from(page_size.unwrap_or(self.config.query.page_size).max(1));
        let statement_hash = compute_statement_hash(&compiled.sql);
        let offset = match cursor {
            Some(encoded) => {
                let cursor = Cursor::decode(encoded)?;
                cursor.validate_statement_hash(statement_hash)?;
                cursor.offset
            }
            None => 0,
        };

        // One extra row tells whether another page follows.
        let sql = compiled.render(
            self.executor.dialect(),
            Layout::Compact,
            Some((page_size + 1, Some(offset))),
        );
        let mut result = self.run(&sql, "page").await?;
        let next_cursor = if result.rows.len() as u64 > page_size {
            result.rows.truncate(page_size as usize);
            Some(Cursor::new(offset + page_size, statement_hash).encode()?)
        } else {
            None
        };
        Ok(Page {
            result,
            next_cursor,
        })
    }

    /// Run the compiled statement without a row cap for the export layer.
    pub async fn export(&self, format: ExportFormat) -> Result<ExportBatch> {
        let compiled = self.compiled()?;
        let result = self.run(&compiled.sql, "export").await?;
        tracing::info!(rows = result.len(), %format, "export batch ready");
        Ok(ExportBatch { format, result })
    }

    fn compiled(&self) -> Result<&CompiledStatement> {
        self.state.compiled().ok_or_else(|| {
            WizardError::Transition(format!(
                "no compiled statement while {}",
                self.state.stage()
            ))
        })
    }

    async fn run(&self, sql: &str, what: &str) -> Result<QueryResult> {
        let start = Instant::now();
        match self.executor.execute_sql(sql).await {
            Ok(result) => {
                tracing::debug!(
                    rows = result.len(),
                    ms = start.elapsed().as_millis(),
                    "{what} executed"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::error!(error = %e, sql = %sql, "{what} execution failed");
                Err(e)
            }
        }
    }
}
