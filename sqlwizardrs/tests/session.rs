//! Session flow against hand-written fake collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map};

use sqlwizard::error::Result;
use sqlwizard::executor::ColumnMeta;
use sqlwizard::pagination::Cursor;
use sqlwizard::{
    AggregateFunction, AggregateTarget, CatalogTarget, ColumnInfo, ExportFormat, FilterOperator,
    JoinKind, QueryExecutor, QueryResult, SchemaCatalog, Session, TableRef, WizardConfig,
    WizardError, WizardStage,
};

const TOTAL_ROWS: u64 = 5;

/// Serves `TOTAL_ROWS` rows, honouring a trailing `LIMIT n [OFFSET m]`, and records
/// every statement it receives.
#[derive(Default)]
struct FakeWarehouse {
    executed: Mutex<Vec<String>>,
    fail_with: Option<String>,
}

impl FakeWarehouse {
    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

fn limit_offset(sql: &str) -> (Option<u64>, u64) {
    let tokens: Vec<&str> = sql.split_whitespace().collect();
    let value_after = |kw: &str| {
        tokens
            .iter()
            .position(|t| *t == kw)
            .and_then(|i| tokens.get(i + 1))
            .and_then(|v| v.parse::<u64>().ok())
    };
    (value_after("LIMIT"), value_after("OFFSET").unwrap_or(0))
}

#[async_trait]
impl QueryExecutor for FakeWarehouse {
    async fn execute_sql(&self, sql: &str) -> Result<QueryResult> {
        self.executed.lock().unwrap().push(sql.to_string());
        if let Some(message) = &self.fail_with {
            return Err(WizardError::Execution(message.clone()));
        }
        if sql.starts_with("SELECT COUNT(*) AS \"CNT\"") {
            let mut row = Map::new();
            row.insert("CNT".to_string(), json!(TOTAL_ROWS));
            return Ok(QueryResult {
                columns: vec![ColumnMeta {
                    name: "CNT".to_string(),
                }],
                rows: vec![row],
            });
        }
        let (limit, offset) = limit_offset(sql);
        let end = limit.map_or(TOTAL_ROWS, |l| (offset + l).min(TOTAL_ROWS));
        let rows = (offset.min(TOTAL_ROWS)..end)
            .map(|i| {
                let mut row = Map::new();
                row.insert("ORDERS.ID".to_string(), json!(i + 1));
                row
            })
            .collect();
        Ok(QueryResult {
            columns: vec![ColumnMeta {
                name: "ORDERS.ID".to_string(),
            }],
            rows,
        })
    }
}

#[async_trait]
impl SchemaCatalog for FakeWarehouse {
    async fn list_selectable_objects(
        &self,
        database: &str,
        schema: &str,
    ) -> Result<Vec<TableRef>> {
        Ok(vec![
            TableRef::new(database, schema, "ORDERS"),
            TableRef::new(database, schema, "CUSTOMERS"),
        ])
    }

    async fn list_columns(&self, table: &TableRef) -> Result<Vec<ColumnInfo>> {
        let info = |name: &str, data_type: &str| ColumnInfo {
            name: name.to_string(),
            data_type: data_type.to_string(),
            comment: None,
        };
        Ok(match table.name.as_str() {
            "ORDERS" => vec![info("ID", "NUMBER"), info("CUSTOMER_ID", "NUMBER")],
            "CUSTOMERS" => vec![info("ID", "NUMBER"), info("NAME", "TEXT")],
            _ => Vec::new(),
        })
    }
}

fn session(warehouse: Arc<FakeWarehouse>) -> Session {
    let mut config = WizardConfig::default();
    config.targets.push(CatalogTarget::new("DB", "SALES"));
    config.query.preview_row_limit = 3;
    config.query.page_size = 2;
    Session::with_backend(warehouse, config)
}

async fn orders_session(warehouse: Arc<FakeWarehouse>) -> Session {
    let mut session = session(warehouse);
    let state = session.state_mut();
    state.set_base_table(TableRef::new("DB", "SALES", "ORDERS"));
    session.confirm_tables().await.unwrap();
    session.state_mut().select_column("ORDERS.ID").unwrap();
    session.state_mut().confirm_filters().unwrap();
    session
}

#[tokio::test]
async fn lists_objects_for_configured_targets() {
    let session = session(Arc::new(FakeWarehouse::default()));
    let objects = session.allowed_objects().await;
    let names: Vec<_> = objects.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["CUSTOMERS", "ORDERS"]);
}

#[tokio::test]
async fn confirm_tables_uses_statement_aliases() {
    let mut session = session(Arc::new(FakeWarehouse::default()));
    let state = session.state_mut();
    state.set_base_table(TableRef::new("DB", "SALES", "ORDERS"));
    let join = state.add_join_step();
    state
        .set_join_table(join, TableRef::new("DB", "SALES", "ORDERS"))
        .unwrap();

    let (left, right) = session.join_key_candidates(join).await.unwrap();
    assert_eq!(left, vec!["ID", "CUSTOMER_ID"]);
    assert_eq!(right, vec!["ID", "CUSTOMER_ID"]);

    session.confirm_tables().await.unwrap();
    let names: Vec<_> = session
        .state()
        .available_columns()
        .iter()
        .map(|c| c.fq_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["ORDERS.ID", "ORDERS.CUSTOMER_ID", "ORDERS_2.ID", "ORDERS_2.CUSTOMER_ID"]
    );
    assert_eq!(session.state().stage(), WizardStage::DefiningFilters);
}

#[tokio::test]
async fn generate_runs_capped_preview() {
    let warehouse = Arc::new(FakeWarehouse::default());
    let mut session = orders_session(warehouse.clone()).await;

    let preview = session.generate().await.unwrap();
    assert_eq!(preview.len(), 3);
    assert_eq!(session.state().stage(), WizardStage::Compiled);

    let executed = warehouse.executed();
    assert_eq!(
        executed,
        vec![r#"SELECT "ORDERS"."ID" AS "ORDERS.ID" FROM "DB"."SALES"."ORDERS" AS "ORDERS" LIMIT 3"#]
    );
    let compiled = session.state().compiled().unwrap();
    assert!(!compiled.sql.contains("LIMIT"));
    assert_eq!(
        session.pretty_sql().unwrap(),
        "SELECT \"ORDERS\".\"ID\" AS \"ORDERS.ID\"\nFROM \"DB\".\"SALES\".\"ORDERS\" AS \"ORDERS\""
    );
}

#[tokio::test]
async fn validation_failure_clears_previous_statement() {
    let mut session = orders_session(Arc::new(FakeWarehouse::default())).await;
    session.generate().await.unwrap();

    session.state_mut().deselect_column("ORDERS.ID").unwrap();
    let err = session.generate().await.unwrap_err();
    assert!(err.is_validation());
    assert!(session.state().compiled().is_none());
    assert!(session.state().preview().is_none());
    assert_eq!(session.state().stage(), WizardStage::DefiningAggregation);
}

#[tokio::test]
async fn execution_error_is_surfaced_and_clears_state() {
    let warehouse = Arc::new(FakeWarehouse::failing("SQL compilation error: invalid identifier"));
    let mut session = orders_session(warehouse.clone()).await;

    match session.generate().await {
        Err(WizardError::Execution(message)) => {
            assert_eq!(message, "SQL compilation error: invalid identifier")
        }
        other => panic!("expected execution error, got {other:?}"),
    }
    assert!(session.state().compiled().is_none());
    assert_eq!(warehouse.executed().len(), 1);
}

#[tokio::test]
async fn dropped_filter_still_executes() {
    let warehouse = Arc::new(FakeWarehouse::default());
    let mut session = orders_session(warehouse.clone()).await;
    let filter = session.state_mut().add_filter().unwrap();
    session
        .state_mut()
        .update_filter(filter, Some("ORDERS.ID".into()), FilterOperator::Gt, "abc")
        .unwrap();

    session.generate().await.unwrap();
    let compiled = session.state().compiled().unwrap();
    assert_eq!(compiled.warnings.len(), 1);
    assert!(!warehouse.executed()[0].contains("WHERE"));
}

#[tokio::test]
async fn count_rows_and_export() {
    let warehouse = Arc::new(FakeWarehouse::default());
    let mut session = orders_session(warehouse.clone()).await;
    session.generate().await.unwrap();

    assert_eq!(session.count_rows().await.unwrap(), TOTAL_ROWS);

    let batch = session.export(ExportFormat::Csv).await.unwrap();
    assert_eq!(batch.format, ExportFormat::Csv);
    assert_eq!(batch.result.len() as u64, TOTAL_ROWS);

    let executed = warehouse.executed();
    assert_eq!(
        executed[1],
        r#"SELECT COUNT(*) AS "CNT" FROM "DB"."SALES"."ORDERS" AS "ORDERS""#
    );
    assert!(!executed[2].contains("LIMIT"));
}

#[tokio::test]
async fn count_rows_rejects_aggregated_statement() {
    let mut session = orders_session(Arc::new(FakeWarehouse::default())).await;
    session
        .state_mut()
        .add_aggregation(AggregateFunction::Count, AggregateTarget::All)
        .unwrap();
    session.generate().await.unwrap();
    assert!(session.count_rows().await.unwrap_err().is_validation());
}

#[tokio::test]
async fn operations_need_a_compiled_statement() {
    let session = orders_session(Arc::new(FakeWarehouse::default())).await;
    assert!(matches!(
        session.export(ExportFormat::Xlsx).await,
        Err(WizardError::Transition(_))
    ));
    assert!(matches!(
        session.fetch_page(None, None).await,
        Err(WizardError::Transition(_))
    ));
}

#[tokio::test]
async fn pages_through_results_with_cursors() {
    let mut session = orders_session(Arc::new(FakeWarehouse::default())).await;
    session.generate().await.unwrap();

    let first = session.fetch_page(None, None).await.unwrap();
    assert_eq!(first.result.len(), 2);
    let cursor = first.next_cursor.unwrap();

    let second = session.fetch_page(None, Some(&cursor)).await.unwrap();
    assert_eq!(second.result.rows[0]["ORDERS.ID"], json!(3));
    let cursor = second.next_cursor.unwrap();

    let last = session.fetch_page(None, Some(&cursor)).await.unwrap();
    assert_eq!(last.result.len(), 1);
    assert!(last.next_cursor.is_none());
}

#[tokio::test]
async fn cursor_from_another_statement_is_rejected() {
    let mut session = orders_session(Arc::new(FakeWarehouse::default())).await;
    session.generate().await.unwrap();

    let foreign = Cursor::new(2, 42).encode().unwrap();
    let err = session.fetch_page(None, Some(&foreign)).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn table_change_after_compile_starts_over() {
    let mut session = orders_session(Arc::new(FakeWarehouse::default())).await;
    session.generate().await.unwrap();

    let state = session.state_mut();
    let join = state.add_join_step();
    assert_eq!(state.stage(), WizardStage::SelectingTables);
    state
        .set_join_table(join, TableRef::new("DB", "SALES", "CUSTOMERS"))
        .unwrap();
    state
        .set_join_keys(join, vec!["CUSTOMER_ID".into()], vec!["ID".into()])
        .unwrap();
    state.set_join_kind(join, JoinKind::Left).unwrap();
    assert!(state.selected_columns().is_empty());
    assert!(state.compiled().is_none());

    session.confirm_tables().await.unwrap();
    session.state_mut().select_column("CUSTOMERS.NAME").unwrap();
    session.state_mut().confirm_filters().unwrap();
    session.generate().await.unwrap();
    assert!(session
        .state()
        .compiled()
        .unwrap()
        .sql
        .contains(r#"LEFT JOIN "DB"."SALES"."CUSTOMERS" AS "CUSTOMERS" ON "ORDERS"."CUSTOMER_ID" = "CUSTOMERS"."ID""#));
}
