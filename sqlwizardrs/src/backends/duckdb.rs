//! DuckDB backend implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

use crate::catalog::{ColumnInfo, SchemaCatalog};
use crate::config::CatalogConfig;
use crate::error::{Result, WizardError};
use crate::executor::{ColumnMeta, QueryExecutor, QueryResult};
use crate::models::TableRef;

/// File-backed DuckDB database acting as both executor and catalog.
///
/// Statements run on the blocking pool; opened connections are kept and reused.
#[derive(Clone)]
pub struct DuckDbConnection {
    database_path: PathBuf,
    include_views: bool,
    limiter: Arc<Semaphore>,
    pool: Arc<Mutex<Vec<duckdb::Connection>>>,
}

impl DuckDbConnection {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        tracing::info!(path = %path.display(), max_concurrency = 16, "creating DuckDB connection");
        Self {
            database_path: path,
            include_views: true,
            limiter: Arc::new(Semaphore::new(16)),
            pool: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_max_concurrency(mut self, max_in_flight: usize) -> Self {
        tracing::debug!(max_concurrency = max_in_flight, "configuring DuckDB concurrency");
        self.limiter = Arc::new(Semaphore::new(max_in_flight));
        self
    }

    /// DuckDB has no materialized views; only `include_views` applies.
    pub fn with_catalog_config(mut self, config: &CatalogConfig) -> Self {
        self.include_views = config.include_views;
        self
    }

    /// Run raw SQL (DDL, inserts) outside the wizard, e.g. to seed a database.
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        let sql = sql.to_string();
        self.with_connection(move |conn| Ok(conn.execute_batch(&sql)?))
            .await
    }

    async fn acquire_slot(&self) -> Result<SemaphorePermit<'_>> {
        if self.limiter.available_permits() == 0 {
            tracing::debug!("all DuckDB slots in use, waiting for permit");
        }
        self.limiter
            .acquire()
            .await
            .map_err(|e| WizardError::Execution(format!("limiter closed: {e}")))
    }

    async fn checkout_connection(&self) -> Result<duckdb::Connection> {
        let mut guard = self.pool.lock().await;
        if let Some(conn) = guard.pop() {
            let pool_size = guard.len();
            drop(guard);
            tracing::trace!(pool_remaining = pool_size, "reusing pooled DuckDB connection");
            return Ok(conn);
        }
        drop(guard);
        tracing::debug!(path = %self.database_path.display(), "opening new DuckDB connection");
        duckdb::Connection::open(self.database_path.clone())
            .map_err(|e| WizardError::Execution(format!("open duckdb: {e}")))
    }

    /// Runs `f` on a pooled connection in the blocking pool; the connection goes back
    /// to the pool whether or not `f` succeeded.
    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&duckdb::Connection) -> Result<T> + Send + 'static,
    {
        let _permit = self.acquire_slot().await?;
        let conn = self.checkout_connection().await?;
        let (out, conn) = tokio::task::spawn_blocking(move || {
            let out = f(&conn);
            (out, conn)
        })
        .await
        .map_err(|e| WizardError::Execution(format!("task join error: {e}")))?;
        self.pool.lock().await.push(conn);
        out
    }
}

fn run_query(conn: &duckdb::Connection, sql: &str) -> Result<QueryResult> {
    let start = Instant::now();
    let mut stmt = conn.prepare(sql)?;
    let mut rows_iter = stmt.query([])?;
    let stmt_ref = rows_iter
        .as_ref()
        .ok_or_else(|| WizardError::Execution("statement missing".to_string()))?;
    let mut column_names = Vec::new();
    for idx in 0..stmt_ref.column_count() {
        let name = stmt_ref
            .column_name(idx)
            .map_err(|e| WizardError::Execution(e.to_string()))?;
        column_names.push(name.to_string());
    }
    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut map = serde_json::Map::new();
        for (idx, name) in column_names.iter().enumerate() {
            let value = crate::executor::duck_value_to_json(row.get_ref(idx)?.to_owned());
            map.insert(name.clone(), value);
        }
        rows.push(map);
    }

    let columns: Vec<_> = column_names
        .into_iter()
        .map(|name| ColumnMeta { name })
        .collect();
    tracing::debug!(
        rows = rows.len(),
        columns = columns.len(),
        ms = start.elapsed().as_millis(),
        "duckdb execute_sql"
    );
    Ok(QueryResult { columns, rows })
}

const TABLES_SQL: &str = "SELECT database_name, schema_name, table_name AS name \
     FROM duckdb_tables() WHERE database_name = ? AND schema_name = ? AND NOT internal";
const VIEWS_SQL: &str = "SELECT database_name, schema_name, view_name AS name \
     FROM duckdb_views() WHERE database_name = ? AND schema_name = ? AND NOT internal";
const COLUMNS_SQL: &str = "SELECT column_name, data_type, comment FROM duckdb_columns() \
     WHERE database_name = ? AND schema_name = ? AND table_name = ? ORDER BY column_index";

fn list_objects(
    conn: &duckdb::Connection,
    sql: &str,
    database: &str,
    schema: &str,
) -> Result<Vec<TableRef>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(duckdb::params![database, schema], |row| {
        Ok(TableRef::new(
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}

#[async_trait]
impl QueryExecutor for DuckDbConnection {
    async fn execute_sql(&self, sql: &str) -> Result<QueryResult> {
        let sql = sql.to_string();
        self.with_connection(move |conn| {
            run_query(conn, &sql).map_err(|e| match e {
                WizardError::DuckDb(err) => WizardError::Execution(err.to_string()),
                other => other,
            })
        })
        .await
    }
}

#[async_trait]
impl SchemaCatalog for DuckDbConnection {
    async fn list_selectable_objects(
        &self,
        database: &str,
        schema: &str,
    ) -> Result<Vec<TableRef>> {
        let (database, schema) = (database.to_string(), schema.to_string());
        let include_views = self.include_views;
        self.with_connection(move |conn| {
            let mut objects = list_objects(conn, TABLES_SQL, &database, &schema)?;
            if include_views {
                objects.extend(list_objects(conn, VIEWS_SQL, &database, &schema)?);
            }
            objects.sort();
            Ok(objects)
        })
        .await
    }

    async fn list_columns(&self, table: &TableRef) -> Result<Vec<ColumnInfo>> {
        let table = table.clone();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(COLUMNS_SQL)?;
            let rows = stmt.query_map(
                duckdb::params![table.database, table.schema, table.name],
                |row| {
                    Ok(ColumnInfo {
                        name: row.get(0)?,
                        data_type: row.get(1)?,
                        comment: row.get::<_, Option<String>>(2)?,
                    })
                },
            )?;
            let columns = rows.collect::<duckdb::Result<Vec<_>>>()?;
            tracing::debug!(table = %table, columns = columns.len(), "duckdb list_columns");
            Ok(columns)
        })
        .await
    }
}
