//! Catalog backed by the warehouse's `INFORMATION_SCHEMA` views.
//!
//! Selectable objects are resolved through the session's enabled roles and their
//! object privileges, so no `SHOW` commands are needed.

use async_trait::async_trait;

use crate::config::CatalogConfig;
use crate::dialect::{AnsiDialect, Dialect};
use crate::error::{Result, WizardError};
use crate::executor::{QueryExecutor, QueryResult};
use crate::ident::sanitize_ident;
use crate::models::TableRef;

use super::{ColumnInfo, SchemaCatalog};

pub struct InformationSchemaCatalog<E> {
    executor: E,
    include_views: bool,
    include_materialized_views: bool,
    dialect: AnsiDialect,
}

impl<E: QueryExecutor> InformationSchemaCatalog<E> {
    pub fn new(executor: E, config: &CatalogConfig) -> Self {
        Self {
            executor,
            include_views: config.include_views,
            include_materialized_views: config.include_materialized_views,
            dialect: AnsiDialect,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Roles enabled for the current session, inherited ones included.
    ///
    /// A failing lookup yields no roles rather than an error; the caller then
    /// sees no objects for that database.
    pub async fn enabled_roles(&self, database: &str) -> Vec<String> {
        let database = sanitize_ident(database);
        let sql = format!("SELECT ROLE_NAME FROM {database}.INFORMATION_SCHEMA.ENABLED_ROLES");
        match self.executor.execute_sql(&sql).await {
            Ok(result) => result
                .rows
                .iter()
                .filter_map(|row| QueryResult::cell_str(row, "ROLE_NAME"))
                .map(str::to_string)
                .collect(),
            Err(e) => {
                tracing::warn!(database = %database, error = %e, "role lookup failed");
                Vec::new()
            }
        }
    }

    fn object_types(&self) -> Vec<&'static str> {
        let mut types = vec!["TABLE"];
        if self.include_views {
            types.push("VIEW");
        }
        if self.include_materialized_views {
            types.push("MATERIALIZED VIEW");
        }
        types
    }

    fn literal_list<'a>(&self, items: impl IntoIterator<Item = &'a str>) -> String {
        items
            .into_iter()
            .map(|item| self.dialect.string_literal(item))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(crate) fn objects_sql(&self, database: &str, schema: &str, roles: &[String]) -> String {
        let database = sanitize_ident(database);
        let schema = sanitize_ident(schema);
        format!(
            "SELECT DISTINCT OBJECT_CATALOG AS DB, OBJECT_SCHEMA AS SCHEMA, OBJECT_NAME AS \"TABLE\" \
             FROM {database}.INFORMATION_SCHEMA.OBJECT_PRIVILEGES \
             WHERE OBJECT_SCHEMA = {} \
             AND OBJECT_TYPE IN ({}) \
             AND PRIVILEGE_TYPE IN ('SELECT', 'OWNERSHIP') \
             AND GRANTEE IN ({}) \
             ORDER BY DB, SCHEMA, \"TABLE\"",
            self.dialect.string_literal(&schema),
            self.literal_list(self.object_types()),
            self.literal_list(roles.iter().map(String::as_str)),
        )
    }

    pub(crate) fn columns_sql(&self, table: &TableRef) -> Result<String> {
        let database = sanitize_ident(&table.database);
        let schema = sanitize_ident(&table.schema);
        let name = sanitize_ident(&table.name);
        if database.is_empty() || schema.is_empty() || name.is_empty() {
            return Err(WizardError::Catalog(format!(
                "cannot list columns of {table}: empty name after sanitizing"
            )));
        }
        Ok(format!(
            "SELECT COLUMN_NAME, DATA_TYPE, COMMENT \
             FROM {}.INFORMATION_SCHEMA.\"COLUMNS\" \
             WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {} \
             ORDER BY ORDINAL_POSITION",
            self.dialect.quote_ident(&database),
            self.dialect.string_literal(&schema),
            self.dialect.string_literal(&name),
        ))
    }
}

#[async_trait]
impl<E: QueryExecutor> SchemaCatalog for InformationSchemaCatalog<E> {
    async fn list_selectable_objects(
        &self,
        database: &str,
        schema: &str,
    ) -> Result<Vec<TableRef>> {
        let roles = self.enabled_roles(database).await;
        if roles.is_empty() {
            tracing::debug!(database, "no enabled roles, nothing selectable");
            return Ok(Vec::new());
        }
        let sql = self.objects_sql(database, schema, &roles);
        let result = self
            .executor
            .execute_sql(&sql)
            .await
            .map_err(|e| WizardError::Catalog(format!("object listing for {database}: {e}")))?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| {
                Some(TableRef::new(
                    QueryResult::cell_str(row, "DB")?,
                    QueryResult::cell_str(row, "SCHEMA")?,
                    QueryResult::cell_str(row, "TABLE")?,
                ))
            })
            .collect())
    }

    async fn list_columns(&self, table: &TableRef) -> Result<Vec<ColumnInfo>> {
        let sql = self.columns_sql(table)?;
        let result = self.executor.execute_sql(&sql).await?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| {
                Some(ColumnInfo {
                    name: QueryResult::cell_str(row, "COLUMN_NAME")?.to_string(),
                    data_type: QueryResult::cell_str(row, "DATA_TYPE")?.to_string(),
                    comment: QueryResult::cell_str(row, "COMMENT").map(str::to_string),
                })
            })
            .collect())
    }
}
