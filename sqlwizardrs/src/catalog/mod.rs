//! Schema catalog access: which objects a caller may select from and what columns
//! they carry.
//!
//! Listings are assumed to be access-control filtered by the implementation.

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{CatalogConfig, CatalogTarget};
use crate::error::{Result, WizardError};
use crate::models::{ColumnRef, TableRef};

mod cache;
mod information_schema;

pub use cache::TtlCache;
pub use information_schema::InformationSchemaCatalog;

/// Column metadata as reported by the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub comment: Option<String>,
}

#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    async fn list_selectable_objects(&self, database: &str, schema: &str)
        -> Result<Vec<TableRef>>;

    /// Columns in ordinal order.
    async fn list_columns(&self, table: &TableRef) -> Result<Vec<ColumnInfo>>;
}

/// Caches object and column listings of an inner catalog.
pub struct CachedCatalog<C> {
    inner: C,
    objects: Mutex<TtlCache<(String, String), Vec<TableRef>>>,
    columns: Mutex<TtlCache<TableRef, Vec<ColumnInfo>>>,
}

impl<C: SchemaCatalog> CachedCatalog<C> {
    pub fn new(inner: C, config: &CatalogConfig) -> Self {
        Self {
            inner,
            objects: Mutex::new(TtlCache::with_config(config)),
            columns: Mutex::new(TtlCache::with_config(config)),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Drop every cached listing.
    pub fn invalidate(&self) -> Result<()> {
        lock(&self.objects)?.clear();
        lock(&self.columns)?.clear();
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    m.lock()
        .map_err(|e| WizardError::Catalog(format!("catalog cache poisoned: {e}")))
}

#[async_trait]
impl<C: SchemaCatalog> SchemaCatalog for CachedCatalog<C> {
    async fn list_selectable_objects(
        &self,
        database: &str,
        schema: &str,
    ) -> Result<Vec<TableRef>> {
        let key = (database.to_string(), schema.to_string());
        let cached = lock(&self.objects)?.get(&key).cloned();
        if let Some(hit) = cached {
            tracing::trace!(database, schema, "catalog object cache hit");
            return Ok(hit);
        }
        let objects = self.inner.list_selectable_objects(database, schema).await?;
        lock(&self.objects)?.insert(key, objects.clone());
        Ok(objects)
    }

    async fn list_columns(&self, table: &TableRef) -> Result<Vec<ColumnInfo>> {
        let cached = lock(&self.columns)?.get(table).cloned();
        if let Some(hit) = cached {
            tracing::trace!(table = %table, "catalog column cache hit");
            return Ok(hit);
        }
        let columns = self.inner.list_columns(table).await?;
        lock(&self.columns)?.insert(table.clone(), columns.clone());
        Ok(columns)
    }
}

/// Objects selectable across every configured target, de-duplicated and sorted by
/// database, schema, name. A target whose listing fails is skipped.
pub async fn allowed_objects(
    catalog: &dyn SchemaCatalog,
    targets: &[CatalogTarget],
) -> Vec<TableRef> {
    let mut all = BTreeSet::new();
    for target in targets {
        match catalog
            .list_selectable_objects(&target.database, &target.schema)
            .await
        {
            Ok(objects) => all.extend(objects),
            Err(e) => tracing::warn!(
                database = %target.database,
                schema = %target.schema,
                error = %e,
                "skipping catalog target"
            ),
        }
    }
    all.into_iter().collect()
}

/// Case-insensitive substring search over table, schema and database names.
pub fn search_objects<'a>(objects: &'a [TableRef], term: &str) -> Vec<&'a TableRef> {
    let term = term.trim().to_lowercase();
    objects
        .iter()
        .filter(|o| {
            term.is_empty()
                || o.name.to_lowercase().contains(&term)
                || o.schema.to_lowercase().contains(&term)
                || o.database.to_lowercase().contains(&term)
        })
        .collect()
}

/// Column picker search: unselected columns whose fully-qualified name or comment
/// contains `term` (case-insensitive).
pub fn search_columns<'a>(
    columns: &'a [ColumnRef],
    selected: &[String],
    term: &str,
) -> Vec<&'a ColumnRef> {
    let term = term.trim().to_lowercase();
    columns
        .iter()
        .filter(|c| !selected.contains(&c.fq_name))
        .filter(|c| {
            term.is_empty()
                || c.fq_name.to_lowercase().contains(&term)
                || c.comment.to_lowercase().contains(&term)
        })
        .collect()
}
