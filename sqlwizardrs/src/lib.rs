pub mod backends;
pub mod catalog;
pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod ident;
pub mod models;
pub mod pagination;
pub mod query_builder;
pub mod runtime;
pub mod sql_ast;
pub mod state;

pub use catalog::{CachedCatalog, ColumnInfo, InformationSchemaCatalog, SchemaCatalog};
pub use config::{CatalogTarget, WizardConfig};
pub use error::{Result, WizardError};
pub use executor::{QueryExecutor, QueryResult};
pub use models::{
    AggregateFunction, AggregateTarget, ColumnRef, FilterOperator, JoinKind, SortDirection,
    TableRef,
};
pub use query_builder::{CompileWarning, CompiledStatement, SqlBuilder};
pub use runtime::{ExportBatch, ExportFormat, Session};
pub use state::{BuilderState, WizardStage};

#[cfg(feature = "duckdb")]
pub use backends::DuckDbConnection;
#[cfg(feature = "postgres")]
pub use backends::PostgresConnection;
