//! Database backend implementations.
//!
//! Each backend is one connection type implementing both [`crate::QueryExecutor`] and
//! [`crate::SchemaCatalog`], gated behind its own feature flag.

#[cfg(feature = "duckdb")]
mod duckdb;
#[cfg(feature = "duckdb")]
pub use duckdb::DuckDbConnection;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
pub use postgres::PostgresConnection;
