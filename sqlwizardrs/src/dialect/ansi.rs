//! ANSI dialect: double-quoted identifiers, single-quoted strings.
//!
//! Understood by the warehouse targets as well as DuckDB and PostgreSQL.

use super::Dialect;

#[derive(Debug, Default, Clone, Copy)]
pub struct AnsiDialect;

impl Dialect for AnsiDialect {
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}
