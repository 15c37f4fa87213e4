//! SQL dialect abstractions.
//!
//! Every piece of text that ends up inside a statement without being a keyword goes
//! through exactly one of the embedding functions below: identifiers, string literals,
//! numeric literals or LIKE patterns. Keeping them on one trait keeps the injection
//! boundary in a single place.

use once_cell::sync::Lazy;
use regex::Regex;

static SIGNED_DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid decimal pattern"));

/// Dialects render identifiers, literals and row caps.
/// Statement layout lives in [`crate::sql_ast::SqlRenderer`].
pub trait Dialect {
    fn quote_ident(&self, ident: &str) -> String;

    /// `"<db>"."<schema>"."<table>"`.
    fn qualify_table(&self, database: &str, schema: &str, table: &str) -> String {
        format!(
            "{}.{}.{}",
            self.quote_ident(database),
            self.quote_ident(schema),
            self.quote_ident(table)
        )
    }

    /// Single-quoted literal with embedded quotes doubled.
    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Returns `None` when `value` is not a plain signed decimal.
    fn numeric_literal(&self, value: &str) -> Option<String> {
        SIGNED_DECIMAL
            .is_match(value)
            .then(|| value.to_string())
    }

    /// Escape character used by [`Dialect::like_contains`].
    fn like_escape_char(&self) -> char {
        '\\'
    }

    /// Substring-match pattern: `'%<escaped>%' ESCAPE '<c>'`.
    ///
    /// The escape character itself, `%` and `_` are escaped so the value only ever
    /// matches literally.
    fn like_contains(&self, value: &str) -> String {
        let esc = self.like_escape_char();
        let mut escaped = String::with_capacity(value.len() + 2);
        for ch in value.chars() {
            if ch == esc || ch == '%' || ch == '_' {
                escaped.push(esc);
            }
            escaped.push(ch);
        }
        format!(
            "{} ESCAPE {}",
            self.string_literal(&format!("%{escaped}%")),
            self.string_literal(&esc.to_string())
        )
    }

    fn render_limit(&self, limit: u64, offset: Option<u64>) -> String {
        match offset {
            Some(offset) if offset > 0 => format!("LIMIT {limit} OFFSET {offset}"),
            _ => format!("LIMIT {limit}"),
        }
    }
}

mod ansi;
pub use ansi::AnsiDialect;
