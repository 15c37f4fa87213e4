//! Cursor-based pagination over a compiled statement.
//!
//! Cursors are stateless: a URL-safe base64 JSON blob carrying the next row offset and
//! a hash of the statement text it was issued for. Pages are fetched with
//! LIMIT/OFFSET, so every page re-executes the statement.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::error::{Result, WizardError};
use crate::executor::QueryResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Row offset of the next page.
    pub offset: u64,
    /// Hash of the statement text the cursor belongs to.
    pub statement_hash: u64,
}

impl Cursor {
    pub fn new(offset: u64, statement_hash: u64) -> Self {
        Self {
            offset,
            statement_hash,
        }
    }

    /// Encode cursor to a URL-safe base64 string.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_string(self)
            .map_err(|e| WizardError::Execution(format!("failed to serialize cursor: {e}")))?;
        Ok(URL_SAFE_NO_PAD.encode(json.as_bytes()))
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| WizardError::Validation(format!("invalid cursor encoding: {e}")))?;
        let json = String::from_utf8(bytes)
            .map_err(|e| WizardError::Validation(format!("invalid cursor UTF-8: {e}")))?;
        serde_json::from_str(&json)
            .map_err(|e| WizardError::Validation(format!("invalid cursor format: {e}")))
    }

    pub fn validate_statement_hash(&self, expected: u64) -> Result<()> {
        if self.statement_hash != expected {
            return Err(WizardError::Validation(
                "cursor does not match the current statement - the query may have changed"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Hash of the executable statement text (without any row cap).
pub fn compute_statement_hash(sql: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    sql.hash(&mut hasher);
    hasher.finish()
}

/// One page of rows and, when more rows may follow, the cursor for the next page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub result: QueryResult,
    pub next_cursor: Option<String>,
}
