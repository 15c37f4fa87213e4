use thiserror::Error;

pub type Result<T> = std::result::Result<T, WizardError>;

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid transition: {0}")]
    Transition(String),
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("execution error: {0}")]
    Execution(String),
    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] duckdb::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WizardError {
    /// True for failures raised before anything reached the warehouse.
    pub fn is_validation(&self) -> bool {
        matches!(self, WizardError::Validation(_))
    }
}
