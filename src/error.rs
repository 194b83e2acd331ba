use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Deadline exceeded during {stage} after {elapsed:?}")]
    DeadlineExceeded { stage: String, elapsed: Duration },

    #[error("Task error: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
