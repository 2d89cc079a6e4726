use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Column '{0}' does not hold numeric values")]
    NonNumeric(String),

    #[error("Please select at least {needed} columns ({got} selected)")]
    TooFewColumns { needed: usize, got: usize },

    #[error("No complete patient rows left in the table")]
    EmptyTable,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
