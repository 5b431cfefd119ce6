//! Data layer errors and table names

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

/// Table names used for Parquet artifacts
pub mod tables {
    pub const DAILY_SIGNALS: &str = "daily_signals";
    pub const DAILY_WEIGHTS: &str = "daily_weights";
    pub const DAILY_IC: &str = "daily_ic";
    pub const DAILY_PORTFOLIO_RETURNS: &str = "daily_portfolio_returns";
    pub const NET_PORTFOLIO_RETURNS: &str = "net_portfolio_returns";
    pub const FORWARD_RETURNS: &str = "forward_returns";
    pub const DAILY_RETURNS: &str = "daily_returns";
    pub const DAILY_BARS: &str = "daily_bars";
    pub const ADV_VOLATILITY: &str = "adv_volatility";
}

/// Data layer errors
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing column {column} (looked for {candidates})")]
    MissingColumn { column: String, candidates: String },
    #[error("column {column} has type {data_type}, expected {expected}")]
    ColumnType {
        column: String,
        data_type: String,
        expected: &'static str,
    },
    #[error("cannot coerce column {column} ({data_type}) to dates: {reason}")]
    DateCoercion {
        column: String,
        data_type: String,
        reason: String,
    },
}
