//! Data module
//!
//! Parquet tables and the run summary artifact

mod artifacts;
mod parquet;
mod types;

pub use artifacts::{RunSummary, SUMMARY_FILE};
pub use parquet::{ParquetReader, ParquetWriter};
pub use types::{tables, DataError};
