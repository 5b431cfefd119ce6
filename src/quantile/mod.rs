//! Quantile and Rank-IC signal validation

mod analyzer;
mod pipeline;
mod rank_ic;
mod types;

pub use analyzer::QuantileAnalyzer;
pub use pipeline::run_quantile_analysis;
pub use rank_ic::{assign_quantiles, compute_rank_ic, rank_average};
pub use types::{DailyIc, QuantileAnalysisConfig, QuantileError, QuantileResult};
