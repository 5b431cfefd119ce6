//! Parameter optimization
//!
//! Grid/random search over a [`Backtester`] and the walk-forward optimizer
//! built on it.

mod backtester;
mod params;
mod search;
mod walk_forward;

pub use backtester::{BacktestError, BacktestMetrics, Backtester, SearchMetric};
pub use params::{Distribution, ParamDistributions, ParamGrid, ParamSet, ParamValue};
pub use search::{
    grid_search, random_search, sample_params, Candidate, SearchContext, SearchError,
    SearchResult,
};
pub use walk_forward::{
    generate_windows, overfitting_ratio, WalkForwardConfig, WalkForwardError,
    WalkForwardOptimizer, WalkForwardResult, Window, WindowResult,
};
