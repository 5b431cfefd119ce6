//! pit-analytics: point-in-time equity backtest analytics
//!
//! This library provides the core components for:
//! - Transaction cost modelling (Almgren-Chriss impact, net returns, capacity)
//! - Forward returns over a trading calendar without look-ahead
//! - Rank-IC and quantile signal validation
//! - Grid/random parameter search and walk-forward optimization
//! - Parquet tables and run summaries
//! - Logging and metrics

pub mod calendar;
pub mod cli;
pub mod config;
pub mod cost;
pub mod data;
pub mod optimize;
pub mod quantile;
pub mod returns;
pub mod telemetry;
