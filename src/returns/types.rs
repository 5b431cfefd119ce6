//! Signal and return row types

use crate::calendar::CalendarError;
use crate::config::ConfigError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Alpha signal value for one security on one date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalObservation {
    pub signal_date: NaiveDate,
    pub permno: i64,
    pub signal_value: f64,
}

/// Compounded return over a signal's forward window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForwardReturn {
    pub signal_date: NaiveDate,
    pub permno: i64,
    pub forward_return: f64,
}

/// Daily total return for one security
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyReturn {
    pub permno: i64,
    pub date: NaiveDate,
    pub ret: f64,
}

/// Forward-return computation errors
#[derive(Debug, Error)]
pub enum ForwardReturnsError {
    /// Window parameters would allow look-ahead or are empty
    #[error(transparent)]
    InvalidWindow(#[from] ConfigError),
    /// Calendar could not produce the session span
    #[error("calendar error: {0}")]
    Calendar(#[from] CalendarError),
    /// Daily return source failed
    #[error("daily return source failed: {0}")]
    Source(String),
}
