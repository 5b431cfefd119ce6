//! Forward returns
//!
//! Point-in-time forward returns for signal validation. Windows start
//! `skip_days >= 1` sessions after the signal, so a signal never sees the
//! return of the day it was formed.

mod provider;
mod source;
mod types;

pub use provider::{ForwardReturnsProvider, HIGH_DROP_RATE, SESSION_SAFETY_MARGIN};
pub use source::{DailyReturnsSource, InMemoryReturns};
pub use types::{DailyReturn, ForwardReturn, ForwardReturnsError, SignalObservation};

pub(crate) use provider::validate_window;
