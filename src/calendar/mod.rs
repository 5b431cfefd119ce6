//! Trading calendar abstraction
//!
//! The analytics never do trading-day arithmetic themselves. Every session
//! lookup, normalization and offset goes through [`TradingCalendar`].

mod session;

pub use session::SessionCalendar;

use chrono::NaiveDate;
use thiserror::Error;

/// Direction used when snapping a date onto a trading session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Latest session on or before the date
    Previous,
    /// Earliest session on or after the date
    Next,
}

/// Calendar lookup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    /// Date falls outside the sessions the calendar knows about
    #[error("date {0} is outside the calendar range")]
    OutOfRange(NaiveDate),
    /// Operation requires a session date
    #[error("date {0} is not a trading session")]
    NotASession(NaiveDate),
    /// Calendar was built without any sessions
    #[error("calendar has no sessions")]
    Empty,
}

/// Exchange trading calendar
pub trait TradingCalendar: Send + Sync {
    /// Whether the date is a trading session
    fn is_session(&self, date: NaiveDate) -> bool;

    /// Snap a date onto a session in the given direction
    fn date_to_session(
        &self,
        date: NaiveDate,
        direction: Direction,
    ) -> Result<NaiveDate, CalendarError>;

    /// All sessions in `[start, end]`, ascending
    fn sessions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, CalendarError>;

    /// Session `n` sessions away from `date` (which must itself be a session)
    fn session_offset(&self, date: NaiveDate, n: i64) -> Result<NaiveDate, CalendarError>;
}
