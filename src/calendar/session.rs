//! Session-list backed calendar

use super::{CalendarError, Direction, TradingCalendar};
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeSet;

/// Calendar backed by an explicit, sorted list of sessions
#[derive(Debug, Clone)]
pub struct SessionCalendar {
    sessions: Vec<NaiveDate>,
}

impl SessionCalendar {
    /// Build from any collection of session dates (sorted and de-duplicated)
    pub fn from_sessions(sessions: impl IntoIterator<Item = NaiveDate>) -> Self {
        let set: BTreeSet<NaiveDate> = sessions.into_iter().collect();
        Self {
            sessions: set.into_iter().collect(),
        }
    }

    /// Monday-Friday calendar over `[start, end]` excluding `holidays`
    pub fn weekdays(start: NaiveDate, end: NaiveDate, holidays: &[NaiveDate]) -> Self {
        let holidays: BTreeSet<NaiveDate> = holidays.iter().copied().collect();
        let sessions = start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .filter(|d| !holidays.contains(d));
        Self::from_sessions(sessions)
    }

    /// First known session
    pub fn first_session(&self) -> Option<NaiveDate> {
        self.sessions.first().copied()
    }

    /// Last known session
    pub fn last_session(&self) -> Option<NaiveDate> {
        self.sessions.last().copied()
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the calendar has no sessions
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn bounds(&self) -> Result<(NaiveDate, NaiveDate), CalendarError> {
        match (self.sessions.first(), self.sessions.last()) {
            (Some(first), Some(last)) => Ok((*first, *last)),
            _ => Err(CalendarError::Empty),
        }
    }
}

impl TradingCalendar for SessionCalendar {
    fn is_session(&self, date: NaiveDate) -> bool {
        self.sessions.binary_search(&date).is_ok()
    }

    fn date_to_session(
        &self,
        date: NaiveDate,
        direction: Direction,
    ) -> Result<NaiveDate, CalendarError> {
        let (first, last) = self.bounds()?;
        if date < first || date > last {
            return Err(CalendarError::OutOfRange(date));
        }

        match direction {
            Direction::Previous => {
                let idx = self.sessions.partition_point(|s| *s <= date);
                // idx >= 1 because date >= first
                Ok(self.sessions[idx - 1])
            }
            Direction::Next => {
                let idx = self.sessions.partition_point(|s| *s < date);
                self.sessions
                    .get(idx)
                    .copied()
                    .ok_or(CalendarError::OutOfRange(date))
            }
        }
    }

    fn sessions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, CalendarError> {
        self.bounds()?;
        if start > end {
            return Ok(Vec::new());
        }
        let lo = self.sessions.partition_point(|s| *s < start);
        let hi = self.sessions.partition_point(|s| *s <= end);
        Ok(self.sessions[lo..hi].to_vec())
    }

    fn session_offset(&self, date: NaiveDate, n: i64) -> Result<NaiveDate, CalendarError> {
        self.bounds()?;
        let idx = self
            .sessions
            .binary_search(&date)
            .map_err(|_| CalendarError::NotASession(date))?;
        let target = idx as i64 + n;
        if target < 0 || target >= self.sessions.len() as i64 {
            return Err(CalendarError::OutOfRange(date));
        }
        Ok(self.sessions[target as usize])
    }
}
