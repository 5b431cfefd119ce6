//! Daily return sources

use super::types::{DailyReturn, ForwardReturnsError};
use chrono::NaiveDate;
use std::collections::HashSet;

/// Supplies daily per-security returns filtered by permno and date range
pub trait DailyReturnsSource: Send + Sync {
    fn daily_returns(
        &self,
        permnos: &[i64],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyReturn>, ForwardReturnsError>;
}

/// Returns table held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryReturns {
    rows: Vec<DailyReturn>,
}

impl InMemoryReturns {
    pub fn new(rows: Vec<DailyReturn>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl DailyReturnsSource for InMemoryReturns {
    fn daily_returns(
        &self,
        permnos: &[i64],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyReturn>, ForwardReturnsError> {
        let wanted: HashSet<i64> = permnos.iter().copied().collect();
        Ok(self
            .rows
            .iter()
            .filter(|r| r.date >= start && r.date <= end && wanted.contains(&r.permno))
            .copied()
            .collect())
    }
}
