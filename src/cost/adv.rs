//! Point-in-time ADV and volatility from daily bars
//!
//! The value stamped on session D comes from the trailing window that ends
//! at D-1, so a trade on D never sees D's own volume or return.

use super::types::PermnoAdvVol;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Rolling window length in trading days
pub const ADV_WINDOW_DAYS: usize = 20;

/// One daily price/volume/return observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub permno: i64,
    pub date: NaiveDate,
    pub price: Option<f64>,
    pub volume: Option<f64>,
    pub ret: Option<f64>,
}

/// Lagged rolling ADV (mean dollar volume) and volatility (sample std)
///
/// Windows with a missing or non-finite value yield `None` for that field.
pub fn compute_adv_volatility(bars: &[DailyBar], window: usize) -> Vec<PermnoAdvVol> {
    let mut by_permno: BTreeMap<i64, Vec<&DailyBar>> = BTreeMap::new();
    for bar in bars {
        by_permno.entry(bar.permno).or_default().push(bar);
    }

    let mut out = Vec::with_capacity(bars.len());
    for (permno, mut rows) in by_permno {
        rows.sort_by_key(|b| b.date);

        let dollar_volume: Vec<Option<f64>> = rows
            .iter()
            .map(|b| match (b.price, b.volume) {
                (Some(p), Some(v)) => Some(p.abs() * v).filter(|x| x.is_finite()),
                _ => None,
            })
            .collect();
        let returns: Vec<Option<f64>> = rows
            .iter()
            .map(|b| b.ret.filter(|r| r.is_finite()))
            .collect();

        for (i, bar) in rows.iter().enumerate() {
            let (adv_usd, volatility) = if window > 0 && i >= window {
                let range = i - window..i;
                (
                    full_window(&dollar_volume[range.clone()]).map(|w| w.iter().mean()),
                    full_window(&returns[range])
                        .filter(|w| w.len() >= 2)
                        .map(|w| w.iter().std_dev()),
                )
            } else {
                (None, None)
            };
            out.push(PermnoAdvVol {
                entity: permno,
                date: bar.date,
                adv_usd,
                volatility,
            });
        }
    }

    tracing::debug!(rows = out.len(), window, "Computed lagged ADV/volatility");
    out
}

fn full_window(values: &[Option<f64>]) -> Option<Vec<f64>> {
    values.iter().copied().collect()
}
