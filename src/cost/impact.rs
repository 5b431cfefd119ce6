//! Almgren-Chriss market impact and per-trade cost
//!
//! impact_bps = eta * sigma * 10000 * sqrt(trade_value / ADV)

use super::types::{CostModelConfig, TradeCost};
use chrono::NaiveDate;

/// Basis points per unit
pub const BPS: f64 = 10_000.0;

/// Fallback ADV when market data is missing or unusable
pub const ADV_FLOOR_USD: f64 = 100_000.0;

/// Fallback daily volatility when market data is missing or unusable
pub const VOL_FLOOR: f64 = 0.01;

/// Returns the value if it is finite and strictly positive
pub(crate) fn positive_finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// ADV to use for a trade, and whether the floor was applied
pub fn resolve_adv(adv_usd: Option<f64>) -> (f64, bool) {
    match positive_finite(adv_usd) {
        Some(adv) => (adv, false),
        None => (ADV_FLOOR_USD, true),
    }
}

/// Volatility to use for a trade, and whether the floor was applied
pub fn resolve_volatility(volatility: Option<f64>) -> (f64, bool) {
    match positive_finite(volatility) {
        Some(vol) => (vol, false),
        None => (VOL_FLOOR, true),
    }
}

/// Square-root market impact in basis points
///
/// Missing or unusable ADV/volatility, or a non-positive trade, yields 0.0.
pub fn compute_market_impact(
    trade_value_usd: f64,
    adv_usd: Option<f64>,
    volatility: Option<f64>,
    impact_coefficient: f64,
) -> f64 {
    let (Some(adv), Some(sigma)) = (positive_finite(adv_usd), positive_finite(volatility)) else {
        return 0.0;
    };
    if !trade_value_usd.is_finite() || trade_value_usd <= 0.0 || !impact_coefficient.is_finite()
    {
        return 0.0;
    }

    impact_coefficient * sigma * BPS * (trade_value_usd / adv).sqrt()
}

/// Full cost breakdown for one trade
pub fn compute_trade_cost(
    symbol: impl Into<String>,
    trade_date: NaiveDate,
    trade_value_usd: f64,
    adv_usd: Option<f64>,
    volatility: Option<f64>,
    config: &CostModelConfig,
) -> TradeCost {
    let commission_spread_cost = config.bps_per_trade() * trade_value_usd / BPS;
    let impact_bps = compute_market_impact(
        trade_value_usd,
        adv_usd,
        volatility,
        config.impact_coefficient(),
    );
    let market_impact_cost = impact_bps * trade_value_usd / BPS;
    let total_cost_usd = commission_spread_cost + market_impact_cost;

    let total_cost_bps = if trade_value_usd != 0.0 {
        total_cost_usd / trade_value_usd * BPS
    } else {
        0.0
    };

    let participation_pct = positive_finite(adv_usd).map(|adv| trade_value_usd / adv);

    TradeCost {
        symbol: symbol.into(),
        trade_date,
        trade_value_usd,
        commission_spread_cost,
        market_impact_cost,
        total_cost_usd,
        total_cost_bps,
        adv_usd,
        volatility,
        participation_pct,
    }
}
