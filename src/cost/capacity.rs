//! Strategy capacity analysis
//!
//! Three independent AUM constraints:
//! - market impact: AUM at which average impact reaches a target in bps
//! - participation: AUM at which the average trade hits the participation limit
//! - breakeven: AUM at which costs consume the annualized gross alpha
//!
//! The binding constraint is the smallest of those that are defined.

use super::daily::weight_changes;
use super::impact::{compute_market_impact, positive_finite, BPS};
use super::stats::TRADING_DAYS_PER_YEAR;
use super::types::{
    CapacityAnalysis, CostModelConfig, CostSummary, EntityKey, LimitingFactor, PositionWeight,
    TradeCost,
};
use crate::telemetry::{set_gauge, GaugeMetric};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Lower bound of the breakeven search
pub const BREAKEVEN_MIN_AUM: f64 = 1_000.0;
/// Upper bound of the breakeven search
pub const BREAKEVEN_MAX_AUM: f64 = 10_000_000_000.0;
/// Bisection iterations for the breakeven search
pub const BREAKEVEN_ITERATIONS: usize = 50;

/// Capacity estimates from weights, realised trades and the cost summary
pub fn compute_capacity_analysis<K: EntityKey>(
    daily_weights: &[PositionWeight<K>],
    trade_costs: &[TradeCost],
    cost_summary: &CostSummary,
    config: &CostModelConfig,
) -> CapacityAnalysis {
    if trade_costs.is_empty() {
        tracing::debug!("No trades, capacity analysis undefined");
        return CapacityAnalysis::default();
    }

    let avg_turnover = average_daily_turnover(daily_weights);
    let avg_holding_period_days = avg_turnover.map(|t| 1.0 / t);
    let portfolio_adv = trade_weighted(trade_costs, |t| t.adv_usd);
    let portfolio_sigma = trade_weighted(trade_costs, |t| t.volatility);
    let gross_alpha = annualize_return(cost_summary.total_gross_return, cost_summary.num_days);

    let eta = config.impact_coefficient();
    let impact_aum_5bps = impact_aum(5.0, eta, portfolio_sigma, portfolio_adv, avg_turnover);
    let impact_aum_10bps = impact_aum(10.0, eta, portfolio_sigma, portfolio_adv, avg_turnover);
    let participation_aum =
        participation_aum(config.participation_limit(), portfolio_adv, avg_turnover);
    let breakeven_aum = breakeven_aum(
        gross_alpha,
        config.bps_per_trade(),
        eta,
        portfolio_sigma,
        portfolio_adv,
        avg_turnover,
    );

    let (implied_max_capacity, limiting_factor) = [
        (impact_aum_10bps, LimitingFactor::MarketImpact),
        (participation_aum, LimitingFactor::Participation),
        (breakeven_aum, LimitingFactor::Breakeven),
    ]
    .into_iter()
    .filter_map(|(aum, factor)| aum.map(|a| (a, factor)))
    .min_by(|a, b| a.0.total_cmp(&b.0))
    .map_or((None, None), |(aum, factor)| (Some(aum), Some(factor)));

    if let Some(capacity) = implied_max_capacity {
        set_gauge(GaugeMetric::ImpliedCapacity, capacity);
    }

    tracing::info!(
        capacity = ?implied_max_capacity,
        limiting = ?limiting_factor,
        turnover = ?avg_turnover,
        "Capacity analysis complete"
    );

    CapacityAnalysis {
        avg_daily_turnover: avg_turnover,
        avg_holding_period_days,
        portfolio_adv,
        portfolio_sigma,
        gross_alpha_annualized: gross_alpha,
        impact_aum_5bps,
        impact_aum_10bps,
        participation_aum,
        breakeven_aum,
        implied_max_capacity,
        limiting_factor,
    }
}

/// Mean over dates of the summed absolute weight change
pub fn average_daily_turnover<K: EntityKey>(daily_weights: &[PositionWeight<K>]) -> Option<f64> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for change in weight_changes(daily_weights) {
        let entry = by_date.entry(change.date).or_insert(0.0);
        if change.delta.is_finite() {
            *entry += change.delta.abs();
        }
    }
    if by_date.is_empty() {
        return None;
    }
    let avg = by_date.values().sum::<f64>() / by_date.len() as f64;
    positive_finite(Some(avg))
}

/// Trade-value-weighted average of a per-trade quantity
fn trade_weighted(trades: &[TradeCost], value: impl Fn(&TradeCost) -> Option<f64>) -> Option<f64> {
    let (weighted, total) = trades
        .iter()
        .filter_map(|t| positive_finite(value(t)).map(|v| (v, t.trade_value_usd)))
        .filter(|(_, tv)| tv.is_finite() && *tv > 0.0)
        .fold((0.0, 0.0), |(w, s), (v, tv)| (w + v * tv, s + tv));
    if total > 0.0 {
        Some(weighted / total)
    } else {
        None
    }
}

/// (1 + total)^(252 / days) - 1
pub fn annualize_return(total_return: Option<f64>, num_days: usize) -> Option<f64> {
    let total = total_return.filter(|r| r.is_finite())?;
    if num_days == 0 || total <= -1.0 {
        return None;
    }
    let annual = (1.0 + total).powf(TRADING_DAYS_PER_YEAR / num_days as f64) - 1.0;
    annual.is_finite().then_some(annual)
}

/// AUM at which average impact reaches `target_bps`
///
/// participation = (target / (eta * sigma * 10000))^2, trade = ADV * participation,
/// AUM = trade / turnover.
pub fn impact_aum(
    target_bps: f64,
    impact_coefficient: f64,
    sigma: Option<f64>,
    adv: Option<f64>,
    avg_turnover: Option<f64>,
) -> Option<f64> {
    let sigma = positive_finite(sigma)?;
    let adv = positive_finite(adv)?;
    let turnover = positive_finite(avg_turnover)?;
    let eta = positive_finite(Some(impact_coefficient))?;

    let participation_at_target = (target_bps / (eta * sigma * BPS)).powi(2);
    let trade_at_target = adv * participation_at_target;
    let aum = trade_at_target / turnover;
    aum.is_finite().then_some(aum)
}

/// AUM at which the average trade hits the participation limit
pub fn participation_aum(
    participation_limit: f64,
    adv: Option<f64>,
    avg_turnover: Option<f64>,
) -> Option<f64> {
    let adv = positive_finite(adv)?;
    let turnover = positive_finite(avg_turnover)?;
    let aum = participation_limit * adv / turnover;
    aum.is_finite().then_some(aum)
}

/// Annual alpha left after costs at a given AUM
fn net_alpha(
    aum: f64,
    gross_alpha: f64,
    bps_per_trade: f64,
    impact_coefficient: f64,
    sigma: f64,
    adv: f64,
    turnover: f64,
) -> f64 {
    let trade_value = aum * turnover;
    let impact_bps = compute_market_impact(trade_value, Some(adv), Some(sigma), impact_coefficient);
    gross_alpha - (bps_per_trade + impact_bps) * turnover * TRADING_DAYS_PER_YEAR / BPS
}

/// AUM at which net alpha crosses zero, by bisection over [$1K, $10B]
///
/// `None` when gross alpha is not positive and finite, when inputs are
/// missing, or when the strategy is already unprofitable at the lower bound.
/// Returns the upper bound when alpha survives the whole range.
pub fn breakeven_aum(
    gross_alpha: Option<f64>,
    bps_per_trade: f64,
    impact_coefficient: f64,
    sigma: Option<f64>,
    adv: Option<f64>,
    avg_turnover: Option<f64>,
) -> Option<f64> {
    let alpha = gross_alpha.filter(|a| a.is_finite() && *a > 0.0)?;
    let sigma = positive_finite(sigma)?;
    let adv = positive_finite(adv)?;
    let turnover = positive_finite(avg_turnover)?;

    let f = |aum: f64| {
        net_alpha(
            aum,
            alpha,
            bps_per_trade,
            impact_coefficient,
            sigma,
            adv,
            turnover,
        )
    };

    let (mut lo, mut hi) = (BREAKEVEN_MIN_AUM, BREAKEVEN_MAX_AUM);
    if f(lo) <= 0.0 {
        tracing::debug!(alpha, "Costs exceed alpha at minimum AUM");
        return None;
    }
    if f(hi) > 0.0 {
        return Some(hi);
    }

    for _ in 0..BREAKEVEN_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if f(mid) > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some(0.5 * (lo + hi))
}
