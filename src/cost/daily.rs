//! Daily transaction costs from position-weight changes

use super::impact::{compute_trade_cost, resolve_adv, resolve_volatility};
use super::types::{
    AdvVolObservation, CostDiagnostics, CostModelConfig, DailyCostDrag, DailyCostOutput,
    EntityKey, PermnoAdvVol, PermnoWeight, PositionWeight, SymbolAdvVol, SymbolWeight,
};
use crate::telemetry::{increment_counter, CounterMetric};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Trades below this notional are floating-point noise
pub const MIN_TRADE_VALUE_USD: f64 = 0.01;

/// A weight change for one entity on one date
#[derive(Debug, Clone, PartialEq)]
pub struct WeightChange<K> {
    pub date: NaiveDate,
    pub entity: K,
    pub delta: f64,
}

/// Weight changes within each entity, in (entity, date) order
///
/// The first observation of an entity changes by its full weight: the
/// position is built from cash.
pub fn weight_changes<K: EntityKey>(weights: &[PositionWeight<K>]) -> Vec<WeightChange<K>> {
    let mut rows: Vec<&PositionWeight<K>> = weights.iter().collect();
    rows.sort_by(|a, b| a.entity.cmp(&b.entity).then(a.date.cmp(&b.date)));

    let mut changes = Vec::with_capacity(rows.len());
    let mut previous: Option<(&K, f64)> = None;
    for row in rows {
        let delta = match previous {
            Some((entity, prev)) if *entity == row.entity => row.weight - prev,
            _ => row.weight,
        };
        changes.push(WeightChange {
            date: row.date,
            entity: row.entity.clone(),
            delta,
        });
        previous = Some((&row.entity, row.weight));
    }
    changes
}

/// Daily costs for symbol-keyed weights
pub fn compute_daily_costs(
    daily_weights: &[SymbolWeight],
    adv_data: &[SymbolAdvVol],
    config: &CostModelConfig,
) -> DailyCostOutput {
    compute_daily_costs_by(daily_weights, adv_data, config)
}

/// Daily costs for permno-keyed weights
pub fn compute_daily_costs_permno(
    daily_weights: &[PermnoWeight],
    adv_data: &[PermnoAdvVol],
    config: &CostModelConfig,
) -> DailyCostOutput {
    compute_daily_costs_by(daily_weights, adv_data, config)
}

fn compute_daily_costs_by<K: EntityKey>(
    daily_weights: &[PositionWeight<K>],
    adv_data: &[AdvVolObservation<K>],
    config: &CostModelConfig,
) -> DailyCostOutput {
    let mut cost_by_date: BTreeMap<NaiveDate, f64> =
        daily_weights.iter().map(|w| (w.date, 0.0)).collect();

    if !config.enabled() {
        tracing::debug!("Cost model disabled, returning zero drag");
        return DailyCostOutput {
            cost_drag: zero_drag(&cost_by_date),
            ..Default::default()
        };
    }

    let mut market_data: HashMap<(&K, NaiveDate), (Option<f64>, Option<f64>)> =
        HashMap::with_capacity(adv_data.len());
    for obs in adv_data {
        market_data
            .entry((&obs.entity, obs.date))
            .or_insert((obs.adv_usd, obs.volatility));
    }

    let portfolio_value = config.portfolio_value_usd();
    let mut diagnostics = CostDiagnostics::default();
    let mut trades = Vec::new();

    for change in weight_changes(daily_weights) {
        let trade_value = change.delta.abs() * portfolio_value;
        // NaN deltas fail this comparison and are dropped
        if !(trade_value > MIN_TRADE_VALUE_USD) {
            continue;
        }

        let (raw_adv, raw_vol) = market_data
            .get(&(&change.entity, change.date))
            .copied()
            .unwrap_or((None, None));
        let (adv, adv_fallback) = resolve_adv(raw_adv);
        let (vol, vol_fallback) = resolve_volatility(raw_vol);
        if adv_fallback {
            diagnostics.adv_fallback_count += 1;
        }
        if vol_fallback {
            diagnostics.volatility_fallback_count += 1;
        }

        let participation = trade_value / adv;
        if participation > config.participation_limit() {
            diagnostics.participation_violations += 1;
        }
        diagnostics.max_participation = Some(
            diagnostics
                .max_participation
                .map_or(participation, |m| m.max(participation)),
        );

        let trade = compute_trade_cost(
            change.entity.to_string(),
            change.date,
            trade_value,
            Some(adv),
            Some(vol),
            config,
        );
        *cost_by_date.entry(change.date).or_insert(0.0) += trade.total_cost_usd;
        trades.push(trade);
    }
    diagnostics.num_trades = trades.len();

    if diagnostics.adv_fallback_count > 0 || diagnostics.volatility_fallback_count > 0 {
        tracing::warn!(
            trades = diagnostics.num_trades,
            adv_fallbacks = diagnostics.adv_fallback_count,
            vol_fallbacks = diagnostics.volatility_fallback_count,
            "Missing ADV/volatility replaced with floor values"
        );
    }
    if diagnostics.participation_violations > 0 {
        tracing::warn!(
            violations = diagnostics.participation_violations,
            limit = config.participation_limit(),
            "Trades exceed participation limit"
        );
    }

    increment_counter(CounterMetric::Trades, diagnostics.num_trades as u64);
    increment_counter(
        CounterMetric::AdvFallbacks,
        diagnostics.adv_fallback_count as u64,
    );
    increment_counter(
        CounterMetric::VolatilityFallbacks,
        diagnostics.volatility_fallback_count as u64,
    );
    increment_counter(
        CounterMetric::ParticipationViolations,
        diagnostics.participation_violations as u64,
    );

    let cost_drag = cost_by_date
        .into_iter()
        .map(|(date, cost)| DailyCostDrag {
            date,
            cost_drag: cost / portfolio_value,
        })
        .collect();

    tracing::debug!(trades = trades.len(), "Computed daily transaction costs");

    DailyCostOutput {
        cost_drag,
        trades,
        diagnostics,
    }
}

fn zero_drag(dates: &BTreeMap<NaiveDate, f64>) -> Vec<DailyCostDrag> {
    dates
        .keys()
        .map(|date| DailyCostDrag {
            date: *date,
            cost_drag: 0.0,
        })
        .collect()
}
