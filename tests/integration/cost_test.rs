//! Integration tests for the cost model

use chrono::NaiveDate;
use pit_analytics::cost::{
    compute_capacity_analysis, compute_compounded_return, compute_cost_summary,
    compute_daily_costs_permno, compute_market_impact, compute_max_drawdown,
    compute_net_returns, compute_sharpe_ratio, CostModelConfig, CostSummary, PermnoAdvVol,
    PermnoWeight, PortfolioReturn,
};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn weight(day: u32, permno: i64, weight: f64) -> PermnoWeight {
    PermnoWeight {
        date: date(day),
        entity: permno,
        weight,
    }
}

#[test]
fn test_impact_scales_with_sqrt_trade_value() {
    let small = compute_market_impact(100_000.0, Some(10_000_000.0), Some(0.02), 0.1);
    let large = compute_market_impact(400_000.0, Some(10_000_000.0), Some(0.02), 0.1);
    assert!((large - 2.0 * small).abs() < 1e-9);
}

#[test]
fn test_impact_degrades_to_zero() {
    let cases = [
        (1e5, None, Some(0.02)),
        (1e5, Some(0.0), Some(0.02)),
        (1e5, Some(-1e6), Some(0.02)),
        (1e5, Some(f64::NAN), Some(0.02)),
        (1e5, Some(f64::INFINITY), Some(0.02)),
        (1e5, Some(1e7), None),
        (1e5, Some(1e7), Some(0.0)),
        (1e5, Some(1e7), Some(f64::NAN)),
        (0.0, Some(1e7), Some(0.02)),
        (-5.0, Some(1e7), Some(0.02)),
    ];
    for (trade_value, adv, vol) in cases {
        assert_eq!(compute_market_impact(trade_value, adv, vol, 0.1), 0.0);
    }
}

#[test]
fn test_first_day_change_is_full_weight() {
    let config = CostModelConfig::new(5.0, 0.0, 0.05, 1_000_000.0).unwrap();
    let weights = vec![weight(2, 1, 0.10), weight(3, 1, 0.10), weight(4, 1, 0.20)];

    let out = compute_daily_costs_permno(&weights, &[], &config);
    assert_eq!(out.trades.len(), 2);
    assert_eq!(out.trades[0].trade_date, date(2));
    assert!((out.trades[0].trade_value_usd - 100_000.0).abs() < 1e-6);
    assert!((out.trades[0].total_cost_usd - 50.0).abs() < 1e-9);
    assert_eq!(out.trades[1].trade_date, date(4));
    assert!((out.trades[1].total_cost_usd - 50.0).abs() < 1e-9);

    assert_eq!(out.cost_drag.len(), 3);
    assert_eq!(out.cost_drag[1].date, date(3));
    assert_eq!(out.cost_drag[1].cost_drag, 0.0);
    assert!((out.cost_drag[0].cost_drag - 5e-5).abs() < 1e-12);
    // No ADV supplied: both trades fell back to the floors
    assert_eq!(out.diagnostics.adv_fallback_count, 2);
}

#[test]
fn test_statistics_edge_cases() {
    let total = compute_compounded_return(&[0.01, 0.02, -0.01]).unwrap();
    assert!((total - 0.019898).abs() < 1e-6);
    assert_eq!(compute_compounded_return(&[f64::NAN, f64::NAN]), None);
    let mixed = compute_compounded_return(&[0.01, f64::NAN, 0.02]).unwrap();
    assert!((mixed - (1.01 * 1.02 - 1.0)).abs() < 1e-12);

    assert_eq!(compute_sharpe_ratio(&[0.01]), None);
    let _ = compute_sharpe_ratio(&[0.01, 0.01, 0.01]);

    let dd = compute_max_drawdown(&[0.10, -0.10]).unwrap();
    assert!((dd - 0.10).abs() < 1e-12);
}

#[test]
fn test_breakeven_requires_positive_alpha() {
    let config = CostModelConfig::default();
    let weights = vec![weight(2, 1, 0.5), weight(3, 1, 0.4), weight(4, 1, 0.6)];
    let out = compute_daily_costs_permno(&weights, &[], &config);

    for total in [0.0, -0.2, -1.0, -1.5] {
        let summary = CostSummary {
            total_gross_return: Some(total),
            num_days: 3,
            ..Default::default()
        };
        let capacity = compute_capacity_analysis(&weights, &out.trades, &summary, &config);
        assert_eq!(capacity.breakeven_aum, None, "total_gross_return {}", total);
        assert!(capacity.participation_aum.is_some());
    }
}

#[test]
fn test_cost_pipeline_end_to_end() {
    let config = CostModelConfig::new(5.0, 0.1, 0.05, 10_000_000.0).unwrap();

    let mut weights = Vec::new();
    let mut adv = Vec::new();
    let mut gross = Vec::new();
    for day in 2..=26 {
        for permno in 1..=4_i64 {
            let tilt = if (day + permno as u32) % 2 == 0 { 0.05 } else { -0.05 };
            weights.push(weight(day, permno, 0.25 + tilt));
            adv.push(PermnoAdvVol {
                entity: permno,
                date: date(day),
                adv_usd: Some(50_000_000.0),
                volatility: Some(0.02),
            });
        }
        gross.push(PortfolioReturn {
            date: date(day),
            gross_return: 0.002,
        });
    }

    let costs = compute_daily_costs_permno(&weights, &adv, &config);
    assert_eq!(costs.diagnostics.adv_fallback_count, 0);
    assert_eq!(costs.diagnostics.volatility_fallback_count, 0);

    let net = compute_net_returns(&gross, &costs.cost_drag);
    assert_eq!(net.len(), gross.len());
    assert!(net.iter().all(|r| r.net_return <= r.gross_return));

    let summary = compute_cost_summary(&net, &costs.trades);
    assert_eq!(summary.num_trades, costs.trades.len());
    assert!(summary.total_net_return.unwrap() < summary.total_gross_return.unwrap());
    assert!(
        (summary.total_cost_usd - summary.commission_cost_usd - summary.impact_cost_usd).abs()
            < 1e-6
    );

    let capacity = compute_capacity_analysis(&weights, &costs.trades, &summary, &config);
    let max = capacity.implied_max_capacity.unwrap();
    for bound in [
        capacity.impact_aum_10bps,
        capacity.participation_aum,
        capacity.breakeven_aum,
    ]
    .into_iter()
    .flatten()
    {
        assert!(max <= bound);
    }
    assert!(capacity.limiting_factor.is_some());
    assert!(capacity.breakeven_aum.is_some());
}

#[test]
fn test_disabled_model_has_zero_drag() {
    let config = CostModelConfig::default().with_enabled(false);
    let weights = vec![weight(2, 1, 0.5), weight(3, 1, 0.0)];
    let out = compute_daily_costs_permno(&weights, &[], &config);
    assert!(out.trades.is_empty());
    assert_eq!(out.cost_drag.len(), 2);
    assert!(out.cost_drag.iter().all(|c| c.cost_drag == 0.0));
}
