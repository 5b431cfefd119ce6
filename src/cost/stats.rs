//! Return statistics, net returns and cost summary

use super::types::{CostSummary, DailyCostDrag, NetReturn, PortfolioReturn, TradeCost};
use chrono::NaiveDate;
use statrs::statistics::Statistics;
use std::collections::HashMap;

/// Trading days per year
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Standard deviations below this are treated as zero
const MIN_STD: f64 = 1e-8;

fn finite(returns: &[f64]) -> Vec<f64> {
    returns.iter().copied().filter(|r| r.is_finite()).collect()
}

/// prod(1 + r) - 1 over finite returns; `None` when none are finite
pub fn compute_compounded_return(returns: &[f64]) -> Option<f64> {
    let valid = finite(returns);
    if valid.is_empty() {
        return None;
    }
    Some(valid.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0)
}

/// Annualized Sharpe ratio, mean / std(ddof=1) * sqrt(252)
pub fn compute_sharpe_ratio(returns: &[f64]) -> Option<f64> {
    let valid = finite(returns);
    if valid.len() < 2 {
        return None;
    }
    let mean = valid.iter().mean();
    let std = valid.iter().std_dev();
    if !std.is_finite() || std < MIN_STD {
        return None;
    }
    Some(mean / std * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Largest peak-to-trough loss of the compounded equity curve
///
/// Equity starts at 1.0. Returns a non-negative fraction, `None` when there
/// are no finite returns.
pub fn compute_max_drawdown(returns: &[f64]) -> Option<f64> {
    let valid = finite(returns);
    if valid.is_empty() {
        return None;
    }

    let mut equity = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut worst = 0.0_f64;
    for r in valid {
        equity *= 1.0 + r;
        peak = peak.max(equity);
        if peak > 0.0 {
            worst = worst.min(equity / peak - 1.0);
        }
    }
    Some(worst.abs())
}

/// Gross returns minus cost drag, joined on date
///
/// Dates without a cost entry carry zero drag.
pub fn compute_net_returns(
    gross_returns: &[PortfolioReturn],
    cost_drag: &[DailyCostDrag],
) -> Vec<NetReturn> {
    let drag_by_date: HashMap<NaiveDate, f64> =
        cost_drag.iter().map(|c| (c.date, c.cost_drag)).collect();

    gross_returns
        .iter()
        .map(|g| {
            let cost_drag = drag_by_date
                .get(&g.date)
                .copied()
                .filter(|c| c.is_finite())
                .unwrap_or(0.0);
            NetReturn {
                date: g.date,
                gross_return: g.gross_return,
                cost_drag,
                net_return: g.gross_return - cost_drag,
            }
        })
        .collect()
}

/// Aggregate gross/net performance and trade costs
pub fn compute_cost_summary(net_returns: &[NetReturn], trades: &[TradeCost]) -> CostSummary {
    let gross: Vec<f64> = net_returns.iter().map(|r| r.gross_return).collect();
    let net: Vec<f64> = net_returns.iter().map(|r| r.net_return).collect();

    let total_gross_return = compute_compounded_return(&gross);
    let total_net_return = compute_compounded_return(&net);
    let total_cost_drag = match (total_gross_return, total_net_return) {
        (Some(g), Some(n)) => Some(g - n),
        _ => None,
    };

    let commission_cost_usd: f64 = trades.iter().map(|t| t.commission_spread_cost).sum();
    let impact_cost_usd: f64 = trades.iter().map(|t| t.market_impact_cost).sum();
    let total_cost_usd: f64 = trades.iter().map(|t| t.total_cost_usd).sum();

    let avg_trade_cost_bps = if trades.is_empty() {
        None
    } else {
        Some(trades.iter().map(|t| t.total_cost_bps).mean())
    };

    CostSummary {
        total_gross_return,
        total_net_return,
        total_cost_drag,
        total_cost_usd,
        commission_cost_usd,
        impact_cost_usd,
        gross_sharpe: compute_sharpe_ratio(&gross),
        net_sharpe: compute_sharpe_ratio(&net),
        gross_max_drawdown: compute_max_drawdown(&gross),
        net_max_drawdown: compute_max_drawdown(&net),
        num_trades: trades.len(),
        avg_trade_cost_bps,
        num_days: gross.iter().filter(|r| r.is_finite()).count(),
    }
}

impl CostSummary {
    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        format!(
            r#"
══════════════════════════════════════════════════════
               TRANSACTION COST SUMMARY
══════════════════════════════════════════════════════

PERFORMANCE
───────────────────────────────────────────────────────
Gross Return:     {}
Net Return:       {}
Cost Drag:        {}
Gross Sharpe:     {}
Net Sharpe:       {}
Gross Max DD:     {}
Net Max DD:       {}

COSTS
───────────────────────────────────────────────────────
Total Cost:       ${:.2}
Commission:       ${:.2}
Impact:           ${:.2}
Trades:           {}
Avg Cost:         {} bps
══════════════════════════════════════════════════════
"#,
            fmt_pct(self.total_gross_return),
            fmt_pct(self.total_net_return),
            fmt_pct(self.total_cost_drag),
            fmt_num(self.gross_sharpe),
            fmt_num(self.net_sharpe),
            fmt_pct(self.gross_max_drawdown),
            fmt_pct(self.net_max_drawdown),
            self.total_cost_usd,
            self.commission_cost_usd,
            self.impact_cost_usd,
            self.num_trades,
            fmt_num(self.avg_trade_cost_bps),
        )
    }
}

pub(crate) fn fmt_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:+.2}%", v * 100.0))
}

pub(crate) fn fmt_num(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}
