//! Transaction cost model
//!
//! Almgren-Chriss square-root impact plus commission/spread, applied to
//! daily position-weight changes, with summary statistics and capacity
//! analysis on top.

mod adv;
mod capacity;
mod daily;
mod impact;
mod stats;
mod types;

pub use adv::{compute_adv_volatility, DailyBar, ADV_WINDOW_DAYS};
pub use capacity::{
    annualize_return, average_daily_turnover, breakeven_aum, compute_capacity_analysis,
    impact_aum, participation_aum, BREAKEVEN_ITERATIONS, BREAKEVEN_MAX_AUM, BREAKEVEN_MIN_AUM,
};
pub use daily::{
    compute_daily_costs, compute_daily_costs_permno, weight_changes, WeightChange,
    MIN_TRADE_VALUE_USD,
};
pub use impact::{
    compute_market_impact, compute_trade_cost, resolve_adv, resolve_volatility, ADV_FLOOR_USD,
    BPS, VOL_FLOOR,
};
pub use stats::{
    compute_compounded_return, compute_cost_summary, compute_max_drawdown, compute_net_returns,
    compute_sharpe_ratio, TRADING_DAYS_PER_YEAR,
};
pub use types::{
    AdvSource, AdvVolObservation, CapacityAnalysis, CostDiagnostics, CostModelConfig,
    CostSummary, DailyCostDrag, DailyCostOutput, EntityKey, LimitingFactor, NetReturn,
    PermnoAdvVol, PermnoWeight, PortfolioReturn, PositionWeight, SymbolAdvVol, SymbolWeight,
    TradeCost,
};

pub(crate) use stats::{fmt_num, fmt_pct};

impl CapacityAnalysis {
    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        let usd = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("${:.0}", v));
        format!(
            r#"
CAPACITY
───────────────────────────────────────────────────────
Avg Turnover:     {}
Holding Period:   {} days
Portfolio ADV:    {}
Portfolio Sigma:  {}
Gross Alpha (ann): {}
Impact AUM 5bps:  {}
Impact AUM 10bps: {}
Participation AUM: {}
Breakeven AUM:    {}
Max Capacity:     {} ({})
══════════════════════════════════════════════════════
"#,
            fmt_pct(self.avg_daily_turnover),
            fmt_num(self.avg_holding_period_days),
            usd(self.portfolio_adv),
            fmt_pct(self.portfolio_sigma),
            fmt_pct(self.gross_alpha_annualized),
            usd(self.impact_aum_5bps),
            usd(self.impact_aum_10bps),
            usd(self.participation_aum),
            usd(self.breakeven_aum),
            usd(self.implied_max_capacity),
            self.limiting_factor
                .map_or_else(|| "n/a".to_string(), |f| f.to_string()),
        )
    }
}
