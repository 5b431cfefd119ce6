//! Transaction cost model types

use crate::config::ConfigError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::hash::Hash;

/// Key identifying a position: a ticker symbol or a permno
pub trait EntityKey: Clone + Eq + Hash + Ord + Display {}

impl<T: Clone + Eq + Hash + Ord + Display> EntityKey for T {}

/// Daily portfolio weight for one entity (fraction of AUM)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionWeight<K> {
    pub date: NaiveDate,
    pub entity: K,
    pub weight: f64,
}

/// Weight keyed by permanent security identifier
pub type PermnoWeight = PositionWeight<i64>;
/// Weight keyed by ticker symbol
pub type SymbolWeight = PositionWeight<String>;

/// Point-in-time ADV and volatility for one entity on one trade date
///
/// Values stamped on date D are computed from the window ending D-1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvVolObservation<K> {
    pub entity: K,
    pub date: NaiveDate,
    pub adv_usd: Option<f64>,
    pub volatility: Option<f64>,
}

pub type PermnoAdvVol = AdvVolObservation<i64>;
pub type SymbolAdvVol = AdvVolObservation<String>;

/// Where ADV figures come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvSource {
    /// CRSP daily price x volume
    #[default]
    Crsp,
    /// Supplied directly by the caller
    Provided,
}

/// Transaction cost model parameters
///
/// Validated at construction; invalid values are rejected, never clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CostModelConfigRaw")]
pub struct CostModelConfig {
    enabled: bool,
    bps_per_trade: f64,
    impact_coefficient: f64,
    participation_limit: f64,
    adv_source: AdvSource,
    portfolio_value_usd: f64,
}

/// Unvalidated form used for deserialization
#[derive(Debug, Clone, Deserialize)]
struct CostModelConfigRaw {
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default = "default_bps_per_trade")]
    bps_per_trade: f64,
    #[serde(default = "default_impact_coefficient")]
    impact_coefficient: f64,
    #[serde(default = "default_participation_limit")]
    participation_limit: f64,
    #[serde(default)]
    adv_source: AdvSource,
    #[serde(default = "default_portfolio_value")]
    portfolio_value_usd: f64,
}

fn default_enabled() -> bool {
    true
}
fn default_bps_per_trade() -> f64 {
    5.0
}
fn default_impact_coefficient() -> f64 {
    0.1
}
fn default_participation_limit() -> f64 {
    0.05
}
fn default_portfolio_value() -> f64 {
    1_000_000.0
}

impl TryFrom<CostModelConfigRaw> for CostModelConfig {
    type Error = ConfigError;

    fn try_from(raw: CostModelConfigRaw) -> Result<Self, Self::Error> {
        Ok(Self::new(
            raw.bps_per_trade,
            raw.impact_coefficient,
            raw.participation_limit,
            raw.portfolio_value_usd,
        )?
        .with_enabled(raw.enabled)
        .with_adv_source(raw.adv_source))
    }
}

fn require_finite(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonFinite { field, value })
    }
}

impl CostModelConfig {
    /// Create a validated, enabled config
    pub fn new(
        bps_per_trade: f64,
        impact_coefficient: f64,
        participation_limit: f64,
        portfolio_value_usd: f64,
    ) -> Result<Self, ConfigError> {
        let bps_per_trade = require_finite("bps_per_trade", bps_per_trade)?;
        let impact_coefficient = require_finite("impact_coefficient", impact_coefficient)?;
        let participation_limit = require_finite("participation_limit", participation_limit)?;
        let portfolio_value_usd = require_finite("portfolio_value_usd", portfolio_value_usd)?;

        if bps_per_trade < 0.0 {
            return Err(ConfigError::out_of_range(
                "bps_per_trade",
                format!("must be >= 0, got {bps_per_trade}"),
            ));
        }
        if impact_coefficient < 0.0 {
            return Err(ConfigError::out_of_range(
                "impact_coefficient",
                format!("must be >= 0, got {impact_coefficient}"),
            ));
        }
        if participation_limit <= 0.0 || participation_limit > 1.0 {
            return Err(ConfigError::out_of_range(
                "participation_limit",
                format!("must be in (0, 1], got {participation_limit}"),
            ));
        }
        if portfolio_value_usd <= 0.0 {
            return Err(ConfigError::out_of_range(
                "portfolio_value_usd",
                format!("must be > 0, got {portfolio_value_usd}"),
            ));
        }

        Ok(Self {
            enabled: true,
            bps_per_trade,
            impact_coefficient,
            participation_limit,
            adv_source: AdvSource::default(),
            portfolio_value_usd,
        })
    }

    /// Turn the model on or off
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the ADV source
    pub fn with_adv_source(mut self, adv_source: AdvSource) -> Self {
        self.adv_source = adv_source;
        self
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn bps_per_trade(&self) -> f64 {
        self.bps_per_trade
    }

    pub fn impact_coefficient(&self) -> f64 {
        self.impact_coefficient
    }

    pub fn participation_limit(&self) -> f64 {
        self.participation_limit
    }

    pub fn adv_source(&self) -> AdvSource {
        self.adv_source
    }

    pub fn portfolio_value_usd(&self) -> f64 {
        self.portfolio_value_usd
    }

    /// Serialize to a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Deserialize (and validate) from a JSON object
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

impl Default for CostModelConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            bps_per_trade: default_bps_per_trade(),
            impact_coefficient: default_impact_coefficient(),
            participation_limit: default_participation_limit(),
            adv_source: AdvSource::default(),
            portfolio_value_usd: default_portfolio_value(),
        }
    }
}

/// Cost of a single non-trivial weight change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeCost {
    pub symbol: String,
    pub trade_date: NaiveDate,
    pub trade_value_usd: f64,
    pub commission_spread_cost: f64,
    pub market_impact_cost: f64,
    pub total_cost_usd: f64,
    pub total_cost_bps: f64,
    pub adv_usd: Option<f64>,
    pub volatility: Option<f64>,
    pub participation_pct: Option<f64>,
}

/// Cost drag for one date, as a fraction of AUM
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyCostDrag {
    pub date: NaiveDate,
    pub cost_drag: f64,
}

/// Gross portfolio return for one date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReturn {
    pub date: NaiveDate,
    pub gross_return: f64,
}

/// Gross return, cost drag and net return for one date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetReturn {
    pub date: NaiveDate,
    pub gross_return: f64,
    pub cost_drag: f64,
    pub net_return: f64,
}

/// Data-quality counters from a daily cost run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostDiagnostics {
    pub num_trades: usize,
    pub adv_fallback_count: usize,
    pub volatility_fallback_count: usize,
    pub participation_violations: usize,
    pub max_participation: Option<f64>,
}

/// Output of a daily cost computation
#[derive(Debug, Clone, Default)]
pub struct DailyCostOutput {
    /// One row per date present in the weights, ascending
    pub cost_drag: Vec<DailyCostDrag>,
    pub trades: Vec<TradeCost>,
    pub diagnostics: CostDiagnostics,
}

/// Aggregate cost statistics
///
/// Fields are `None` when the statistic is undefined for the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_gross_return: Option<f64>,
    pub total_net_return: Option<f64>,
    pub total_cost_drag: Option<f64>,
    pub total_cost_usd: f64,
    pub commission_cost_usd: f64,
    pub impact_cost_usd: f64,
    pub gross_sharpe: Option<f64>,
    pub net_sharpe: Option<f64>,
    pub gross_max_drawdown: Option<f64>,
    pub net_max_drawdown: Option<f64>,
    pub num_trades: usize,
    pub avg_trade_cost_bps: Option<f64>,
    /// Return observations the totals were compounded over
    pub num_days: usize,
}

impl CostSummary {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Which capacity constraint binds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitingFactor {
    MarketImpact,
    Participation,
    Breakeven,
}

impl std::fmt::Display for LimitingFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LimitingFactor::MarketImpact => "market_impact",
            LimitingFactor::Participation => "participation",
            LimitingFactor::Breakeven => "breakeven",
        };
        f.write_str(name)
    }
}

/// Strategy capacity estimates
///
/// Every field degrades to `None` independently when its inputs are missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacityAnalysis {
    pub avg_daily_turnover: Option<f64>,
    pub avg_holding_period_days: Option<f64>,
    pub portfolio_adv: Option<f64>,
    pub portfolio_sigma: Option<f64>,
    pub gross_alpha_annualized: Option<f64>,
    pub impact_aum_5bps: Option<f64>,
    pub impact_aum_10bps: Option<f64>,
    pub participation_aum: Option<f64>,
    pub breakeven_aum: Option<f64>,
    pub implied_max_capacity: Option<f64>,
    pub limiting_factor: Option<LimitingFactor>,
}

impl CapacityAnalysis {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_rejects_negative_bps() {
        assert!(matches!(
            CostModelConfig::new(-1.0, 0.1, 0.05, 1e6),
            Err(ConfigError::OutOfRange { field: "bps_per_trade", .. })
        ));
    }

    #[test]
    fn test_config_rejects_non_finite() {
        assert!(matches!(
            CostModelConfig::new(5.0, f64::NAN, 0.05, 1e6),
            Err(ConfigError::NonFinite { field: "impact_coefficient", .. })
        ));
        assert!(CostModelConfig::new(5.0, 0.1, 0.05, f64::INFINITY).is_err());
    }

    #[test]
    fn test_config_participation_limit_bounds() {
        assert!(CostModelConfig::new(5.0, 0.1, 0.0, 1e6).is_err());
        assert!(CostModelConfig::new(5.0, 0.1, 1.5, 1e6).is_err());
        assert!(CostModelConfig::new(5.0, 0.1, 1.0, 1e6).is_ok());
    }

    #[test]
    fn test_config_rejects_non_positive_portfolio_value() {
        assert!(CostModelConfig::new(5.0, 0.1, 0.05, 0.0).is_err());
    }

    #[test]
    fn test_config_json_round_trip_validates() {
        let config = CostModelConfig::new(7.5, 0.2, 0.1, 5e6)
            .unwrap()
            .with_adv_source(AdvSource::Provided);
        let restored = CostModelConfig::from_json(config.to_json()).unwrap();
        assert_eq!(restored, config);

        let bad = serde_json::json!({ "bps_per_trade": -3.0 });
        assert!(CostModelConfig::from_json(bad).is_err());
    }

    #[test]
    fn test_capacity_json_keeps_nulls() {
        let analysis = CapacityAnalysis::default();
        let value = analysis.to_json();
        assert!(value["breakeven_aum"].is_null());
        assert_eq!(CapacityAnalysis::from_json(value).unwrap(), analysis);
    }
}
