use super::analyzer::QuantileAnalyzer;
use super::types::{QuantileAnalysisConfig, QuantileError, QuantileResult};
use crate::returns::{DailyReturnsSource, ForwardReturnsProvider, SignalObservation};
use std::collections::BTreeSet;

/// Compute forward returns for `signals` and run the quantile analysis
///
/// Forward returns are requested once per distinct `(signal_date, permno)`.
pub fn run_quantile_analysis<S: DailyReturnsSource>(
    signals: &[SignalObservation],
    provider: &ForwardReturnsProvider<S>,
    config: &QuantileAnalysisConfig,
    signal_name: &str,
    universe_name: &str,
) -> Result<QuantileResult, QuantileError> {
    let mut seen = BTreeSet::new();
    let unique: Vec<SignalObservation> = signals
        .iter()
        .filter(|s| seen.insert((s.signal_date, s.permno)))
        .copied()
        .collect();

    tracing::debug!(
        signals = signals.len(),
        unique = unique.len(),
        "Requesting forward returns"
    );
    let forward_returns =
        provider.get_forward_returns(&unique, config.skip_days(), config.holding_period_days())?;

    let analyzer = QuantileAnalyzer::new(provider.calendar().clone(), config.clone());
    analyzer.analyze(signals, &forward_returns, signal_name, universe_name)
}
