//! Grid and random parameter search

use super::backtester::{BacktestError, BacktestMetrics, Backtester, SearchMetric};
use super::params::{Distribution, ParamDistributions, ParamGrid, ParamSet};
use crate::telemetry::{increment_counter, CounterMetric};
use chrono::NaiveDate;
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

/// Parameter search errors
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("unsupported metric: {0} (expected mean_ic, icir or hit_rate)")]
    UnsupportedMetric(String),
    #[error("parameter grid has no combinations")]
    EmptyGrid,
    #[error("invalid distribution for parameter {0}")]
    InvalidDistribution(String),
    #[error("cannot build alpha from [{params}]: {reason}")]
    InvalidParams { params: String, reason: String },
    #[error(transparent)]
    Backtest(#[from] BacktestError),
}

/// Backtest window and scoring shared by every candidate of a search
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub snapshot_id: Option<&'a str>,
    pub metric: SearchMetric,
}

/// One scored parameter combination
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub params: ParamSet,
    pub metrics: BacktestMetrics,
    pub score: f64,
}

/// Outcome of a search; candidates are in evaluation order
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best: Candidate,
    pub candidates: Vec<Candidate>,
}

impl SearchResult {
    pub fn best_params(&self) -> &ParamSet {
        &self.best.params
    }

    /// NaN when no candidate produced a score
    pub fn best_score(&self) -> f64 {
        self.best.score
    }
}

/// Score every combination of `grid`
pub fn grid_search<B, F>(
    alpha_factory: F,
    grid: &ParamGrid,
    backtester: &B,
    ctx: &SearchContext<'_>,
) -> Result<SearchResult, SearchError>
where
    B: Backtester,
    F: Fn(&ParamSet) -> Result<B::Alpha, SearchError>,
{
    let combos = grid.combinations();
    tracing::debug!(candidates = combos.len(), metric = %ctx.metric, "Starting grid search");
    evaluate(combos, alpha_factory, backtester, ctx)
}

/// Score `n_iter` combinations drawn from `distributions`
///
/// Draws are without replacement when every distribution is a finite choice
/// list and `n_iter` does not exceed the number of combinations, otherwise
/// with replacement. The same `seed` always yields the same candidates.
pub fn random_search<B, F>(
    alpha_factory: F,
    distributions: &ParamDistributions,
    backtester: &B,
    ctx: &SearchContext<'_>,
    n_iter: usize,
    seed: u64,
) -> Result<SearchResult, SearchError>
where
    B: Backtester,
    F: Fn(&ParamSet) -> Result<B::Alpha, SearchError>,
{
    let combos = sample_params(distributions, n_iter, seed)?;
    tracing::debug!(candidates = combos.len(), seed, metric = %ctx.metric, "Starting random search");
    evaluate(combos, alpha_factory, backtester, ctx)
}

/// Draw `n_iter` parameter sets
pub fn sample_params(
    distributions: &ParamDistributions,
    n_iter: usize,
    seed: u64,
) -> Result<Vec<ParamSet>, SearchError> {
    if distributions.is_empty() || n_iter == 0 {
        return Err(SearchError::EmptyGrid);
    }
    if let Some((name, _)) = distributions.iter().find(|(_, d)| !d.is_valid()) {
        return Err(SearchError::InvalidDistribution(name.clone()));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    if distributions.values().all(|d| d.is_discrete()) {
        let grid = distributions
            .iter()
            .fold(ParamGrid::new(), |grid, (name, dist)| match dist {
                Distribution::Choice { values } => grid.with(name.clone(), values.clone()),
                _ => grid,
            });
        let combos = grid.combinations();
        if n_iter <= combos.len() {
            return Ok(index::sample(&mut rng, combos.len(), n_iter)
                .into_iter()
                .map(|i| combos[i].clone())
                .collect());
        }
    }

    let mut sets = Vec::with_capacity(n_iter);
    for _ in 0..n_iter {
        let mut set = ParamSet::new();
        for (name, dist) in distributions {
            let value = dist
                .sample(&mut rng)
                .ok_or_else(|| SearchError::InvalidDistribution(name.clone()))?;
            set.insert(name.clone(), value);
        }
        sets.push(set);
    }
    Ok(sets)
}

fn evaluate<B, F>(
    combos: Vec<ParamSet>,
    alpha_factory: F,
    backtester: &B,
    ctx: &SearchContext<'_>,
) -> Result<SearchResult, SearchError>
where
    B: Backtester,
    F: Fn(&ParamSet) -> Result<B::Alpha, SearchError>,
{
    if combos.is_empty() {
        return Err(SearchError::EmptyGrid);
    }

    let mut candidates = Vec::with_capacity(combos.len());
    for params in combos {
        let alpha = alpha_factory(&params)?;
        let metrics = backtester.run_backtest(&alpha, ctx.start, ctx.end, ctx.snapshot_id)?;
        let score = metrics.score(ctx.metric);
        tracing::debug!(params = %params, score, "Scored candidate");
        candidates.push(Candidate {
            params,
            metrics,
            score,
        });
    }
    increment_counter(CounterMetric::ParamCandidates, candidates.len() as u64);

    let best_idx = best_index(&candidates);
    let best = candidates[best_idx].clone();
    if best.score.is_nan() {
        tracing::warn!(candidates = candidates.len(), metric = %ctx.metric, "Every candidate scored NaN");
    }
    Ok(SearchResult { best, candidates })
}

/// Highest score wins, earlier candidates win ties, NaN never wins
fn best_index(candidates: &[Candidate]) -> usize {
    let mut best: Option<(usize, f64)> = None;
    for (i, c) in candidates.iter().enumerate() {
        if c.score.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, s)| c.score > s) {
            best = Some((i, c.score));
        }
    }
    best.map_or(0, |(i, _)| i)
}
