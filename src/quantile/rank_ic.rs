//! Ranking, Spearman correlation and quantile bucketing

/// Ranks starting at 1, ties sharing their average rank
pub fn rank_average(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // positions i..=j hold ranks i+1..=j+1
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((sxy / denom).clamp(-1.0, 1.0))
}

/// Spearman correlation of raw signal values against forward returns
///
/// `None` when the series differ in length, hold fewer than two points,
/// contain non-finite values, or either is constant.
pub fn compute_rank_ic(signal: &[f64], returns: &[f64]) -> Option<f64> {
    if signal.len() != returns.len() || signal.len() < 2 {
        return None;
    }
    if signal.iter().chain(returns).any(|v| !v.is_finite()) {
        return None;
    }
    if is_constant(signal) || is_constant(returns) {
        return None;
    }
    pearson(&rank_average(signal), &rank_average(returns))
}

/// Quantile bucket per value: ceil(rank / n * n_quantiles), clipped to [1, n_quantiles]
///
/// Ties share an average rank, so bucket sizes can shift near boundaries.
pub fn assign_quantiles(values: &[f64], n_quantiles: usize) -> Vec<usize> {
    let n = values.len() as f64;
    rank_average(values)
        .into_iter()
        .map(|rank| {
            let bucket = (rank / n * n_quantiles as f64).ceil() as usize;
            bucket.clamp(1, n_quantiles)
        })
        .collect()
}
