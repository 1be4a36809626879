//! Pairs Statistics
//!
//! Pure functions over [`TimeSeries`]. Degenerate input never errors; it
//! yields a neutral sentinel instead:
//!
//! | Function              | Degenerate input                     | Result             |
//! |-----------------------|--------------------------------------|--------------------|
//! | [`hedge_ratio`]       | < 2 aligned points, zero x-variance  | `1.0`              |
//! | [`rolling_zscore`]    | `window <= 1`                        | all missing        |
//! | [`rolling_corr`]      | `window <= 1`                        | all missing        |
//! | [`stationarity_test`] | < 10 observations, singular fit      | `NaN` statistic    |
//!
//! Callers should read those sentinels as "not enough data yet".

mod backtest;
mod stationarity;

pub use backtest::{Position, mean_reversion_backtest};
pub use stationarity::{AdfResult, MIN_ADF_OBSERVATIONS, stationarity_test};

use std::collections::HashMap;

use crate::domain::series::TimeSeries;

/// Hedge ratio returned when the regression is undefined.
pub const FALLBACK_HEDGE_RATIO: f64 = 1.0;

/// Regression used to estimate the hedge ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegressionKind {
    /// Ordinary least squares, single regressor.
    #[default]
    Ols,
}

impl RegressionKind {
    /// Estimate the hedge ratio of `y` on `x`.
    #[must_use]
    pub fn hedge_ratio(self, y: &TimeSeries, x: &TimeSeries) -> f64 {
        match self {
            Self::Ols => hedge_ratio(y, x),
        }
    }
}

// =============================================================================
// Alignment
// =============================================================================

/// Inner-join two series on their index.
///
/// Keeps only timestamps where both sides hold a defined value, in ascending
/// timestamp order. Both outputs share the same index.
#[must_use]
pub fn align(a: &TimeSeries, b: &TimeSeries) -> (TimeSeries, TimeSeries) {
    let right: HashMap<i64, f64> = b.defined().collect();

    let mut joined: Vec<(i64, f64, f64)> = a
        .defined()
        .filter_map(|(t, va)| right.get(&t).map(|vb| (t, va, *vb)))
        .collect();
    joined.sort_by_key(|(t, _, _)| *t);
    joined.dedup_by_key(|(t, _, _)| *t);

    let left = TimeSeries::from_points(joined.iter().map(|(t, va, _)| (*t, *va)));
    let right = TimeSeries::from_points(joined.iter().map(|(t, _, vb)| (*t, *vb)));
    (left, right)
}

fn defined_values(series: &TimeSeries) -> Vec<f64> {
    series.values().iter().filter_map(|v| *v).collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

// =============================================================================
// Hedge Ratio and Spread
// =============================================================================

/// OLS slope of `y` on `x`: `Σ(x-x̄)(y-ȳ) / Σ(x-x̄)²` over aligned points.
///
/// Returns [`FALLBACK_HEDGE_RATIO`] with fewer than two aligned points or when
/// `x` has no variance.
#[must_use]
pub fn hedge_ratio(y: &TimeSeries, x: &TimeSeries) -> f64 {
    let (ya, xa) = align(y, x);
    if ya.len() < 2 {
        return FALLBACK_HEDGE_RATIO;
    }

    let ys = defined_values(&ya);
    let xs = defined_values(&xa);
    let y_mean = mean(&ys);
    let x_mean = mean(&xs);

    let (cov, var_x) = xs
        .iter()
        .zip(&ys)
        .fold((0.0, 0.0), |(cov, var), (xv, yv)| {
            let dx = xv - x_mean;
            (cov + dx * (yv - y_mean), var + dx * dx)
        });

    if var_x == 0.0 || !var_x.is_finite() {
        return FALLBACK_HEDGE_RATIO;
    }
    cov / var_x
}

/// `y - hedge_ratio * x` over the aligned index.
#[must_use]
pub fn spread(y: &TimeSeries, x: &TimeSeries, hedge_ratio: f64) -> TimeSeries {
    let (ya, xa) = align(y, x);
    TimeSeries::from_points(
        ya.defined()
            .zip(xa.defined())
            .map(|((t, yv), (_, xv))| (t, yv - hedge_ratio * xv)),
    )
}

// =============================================================================
// Rolling Statistics
// =============================================================================

/// Trailing-window z-score with population standard deviation.
///
/// Position `i` is `(v[i] - mean) / std` over `v[i-window+1..=i]`. It is
/// missing for the first `window - 1` positions, when the window holds a
/// missing value, or when the window has zero spread.
#[must_use]
pub fn rolling_zscore(series: &TimeSeries, window: usize) -> TimeSeries {
    if window <= 1 {
        return TimeSeries::missing(series.index().to_vec());
    }

    let values = series.values();
    let out = (0..values.len())
        .map(|i| {
            let slice = trailing(values, i, window)?;
            let mu = mean(&slice);
            let var = slice.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / window as f64;
            let sd = var.sqrt();
            if sd == 0.0 {
                return None;
            }
            Some((slice[window - 1] - mu) / sd)
        })
        .collect();

    TimeSeries::new(series.index().to_vec(), out)
}

/// Trailing-window Pearson correlation of the aligned pair.
///
/// Missing until `window` aligned points exist and whenever either side of the
/// window has zero variance.
#[must_use]
pub fn rolling_corr(a: &TimeSeries, b: &TimeSeries, window: usize) -> TimeSeries {
    let (aa, bb) = align(a, b);
    if window <= 1 {
        return TimeSeries::missing(aa.index().to_vec());
    }

    let av = aa.values();
    let bv = bb.values();
    let out = (0..av.len())
        .map(|i| {
            let xs = trailing(av, i, window)?;
            let ys = trailing(bv, i, window)?;
            pearson(&xs, &ys)
        })
        .collect();

    TimeSeries::new(aa.index().to_vec(), out)
}

/// Defined values of the window ending at `i`, or `None` if the window is
/// incomplete or holds a missing value.
fn trailing(values: &[Option<f64>], i: usize, window: usize) -> Option<Vec<f64>> {
    if i + 1 < window {
        return None;
    }
    values[i + 1 - window..=i].iter().copied().collect()
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let x_mean = mean(xs);
    let y_mean = mean(ys);
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - x_mean;
        let dy = y - y_mean;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn series(points: &[(i64, f64)]) -> TimeSeries {
        TimeSeries::from_points(points.iter().copied())
    }

    #[test]
    fn align_inner_joins_and_drops_missing() {
        let a = TimeSeries::new(vec![1, 2, 3, 4], vec![Some(1.0), Some(2.0), None, Some(4.0)]);
        let b = series(&[(2, 20.0), (3, 30.0), (4, 40.0), (5, 50.0)]);
        let (l, r) = align(&a, &b);
        assert_eq!(l.index(), &[2, 4]);
        assert_eq!(r.index(), &[2, 4]);
        assert_eq!(l.values(), &[Some(2.0), Some(4.0)]);
        assert_eq!(r.values(), &[Some(20.0), Some(40.0)]);
    }

    #[test]
    fn hedge_ratio_matches_closed_form() {
        let x = series(&[(1, 1.0), (2, 2.0), (3, 3.0), (4, 5.0)]);
        let y = series(&[(1, 2.1), (2, 3.9), (3, 6.2), (4, 9.8)]);
        let xm = (1.0 + 2.0 + 3.0 + 5.0) / 4.0;
        let ym = (2.1 + 3.9 + 6.2 + 9.8) / 4.0;
        let xs = [1.0, 2.0, 3.0, 5.0];
        let ys = [2.1, 3.9, 6.2, 9.8];
        let num: f64 = xs.iter().zip(ys).map(|(x, y)| (x - xm) * (y - ym)).sum();
        let den: f64 = xs.iter().map(|x| (x - xm) * (x - xm)).sum();
        assert!((hedge_ratio(&y, &x) - num / den).abs() < EPS);
    }

    #[test]
    fn hedge_ratio_degenerate_falls_back_to_one() {
        let one = series(&[(1, 5.0)]);
        assert_eq!(hedge_ratio(&one, &one), 1.0);

        let flat_x = series(&[(1, 3.0), (2, 3.0), (3, 3.0)]);
        let y = series(&[(1, 1.0), (2, 2.0), (3, 3.0)]);
        assert_eq!(hedge_ratio(&y, &flat_x), 1.0);

        let disjoint = series(&[(10, 1.0), (11, 2.0)]);
        assert_eq!(hedge_ratio(&y, &disjoint), 1.0);
    }

    #[test]
    fn spread_uses_aligned_points() {
        let y = series(&[(1, 10.0), (2, 12.0), (3, 14.0)]);
        let x = series(&[(2, 5.0), (3, 6.0), (4, 7.0)]);
        let s = spread(&y, &x, 2.0);
        assert_eq!(s.index(), &[2, 3]);
        assert_eq!(s.values(), &[Some(2.0), Some(2.0)]);
    }

    #[test]
    fn zscore_window_three() {
        let s = series(&[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)]);
        let z = rolling_zscore(&s, 3);
        assert_eq!(z.len(), 4);
        assert_eq!(z.get(0), None);
        assert_eq!(z.get(1), None);

        let mu = 2.0;
        let popstd = (((1.0 - mu) * (1.0f64 - mu) + 0.0 + (3.0 - mu) * (3.0 - mu)) / 3.0).sqrt();
        let expected = (3.0 - mu) / popstd;
        assert!((z.get(2).unwrap() - expected).abs() < EPS);
        assert!((z.get(3).unwrap() - expected).abs() < EPS);
    }

    #[test]
    fn zscore_degenerate_window_is_all_missing() {
        let s = series(&[(1, 1.0), (2, 2.0)]);
        for window in [0, 1] {
            let z = rolling_zscore(&s, window);
            assert_eq!(z.index(), s.index());
            assert_eq!(z.count_defined(), 0);
        }
    }

    #[test]
    fn zscore_flat_window_is_missing() {
        let s = series(&[(1, 2.0), (2, 2.0), (3, 2.0)]);
        assert_eq!(rolling_zscore(&s, 3).count_defined(), 0);
    }

    #[test]
    fn zscore_window_with_gap_is_missing() {
        let s = TimeSeries::new(
            vec![1, 2, 3, 4, 5],
            vec![Some(1.0), None, Some(3.0), Some(4.0), Some(6.0)],
        );
        let z = rolling_zscore(&s, 3);
        assert_eq!(z.get(2), None);
        assert_eq!(z.get(3), None);
        assert!(z.get(4).is_some());
    }

    #[test]
    fn corr_of_linear_pair_is_one() {
        let a = series(&[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)]);
        let b = series(&[(1, 2.0), (2, 4.0), (3, 6.0), (4, 8.0)]);
        let c = rolling_corr(&a, &b, 3);
        assert_eq!(c.get(1), None);
        assert!((c.get(2).unwrap() - 1.0).abs() < EPS);
        assert!((c.get(3).unwrap() - 1.0).abs() < EPS);
    }

    #[test]
    fn corr_of_inverse_pair_is_minus_one() {
        let a = series(&[(1, 1.0), (2, 2.0), (3, 3.0)]);
        let b = series(&[(1, 3.0), (2, 2.0), (3, 1.0)]);
        let c = rolling_corr(&a, &b, 3);
        assert!((c.get(2).unwrap() + 1.0).abs() < EPS);
    }

    #[test]
    fn corr_aligns_before_windowing() {
        let a = series(&[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)]);
        let b = series(&[(2, 1.0), (3, 2.0), (4, 3.5)]);
        let c = rolling_corr(&a, &b, 3);
        assert_eq!(c.index(), &[2, 3, 4]);
        assert!(c.get(2).is_some());
    }
}
