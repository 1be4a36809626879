//! Augmented Dickey-Fuller Test
//!
//! Unit-root test with a constant term. The regression is
//!
//! ```text
//! Δy[t] = α + γ·y[t-1] + Σ_{i=1..p} δ_i·Δy[t-i] + ε
//! ```
//!
//! and the statistic is the t-value of `γ`. The augmentation order `p` is
//! chosen by minimum AIC over `0..=maxlag` with
//! `maxlag = ceil(12·(n/100)^¼)`, bounded by `n/2 - 2`; every candidate is
//! fitted on the same trimmed sample so the AIC values are comparable, then
//! the chosen order is refitted on its full sample.
//!
//! The p-value uses MacKinnon's regression-surface approximation for the
//! constant-only case with one series.

use crate::domain::series::TimeSeries;

/// Fewer defined observations than this yield an undefined result.
pub const MIN_ADF_OBSERVATIONS: usize = 10;

// MacKinnon (1994) surface for regression "c", N = 1.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 3.8269e-2];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -1.0368e-2];

/// Outcome of [`stationarity_test`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdfResult {
    /// t-statistic of the lagged level (more negative = more stationary).
    pub statistic: f64,
    /// Approximate p-value for the unit-root null.
    pub p_value: f64,
    /// Augmentation lags used in the final regression.
    pub used_lag: usize,
    /// Observations in the final regression.
    pub nobs: usize,
}

impl AdfResult {
    /// Sentinel for "not enough data".
    #[must_use]
    pub const fn undefined() -> Self {
        Self {
            statistic: f64::NAN,
            p_value: f64::NAN,
            used_lag: 0,
            nobs: 0,
        }
    }

    /// Whether both the statistic and the p-value are numbers.
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.statistic.is_finite() && self.p_value.is_finite()
    }
}

/// Run the ADF test on the defined values of `series`.
///
/// Returns [`AdfResult::undefined`] with fewer than
/// [`MIN_ADF_OBSERVATIONS`] values or when the regression is singular
/// (for example a constant series).
#[must_use]
pub fn stationarity_test(series: &TimeSeries) -> AdfResult {
    let levels: Vec<f64> = series.defined().map(|(_, v)| v).collect();
    let n = levels.len();
    if n < MIN_ADF_OBSERVATIONS {
        return AdfResult::undefined();
    }

    let diffs: Vec<f64> = levels.windows(2).map(|w| w[1] - w[0]).collect();
    let max_lag = max_lag(n);

    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=max_lag {
        let Some(fit) = fit_design(&levels, &diffs, lag, max_lag) else {
            continue;
        };
        if best.is_none_or(|(aic, _)| fit.aic < aic) {
            best = Some((fit.aic, lag));
        }
    }

    let Some((_, lag)) = best else {
        return AdfResult::undefined();
    };
    let Some(fit) = fit_design(&levels, &diffs, lag, lag) else {
        return AdfResult::undefined();
    };

    // Column 0 is the constant, column 1 the lagged level.
    let statistic = fit.coef[1] / fit.std_err[1];
    if !statistic.is_finite() {
        return AdfResult::undefined();
    }

    AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic),
        used_lag: lag,
        nobs: fit.nobs,
    }
}

fn max_lag(n: usize) -> usize {
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    schwert.min((n / 2).saturating_sub(2))
}

/// Fit the ADF regression with `lag` augmentation terms on rows
/// `start..diffs.len()`. `start` must be at least `lag`.
fn fit_design(levels: &[f64], diffs: &[f64], lag: usize, start: usize) -> Option<OlsFit> {
    let rows: Vec<Vec<f64>> = (start..diffs.len())
        .map(|t| {
            let mut row = Vec::with_capacity(lag + 2);
            row.push(1.0);
            row.push(levels[t]);
            row.extend((1..=lag).map(|i| diffs[t - i]));
            row
        })
        .collect();
    let target = &diffs[start..];
    ols(&rows, target)
}

// =============================================================================
// Least Squares
// =============================================================================

struct OlsFit {
    coef: Vec<f64>,
    std_err: Vec<f64>,
    aic: f64,
    nobs: usize,
}

fn ols(rows: &[Vec<f64>], target: &[f64]) -> Option<OlsFit> {
    let nobs = rows.len();
    let k = rows.first()?.len();
    if nobs <= k {
        return None;
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, y) in rows.iter().zip(target) {
        for i in 0..k {
            xty[i] += row[i] * y;
            for j in 0..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }

    let inv = invert(xtx)?;
    let coef: Vec<f64> = (0..k)
        .map(|i| (0..k).map(|j| inv[i][j] * xty[j]).sum())
        .collect();

    let ssr: f64 = rows
        .iter()
        .zip(target)
        .map(|(row, y)| {
            let fitted: f64 = row.iter().zip(&coef).map(|(x, b)| x * b).sum();
            (y - fitted) * (y - fitted)
        })
        .sum();

    let nobs_f = nobs as f64;
    let sigma2 = ssr / (nobs - k) as f64;
    let std_err = (0..k).map(|i| (sigma2 * inv[i][i]).sqrt()).collect();
    let llf = -nobs_f / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / nobs_f).ln() + 1.0);
    let aic = 2.0f64.mul_add(k as f64, -2.0 * llf);

    Some(OlsFit {
        coef,
        std_err,
        aic,
        nobs,
    })
}

/// Gauss-Jordan inverse with partial pivoting. `None` if numerically singular.
fn invert(mut a: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let scale = (0..n).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    if scale == 0.0 {
        return None;
    }
    let tol = scale * 1e-12;

    let mut inv: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let pivot = (col..n).max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))?;
        if a[pivot][col].abs() <= tol {
            return None;
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);

        let p = a[col][col];
        for j in 0..n {
            a[col][j] /= p;
            inv[col][j] /= p;
        }

        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = a[r][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[r][j] -= factor * a[col][j];
                inv[r][j] -= factor * inv[col][j];
            }
        }
    }

    Some(inv)
}

// =============================================================================
// p-value
// =============================================================================

/// MacKinnon approximate p-value for an ADF statistic (constant, N = 1).
#[must_use]
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coefs: &[f64] = if statistic <= TAU_STAR {
        &TAU_SMALL_P
    } else {
        &TAU_LARGE_P
    };
    let z = coefs
        .iter()
        .rev()
        .fold(0.0_f64, |acc, c| acc.mul_add(statistic, *c));
    normal_cdf(z)
}

fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + libm::erf(z / std::f64::consts::SQRT_2))
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn indexed(values: &[f64]) -> TimeSeries {
        TimeSeries::from_points(values.iter().enumerate().map(|(i, v)| (i as i64, *v)))
    }

    fn noise(seed: u64, n: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.random_range(-1.0..1.0)).collect()
    }

    #[test]
    fn too_few_observations_is_undefined() {
        let s = indexed(&[1.0, 2.0, 1.5, 1.7, 1.2, 1.9, 1.1, 1.4, 1.6]);
        let r = stationarity_test(&s);
        assert!(r.statistic.is_nan());
        assert!(r.p_value.is_nan());
        assert!(!r.is_defined());
    }

    #[test]
    fn missing_values_do_not_count() {
        let mut values: Vec<Option<f64>> = noise(3, 9).into_iter().map(Some).collect();
        values.extend([None, None, None]);
        let index = (0..values.len() as i64).collect();
        let r = stationarity_test(&TimeSeries::new(index, values));
        assert!(!r.is_defined());
    }

    #[test]
    fn constant_series_is_undefined() {
        let s = indexed(&[5.0; 40]);
        assert!(!stationarity_test(&s).is_defined());
    }

    #[test]
    fn max_lag_bounds() {
        assert_eq!(max_lag(10), 3);
        assert_eq!(max_lag(100), 12);
        assert_eq!(max_lag(300), 16);
    }

    #[test]
    fn white_noise_rejects_unit_root() {
        let s = indexed(&noise(7, 300));
        let r = stationarity_test(&s);
        assert!(r.is_defined());
        assert!(r.statistic < -3.5, "statistic {}", r.statistic);
        assert!(r.p_value < 0.01, "p-value {}", r.p_value);
        assert!(r.used_lag <= 16);
    }

    #[test]
    fn random_walk_is_less_stationary_than_noise() {
        let steps = noise(11, 300);
        let walk: Vec<f64> = steps
            .iter()
            .scan(100.0, |level, step| {
                *level += step;
                Some(*level)
            })
            .collect();

        let walk_result = stationarity_test(&indexed(&walk));
        let noise_result = stationarity_test(&indexed(&steps));
        assert!(walk_result.is_defined());
        assert!(walk_result.statistic > noise_result.statistic);
        assert!(walk_result.p_value > noise_result.p_value);
    }

    #[test]
    fn p_value_surface() {
        assert_eq!(mackinnon_p_value(3.0), 1.0);
        assert_eq!(mackinnon_p_value(-20.0), 0.0);
        // 5% critical value for the constant-only case is about -2.86.
        assert!((mackinnon_p_value(-2.86) - 0.05).abs() < 0.005);
        assert!(mackinnon_p_value(-3.5) < mackinnon_p_value(-2.0));
    }
}
