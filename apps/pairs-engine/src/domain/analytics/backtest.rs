//! Toy mean-reversion backtest on a z-score sequence.
//!
//! One unit of spread, no costs, no slippage. The position entering step `t`
//! earns `exposure · (z[t] - z[t-1])`, so a short gains while z falls toward
//! zero and a long gains while z rises toward zero. The transition at step `t`
//! only affects PnL from step `t + 1` on.

use crate::domain::series::TimeSeries;

/// Spread position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    /// No exposure.
    #[default]
    Flat,
    /// Long the spread (entered on a low z-score).
    Long,
    /// Short the spread (entered on a high z-score).
    Short,
}

impl Position {
    /// Signed spread exposure.
    #[must_use]
    pub const fn exposure(self) -> f64 {
        match self {
            Self::Flat => 0.0,
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }

    /// Next position after observing `z`.
    #[must_use]
    pub fn step(self, z: f64, entry: f64, exit: f64) -> Self {
        match self {
            Self::Flat if z > entry => Self::Short,
            Self::Flat if z < -entry => Self::Long,
            Self::Flat => Self::Flat,
            Self::Long | Self::Short if z.abs() < exit => Self::Flat,
            held => held,
        }
    }
}

/// Cumulative equity of the single-unit strategy, one point per defined z.
///
/// Missing z values are skipped; the first defined point has equity 0.
#[must_use]
pub fn mean_reversion_backtest(z: &TimeSeries, entry: f64, exit: f64) -> TimeSeries {
    let mut position = Position::Flat;
    let mut previous: Option<f64> = None;
    let mut equity = 0.0;

    let points: Vec<(i64, f64)> = z
        .defined()
        .map(|(t, value)| {
            if let Some(prev) = previous {
                equity += position.exposure() * (value - prev);
            }
            position = position.step(value, entry, exit);
            previous = Some(value);
            (t, equity)
        })
        .collect();

    TimeSeries::from_points(points)
}
