//! Z-Score Alerts
//!
//! Stateless threshold check over the latest z-score. An alert fires on every
//! evaluation where the condition holds; there is no hysteresis or
//! de-duplication.

use std::fmt;

/// Default alert threshold.
pub const DEFAULT_ALERT_THRESHOLD: f64 = 2.0;

/// Which side of the band was breached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertSide {
    /// `z >= threshold`.
    High,
    /// `z <= -threshold`.
    Low,
}

/// A fired alert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alert {
    /// Side of the band.
    pub side: AlertSide,
    /// The z-score that triggered it.
    pub zscore: f64,
    /// The (positive) threshold it was compared against.
    pub threshold: f64,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.side {
            AlertSide::High => write!(
                f,
                "ALERT: Z-score {:.2} >= {:.2}",
                self.zscore, self.threshold
            ),
            AlertSide::Low => write!(
                f,
                "ALERT: Z-score {:.2} <= {:.2}",
                self.zscore, -self.threshold
            ),
        }
    }
}

/// Compares a statistic against a symmetric band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertEvaluator {
    threshold: f64,
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_THRESHOLD)
    }
}

impl AlertEvaluator {
    /// Create an evaluator. The threshold is used as given; a negative one
    /// makes every defined value alert.
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Configured threshold.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Evaluate the latest value. Missing or NaN never alerts.
    #[must_use]
    pub fn check(&self, latest: Option<f64>) -> Option<Alert> {
        let zscore = latest.filter(|z| !z.is_nan())?;
        let side = if zscore >= self.threshold {
            AlertSide::High
        } else if zscore <= -self.threshold {
            AlertSide::Low
        } else {
            return None;
        };
        Some(Alert {
            side,
            zscore,
            threshold: self.threshold,
        })
    }
}
