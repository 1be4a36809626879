//! Resampling timeframes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unsupported timeframe string. A configuration error, never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeframeError {
    /// The value is not one of the supported timeframes.
    #[error("unsupported timeframe: {0}")]
    Unsupported(String),
}

/// Fixed bucket width used to resample ticks into bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    /// One-second bars.
    #[serde(rename = "1s")]
    OneSecond,
    /// One-minute bars.
    #[default]
    #[serde(rename = "1m")]
    OneMinute,
    /// Five-minute bars.
    #[serde(rename = "5m")]
    FiveMinutes,
}

impl Timeframe {
    /// All supported timeframes, shortest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::OneSecond, Self::OneMinute, Self::FiveMinutes]
    }

    /// Bucket width in milliseconds.
    #[must_use]
    pub const fn width_ms(self) -> i64 {
        match self {
            Self::OneSecond => 1_000,
            Self::OneMinute => 60_000,
            Self::FiveMinutes => 300_000,
        }
    }

    /// Short label (`1s`, `1m`, `5m`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneSecond => "1s",
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
        }
    }

    /// Epoch-aligned start of the period containing `timestamp_ms`.
    #[must_use]
    pub const fn period_start(self, timestamp_ms: i64) -> i64 {
        timestamp_ms.div_euclid(self.width_ms()) * self.width_ms()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1s" | "1sec" | "1second" => Ok(Self::OneSecond),
            "1m" | "1min" | "1minute" => Ok(Self::OneMinute),
            "5m" | "5min" | "5minutes" => Ok(Self::FiveMinutes),
            _ => Err(TimeframeError::Unsupported(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("1s", Timeframe::OneSecond ; "short seconds")]
    #[test_case("1Second", Timeframe::OneSecond ; "long seconds")]
    #[test_case("1min", Timeframe::OneMinute ; "minute alias")]
    #[test_case(" 1M ", Timeframe::OneMinute ; "padded upper")]
    #[test_case("5minutes", Timeframe::FiveMinutes ; "five minutes")]
    fn parses_aliases(raw: &str, expected: Timeframe) {
        assert_eq!(raw.parse::<Timeframe>(), Ok(expected));
    }

    #[test_case("15m" ; "unsupported width")]
    #[test_case("" ; "empty")]
    #[test_case("1h" ; "hour")]
    fn rejects_unsupported(raw: &str) {
        assert_eq!(
            raw.parse::<Timeframe>(),
            Err(TimeframeError::Unsupported(raw.to_string()))
        );
    }

    #[test]
    fn period_start_is_epoch_aligned() {
        assert_eq!(Timeframe::OneSecond.period_start(999), 0);
        assert_eq!(Timeframe::OneSecond.period_start(1_000), 1_000);
        assert_eq!(Timeframe::OneMinute.period_start(119_999), 60_000);
        assert_eq!(Timeframe::FiveMinutes.period_start(299_999), 0);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for tf in Timeframe::all() {
            assert_eq!(tf.to_string().parse::<Timeframe>(), Ok(*tf));
        }
    }
}
