//! Engine Configuration Settings
//!
//! Configuration types for the pairs engine, loaded from environment variables.
//! Numeric values that fail to parse fall back to their defaults; analytics
//! parameters are clamped to their supported ranges.

use std::path::PathBuf;
use std::time::Duration;

use crate::application::services::PairRequest;
use crate::domain::analytics::RegressionKind;
use crate::domain::market::{Timeframe, TimeframeError};
use crate::infrastructure::feed::BINANCE_FUTURES_WS_URL;

/// Tick store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// SQLite database file.
    pub db_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/ticks.db"),
        }
    }
}

/// Feed connection and ingestion settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSettings {
    /// Raw-stream base URL.
    pub url: String,
    /// Heartbeat ping interval.
    pub heartbeat_interval: Duration,
    /// Silence tolerated after a ping.
    pub heartbeat_timeout: Duration,
    /// Backoff floor.
    pub reconnect_delay_initial: Duration,
    /// Backoff cap.
    pub reconnect_delay_max: Duration,
    /// Backoff growth factor.
    pub reconnect_delay_multiplier: f64,
    /// Backoff jitter fraction.
    pub reconnect_jitter: f64,
    /// How long `stop` waits for consumers before aborting them.
    pub shutdown_grace: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: BINANCE_FUTURES_WS_URL.to_string(),
            heartbeat_interval: Duration::from_secs(15),
            heartbeat_timeout: Duration::from_secs(20),
            reconnect_delay_initial: Duration::from_secs(1),
            reconnect_delay_max: Duration::from_secs(30),
            reconnect_delay_multiplier: 2.0,
            reconnect_jitter: 0.1,
            shutdown_grace: Duration::from_secs(2),
        }
    }
}

/// Parameters of the periodic analytics pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSettings {
    /// Bar width.
    pub timeframe: Timeframe,
    /// Resample lookback (5..=240).
    pub lookback_minutes: u32,
    /// Rolling window in bars (10..=500).
    pub window: usize,
    /// Alert band (0.5..=5.0).
    pub alert_threshold: f64,
    /// Backtest entry band (1.0..=4.0).
    pub entry_z: f64,
    /// Backtest exit band (0.0..=2.0).
    pub exit_z: f64,
    /// Run the stationarity test on every pass.
    pub run_stationarity: bool,
    /// Delay between passes.
    pub refresh_interval: Duration,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::OneMinute,
            lookback_minutes: 60,
            window: 100,
            alert_threshold: 2.0,
            entry_z: 2.0,
            exit_z: 0.0,
            run_stationarity: false,
            refresh_interval: Duration::from_secs(1),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// The pair, lower-case, in leg order (`y`, `x`).
    pub symbols: [String; 2],
    /// Tick store settings.
    pub storage: StorageSettings,
    /// Feed settings.
    pub feed: FeedSettings,
    /// Analytics settings.
    pub analytics: AnalyticsSettings,
    /// Prometheus scrape port (0 = disabled).
    pub metrics_port: u16,
}

impl EngineConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let symbols = parse_pair(
            &env.get("PAIRS_SYMBOLS")
                .unwrap_or_else(|| "btcusdt,ethusdt".into()),
        )?;

        let storage = StorageSettings {
            db_path: env
                .get("PAIRS_DB_PATH")
                .filter(|p| !p.trim().is_empty())
                .map_or_else(|| StorageSettings::default().db_path, PathBuf::from),
        };

        let feed_defaults = FeedSettings::default();
        // A zero floor would reconnect in a tight loop.
        let reconnect_delay_initial = env
            .millis(
                "PAIRS_RECONNECT_DELAY_INITIAL_MS",
                feed_defaults.reconnect_delay_initial,
            )
            .max(Duration::from_millis(1));
        let feed = FeedSettings {
            url: env
                .get("PAIRS_FEED_URL")
                .filter(|u| !u.trim().is_empty())
                .unwrap_or(feed_defaults.url),
            heartbeat_interval: env
                .secs(
                    "PAIRS_HEARTBEAT_INTERVAL_SECS",
                    feed_defaults.heartbeat_interval,
                )
                .max(Duration::from_secs(1)),
            heartbeat_timeout: env
                .secs(
                    "PAIRS_HEARTBEAT_TIMEOUT_SECS",
                    feed_defaults.heartbeat_timeout,
                )
                .max(Duration::from_secs(1)),
            reconnect_delay_initial,
            reconnect_delay_max: env
                .secs(
                    "PAIRS_RECONNECT_DELAY_MAX_SECS",
                    feed_defaults.reconnect_delay_max,
                )
                .max(reconnect_delay_initial),
            reconnect_delay_multiplier: env
                .parse(
                    "PAIRS_RECONNECT_DELAY_MULTIPLIER",
                    feed_defaults.reconnect_delay_multiplier,
                )
                .max(1.0),
            reconnect_jitter: env
                .parse("PAIRS_RECONNECT_JITTER", feed_defaults.reconnect_jitter)
                .clamp(0.0, 1.0),
            shutdown_grace: env.millis("PAIRS_SHUTDOWN_GRACE_MS", feed_defaults.shutdown_grace),
        };

        let defaults = AnalyticsSettings::default();
        let timeframe = match env.get("PAIRS_TIMEFRAME") {
            Some(raw) => raw.parse()?,
            None => defaults.timeframe,
        };
        let analytics = AnalyticsSettings {
            timeframe,
            lookback_minutes: env
                .parse("PAIRS_LOOKBACK_MINUTES", defaults.lookback_minutes)
                .clamp(5, 240),
            window: env.parse("PAIRS_WINDOW", defaults.window).clamp(10, 500),
            alert_threshold: env
                .parse("PAIRS_ALERT_THRESHOLD", defaults.alert_threshold)
                .clamp(0.5, 5.0),
            entry_z: env.parse("PAIRS_ENTRY_Z", defaults.entry_z).clamp(1.0, 4.0),
            exit_z: env.parse("PAIRS_EXIT_Z", defaults.exit_z).clamp(0.0, 2.0),
            run_stationarity: env.flag("PAIRS_RUN_ADF", defaults.run_stationarity),
            refresh_interval: env
                .secs("PAIRS_REFRESH_SECS", defaults.refresh_interval)
                .max(Duration::from_secs(1)),
        };

        Ok(Self {
            symbols,
            storage,
            feed,
            analytics,
            metrics_port: env.parse("PAIRS_METRICS_PORT", 0),
        })
    }

    /// Analytics request for the configured pair.
    #[must_use]
    pub fn pair_request(&self) -> PairRequest {
        let [leg_a, leg_b] = self.symbols.clone();
        PairRequest {
            leg_a,
            leg_b,
            timeframe: self.analytics.timeframe,
            lookback_minutes: self.analytics.lookback_minutes,
            window: self.analytics.window,
            entry_z: self.analytics.entry_z,
            exit_z: self.analytics.exit_z,
            alert_threshold: self.analytics.alert_threshold,
            run_stationarity: self.analytics.run_stationarity,
            regression: RegressionKind::Ols,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `PAIRS_TIMEFRAME` is not supported.
    #[error(transparent)]
    Timeframe(#[from] TimeframeError),
    /// `PAIRS_SYMBOLS` does not name exactly two distinct symbols.
    #[error("PAIRS_SYMBOLS must name exactly two distinct symbols, got {0:?}")]
    SymbolCount(Vec<String>),
}

fn parse_pair(raw: &str) -> Result<[String; 2], ConfigError> {
    let mut symbols: Vec<String> = Vec::new();
    for s in raw.split(',').map(|s| s.trim().to_lowercase()) {
        if !s.is_empty() && !symbols.contains(&s) {
            symbols.push(s);
        }
    }
    <[String; 2]>::try_from(symbols).map_err(ConfigError::SymbolCount)
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn secs(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_secs)
    }

    fn millis(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_millis)
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        self.get(key).map_or(default, |v| {
            matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.symbols, ["btcusdt".to_string(), "ethusdt".to_string()]);
        assert_eq!(cfg.storage.db_path, PathBuf::from("data/ticks.db"));
        assert_eq!(cfg.feed.url, "wss://fstream.binance.com/ws");
        assert_eq!(cfg.feed.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(cfg.feed.heartbeat_timeout, Duration::from_secs(20));
        assert_eq!(cfg.feed.reconnect_delay_initial, Duration::from_secs(1));
        assert_eq!(cfg.feed.reconnect_delay_max, Duration::from_secs(30));
        assert_eq!(cfg.feed.shutdown_grace, Duration::from_secs(2));
        assert_eq!(cfg.analytics, AnalyticsSettings::default());
        assert_eq!(cfg.metrics_port, 0);
    }

    #[test]
    fn analytics_values_are_clamped() {
        let cfg = config(&[
            ("PAIRS_LOOKBACK_MINUTES", "1000"),
            ("PAIRS_WINDOW", "3"),
            ("PAIRS_ALERT_THRESHOLD", "9"),
            ("PAIRS_ENTRY_Z", "0.2"),
            ("PAIRS_EXIT_Z", "-1"),
            ("PAIRS_RUN_ADF", "true"),
        ])
        .unwrap();
        assert_eq!(cfg.analytics.lookback_minutes, 240);
        assert_eq!(cfg.analytics.window, 10);
        assert_eq!(cfg.analytics.alert_threshold, 5.0);
        assert_eq!(cfg.analytics.entry_z, 1.0);
        assert_eq!(cfg.analytics.exit_z, 0.0);
        assert!(cfg.analytics.run_stationarity);
    }

    #[test]
    fn zero_feed_timings_are_raised_to_floors() {
        let cfg = config(&[
            ("PAIRS_HEARTBEAT_INTERVAL_SECS", "0"),
            ("PAIRS_HEARTBEAT_TIMEOUT_SECS", "0"),
            ("PAIRS_RECONNECT_DELAY_INITIAL_MS", "0"),
            ("PAIRS_RECONNECT_DELAY_MAX_SECS", "0"),
            ("PAIRS_RECONNECT_DELAY_MULTIPLIER", "0.5"),
        ])
        .unwrap();
        assert_eq!(cfg.feed.heartbeat_interval, Duration::from_secs(1));
        assert_eq!(cfg.feed.heartbeat_timeout, Duration::from_secs(1));
        assert_eq!(cfg.feed.reconnect_delay_initial, Duration::from_millis(1));
        assert_eq!(cfg.feed.reconnect_delay_max, Duration::from_millis(1));
        assert_eq!(cfg.feed.reconnect_delay_multiplier, 1.0);
    }

    #[test]
    fn unparsable_numbers_fall_back_to_defaults() {
        let cfg = config(&[("PAIRS_WINDOW", "lots"), ("PAIRS_METRICS_PORT", "-1")]).unwrap();
        assert_eq!(cfg.analytics.window, 100);
        assert_eq!(cfg.metrics_port, 0);
    }

    #[test]
    fn unsupported_timeframe_is_an_error() {
        let err = config(&[("PAIRS_TIMEFRAME", "15m")]).unwrap_err();
        assert!(matches!(err, ConfigError::Timeframe(TimeframeError::Unsupported(_))));
    }

    #[test]
    fn symbols_keep_leg_order() {
        let cfg = config(&[("PAIRS_SYMBOLS", " ETHUSDT , btcusdt ")]).unwrap();
        assert_eq!(cfg.symbols, ["ethusdt".to_string(), "btcusdt".to_string()]);
        let req = cfg.pair_request();
        assert_eq!(req.leg_a, "ethusdt");
        assert_eq!(req.leg_b, "btcusdt");
    }

    #[test]
    fn symbol_count_must_be_two() {
        assert!(matches!(
            config(&[("PAIRS_SYMBOLS", "btcusdt")]),
            Err(ConfigError::SymbolCount(_))
        ));
        assert!(matches!(
            config(&[("PAIRS_SYMBOLS", "btcusdt,BTCUSDT")]),
            Err(ConfigError::SymbolCount(_))
        ));
        assert!(matches!(
            config(&[("PAIRS_SYMBOLS", "a,b,c")]),
            Err(ConfigError::SymbolCount(_))
        ));
    }
}
