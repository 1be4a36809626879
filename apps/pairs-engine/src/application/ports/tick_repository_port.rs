//! Tick Repository Port (Driven Port)
//!
//! Append-only tick persistence with range queries and resampling.

use crate::domain::market::{Bar, Tick, Timeframe};

/// Port for tick persistence and retrieval.
///
/// Implementations are synchronous: every call is a short, bounded statement
/// and must not be held across an `.await`.
pub trait TickRepository: Send + Sync {
    /// Backend error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Append one tick. Committed once this returns `Ok`.
    fn insert(&self, tick: &Tick) -> Result<(), Self::Error>;

    /// Ticks for any of `symbols` (case-insensitive), optionally only those at
    /// or after `since_ms`, ordered by timestamp then insertion order.
    fn fetch(&self, symbols: &[&str], since_ms: Option<i64>) -> Result<Vec<Tick>, Self::Error>;

    /// Bars for `symbol` over `[now_ms - lookback, now_ms)`.
    fn resample_at(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback_minutes: u32,
        now_ms: i64,
    ) -> Result<Vec<Bar>, Self::Error>;

    /// Bars for `symbol` over the last `lookback_minutes` of wall-clock time.
    fn resample(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback_minutes: u32,
    ) -> Result<Vec<Bar>, Self::Error> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.resample_at(symbol, timeframe, lookback_minutes, now_ms)
    }
}
