//! Market Data Types
//!
//! Trade ticks as received from a feed and the OHLCV bars derived from them.
//!
//! # Invariants
//!
//! - A [`Tick`] always has a non-negative timestamp, a finite positive price and a
//!   finite non-negative quantity. The constructor is the only way to build one.
//! - Symbols are stored upper-case; the feed layer subscribes lower-case.
//! - A [`Bar`] is never persisted and exists only for periods that saw at least
//!   one tick.

mod timeframe;

pub use timeframe::{Timeframe, TimeframeError};

use serde::{Deserialize, Serialize};

// =============================================================================
// Symbols
// =============================================================================

/// Canonical (upper-case, trimmed) form of a symbol, as stored in the tick log.
#[must_use]
pub fn canonical_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Normalize a symbol set for subscription: trim, lower-case, drop empties,
/// de-duplicate and sort.
///
/// Two inputs that differ only in order or case normalize to the same vector.
#[must_use]
pub fn normalize_symbols<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = symbols
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

// =============================================================================
// Tick
// =============================================================================

/// Reasons a tick is rejected at construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TickError {
    /// Timestamp is negative.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),
    /// Symbol is empty after trimming.
    #[error("empty symbol")]
    EmptySymbol,
    /// Price is not finite or not strictly positive.
    #[error("invalid price: {0}")]
    InvalidPrice(f64),
    /// Quantity is not finite or negative.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(f64),
}

/// A single trade event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    timestamp_ms: i64,
    symbol: String,
    price: f64,
    quantity: f64,
}

impl Tick {
    /// Build a validated tick. The symbol is canonicalized to upper-case.
    pub fn new(
        timestamp_ms: i64,
        symbol: &str,
        price: f64,
        quantity: f64,
    ) -> Result<Self, TickError> {
        if timestamp_ms < 0 {
            return Err(TickError::InvalidTimestamp(timestamp_ms));
        }
        let symbol = canonical_symbol(symbol);
        if symbol.is_empty() {
            return Err(TickError::EmptySymbol);
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(TickError::InvalidPrice(price));
        }
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(TickError::InvalidQuantity(quantity));
        }
        Ok(Self {
            timestamp_ms,
            symbol,
            price,
            quantity,
        })
    }

    /// Event time in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Upper-case symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Trade price.
    #[must_use]
    pub const fn price(&self) -> f64 {
        self.price
    }

    /// Trade quantity.
    #[must_use]
    pub const fn quantity(&self) -> f64 {
        self.quantity
    }
}

// =============================================================================
// Bar
// =============================================================================

/// OHLCV aggregate over one timeframe period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Start of the period (ms since epoch, aligned to the timeframe width).
    pub period_start_ms: i64,
    /// Price of the first tick in the period.
    pub open: f64,
    /// Highest price in the period.
    pub high: f64,
    /// Lowest price in the period.
    pub low: f64,
    /// Price of the last tick in the period.
    pub close: f64,
    /// Sum of traded quantity in the period.
    pub volume: f64,
}

impl Bar {
    /// Open a bar from the first tick of a period.
    #[must_use]
    pub const fn open_at(period_start_ms: i64, price: f64, quantity: f64) -> Self {
        Self {
            period_start_ms,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: quantity,
        }
    }

    /// Fold a later tick of the same period into the bar.
    pub fn absorb(&mut self, price: f64, quantity: f64) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
        self.volume += quantity;
    }
}

/// Bucket ticks into bars.
///
/// `ticks` must already be ordered by timestamp (ties in arrival order), which
/// is what the tick store returns. Periods without ticks produce no bar.
#[must_use]
pub fn aggregate_bars(ticks: &[Tick], timeframe: Timeframe) -> Vec<Bar> {
    let mut bars: Vec<Bar> = Vec::new();

    for tick in ticks {
        let start = timeframe.period_start(tick.timestamp_ms());
        match bars.last_mut() {
            Some(bar) if bar.period_start_ms == start => {
                bar.absorb(tick.price(), tick.quantity());
            }
            _ => bars.push(Bar::open_at(start, tick.price(), tick.quantity())),
        }
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(ts: i64, price: f64, qty: f64) -> Tick {
        Tick::new(ts, "btcusdt", price, qty).unwrap()
    }

    #[test]
    fn tick_canonicalizes_symbol() {
        let t = Tick::new(1, " ethusdt ", 10.0, 0.0).unwrap();
        assert_eq!(t.symbol(), "ETHUSDT");
    }

    #[test]
    fn tick_rejects_bad_values() {
        assert_eq!(
            Tick::new(-1, "x", 1.0, 1.0),
            Err(TickError::InvalidTimestamp(-1))
        );
        assert_eq!(Tick::new(1, "  ", 1.0, 1.0), Err(TickError::EmptySymbol));
        assert_eq!(Tick::new(1, "x", 0.0, 1.0), Err(TickError::InvalidPrice(0.0)));
        assert!(matches!(
            Tick::new(1, "x", f64::NAN, 1.0),
            Err(TickError::InvalidPrice(_))
        ));
        assert_eq!(
            Tick::new(1, "x", 1.0, -0.5),
            Err(TickError::InvalidQuantity(-0.5))
        );
    }

    #[test]
    fn normalize_symbols_is_order_and_case_insensitive() {
        let a = normalize_symbols(["ETHUSDT", "btcusdt", "ethusdt", " "]);
        let b = normalize_symbols(["BTCUSDT", "EthUsdt"]);
        assert_eq!(a, vec!["btcusdt", "ethusdt"]);
        assert_eq!(a, b);
    }

    #[test]
    fn aggregate_single_second_bucket() {
        let ticks = vec![
            tick(0, 10.0, 1.0),
            tick(500, 12.0, 2.0),
            tick(999, 11.0, 3.0),
        ];
        let bars = aggregate_bars(&ticks, Timeframe::OneSecond);
        assert_eq!(bars.len(), 1);
        let bar = bars[0];
        assert_eq!(bar.period_start_ms, 0);
        assert_eq!(bar.open, 10.0);
        assert_eq!(bar.high, 12.0);
        assert_eq!(bar.low, 10.0);
        assert_eq!(bar.close, 11.0);
        assert_eq!(bar.volume, 6.0);
    }

    #[test]
    fn aggregate_skips_empty_periods() {
        let ticks = vec![tick(1_000, 10.0, 1.0), tick(3_200, 9.0, 1.0)];
        let bars = aggregate_bars(&ticks, Timeframe::OneSecond);
        let starts: Vec<i64> = bars.iter().map(|b| b.period_start_ms).collect();
        assert_eq!(starts, vec![1_000, 3_000]);
    }

    #[test]
    fn aggregate_empty_input() {
        assert!(aggregate_bars(&[], Timeframe::OneMinute).is_empty());
    }
}
