//! Domain Layer - Core market data types and statistics.
//!
//! Everything here is pure: no I/O, no clocks, no shared state. Functions
//! take explicit inputs and are deterministic, so the same ticks always
//! produce the same bars and the same statistics.

/// Ticks, bars, timeframes and symbol normalization.
pub mod market;

/// Timestamp-indexed series with missing values.
pub mod series;

/// Pairs statistics (hedge ratio, spread, z-score, correlation, ADF, backtest).
pub mod analytics;

/// Threshold alerts over the latest statistic value.
pub mod alerts;
