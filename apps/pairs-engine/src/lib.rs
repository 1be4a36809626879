#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::cast_lossless
    )
)]

//! Pairs Engine - Tick Ingestion and Pairs Analytics
//!
//! Keeps one reconnecting trade-feed consumer per symbol, appends every valid
//! tick to a SQLite log, resamples the log into OHLCV bars on demand and
//! computes pairs-trading statistics over two legs.
//!
//! # Layers (inside to outside)
//!
//! - **Domain**: pure types and statistics
//!   - `market`: ticks, bars, timeframes
//!   - `series`: timestamp-indexed series with gaps
//!   - `analytics`: hedge ratio, spread, z-score, correlation, ADF, backtest
//!   - `alerts`: threshold alerts on the latest z-score
//!
//! - **Application**: use cases and port definitions
//!   - `ports`: `TickRepository`, `FeedConnector` / `FeedConnection`
//!   - `services`: `PairAnalyzer`
//!
//! - **Infrastructure**: adapters and ambient plumbing
//!   - `storage`: `SqliteTickStore`
//!   - `feed`: Binance WebSocket adapter, codec, backoff, heartbeat
//!   - `ingestion`: `IngestionService` and its consumers
//!   - `config`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//! trade WS (sym A) --> consumer A --+
//!                                   +--> SqliteTickStore --> resample --> PairAnalyzer --> Alert
//! trade WS (sym B) --> consumer B --+
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Market types and statistics with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::alerts::{Alert, AlertEvaluator, AlertSide};
pub use domain::market::{Bar, Tick, TickError, Timeframe, TimeframeError};
pub use domain::series::TimeSeries;

// Ports and services
pub use application::ports::{FeedConnection, FeedConnector, FeedError, FeedFrame, TickRepository};
pub use application::services::{
    AnalysisOutcome, PairAnalyzer, PairError, PairRequest, PairSnapshot,
};

// Storage
pub use infrastructure::storage::{SqliteTickStore, StoreError};

// Ingestion
pub use infrastructure::feed::BinanceTradeConnector;
pub use infrastructure::ingestion::{
    ConnectionState, FeedStats, IngestionConfig, IngestionError, IngestionService, StartOutcome,
};

// Infrastructure config
pub use infrastructure::config::{
    AnalyticsSettings, ConfigError, EngineConfig, FeedSettings, StorageSettings,
};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
