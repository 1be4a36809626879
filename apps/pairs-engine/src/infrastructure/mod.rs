//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete implementations of the application ports plus the ambient
//! plumbing (configuration, metrics, tracing).

/// SQLite tick store.
pub mod storage;

/// Trade feed transport: backoff, heartbeat, codec and the Binance adapter.
pub mod feed;

/// Per-symbol feed consumers and their supervisor.
pub mod ingestion;

/// Environment-driven configuration.
pub mod config;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Tracing subscriber and optional OTLP export.
pub mod telemetry;
