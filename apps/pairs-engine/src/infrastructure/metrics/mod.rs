//! Prometheus Metrics Module
//!
//! # Metrics
//!
//! - **Ingestion**: messages received, ticks written and messages dropped per
//!   symbol, with the drop reason as a label
//! - **Storage**: tick write failures
//! - **Connections**: live feed connections and reconnect attempts
//! - **Analytics**: duration of each pairs pass
//!
//! Recording is a no-op until [`init_metrics`] installs the recorder, so the
//! library and its tests never need a global exporter.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

// =============================================================================
// Installation
// =============================================================================

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// With a non-zero `port` an HTTP scrape endpoint is served on
/// `0.0.0.0:<port>` (requires a running tokio runtime). Calling this again
/// after a successful install is a no-op.
pub fn init_metrics(port: u16) -> Result<(), BuildError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let builder = PrometheusBuilder::new();
    if port == 0 {
        builder.install_recorder()?;
    } else {
        builder
            .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
            .install()?;
        tracing::info!(port, "Prometheus scrape endpoint listening");
    }

    register_metrics();
    let _ = INSTALLED.set(());
    Ok(())
}

fn register_metrics() {
    describe_counter!(
        "pairs_engine_messages_received_total",
        "Text frames received from the trade feed"
    );
    describe_counter!(
        "pairs_engine_ticks_written_total",
        "Validated ticks persisted to the tick store"
    );
    describe_counter!(
        "pairs_engine_messages_dropped_total",
        "Feed messages dropped as malformed"
    );
    describe_counter!(
        "pairs_engine_store_write_failures_total",
        "Tick inserts that failed and were skipped"
    );
    describe_counter!(
        "pairs_engine_reconnects_total",
        "Feed reconnection attempts"
    );
    describe_gauge!(
        "pairs_engine_feed_connections",
        "Whether the feed for a symbol is currently streaming (0/1)"
    );
    describe_histogram!(
        "pairs_engine_analytics_pass_seconds",
        "Duration of one pairs analytics pass"
    );
}

// =============================================================================
// Recording
// =============================================================================

/// A text frame arrived for `symbol`.
pub fn record_message_received(symbol: &str) {
    counter!("pairs_engine_messages_received_total", "symbol" => symbol.to_string()).increment(1);
}

/// A tick for `symbol` was persisted.
pub fn record_tick_written(symbol: &str) {
    counter!("pairs_engine_ticks_written_total", "symbol" => symbol.to_string()).increment(1);
}

/// A message for `symbol` was dropped.
pub fn record_message_dropped(symbol: &str, reason: &'static str) {
    counter!(
        "pairs_engine_messages_dropped_total",
        "symbol" => symbol.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// Persisting a tick for `symbol` failed.
pub fn record_store_write_failure(symbol: &str) {
    counter!("pairs_engine_store_write_failures_total", "symbol" => symbol.to_string())
        .increment(1);
}

/// The consumer for `symbol` is about to reconnect.
pub fn record_reconnect(symbol: &str) {
    counter!("pairs_engine_reconnects_total", "symbol" => symbol.to_string()).increment(1);
}

/// Set whether the feed for `symbol` is streaming.
pub fn set_feed_connected(symbol: &str, connected: bool) {
    gauge!("pairs_engine_feed_connections", "symbol" => symbol.to_string())
        .set(if connected { 1.0 } else { 0.0 });
}

/// Record the duration of an analytics pass.
pub fn record_analytics_pass(duration: Duration) {
    histogram!("pairs_engine_analytics_pass_seconds").record(duration.as_secs_f64());
}
