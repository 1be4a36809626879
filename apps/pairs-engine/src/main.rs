//! Pairs Engine Binary
//!
//! Streams trades for the configured pair into SQLite and logs a pairs
//! snapshot on every refresh.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin pairs-engine
//! ```
//!
//! # Environment Variables
//!
//! - `PAIRS_SYMBOLS`: the two legs, comma separated (default: btcusdt,ethusdt)
//! - `PAIRS_DB_PATH`: SQLite file (default: data/ticks.db)
//! - `PAIRS_FEED_URL`: raw-stream base URL (default: wss://fstream.binance.com/ws)
//! - `PAIRS_TIMEFRAME`: 1s | 1m | 5m (default: 1m)
//! - `PAIRS_LOOKBACK_MINUTES`, `PAIRS_WINDOW`, `PAIRS_ALERT_THRESHOLD`,
//!   `PAIRS_ENTRY_Z`, `PAIRS_EXIT_Z`, `PAIRS_RUN_ADF`, `PAIRS_REFRESH_SECS`
//! - `PAIRS_RECONNECT_*`, `PAIRS_HEARTBEAT_*`, `PAIRS_SHUTDOWN_GRACE_MS`
//! - `PAIRS_METRICS_PORT`: Prometheus scrape port, 0 disables (default: 0)
//! - `OTEL_ENABLED`: export spans over OTLP (default: false)
//! - `RUST_LOG`: log filter (default: pairs_engine=info)

use std::sync::Arc;
use std::time::{Duration, Instant};

use pairs_engine::infrastructure::metrics::record_analytics_pass;
use pairs_engine::infrastructure::telemetry;
use pairs_engine::{
    AnalysisOutcome, BinanceTradeConnector, EngineConfig, FeedConnector, IngestionConfig,
    IngestionService, PairAnalyzer, PairRequest, PairSnapshot, SqliteTickStore, TickRepository,
    init_metrics,
};
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider was already installed");
    }

    load_dotenv_from_ancestors();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting pairs engine");

    let config = EngineConfig::from_env()?;
    log_config(&config);

    init_metrics(config.metrics_port)?;

    let store = Arc::new(SqliteTickStore::open(&config.storage.db_path)?);
    let connector: Arc<dyn FeedConnector> =
        Arc::new(BinanceTradeConnector::new(config.feed.url.clone()));
    let ingestion = IngestionService::new(
        Arc::clone(&store),
        connector,
        IngestionConfig::from_feed_settings(&config.feed),
    );
    ingestion.start(config.symbols.iter()).await?;

    let shutdown_token = CancellationToken::new();
    let analytics = tokio::spawn(run_analytics(
        PairAnalyzer::new(Arc::clone(&store)),
        config.pair_request(),
        config.analytics.refresh_interval,
        shutdown_token.clone(),
    ));

    tracing::info!("Pairs engine ready");

    await_shutdown(shutdown_token).await;

    ingestion.stop().await;
    if let Err(e) = analytics.await {
        tracing::error!(error = %e, "Analytics loop ended abnormally");
    }

    for stats in ingestion.stats() {
        tracing::info!(
            symbol = %stats.symbol,
            messages = stats.messages_received,
            written = stats.ticks_written,
            dropped = stats.dropped_malformed,
            write_failures = stats.write_failures,
            reconnects = stats.reconnects,
            "Feed summary"
        );
    }

    tracing::info!("Pairs engine stopped");
    Ok(())
}

/// Run one analytics pass per `every` until cancelled.
async fn run_analytics<R>(
    analyzer: PairAnalyzer<R>,
    request: PairRequest,
    every: Duration,
    shutdown: CancellationToken,
) where
    R: TickRepository + 'static,
{
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let started = Instant::now();
        let pass = analyzer.clone();
        let pass_request = request.clone();
        let outcome = tokio::task::spawn_blocking(move || pass.analyze(&pass_request)).await;
        record_analytics_pass(started.elapsed());

        match outcome {
            Ok(Ok(AnalysisOutcome::Ready(snapshot))) => report(&snapshot),
            Ok(Ok(AnalysisOutcome::WaitingForData { leg })) => {
                tracing::debug!(leg = %leg, "Waiting for bars");
            }
            Ok(Err(e)) => tracing::warn!(error = %e, "Analytics pass failed"),
            Err(e) => tracing::error!(error = %e, "Analytics pass panicked"),
        }
    }

    tracing::debug!("Analytics loop stopped");
}

fn report(snapshot: &PairSnapshot) {
    tracing::info!(
        leg_a = %snapshot.leg_a,
        leg_b = %snapshot.leg_b,
        bars = snapshot.aligned_len(),
        hedge_ratio = snapshot.hedge_ratio,
        zscore = ?snapshot.latest_zscore,
        equity = snapshot.final_equity(),
        "Pair snapshot"
    );

    if let Some(adf) = &snapshot.stationarity {
        tracing::info!(
            statistic = adf.statistic,
            p_value = adf.p_value,
            used_lag = adf.used_lag,
            "Spread stationarity"
        );
    }

    if let Some(alert) = &snapshot.alert {
        tracing::warn!(side = ?alert.side, "{alert}");
    }
}

/// Log the parsed configuration.
fn log_config(config: &EngineConfig) {
    tracing::info!(
        symbols = ?config.symbols,
        db_path = %config.storage.db_path.display(),
        timeframe = %config.analytics.timeframe,
        lookback_minutes = config.analytics.lookback_minutes,
        window = config.analytics.window,
        metrics_port = config.metrics_port,
        "Configuration loaded"
    );
    tracing::debug!(
        feed_url = %config.feed.url,
        heartbeat_secs = config.feed.heartbeat_interval.as_secs(),
        reconnect_max_secs = config.feed.reconnect_delay_max.as_secs(),
        "Feed settings"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv_from_ancestors() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for SIGINT or SIGTERM, then cancel `shutdown_token`.
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
