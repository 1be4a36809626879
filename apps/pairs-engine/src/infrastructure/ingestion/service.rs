//! Ingestion Service
//!
//! Caller-owned handle that supervises one feed consumer per symbol.
//!
//! A session is one `start` to `stop` lifetime: a normalized symbol set, a
//! `JoinSet` of consumer tasks and the `CancellationToken` they share. Every
//! session gets a fresh token, so a restart never revives cancelled tasks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::consumer::FeedConsumer;
use super::state::{ConnectionState, FeedState, FeedStats};
use crate::application::ports::{FeedConnector, TickRepository};
use crate::domain::market::normalize_symbols;
use crate::infrastructure::config::FeedSettings;
use crate::infrastructure::feed::{HeartbeatConfig, ReconnectConfig};

/// Default time `stop` waits for consumers before aborting them.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// =============================================================================
// Configuration
// =============================================================================

/// Consumer tuning shared by every task in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionConfig {
    /// Backoff between connection attempts.
    pub reconnect: ReconnectConfig,
    /// Ping cadence and silence tolerance.
    pub heartbeat: HeartbeatConfig,
    /// Bounded wait in `stop` before tasks are aborted.
    pub shutdown_grace: Duration,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl IngestionConfig {
    /// Build from the feed section of the engine configuration.
    #[must_use]
    pub fn from_feed_settings(settings: &FeedSettings) -> Self {
        Self {
            reconnect: ReconnectConfig::from_feed_settings(settings),
            heartbeat: HeartbeatConfig::from_feed_settings(settings),
            shutdown_grace: settings.shutdown_grace,
        }
    }
}

// =============================================================================
// Errors and outcomes
// =============================================================================

/// Errors returned by [`IngestionService::start`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestionError {
    /// The symbol set was empty after normalization.
    #[error("no symbols to subscribe to")]
    NoSymbols,
}

/// What `start` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new session was launched.
    Started,
    /// The same symbol set was already streaming; nothing changed.
    AlreadyRunning,
}

// =============================================================================
// Service
// =============================================================================

struct Session {
    symbols: Vec<String>,
    cancel: CancellationToken,
    tasks: JoinSet<()>,
    states: Vec<Arc<FeedState>>,
}

/// Supervises the per-symbol feed consumers.
///
/// Dropping the service without calling [`stop`](Self::stop) aborts the
/// consumers when the session's `JoinSet` is dropped.
pub struct IngestionService<R> {
    repository: Arc<R>,
    connector: Arc<dyn FeedConnector>,
    config: IngestionConfig,
    session: tokio::sync::Mutex<Option<Session>>,
    states: parking_lot::RwLock<Vec<Arc<FeedState>>>,
    running: AtomicBool,
}

impl<R: TickRepository + 'static> IngestionService<R> {
    /// Create an idle service.
    #[must_use]
    pub fn new(
        repository: Arc<R>,
        connector: Arc<dyn FeedConnector>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            repository,
            connector,
            config,
            session: tokio::sync::Mutex::new(None),
            states: parking_lot::RwLock::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Start streaming `symbols`.
    ///
    /// Symbols are trimmed, lower-cased, de-duplicated and sorted. If the
    /// resulting set matches the running session this is a no-op; otherwise
    /// the running session is fully stopped before the new one is spawned.
    pub async fn start<I, S>(&self, symbols: I) -> Result<StartOutcome, IngestionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = normalize_symbols(symbols);
        if symbols.is_empty() {
            return Err(IngestionError::NoSymbols);
        }

        let mut session = self.session.lock().await;

        if let Some(current) = session.as_ref()
            && current.symbols == symbols
        {
            tracing::debug!(symbols = ?symbols, "Ingestion already running for symbol set");
            return Ok(StartOutcome::AlreadyRunning);
        }

        if let Some(previous) = session.take() {
            tracing::info!(
                previous = ?previous.symbols,
                next = ?symbols,
                "Restarting ingestion with a new symbol set"
            );
            self.shutdown(previous).await;
        }

        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        let mut states = Vec::with_capacity(symbols.len());

        for symbol in &symbols {
            let state = Arc::new(FeedState::new(symbol.clone()));
            let consumer = FeedConsumer::new(
                symbol.clone(),
                Arc::clone(&self.repository),
                Arc::clone(&self.connector),
                Arc::clone(&state),
                self.config.clone(),
                cancel.clone(),
            );
            let span = tracing::info_span!("feed_consumer", symbol = %symbol);
            tasks.spawn(consumer.run().instrument(span));
            states.push(state);
        }

        tracing::info!(symbols = ?symbols, "Ingestion started");

        *self.states.write() = states.clone();
        self.running.store(true, Ordering::SeqCst);
        *session = Some(Session {
            symbols,
            cancel,
            tasks,
            states,
        });

        Ok(StartOutcome::Started)
    }

    /// Stop the running session, if any.
    ///
    /// Waits up to the configured grace period for consumers to finish, then
    /// aborts the rest. No tick is written after this returns.
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        match session.take() {
            Some(current) => self.shutdown(current).await,
            None => tracing::debug!("Ingestion stop requested while idle"),
        }
    }

    async fn shutdown(&self, mut session: Session) {
        session.cancel.cancel();

        let grace = self.config.shutdown_grace;
        let tasks = &mut session.tasks;
        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined
                    && e.is_panic()
                {
                    tracing::error!(error = %e, "Feed consumer panicked");
                }
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                grace_ms = grace.as_millis(),
                remaining = session.tasks.len(),
                "Feed consumers did not drain in time, aborting"
            );
            session.tasks.shutdown().await;
        }

        for state in &session.states {
            state.set_state(ConnectionState::Stopped);
        }
        self.running.store(false, Ordering::SeqCst);
        tracing::info!(symbols = ?session.symbols, "Ingestion stopped");
    }

    /// Whether a session is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Normalized symbols of the active session, empty when idle.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        if !self.is_running() {
            return Vec::new();
        }
        self.states
            .read()
            .iter()
            .map(|s| s.symbol().to_string())
            .collect()
    }

    /// Per-symbol snapshot of the most recent session.
    ///
    /// After `stop` the last session's counters remain readable with every
    /// state reported as `Stopped`.
    #[must_use]
    pub fn stats(&self) -> Vec<FeedStats> {
        self.states.read().iter().map(|s| s.snapshot()).collect()
    }
}
