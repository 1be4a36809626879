//! Per-symbol feed state and counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Connection lifecycle of one consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not connected; waiting to (re)connect.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Receiving messages.
    Streaming,
    /// Stopped for good.
    Stopped,
}

impl ConnectionState {
    /// Lower-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live state of one symbol's consumer, shared with the service handle.
#[derive(Debug)]
pub struct FeedState {
    symbol: String,
    state: parking_lot::RwLock<ConnectionState>,
    last_connected_at: parking_lot::RwLock<Option<DateTime<Utc>>>,
    last_error: parking_lot::RwLock<Option<String>>,
    messages_received: AtomicU64,
    ticks_written: AtomicU64,
    dropped_malformed: AtomicU64,
    write_failures: AtomicU64,
    reconnects: AtomicU64,
}

impl FeedState {
    /// Fresh, disconnected state for `symbol`.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            state: parking_lot::RwLock::new(ConnectionState::Disconnected),
            last_connected_at: parking_lot::RwLock::new(None),
            last_error: parking_lot::RwLock::new(None),
            messages_received: AtomicU64::new(0),
            ticks_written: AtomicU64::new(0),
            dropped_malformed: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
        }
    }

    /// Subscribed symbol (lower-case).
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Move to `state`. Entering `Streaming` records the time and clears the
    /// last error.
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        if state == ConnectionState::Streaming {
            *self.last_connected_at.write() = Some(Utc::now());
            *self.last_error.write() = None;
        }
    }

    /// Record the reason the last connection ended.
    pub fn set_error(&self, message: String) {
        *self.last_error.write() = Some(message);
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub(crate) fn increment_messages(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_written(&self) {
        self.ticks_written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_dropped(&self) {
        self.dropped_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_write_failures(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_reconnects(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the state and counters.
    #[must_use]
    pub fn snapshot(&self) -> FeedStats {
        FeedStats {
            symbol: self.symbol.clone(),
            state: self.state(),
            last_connected_at: *self.last_connected_at.read(),
            last_error: self.last_error.read().clone(),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            ticks_written: self.ticks_written.load(Ordering::Relaxed),
            dropped_malformed: self.dropped_malformed.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot returned by `IngestionService::stats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStats {
    /// Subscribed symbol (lower-case).
    pub symbol: String,
    /// Connection state.
    pub state: ConnectionState,
    /// When the consumer last reached `Streaming`.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Why the last connection ended, cleared on the next successful connect.
    pub last_error: Option<String>,
    /// Text frames received.
    pub messages_received: u64,
    /// Ticks persisted.
    pub ticks_written: u64,
    /// Frames dropped as malformed.
    pub dropped_malformed: u64,
    /// Valid ticks that failed to persist.
    pub write_failures: u64,
    /// Reconnect attempts scheduled.
    pub reconnects: u64,
}
