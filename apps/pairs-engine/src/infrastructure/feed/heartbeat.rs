//! Heartbeat
//!
//! Liveness tracking for one feed connection. The consumer calls
//! [`HeartbeatState::on_tick`] every `ping_interval`; any received frame counts
//! as proof of life. If a ping is outstanding and nothing has arrived within
//! `pong_timeout`, the connection is considered dead.

use std::time::Duration;

use tokio::time::Instant;

use crate::infrastructure::config::FeedSettings;

const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Ping cadence and liveness timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval between pings.
    pub ping_interval: Duration,
    /// Silence tolerated while a ping is outstanding.
    pub pong_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(15),
            pong_timeout: Duration::from_secs(20),
        }
    }
}

impl HeartbeatConfig {
    /// Custom heartbeat.
    #[must_use]
    pub const fn new(ping_interval: Duration, pong_timeout: Duration) -> Self {
        Self {
            ping_interval,
            pong_timeout,
        }
    }

    /// Tick period for the ping timer, never zero.
    #[must_use]
    pub fn tick_period(&self) -> Duration {
        self.ping_interval.max(MIN_TICK_PERIOD)
    }

    /// Heartbeat taken from the feed settings.
    #[must_use]
    pub const fn from_feed_settings(settings: &FeedSettings) -> Self {
        Self {
            ping_interval: settings.heartbeat_interval,
            pong_timeout: settings.heartbeat_timeout,
        }
    }
}

/// What the consumer should do on a heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatEvent {
    /// Send a ping.
    SendPing,
    /// Give up on the connection.
    Timeout(Duration),
}

/// Liveness state of a single connection.
#[derive(Debug)]
pub struct HeartbeatState {
    config: HeartbeatConfig,
    last_seen: Instant,
    waiting_for_pong: bool,
}

impl HeartbeatState {
    /// State for a freshly opened connection.
    #[must_use]
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            last_seen: Instant::now(),
            waiting_for_pong: false,
        }
    }

    /// Record any inbound frame.
    pub fn record_frame(&mut self) {
        self.last_seen = Instant::now();
        self.waiting_for_pong = false;
    }

    /// Whether a ping is outstanding.
    #[must_use]
    pub const fn is_waiting_for_pong(&self) -> bool {
        self.waiting_for_pong
    }

    /// Time since the last inbound frame.
    #[must_use]
    pub fn silence(&self) -> Duration {
        self.last_seen.elapsed()
    }

    /// Decide the action for this tick and mark a ping as sent if needed.
    pub fn on_tick(&mut self) -> HeartbeatEvent {
        let silence = self.silence();
        if self.waiting_for_pong && silence > self.config.pong_timeout {
            return HeartbeatEvent::Timeout(silence);
        }
        self.waiting_for_pong = true;
        HeartbeatEvent::SendPing
    }
}
