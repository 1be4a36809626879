//! Feed Consumer
//!
//! One task per symbol: connect, stream, decode, persist, and on any failure
//! back off and reconnect. Only cancellation ends the loop.

use std::sync::Arc;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::IngestionConfig;
use super::state::{ConnectionState, FeedState};
use crate::application::ports::{FeedConnection, FeedConnector, FeedError, FeedFrame, TickRepository};
use crate::infrastructure::feed::{HeartbeatEvent, HeartbeatState, ReconnectPolicy, TradeCodec};
use crate::infrastructure::metrics;

pub(super) struct FeedConsumer<R> {
    symbol: String,
    repository: Arc<R>,
    connector: Arc<dyn FeedConnector>,
    codec: TradeCodec,
    state: Arc<FeedState>,
    config: IngestionConfig,
    cancel: CancellationToken,
}

impl<R: TickRepository> FeedConsumer<R> {
    pub(super) fn new(
        symbol: String,
        repository: Arc<R>,
        connector: Arc<dyn FeedConnector>,
        state: Arc<FeedState>,
        config: IngestionConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            codec: TradeCodec::new(symbol.clone()),
            symbol,
            repository,
            connector,
            state,
            config,
            cancel,
        }
    }

    /// Connection loop. Returns once cancelled.
    pub(super) async fn run(self) {
        let mut policy = ReconnectPolicy::new(self.config.reconnect.clone());

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.state.set_state(ConnectionState::Connecting);
            let connected = tokio::select! {
                () = self.cancel.cancelled() => break,
                result = self.connector.connect(&self.symbol) => result,
            };

            match connected {
                Ok(mut conn) => {
                    policy.reset();
                    self.state.set_state(ConnectionState::Streaming);
                    metrics::set_feed_connected(&self.symbol, true);
                    tracing::info!("Trade stream connected");

                    let outcome = self.stream(conn.as_mut()).await;
                    conn.close().await;
                    metrics::set_feed_connected(&self.symbol, false);

                    match outcome {
                        Ok(()) => break,
                        Err(e) => {
                            tracing::warn!(error = %e, "Trade stream lost");
                            self.state.set_error(e.to_string());
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Trade stream connect failed");
                    self.state.set_error(e.to_string());
                }
            }

            self.state.set_state(ConnectionState::Disconnected);
            let delay = policy.next_delay();
            self.state.increment_reconnects();
            metrics::record_reconnect(&self.symbol);
            tracing::info!(
                attempt = policy.attempt_count(),
                delay_ms = delay.as_millis(),
                "Reconnecting to trade stream"
            );

            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        self.state.set_state(ConnectionState::Stopped);
        tracing::info!("Trade stream consumer stopped");
    }

    /// Pump one connection. `Ok` means cancelled, `Err` means reconnect.
    async fn stream(&self, conn: &mut dyn FeedConnection) -> Result<(), FeedError> {
        let mut heartbeat = HeartbeatState::new(self.config.heartbeat.clone());
        let period = self.config.heartbeat.tick_period();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => match heartbeat.on_tick() {
                    HeartbeatEvent::SendPing => conn.ping().await?,
                    HeartbeatEvent::Timeout(silence) => {
                        return Err(FeedError::HeartbeatTimeout(silence));
                    }
                },
                event = conn.next_event() => match event {
                    Some(Ok(FeedFrame::Text(text))) => {
                        heartbeat.record_frame();
                        self.handle_text(&text);
                    }
                    Some(Ok(FeedFrame::Pong)) => heartbeat.record_frame(),
                    Some(Err(e)) => return Err(e),
                    None => return Err(FeedError::Closed),
                },
            }
        }
    }

    /// Decode and persist one message. Never fails the stream.
    fn handle_text(&self, text: &str) {
        self.state.increment_messages();
        metrics::record_message_received(&self.symbol);

        let tick = match self.codec.decode(text) {
            Ok(tick) => tick,
            Err(e) => {
                self.state.increment_dropped();
                metrics::record_message_dropped(&self.symbol, e.reason());
                tracing::debug!(reason = e.reason(), error = %e, "Dropped malformed message");
                return;
            }
        };

        match self.repository.insert(&tick) {
            Ok(()) => {
                self.state.increment_written();
                metrics::record_tick_written(&self.symbol);
            }
            Err(e) => {
                self.state.increment_write_failures();
                metrics::record_store_write_failure(&self.symbol);
                tracing::warn!(
                    error = %e,
                    timestamp_ms = tick.timestamp_ms(),
                    "Tick write failed, skipping"
                );
            }
        }
    }
}
