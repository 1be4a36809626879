//! Feed Port (Driven Port)
//!
//! Transport for one live trade stream per symbol. The ingestion service owns
//! reconnection, heartbeat timing and decoding; an adapter only moves frames.

use async_trait::async_trait;

/// A frame received from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedFrame {
    /// Text payload (one trade message).
    Text(String),
    /// Reply to a ping, or any keep-alive frame without payload.
    Pong,
}

/// Feed transport errors. All of them are treated as transient.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Handshake or connect failed.
    #[error("feed connect failed: {0}")]
    Connect(String),

    /// WebSocket protocol or I/O error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    /// The server closed the connection.
    #[error("feed closed by server")]
    Closed,

    /// No frame within the heartbeat timeout.
    #[error("heartbeat timeout after {0:?}")]
    HeartbeatTimeout(std::time::Duration),
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

/// Opens connections for a symbol.
#[async_trait]
pub trait FeedConnector: Send + Sync {
    /// Connect to the trade stream of `symbol` (lower-case).
    async fn connect(&self, symbol: &str) -> Result<Box<dyn FeedConnection>, FeedError>;
}

/// An established stream.
#[async_trait]
pub trait FeedConnection: Send {
    /// Next frame. `None` once the stream has ended.
    async fn next_event(&mut self) -> Option<Result<FeedFrame, FeedError>>;

    /// Send a keep-alive ping.
    async fn ping(&mut self) -> Result<(), FeedError>;

    /// Close the connection. Errors are ignored.
    async fn close(&mut self);
}
