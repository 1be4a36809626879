//! Tick Ingestion
//!
//! Long-running side of the engine. [`IngestionService`] owns one
//! reconnecting consumer per symbol; each consumer decodes trade frames and
//! appends valid ticks to a [`TickRepository`](crate::application::ports::TickRepository).
//!
//! # Per-symbol lifecycle
//!
//! ```text
//! Disconnected -> Connecting -> Streaming
//!      ^              |             |
//!      +--- backoff --+-------------+   (connect error, close, heartbeat timeout)
//!
//! any state -> Stopped                  (stop)
//! ```

mod consumer;
mod service;
mod state;

pub use service::{
    DEFAULT_SHUTDOWN_GRACE, IngestionConfig, IngestionError, IngestionService, StartOutcome,
};
pub use state::{ConnectionState, FeedState, FeedStats};
