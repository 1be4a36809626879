//! Application Ports (Driven)
//!
//! - `TickRepository`: append and query persisted ticks, resample into bars
//! - `FeedConnector` / `FeedConnection`: one live trade stream per symbol

mod feed_port;
mod tick_repository_port;

pub use feed_port::{FeedConnection, FeedConnector, FeedError, FeedFrame};
pub use tick_repository_port::TickRepository;
