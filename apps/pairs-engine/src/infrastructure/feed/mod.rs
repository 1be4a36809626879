//! Market Data Feed
//!
//! Transport pieces used by the ingestion consumer:
//!
//! - **reconnect**: exponential backoff between connection attempts
//! - **heartbeat**: ping cadence and liveness timeout
//! - **codec**: trade JSON to validated ticks
//! - **binance**: default WebSocket adapter for the `FeedConnector` port

pub mod binance;
pub mod codec;
pub mod heartbeat;
pub mod reconnect;

pub use binance::{BINANCE_FUTURES_WS_URL, BinanceTradeConnector};
pub use codec::{CodecError, TradeCodec};
pub use heartbeat::{HeartbeatConfig, HeartbeatEvent, HeartbeatState};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
