//! Binance Trade Stream Adapter
//!
//! One WebSocket per symbol on the USD-M futures raw stream endpoint.
//!
//! # Stream URL
//!
//! - `wss://fstream.binance.com/ws/<symbol>@trade` (symbol lower-case)
//!
//! The server pings every few minutes; replies are sent here and surface to
//! the consumer as [`FeedFrame::Pong`] so they count as liveness.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::application::ports::{FeedConnection, FeedConnector, FeedError, FeedFrame};

/// Default raw-stream base URL.
pub const BINANCE_FUTURES_WS_URL: &str = "wss://fstream.binance.com/ws";

/// Connects to `<base_url>/<symbol>@trade`.
#[derive(Debug, Clone)]
pub struct BinanceTradeConnector {
    base_url: String,
}

impl Default for BinanceTradeConnector {
    fn default() -> Self {
        Self::new(BINANCE_FUTURES_WS_URL)
    }
}

impl BinanceTradeConnector {
    /// Connector for a custom base URL (trailing slashes are ignored).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Stream URL for `symbol`.
    #[must_use]
    pub fn stream_url(&self, symbol: &str) -> String {
        format!("{}/{}@trade", self.base_url, symbol.trim().to_lowercase())
    }
}

#[async_trait]
impl FeedConnector for BinanceTradeConnector {
    async fn connect(&self, symbol: &str) -> Result<Box<dyn FeedConnection>, FeedError> {
        let url = self.stream_url(symbol);
        tracing::info!(url = %url, "Connecting to trade stream");
        let (ws, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| FeedError::Connect(format!("{url}: {e}")))?;
        Ok(Box::new(BinanceTradeConnection { ws }))
    }
}

struct BinanceTradeConnection {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FeedConnection for BinanceTradeConnection {
    async fn next_event(&mut self) -> Option<Result<FeedFrame, FeedError>> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(FeedFrame::Text(text.to_string()))),
                Ok(Message::Pong(_)) => return Some(Ok(FeedFrame::Pong)),
                Ok(Message::Ping(data)) => {
                    if let Err(e) = self.ws.send(Message::Pong(data)).await {
                        return Some(Err(e.into()));
                    }
                    return Some(Ok(FeedFrame::Pong));
                }
                Ok(Message::Close(frame)) => {
                    tracing::info!(?frame, "Server sent close frame");
                    return Some(Err(FeedError::Closed));
                }
                Ok(Message::Binary(_) | Message::Frame(_)) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn ping(&mut self) -> Result<(), FeedError> {
        self.ws.send(Message::Ping(Vec::new().into())).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.ws.close(None).await {
            tracing::debug!(error = %e, "Error closing trade stream");
        }
    }
}
