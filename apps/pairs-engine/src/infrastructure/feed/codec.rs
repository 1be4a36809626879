//! Trade Message Codec
//!
//! Decodes one JSON trade message into a validated [`Tick`]. The Binance
//! futures `<symbol>@trade` payload looks like
//!
//! ```json
//! {"e":"trade","E":1700000000123,"T":1700000000120,"s":"BTCUSDT",
//!  "t":12345,"p":"37000.10","q":"0.005","X":"MARKET","m":true}
//! ```
//!
//! Field resolution:
//!
//! | Tick field | Source                                   |
//! |------------|------------------------------------------|
//! | timestamp  | `E` (event time), else `T` (trade time)  |
//! | price      | `p`, else `price`                        |
//! | quantity   | `q`, else `qty`                          |
//! | symbol     | `s`, else the subscribed symbol          |
//!
//! Numbers may arrive as JSON numbers or as decimal strings.

use serde::Deserialize;

use crate::domain::market::{Tick, TickError};

/// Reasons a message is dropped.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Not JSON, or not the expected shape.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field is absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A numeric field did not parse.
    #[error("invalid number in {field}: {value}")]
    InvalidNumber {
        /// Field name.
        field: &'static str,
        /// Raw value.
        value: String,
    },

    /// Parsed fine but is not a valid tick.
    #[error("invalid tick: {0}")]
    InvalidTick(#[from] TickError),
}

impl CodecError {
    /// Short label used as the `reason` metric dimension.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Json(_) => "parse",
            Self::MissingField(_) => "missing_field",
            Self::InvalidNumber { .. } => "invalid_number",
            Self::InvalidTick(_) => "invalid_tick",
        }
    }
}

/// A number that may be sent as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Numeric {
    fn as_f64(&self, field: &'static str) -> Result<f64, CodecError> {
        match self {
            Self::Int(v) => Ok(*v as f64),
            Self::Float(v) => Ok(*v),
            Self::Text(s) => s.trim().parse().map_err(|_| CodecError::InvalidNumber {
                field,
                value: s.clone(),
            }),
        }
    }

    fn as_millis(&self, field: &'static str) -> Result<i64, CodecError> {
        match self {
            Self::Int(v) => Ok(*v),
            Self::Float(v) if v.is_finite() => Ok(v.trunc() as i64),
            Self::Float(v) => Err(CodecError::InvalidNumber {
                field,
                value: v.to_string(),
            }),
            Self::Text(s) => s.trim().parse().map_err(|_| CodecError::InvalidNumber {
                field,
                value: s.clone(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TradeMessage {
    #[serde(rename = "E", default)]
    event_time: Option<Numeric>,
    #[serde(rename = "T", default)]
    trade_time: Option<Numeric>,
    #[serde(rename = "s", default)]
    symbol: Option<String>,
    #[serde(rename = "p", alias = "price", default)]
    price: Option<Numeric>,
    #[serde(rename = "q", alias = "qty", default)]
    quantity: Option<Numeric>,
}

/// Decoder for trade messages of one subscribed symbol.
#[derive(Debug, Clone)]
pub struct TradeCodec {
    subscribed: String,
}

impl TradeCodec {
    /// Codec for the stream of `subscribed`.
    #[must_use]
    pub fn new(subscribed: impl Into<String>) -> Self {
        Self {
            subscribed: subscribed.into(),
        }
    }

    /// Decode one text frame.
    pub fn decode(&self, text: &str) -> Result<Tick, CodecError> {
        let msg: TradeMessage = serde_json::from_str(text)?;

        // A zero event time is treated as absent.
        let event_time = msg
            .event_time
            .map(|v| v.as_millis("E"))
            .transpose()?
            .filter(|ts| *ts != 0);
        let timestamp_ms = match event_time {
            Some(ts) => ts,
            None => msg
                .trade_time
                .map(|v| v.as_millis("T"))
                .transpose()?
                .filter(|ts| *ts != 0)
                .ok_or(CodecError::MissingField("E"))?,
        };

        let price = msg
            .price
            .ok_or(CodecError::MissingField("p"))?
            .as_f64("p")?;
        let quantity = msg
            .quantity
            .ok_or(CodecError::MissingField("q"))?
            .as_f64("q")?;
        let symbol = msg
            .symbol
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.subscribed.clone());

        Ok(Tick::new(timestamp_ms, &symbol, price, quantity)?)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn codec() -> TradeCodec {
        TradeCodec::new("btcusdt")
    }

    #[test]
    fn decodes_binance_trade() {
        let tick = codec()
            .decode(
                r#"{"e":"trade","E":1700000000123,"T":1700000000120,"s":"BTCUSDT","t":1,"p":"37000.10","q":"0.005","X":"MARKET","m":true}"#,
            )
            .unwrap();
        assert_eq!(tick.timestamp_ms(), 1_700_000_000_123);
        assert_eq!(tick.symbol(), "BTCUSDT");
        assert!((tick.price() - 37_000.10).abs() < 1e-9);
        assert!((tick.quantity() - 0.005).abs() < 1e-12);
    }

    #[test]
    fn falls_back_to_trade_time_and_subscribed_symbol() {
        let tick = codec()
            .decode(r#"{"T":1700000000120,"price":10.5,"qty":2}"#)
            .unwrap();
        assert_eq!(tick.timestamp_ms(), 1_700_000_000_120);
        assert_eq!(tick.symbol(), "BTCUSDT");
        assert_eq!(tick.quantity(), 2.0);
    }

    #[test]
    fn zero_event_time_falls_back_to_trade_time() {
        let tick = codec().decode(r#"{"E":0,"T":5,"p":"1","q":"1"}"#).unwrap();
        assert_eq!(tick.timestamp_ms(), 5);
    }

    #[test_case(r#"{"E":1,"q":"1"}"#, "missing_field" ; "missing price")]
    #[test_case(r#"{"E":1,"p":"1"}"#, "missing_field" ; "missing quantity")]
    #[test_case(r#"{"p":"1","q":"1"}"#, "missing_field" ; "missing timestamp")]
    #[test_case(r#"{"E":0,"T":0,"p":"1","q":"1"}"#, "missing_field" ; "zero timestamp")]
    #[test_case(r#"{"E":1,"p":"abc","q":"1"}"#, "invalid_number" ; "non numeric price")]
    #[test_case(r#"{"E":1,"p":"1","q":"-2"}"#, "invalid_tick" ; "negative quantity")]
    #[test_case(r#"{"E":1,"p":"0","q":"1"}"#, "invalid_tick" ; "zero price")]
    #[test_case("not json", "parse" ; "garbage")]
    #[test_case(r#""trade""#, "parse" ; "wrong shape")]
    fn rejects_malformed(raw: &str, reason: &str) {
        let err = codec().decode(raw).unwrap_err();
        assert_eq!(err.reason(), reason, "{err}");
    }
}
