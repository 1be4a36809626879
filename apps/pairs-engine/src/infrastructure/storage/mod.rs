//! Tick Storage
//!
//! SQLite-backed append-only tick log. Resampling reads a bounded window of
//! raw ticks and folds them into bars in memory; bars are never persisted.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE ticks (ts_ms INTEGER NOT NULL, symbol TEXT NOT NULL,
//!                     price REAL NOT NULL, qty REAL NOT NULL);
//! CREATE INDEX idx_ticks_symbol_ts ON ticks(symbol, ts_ms);
//! ```
//!
//! The implicit `rowid` records insertion order and breaks timestamp ties.

mod sqlite;

pub use sqlite::{SqliteTickStore, StoreError};
