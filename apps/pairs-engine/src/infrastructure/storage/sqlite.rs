//! SQLite tick store.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, params, params_from_iter};

use crate::application::ports::TickRepository;
use crate::domain::market::{Bar, Tick, TickError, Timeframe, aggregate_bars, canonical_symbol};

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS ticks (
        ts_ms INTEGER NOT NULL,
        symbol TEXT NOT NULL,
        price REAL NOT NULL,
        qty REAL NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_ticks_symbol_ts
    ON ticks(symbol, ts_ms);
";

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Creating the database directory failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row no longer forms a valid tick.
    #[error("corrupt tick row: {0}")]
    CorruptRow(#[from] TickError),
}

/// Durable tick log shared by the ingestion tasks and analytics readers.
///
/// Every statement runs under one mutex, so a reader never observes a
/// half-applied write. Each insert is its own autocommit transaction.
#[derive(Debug)]
pub struct SqliteTickStore {
    conn: Mutex<Connection>,
}

impl SqliteTickStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        // WAL lets readers proceed while a write commits. NORMAL syncs at
        // checkpoints only; a commit survives a process crash, not power loss.
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        tracing::debug!(journal_mode = %mode, synchronous = "NORMAL", "SQLite pragmas set");
        let store = Self::init(conn)?;
        tracing::info!(path = %path.display(), "Tick store opened");
        Ok(store)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored ticks for `symbol`.
    pub fn count(&self, symbol: &str) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM ticks WHERE symbol = ?1",
            [canonical_symbol(symbol)],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(n).unwrap_or_default())
    }

    fn query_ticks<P>(&self, sql: &str, params: P) -> Result<Vec<Tick>, StoreError>
    where
        P: rusqlite::Params,
    {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(sql)?;
        let rows: Vec<(i64, String, f64, f64)> = stmt
            .query_map(params, |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<Result<_, _>>()?;
        drop(stmt);
        drop(conn);

        rows.into_iter()
            .map(|(ts, symbol, price, qty)| Ok(Tick::new(ts, &symbol, price, qty)?))
            .collect()
    }
}

impl TickRepository for SqliteTickStore {
    type Error = StoreError;

    fn insert(&self, tick: &Tick) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.prepare_cached("INSERT INTO ticks (ts_ms, symbol, price, qty) VALUES (?1, ?2, ?3, ?4)")?
            .execute(params![
                tick.timestamp_ms(),
                tick.symbol(),
                tick.price(),
                tick.quantity()
            ])?;
        Ok(())
    }

    fn fetch(&self, symbols: &[&str], since_ms: Option<i64>) -> Result<Vec<Tick>, StoreError> {
        let mut wanted: Vec<String> = symbols
            .iter()
            .map(|s| canonical_symbol(s))
            .filter(|s| !s.is_empty())
            .collect();
        wanted.sort();
        wanted.dedup();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; wanted.len()].join(", ");
        let sql = format!(
            "SELECT ts_ms, symbol, price, qty FROM ticks \
             WHERE symbol IN ({placeholders}) AND ts_ms >= ? \
             ORDER BY ts_ms, rowid"
        );
        let since = since_ms.unwrap_or(i64::MIN);
        let params = wanted
            .into_iter()
            .map(rusqlite::types::Value::Text)
            .chain(std::iter::once(rusqlite::types::Value::Integer(since)));
        self.query_ticks(&sql, params_from_iter(params))
    }

    fn resample_at(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback_minutes: u32,
        now_ms: i64,
    ) -> Result<Vec<Bar>, StoreError> {
        let since = now_ms.saturating_sub(i64::from(lookback_minutes) * 60_000);
        let ticks = self.query_ticks(
            "SELECT ts_ms, symbol, price, qty FROM ticks \
             WHERE symbol = ?1 AND ts_ms >= ?2 AND ts_ms < ?3 \
             ORDER BY ts_ms, rowid",
            params![canonical_symbol(symbol), since, now_ms],
        )?;
        Ok(aggregate_bars(&ticks, timeframe))
    }
}
