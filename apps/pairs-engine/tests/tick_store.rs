//! Tick Store Integration Tests
//!
//! On-disk `SqliteTickStore`: durability across reopen, resampling, readers
//! running alongside writers, and a full analytics pass over stored ticks.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use pairs_engine::{
    AnalysisOutcome, PairAnalyzer, PairRequest, SqliteTickStore, Tick, TickRepository, Timeframe,
};

fn tick(ts: i64, symbol: &str, price: f64, qty: f64) -> Tick {
    Tick::new(ts, symbol, price, qty).unwrap()
}

fn temp_store() -> (TempDir, SqliteTickStore) {
    let dir = TempDir::new().unwrap();
    let store = SqliteTickStore::open(dir.path().join("nested").join("ticks.db")).unwrap();
    (dir, store)
}

#[test]
fn ticks_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ticks.db");

    {
        let store = SqliteTickStore::open(&path).unwrap();
        store.insert(&tick(1_000, "btcusdt", 100.0, 1.0)).unwrap();
        store.insert(&tick(2_000, "btcusdt", 101.0, 0.5)).unwrap();
    }

    let reopened = SqliteTickStore::open(&path).unwrap();
    let ticks = reopened.fetch(&["BTCUSDT"], None).unwrap();
    assert_eq!(ticks.len(), 2);
    assert_eq!(ticks[1].price(), 101.0);
    assert_eq!(ticks[1].symbol(), "BTCUSDT");
}

#[test]
fn one_second_bar_from_three_ticks() {
    let (_dir, store) = temp_store();
    store.insert(&tick(0, "btcusdt", 10.0, 1.0)).unwrap();
    store.insert(&tick(500, "btcusdt", 12.0, 2.0)).unwrap();
    store.insert(&tick(999, "btcusdt", 11.0, 3.0)).unwrap();
    // Next tick two buckets later leaves the [1000, 2000) bucket empty.
    store.insert(&tick(2_100, "btcusdt", 13.0, 1.0)).unwrap();

    let bars = store
        .resample_at("btcusdt", Timeframe::OneSecond, 5, 60_000)
        .unwrap();

    assert_eq!(bars.len(), 2);
    let first = bars[0];
    assert_eq!(first.period_start_ms, 0);
    assert_eq!(first.open, 10.0);
    assert_eq!(first.high, 12.0);
    assert_eq!(first.low, 10.0);
    assert_eq!(first.close, 11.0);
    assert_eq!(first.volume, 6.0);
    assert_eq!(bars[1].period_start_ms, 2_000);
}

#[test]
fn resample_is_per_symbol() {
    let (_dir, store) = temp_store();
    store.insert(&tick(1_000, "btcusdt", 10.0, 1.0)).unwrap();
    store.insert(&tick(1_000, "ethusdt", 20.0, 1.0)).unwrap();

    let bars = store
        .resample_at("ETHUSDT", Timeframe::OneMinute, 5, 120_000)
        .unwrap();
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].close, 20.0);
}

#[test]
fn readers_see_consistent_rows_while_writers_append() {
    let (_dir, store) = temp_store();
    let store = Arc::new(store);

    let writers: Vec<_> = ["btcusdt", "ethusdt"]
        .into_iter()
        .map(|symbol| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..200_i64 {
                    store.insert(&tick(i * 10, symbol, 100.0, 1.0)).unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let mut last = 0;
            for _ in 0..50 {
                let ticks = store.fetch(&["btcusdt"], None).unwrap();
                assert!(ticks.len() >= last);
                assert!(
                    ticks
                        .windows(2)
                        .all(|w| w[0].timestamp_ms() <= w[1].timestamp_ms())
                );
                last = ticks.len();
            }
        })
    };

    for handle in writers {
        handle.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(store.count("btcusdt").unwrap(), 200);
    assert_eq!(store.count("ethusdt").unwrap(), 200);
}

#[test]
fn analyzer_runs_over_stored_ticks() {
    let (_dir, store) = temp_store();
    let now = 3_600_000;

    // Sixty one-minute bars; y = 2x + small wobble.
    for i in 0..60_i64 {
        let ts = i * 60_000;
        let x = 100.0 + (i as f64 * 0.3).sin() * 5.0;
        let wobble = if i % 2 == 0 { 0.05 } else { -0.05 };
        store.insert(&tick(ts, "ethusdt", x, 1.0)).unwrap();
        store
            .insert(&tick(ts + 1, "btcusdt", 2.0 * x + wobble, 1.0))
            .unwrap();
    }

    let analyzer = PairAnalyzer::new(Arc::new(store));
    let mut request = PairRequest::new("btcusdt", "ethusdt");
    request.lookback_minutes = 60;
    request.window = 20;

    let AnalysisOutcome::Ready(snapshot) = analyzer.analyze_at(&request, now).unwrap() else {
        panic!("expected a snapshot");
    };

    assert_eq!(snapshot.aligned_len(), 60);
    assert!((snapshot.hedge_ratio - 2.0).abs() < 0.05);
    assert_eq!(snapshot.zscore.len(), 60);
    assert!(snapshot.latest_zscore.is_some());
    assert_eq!(snapshot.equity.len(), snapshot.zscore.count_defined());
}
