mod common;

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use common::{co2, T0};
use weatherdb::{settings, Error, MeasurementKind, QuerySpec, StoreConfig, StoreHandle};

/// Many threads querying at once each get the answer to their own query.
#[test]
fn concurrent_queries_get_their_own_results() {
    let store = StoreHandle::open(StoreConfig::in_memory()).expect("open");
    for i in 0..120 {
        store.ingest_at(T0 + i * 60, co2(400 + i)).expect("ingest");
    }

    let barrier = Arc::new(Barrier::new(16));
    let handles: Vec<_> = (0..16usize)
        .map(|t| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let num = t + 1;
                for _ in 0..50 {
                    let series = store
                        .query(QuerySpec::new(MeasurementKind::Co2, "co2_concentration", num, 60))
                        .expect("query");
                    assert_eq!(series.len(), num, "thread {t} received another thread's answer");
                    assert_eq!(*series.last().expect("non-empty"), 519.0);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("query thread panicked");
    }
    store.shutdown().expect("shutdown");
}

/// Concurrent producers: every sample lands in exactly one rollup bucket.
#[test]
fn concurrent_producers_keep_counts() {
    let (_dir, path) = common::create_temp_db_file("producers.db");
    let store = common::open_store(&path);

    let handles: Vec<_> = (0..8i64)
        .map(|p| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..250 {
                    store.ingest_at(T0 + i, co2(400 + p)).expect("ingest");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("producer panicked");
    }
    store.shutdown().expect("shutdown");

    let conn = common::open_read_only(&path);
    let counted: i64 = conn
        .query_row("SELECT SUM(count) FROM co2_minute", [], |row| row.get(0))
        .expect("sum");
    assert_eq!(counted, 2_000);
    assert_eq!(common::count_rows(&conn, "co2"), 2_000);
    // 250 seconds span 5 minutes.
    assert_eq!(common::count_rows(&conn, "co2_minute"), 5);
}

/// Work queued before shutdown completes; nothing after it runs, and no
/// caller blocks.
#[test]
fn shutdown_drains_and_closes() {
    let (_dir, path) = common::create_temp_db_file("shutdown.db");
    let store = common::open_store(&path);

    for i in 0..100 {
        store.ingest_at(T0 + i, co2(410)).expect("ingest");
    }
    store
        .setting_set(settings::GRAPH_RESOLUTION, "4")
        .expect("set");

    let waiter = {
        let store = store.clone();
        thread::spawn(move || {
            // Keep asking until the owner goes away; every call must return.
            loop {
                match store.setting_get(settings::GRAPH_RESOLUTION) {
                    Ok(_) => thread::sleep(Duration::from_millis(1)),
                    Err(Error::Closed) => break,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        })
    };

    thread::sleep(Duration::from_millis(20));
    store.shutdown().expect("shutdown");
    waiter.join().expect("waiter should finish");

    assert!(matches!(store.add_co2(1, 1, 1), Err(Error::Closed)));

    let conn = common::open_read_only(&path);
    assert_eq!(common::count_rows(&conn, "co2"), 100);
    let value: String = conn
        .query_row("SELECT value FROM settings WHERE key = 'graph_resolution'", [], |row| row.get(0))
        .expect("setting persisted");
    assert_eq!(value, "4");
}

/// Data and settings survive closing and reopening the file.
#[test]
fn restart_preserves_state() {
    let (_dir, path) = common::create_temp_db_file("restart.db");

    {
        let store = common::open_store(&path);
        store.ingest_at(T0, co2(400)).expect("ingest");
        store.ingest_at(T0 + 10, co2(420)).expect("ingest");
        assert_eq!(
            store
                .setting_get_or_init(settings::LOGGING_PERIOD, "1")
                .expect("init"),
            "1"
        );
        store.shutdown().expect("shutdown");
    }

    let store = common::open_store(&path);
    store.ingest_at(T0 + 20, co2(440)).expect("ingest");

    let series = store
        .query(QuerySpec::new(MeasurementKind::Co2, "co2_concentration", 1, 60))
        .expect("query");
    assert_eq!(series, vec![420.0]);
    assert_eq!(
        store.setting_get(settings::LOGGING_PERIOD).expect("get").as_deref(),
        Some("1")
    );
    store.shutdown().expect("shutdown");

    let conn = common::open_read_only(&path);
    let count: i64 = conn
        .query_row("SELECT count FROM co2_minute WHERE time = ?1", [T0], |row| row.get(0))
        .expect("minute row");
    assert_eq!(count, 3, "reopened store continues the same bucket");
}
