#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use weatherdb::{Co2Reading, Database, Reading, StationReading, StoreConfig, StoreHandle};

/// Day-aligned base timestamp (2023-11-14 00:00:00 UTC).
pub const T0: i64 = 1_699_920_000;

pub fn create_temp_db_file(name: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let path = dir.path().join(name);
    let _ = Database::open(&path).expect("initialize database");
    (dir, path)
}

pub fn open_store(path: &Path) -> StoreHandle {
    StoreHandle::open(StoreConfig::file(path)).expect("open store")
}

pub fn open_read_only(path: &Path) -> Connection {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .expect("open read-only connection")
}

pub fn co2(ppm: i64) -> Reading {
    Reading::Co2(Co2Reading {
        co2_concentration: ppm,
        temperature: 2_150,
        humidity: 45,
    })
}

pub fn station(identifier: i64, gust_speed: i64, rain: i64) -> Reading {
    Reading::Station(StationReading {
        identifier,
        temperature: 1_800,
        humidity: 60,
        wind_speed: 10,
        gust_speed,
        rain,
        wind_direction: 3,
        battery_low: false,
    })
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("count rows")
}

pub fn eventually<T>(timeout: Duration, interval: Duration, mut f: impl FnMut() -> Option<T>) -> T {
    let start = std::time::Instant::now();
    loop {
        if let Some(v) = f() {
            return v;
        }
        if start.elapsed() > timeout {
            panic!("condition not met within {:?}", timeout);
        }
        std::thread::sleep(interval);
    }
}
