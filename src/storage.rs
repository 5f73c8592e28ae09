//! # Storage
//!
//! `Storage` owns the SQLite connection and exposes every store operation as
//! a plain method. It is the code that runs *on* the owner thread: the actor
//! loop dispatches requests to it, and maintenance tasks receive it directly
//! so they can call the same operations inline without a round trip through
//! the queue.
//!
//! `Storage` is `Send` but not `Sync`; only one thread ever holds it.

use rusqlite::Connection;

use crate::config::DbLocation;
use crate::query::{self, QuerySpec};
use crate::rollup;
use crate::schema::Database;
use crate::settings;
use crate::types::{current_time_secs, Identifier, Reading, Sample, Timestamp};
use crate::Result;

/// The store's connection plus the operations defined on it.
#[derive(Debug)]
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens (and initializes if needed) the database at `location`.
    pub fn open(location: &DbLocation) -> Result<Self> {
        let db = match location {
            DbLocation::File(path) => Database::open(path)?,
            DbLocation::InMemory => Database::open_in_memory()?,
        };
        Ok(Self::from_connection(db.into_connection()))
    }

    /// Wraps a connection that already carries the schema.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Read access to the connection, for maintenance tasks that export or
    /// inspect data.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Stores `reading` stamped with the current time.
    pub fn ingest(&mut self, reading: Reading) -> Result<()> {
        self.ingest_at(current_time_secs(), reading)
    }

    /// Stores `reading` stamped with `timestamp`.
    pub fn ingest_at(&mut self, timestamp: Timestamp, reading: Reading) -> Result<()> {
        self.apply(&reading.into_sample(timestamp))
    }

    /// Writes a sample and its rollups as one transaction.
    pub fn apply(&mut self, sample: &Sample) -> Result<()> {
        rollup::apply(&mut self.conn, sample)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn query(&self, spec: &QuerySpec) -> Result<Vec<f64>> {
        query::query(&self.conn, spec)
    }

    /// Rain during the last `period` seconds, measured from now.
    pub fn rain_over_period(&self, identifier: Identifier, period: i64) -> Result<Option<f64>> {
        self.rain_over_period_at(identifier, period, current_time_secs())
    }

    pub fn rain_over_period_at(
        &self,
        identifier: Identifier,
        period: i64,
        now: Timestamp,
    ) -> Result<Option<f64>> {
        query::rain_over_period(&self.conn, identifier, period, now)
    }

    pub fn rain_period_series(
        &self,
        num: usize,
        period: i64,
        identifier: Identifier,
    ) -> Result<Vec<f64>> {
        query::rain_period_series(&self.conn, num, period, identifier)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn setting_get(&self, key: &str) -> Result<Option<String>> {
        settings::get(&self.conn, key)
    }

    pub fn setting_set(&mut self, key: &str, value: &str) -> Result<()> {
        settings::set(&self.conn, key, value)
    }

    pub fn setting_get_or_init(&mut self, key: &str, default: &str) -> Result<String> {
        settings::get_or_init(&self.conn, key, default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MeasurementKind, SensorReading};

    #[test]
    fn test_inline_roundtrip() {
        let mut storage = Storage::open(&DbLocation::InMemory).expect("open");
        let t0 = 1_699_920_000;

        for (offset, temp) in [(0, 2_000), (30, 2_100)] {
            storage
                .ingest_at(
                    t0 + offset,
                    Reading::Sensor(SensorReading {
                        identifier: 4,
                        temperature: temp,
                        humidity: 50,
                    }),
                )
                .expect("ingest");
        }

        let spec = QuerySpec::new(MeasurementKind::Sensor, "temperature", 2, 60).identifier(4);
        assert_eq!(storage.query(&spec).expect("query"), vec![2_050.0, 2_050.0]);

        storage.setting_set(settings::LOGGING_PERIOD, "3").expect("set");
        assert_eq!(
            storage.setting_get(settings::LOGGING_PERIOD).expect("get").as_deref(),
            Some("3")
        );
    }
}
