//! # Async API for WeatherDB
//!
//! [`WeatherDb`] exposes the same operations as [`StoreHandle`] as `async`
//! methods, for applications that drive their sensors and display from a
//! Tokio runtime.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Tokio Runtime                            │
//! │                                                             │
//! │   task ─┐                                                   │
//! │   task ─┼─ tokio::sync::mpsc (async send) ──┐               │
//! │   task ─┘     oneshot (async recv) ◄────┐   │               │
//! └─────────────────────────────────────────┼───┼───────────────┘
//!                                           │   ▼
//!                               ┌───────────────────────┐
//!                               │  weatherdb-owner      │
//!                               │  Storage (Connection) │
//!                               └───────────────────────┘
//! ```
//!
//! Both front ends feed the same queue, so a `WeatherDb` and the
//! `StoreHandle` it was built from observe one FIFO order.

use crate::actor::{StoreBuilder, StoreHandle, StoreRequest};
use crate::config::StoreConfig;
use crate::query::QuerySpec;
use crate::types::{current_time_secs, Identifier, Reading, Timestamp};
use crate::{Error, Result};

/// Async front end to the store.
///
/// # Example
///
/// ```rust,no_run
/// use weatherdb::{MeasurementKind, QuerySpec, StoreConfig, WeatherDb};
///
/// # async fn example() -> weatherdb::Result<()> {
/// let db = WeatherDb::open(StoreConfig::file("values.db")).await?;
/// let series = db
///     .query(QuerySpec::new(MeasurementKind::Co2, "co2_concentration", 60, 60))
///     .await?;
/// assert_eq!(series.len(), 60);
/// db.shutdown().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct WeatherDb {
    handle: StoreHandle,
}

impl WeatherDb {
    /// Opens the store with no maintenance tasks.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        Self::from_builder(StoreBuilder::new(config)).await
    }

    /// Opens the store from a configured builder.
    ///
    /// Opening touches the filesystem, so it runs on the blocking pool.
    pub async fn from_builder(builder: StoreBuilder) -> Result<Self> {
        let handle = tokio::task::spawn_blocking(move || builder.spawn())
            .await
            .map_err(|e| Error::Spawn(std::io::Error::other(e)))??;
        Ok(Self { handle })
    }

    /// Wraps an existing handle.
    pub fn from_handle(handle: StoreHandle) -> Self {
        Self { handle }
    }

    /// The blocking handle behind this front end.
    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Queues `reading`, stamped with the current time.
    pub async fn ingest(&self, reading: Reading) -> Result<()> {
        self.ingest_at(current_time_secs(), reading).await
    }

    /// Queues `reading` with an explicit timestamp.
    pub async fn ingest_at(&self, timestamp: Timestamp, reading: Reading) -> Result<()> {
        let sample = reading.into_sample(timestamp);
        sample.validate()?;
        self.handle.send_async(StoreRequest::Ingest(sample)).await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn query(&self, spec: QuerySpec) -> Result<Vec<f64>> {
        self.handle
            .call_async(|response| StoreRequest::Query { spec, response })
            .await
    }

    pub async fn rain_over_period(&self, identifier: Identifier, period: i64) -> Result<Option<f64>> {
        let now = current_time_secs();
        self.handle
            .call_async(|response| StoreRequest::RainOverPeriod {
                identifier,
                period,
                now,
                response,
            })
            .await
    }

    pub async fn rain_period_series(
        &self,
        num: usize,
        period: i64,
        identifier: Identifier,
    ) -> Result<Vec<f64>> {
        self.handle
            .call_async(|response| StoreRequest::RainPeriodSeries {
                num,
                period,
                identifier,
                response,
            })
            .await
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub async fn setting_get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.handle
            .call_async(|response| StoreRequest::SettingGet { key, response })
            .await
    }

    pub async fn setting_set(&self, key: &str, value: &str) -> Result<()> {
        self.handle
            .send_async(StoreRequest::SettingSet {
                key: key.to_string(),
                value: value.to_string(),
            })
            .await
    }

    pub async fn setting_get_or_init(&self, key: &str, default: &str) -> Result<String> {
        let (key, default) = (key.to_string(), default.to_string());
        self.handle
            .call_async(|response| StoreRequest::SettingGetOrInit {
                key,
                default,
                response,
            })
            .await
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Stops the owner thread; see [`StoreHandle::shutdown`].
    pub async fn shutdown(&self) -> Result<()> {
        let handle = self.handle.clone();
        tokio::task::spawn_blocking(move || handle.shutdown())
            .await
            .map_err(|e| Error::Spawn(std::io::Error::other(e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::GRAPH_RESOLUTION;
    use crate::types::{MeasurementKind, SensorReading};

    const T0: i64 = 1_699_920_000;

    #[tokio::test]
    async fn test_async_roundtrip() {
        let db = WeatherDb::open(StoreConfig::in_memory()).await.expect("open");

        for (offset, temp) in [(0, 1_000), (10, 1_200)] {
            db.ingest_at(
                T0 + offset,
                Reading::Sensor(SensorReading {
                    identifier: 2,
                    temperature: temp,
                    humidity: 70,
                }),
            )
            .await
            .expect("ingest");
        }

        let series = db
            .query(QuerySpec::new(MeasurementKind::Sensor, "temperature", 3, 60).identifier(2))
            .await
            .expect("query");
        assert_eq!(series, vec![1_100.0; 3]);

        db.shutdown().await.expect("shutdown");
        assert!(matches!(db.setting_get(GRAPH_RESOLUTION).await, Err(Error::Closed)));
    }

    #[tokio::test]
    async fn test_async_settings() {
        let db = WeatherDb::open(StoreConfig::in_memory()).await.expect("open");
        assert_eq!(db.setting_get_or_init(GRAPH_RESOLUTION, "1").await.expect("init"), "1");
        db.setting_set(GRAPH_RESOLUTION, "5").await.expect("set");
        assert_eq!(
            db.setting_get(GRAPH_RESOLUTION).await.expect("get").as_deref(),
            Some("5")
        );
        db.shutdown().await.expect("shutdown");
    }
}
