mod common;

use common::{co2, station, T0};
use weatherdb::{Error, MeasurementKind, QuerySpec, Reading, SensorReading, StoreConfig, StoreHandle};

fn open() -> StoreHandle {
    StoreHandle::open(StoreConfig::in_memory()).expect("open store")
}

/// A constant signal downsamples to that constant at every resolution.
#[test]
fn constant_series_at_every_resolution() {
    let store = open();
    // Two days of one sample per 5 minutes.
    for i in 0..(2 * 24 * 12) {
        store.ingest_at(T0 + i * 300, co2(500)).expect("ingest");
    }

    for (num, resolution) in [(10, 30), (24, 600), (12, 3_600), (2, 86_400)] {
        let series = store
            .query(QuerySpec::new(MeasurementKind::Co2, "co2_concentration", num, resolution))
            .expect("query");
        assert_eq!(series.len(), num, "resolution {resolution}");
        assert!(
            series.iter().all(|v| (v - 500.0).abs() < 1e-9),
            "resolution {resolution}: {series:?}"
        );
    }

    store.shutdown().expect("shutdown");
}

/// Short history is left-padded with the oldest computed point.
#[test]
fn short_history_is_padded() {
    let store = open();
    for (minute, temp) in [(0, 1_000), (1, 1_100), (2, 1_200)] {
        store
            .ingest_at(
                T0 + minute * 60,
                Reading::Sensor(SensorReading {
                    identifier: 9,
                    temperature: temp,
                    humidity: 50,
                }),
            )
            .expect("ingest");
    }

    let series = store
        .query(QuerySpec::new(MeasurementKind::Sensor, "temperature", 6, 60).identifier(9))
        .expect("query");
    assert_eq!(series, vec![1_000.0, 1_000.0, 1_000.0, 1_000.0, 1_100.0, 1_200.0]);

    store.shutdown().expect("shutdown");
}

#[test]
fn empty_table_returns_zeros() {
    let store = open();
    let series = store
        .query(QuerySpec::new(MeasurementKind::PmCount, "greater25um", 48, 1_800))
        .expect("query");
    assert_eq!(series, vec![0.0; 48]);
    store.shutdown().expect("shutdown");
}

#[test]
fn unknown_field_is_rejected() {
    let store = open();
    let err = store
        .query(QuerySpec::new(MeasurementKind::AirQuality, "ozone", 10, 60))
        .expect_err("unknown field");
    assert!(matches!(err, Error::UnknownField { .. }));
    store.shutdown().expect("shutdown");
}

/// A counter reset inside the window never yields negative rain.
#[test]
fn rain_is_never_negative() {
    let store = open();
    let now = weatherdb::current_time_secs();

    // Counter climbs, then the station resets to 0 and climbs again.
    for (age, rain) in [(3_000, 500), (2_000, 520), (1_000, 3), (10, 8)] {
        store.ingest_at(now - age, station(2, 0, rain)).expect("ingest");
    }

    let rain = store.rain_over_period(2, 3_600).expect("query");
    assert_eq!(rain, Some(0.0));

    let last_half_hour = store.rain_over_period(2, 1_800).expect("query");
    assert_eq!(last_half_hour, Some(5.0));

    assert_eq!(store.rain_over_period(99, 3_600).expect("query"), None);

    let series = store.rain_period_series(4, 900, 2).expect("series");
    assert_eq!(series.len(), 4);
    assert!(series.iter().all(|v| *v >= 0.0), "{series:?}");

    store.shutdown().expect("shutdown");
}
