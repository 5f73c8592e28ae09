//! # Core Types for WeatherDB
//!
//! This module defines the domain vocabulary shared by every other module:
//! which measurement kinds exist, which fields each kind carries, how each
//! field is rolled up, and the three bucket granularities.
//!
//! ## Kind Descriptors
//!
//! Every measurement kind is described by static data rather than by
//! hand-written SQL per kind:
//!
//! ```text
//! MeasurementKind::Station
//!   table:       "station"
//!   identifier:  yes (one row set per outdoor station)
//!   fields:      temperature  Sum
//!                humidity     Sum
//!                wind_speed   Sum
//!                gust_speed   Max
//!                rain         Latest      (cumulative counter)
//!                wind_direction  raw only
//!                battery_low     raw only
//! ```
//!
//! The schema, rollup and query modules all derive their SQL from these
//! descriptors, so adding a field is a one-line change here.
//!
//! ## Values
//!
//! Devices deliver scaled integers (temperature in 1/100 °C, pressure in
//! 1/100 hPa, and so on). Values are stored exactly as delivered; only the
//! query engine converts to `f64` when averaging.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// Primitive Aliases
// =============================================================================

/// Unix timestamp in whole seconds.
pub type Timestamp = i64;

/// Identifier of one physical device for multi-entity kinds (outdoor
/// stations and outdoor sensors). Small integer assigned by the radio
/// protocol.
pub type Identifier = i64;

/// Returns the current Unix time in seconds.
///
/// A clock before the epoch reads as 0 rather than failing; the store never
/// sees such timestamps in practice.
pub fn current_time_secs() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as Timestamp)
        .unwrap_or(0)
}

// =============================================================================
// Rollup Policy
// =============================================================================

/// How a field is folded into a rollup bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Running sum; divided by the bucket's `count` when averaged.
    Sum,
    /// Largest value seen in the bucket (gust speed).
    Max,
    /// Most recent value seen in the bucket (cumulative rain counter).
    Latest,
}

/// Static description of one stored field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Column name, identical in the raw and rollup tables.
    pub name: &'static str,
    /// Rollup policy, or `None` for raw-only fields.
    pub rollup: Option<Aggregate>,
}

impl FieldSpec {
    const fn sum(name: &'static str) -> Self {
        Self { name, rollup: Some(Aggregate::Sum) }
    }

    const fn max(name: &'static str) -> Self {
        Self { name, rollup: Some(Aggregate::Max) }
    }

    const fn latest(name: &'static str) -> Self {
        Self { name, rollup: Some(Aggregate::Latest) }
    }

    const fn raw(name: &'static str) -> Self {
        Self { name, rollup: None }
    }
}

const AIR_QUALITY_FIELDS: &[FieldSpec] = &[
    FieldSpec::sum("iaq_index"),
    FieldSpec::sum("iaq_index_accuracy"),
    FieldSpec::sum("temperature"),
    FieldSpec::sum("humidity"),
    FieldSpec::sum("air_pressure"),
];

const PM_CONCENTRATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::sum("pm10"),
    FieldSpec::sum("pm25"),
    FieldSpec::sum("pm100"),
];

const PM_COUNT_FIELDS: &[FieldSpec] = &[
    FieldSpec::sum("greater03um"),
    FieldSpec::sum("greater05um"),
    FieldSpec::sum("greater10um"),
    FieldSpec::sum("greater25um"),
    FieldSpec::sum("greater50um"),
    FieldSpec::sum("greater100um"),
];

const CO2_FIELDS: &[FieldSpec] = &[
    FieldSpec::sum("co2_concentration"),
    FieldSpec::sum("temperature"),
    FieldSpec::sum("humidity"),
];

const STATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::sum("temperature"),
    FieldSpec::sum("humidity"),
    FieldSpec::sum("wind_speed"),
    FieldSpec::max("gust_speed"),
    FieldSpec::latest("rain"),
    FieldSpec::raw("wind_direction"),
    FieldSpec::raw("battery_low"),
];

const SENSOR_FIELDS: &[FieldSpec] = &[
    FieldSpec::sum("temperature"),
    FieldSpec::sum("humidity"),
];

// =============================================================================
// Measurement Kinds
// =============================================================================

/// One of the six logical measurement streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementKind {
    /// Indoor air quality sensor (IAQ index, temperature, humidity, pressure).
    AirQuality,
    /// Particulate matter mass concentration.
    PmConcentration,
    /// Particulate matter particle counts per size class.
    PmCount,
    /// CO₂ sensor with its own temperature/humidity readings.
    Co2,
    /// Outdoor weather station, one per identifier.
    Station,
    /// Outdoor temperature/humidity sensor, one per identifier.
    Sensor,
}

impl MeasurementKind {
    /// Every kind, in schema creation order.
    pub const ALL: [MeasurementKind; 6] = [
        MeasurementKind::AirQuality,
        MeasurementKind::PmConcentration,
        MeasurementKind::PmCount,
        MeasurementKind::Co2,
        MeasurementKind::Station,
        MeasurementKind::Sensor,
    ];

    /// Name of the raw table. Rollup tables append `_minute`, `_hour`, `_day`.
    pub fn table(self) -> &'static str {
        match self {
            MeasurementKind::AirQuality => "air_quality",
            MeasurementKind::PmConcentration => "pm_concentration",
            MeasurementKind::PmCount => "pm_count",
            MeasurementKind::Co2 => "co2",
            MeasurementKind::Station => "station",
            MeasurementKind::Sensor => "sensor",
        }
    }

    /// Name of the rollup table at the given granularity.
    pub fn rollup_table(self, granularity: Granularity) -> String {
        format!("{}_{}", self.table(), granularity.suffix())
    }

    /// All stored fields, in column order.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            MeasurementKind::AirQuality => AIR_QUALITY_FIELDS,
            MeasurementKind::PmConcentration => PM_CONCENTRATION_FIELDS,
            MeasurementKind::PmCount => PM_COUNT_FIELDS,
            MeasurementKind::Co2 => CO2_FIELDS,
            MeasurementKind::Station => STATION_FIELDS,
            MeasurementKind::Sensor => SENSOR_FIELDS,
        }
    }

    /// Fields that have a rollup policy, in column order.
    pub fn rollup_fields(self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields().iter().filter(|f| f.rollup.is_some())
    }

    /// Looks up a field by column name.
    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Whether rows of this kind are keyed by a device identifier.
    pub fn has_identifier(self) -> bool {
        matches!(self, MeasurementKind::Station | MeasurementKind::Sensor)
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

// =============================================================================
// Granularity
// =============================================================================

/// Rollup bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Minute,
    Hour,
    Day,
}

impl Granularity {
    /// Every granularity, finest first.
    pub const ALL: [Granularity; 3] = [Granularity::Minute, Granularity::Hour, Granularity::Day];

    /// Bucket width in seconds.
    pub fn seconds(self) -> i64 {
        match self {
            Granularity::Minute => 60,
            Granularity::Hour => 3_600,
            Granularity::Day => 86_400,
        }
    }

    /// Table name suffix.
    pub fn suffix(self) -> &'static str {
        match self {
            Granularity::Minute => "minute",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
        }
    }

    /// Start of the bucket containing `ts`.
    ///
    /// Uses Euclidean remainder so pre-epoch timestamps still land on a
    /// bucket boundary at or before `ts`.
    pub fn bucket_start(self, ts: Timestamp) -> Timestamp {
        ts - ts.rem_euclid(self.seconds())
    }
}

// =============================================================================
// Readings
// =============================================================================

/// Indoor air quality reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AirQualityReading {
    pub iaq_index: i64,
    pub iaq_index_accuracy: i64,
    pub temperature: i64,
    pub humidity: i64,
    pub air_pressure: i64,
}

/// Particulate matter concentration reading (µg/m³).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PmConcentrationReading {
    pub pm10: i64,
    pub pm25: i64,
    pub pm100: i64,
}

/// Particulate matter count reading (particles per 0.1 L above each size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PmCountReading {
    pub greater03um: i64,
    pub greater05um: i64,
    pub greater10um: i64,
    pub greater25um: i64,
    pub greater50um: i64,
    pub greater100um: i64,
}

/// CO₂ sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Co2Reading {
    pub co2_concentration: i64,
    pub temperature: i64,
    pub humidity: i64,
}

/// Outdoor weather station reading.
///
/// `rain` is the station's cumulative counter, not a per-interval amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StationReading {
    pub identifier: Identifier,
    pub temperature: i64,
    pub humidity: i64,
    pub wind_speed: i64,
    pub gust_speed: i64,
    pub rain: i64,
    pub wind_direction: i64,
    pub battery_low: bool,
}

/// Outdoor temperature/humidity sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorReading {
    pub identifier: Identifier,
    pub temperature: i64,
    pub humidity: i64,
}

/// A reading of any kind, as handed to the ingestion API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    AirQuality(AirQualityReading),
    PmConcentration(PmConcentrationReading),
    PmCount(PmCountReading),
    Co2(Co2Reading),
    Station(StationReading),
    Sensor(SensorReading),
}

impl Reading {
    /// The measurement kind this reading belongs to.
    pub fn kind(&self) -> MeasurementKind {
        match self {
            Reading::AirQuality(_) => MeasurementKind::AirQuality,
            Reading::PmConcentration(_) => MeasurementKind::PmConcentration,
            Reading::PmCount(_) => MeasurementKind::PmCount,
            Reading::Co2(_) => MeasurementKind::Co2,
            Reading::Station(_) => MeasurementKind::Station,
            Reading::Sensor(_) => MeasurementKind::Sensor,
        }
    }

    /// Flattens the reading into a [`Sample`] stamped with `timestamp`.
    ///
    /// Values are emitted in the same order as [`MeasurementKind::fields`].
    pub fn into_sample(self, timestamp: Timestamp) -> Sample {
        let kind = self.kind();
        let (identifier, values) = match self {
            Reading::AirQuality(r) => (
                None,
                vec![r.iaq_index, r.iaq_index_accuracy, r.temperature, r.humidity, r.air_pressure],
            ),
            Reading::PmConcentration(r) => (None, vec![r.pm10, r.pm25, r.pm100]),
            Reading::PmCount(r) => (
                None,
                vec![
                    r.greater03um,
                    r.greater05um,
                    r.greater10um,
                    r.greater25um,
                    r.greater50um,
                    r.greater100um,
                ],
            ),
            Reading::Co2(r) => (None, vec![r.co2_concentration, r.temperature, r.humidity]),
            Reading::Station(r) => (
                Some(r.identifier),
                vec![
                    r.temperature,
                    r.humidity,
                    r.wind_speed,
                    r.gust_speed,
                    r.rain,
                    r.wind_direction,
                    i64::from(r.battery_low),
                ],
            ),
            Reading::Sensor(r) => (Some(r.identifier), vec![r.temperature, r.humidity]),
        };
        Sample { kind, identifier, timestamp, values }
    }
}

// =============================================================================
// Sample
// =============================================================================

/// One timestamped reading in column order, ready for the rollup engine.
///
/// Samples built through [`Reading::into_sample`] always match their kind's
/// descriptor; hand-built samples are validated by [`Sample::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub kind: MeasurementKind,
    pub identifier: Option<Identifier>,
    pub timestamp: Timestamp,
    pub values: Vec<i64>,
}

impl Sample {
    /// Checks identifier presence and value count against the kind.
    pub fn validate(&self) -> crate::Result<()> {
        match (self.kind.has_identifier(), self.identifier) {
            (true, None) => return Err(crate::Error::MissingIdentifier(self.kind)),
            (false, Some(_)) => return Err(crate::Error::UnexpectedIdentifier(self.kind)),
            _ => {}
        }
        let expected = self.kind.fields().len();
        if self.values.len() != expected {
            return Err(crate::Error::InvalidSample(format!(
                "{} sample has {} values, expected {expected}",
                self.kind,
                self.values.len()
            )));
        }
        Ok(())
    }

    /// Iterates `(field, value)` pairs for fields with a rollup policy.
    pub fn rollup_values(&self) -> impl Iterator<Item = (&'static FieldSpec, i64)> + '_ {
        self.kind
            .fields()
            .iter()
            .zip(self.values.iter().copied())
            .filter(|(f, _)| f.rollup.is_some())
    }
}

// =============================================================================
// Tests
// =============================================================================
