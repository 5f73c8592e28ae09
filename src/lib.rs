//! # WeatherDB - Embedded Time-Series Store
//!
//! WeatherDB stores the readings of a tabletop weather station: indoor air
//! quality, particulate matter, CO₂, and any number of outdoor stations and
//! temperature/humidity sensors. It provides:
//!
//! - **Single-writer access**: one owner thread holds the SQLite connection
//! - **Rolling aggregates**: minute, hour and day buckets maintained on ingest
//! - **Downsampled queries**: fixed-length series for trend graphs, padded
//!   when history is short
//! - **Settings**: small key/value store for UI preferences
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │            StoreHandle (blocking)  /  WeatherDb (async)         │
//! │         add_co2, add_station, ..., query, setting_get           │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │  typed requests, per-call oneshot
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Owner Thread                             │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐ │
//! │  │   Rollup    │  │ Downsample  │  │  Settings  /            │ │
//! │  │   Engine    │  │   Queries   │  │  Maintenance tasks      │ │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │            SQLite: raw tables + _minute/_hour/_day              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Invariants
//!
//! 1. **Single owner**: only the owner thread touches the connection
//! 2. **FIFO**: requests execute in the order they were queued
//! 3. **Atomic samples**: a raw row and its three rollups commit together
//! 4. **One row per bucket**: at most one rollup row per `(bucket, identifier)`,
//!    and its sums and count only grow
//! 5. **No lost callers**: every result-bearing request gets an answer,
//!    `Error::Closed` at worst
//!
//! ## Module Organization
//!
//! - [`error`]: Error type for all failure modes
//! - [`types`]: Measurement kinds, field policies, granularities, readings
//! - [`schema`]: SQLite DDL and database initialization
//! - [`rollup`]: Raw insert plus minute/hour/day upserts
//! - [`query`]: Downsampling and rain period queries
//! - [`settings`]: Key/value settings
//! - [`storage`]: Connection owner used on the owner thread
//! - [`config`]: Store configuration
//! - [`actor`]: Owner thread, request queue and blocking handle
//! - [`api`]: Async front end

// =============================================================================
// Module Declarations
// =============================================================================

/// Error types for WeatherDB operations.
pub mod error;

/// Domain types: measurement kinds, field rollup policies, granularities
/// and readings.
pub mod types;

/// SQLite schema definitions and database initialization.
///
/// Tables are generated from the kind descriptors in [`types`], one raw
/// table and three rollup tables per kind.
pub mod schema;

/// Rollup engine.
///
/// Applies a sample as one transaction: the raw insert followed by an atomic
/// upsert into each of the minute, hour and day tables.
pub mod rollup;

/// Downsample query engine.
pub mod query;

/// Key/value settings store.
pub mod settings;

/// Owner-side storage: the connection plus every store operation.
pub mod storage;

/// Store configuration.
pub mod config;

/// Access serializer.
///
/// A dedicated owner thread processes typed requests in FIFO order. Producers
/// send fire-and-forget ingestion requests; queries carry their own one-shot
/// response channel. Maintenance tasks run on the owner between requests.
pub mod actor;

/// Async API for WeatherDB.
///
/// The main async entry point is [`WeatherDb`](api::WeatherDb).
pub mod api;

// =============================================================================
// Re-exports
// =============================================================================

pub use actor::{MaintenanceTask, StoreBuilder, StoreHandle};
pub use api::WeatherDb;
pub use config::{DbLocation, StoreConfig};
pub use error::{Error, Result};
pub use query::QuerySpec;
pub use schema::Database;
pub use storage::Storage;

pub use types::{
    current_time_secs, Aggregate, AirQualityReading, Co2Reading, FieldSpec, Granularity,
    Identifier, MeasurementKind, PmConcentrationReading, PmCountReading, Reading, Sample,
    SensorReading, StationReading, Timestamp,
};
