//! # Error Handling for WeatherDB
//!
//! This module defines the error types used throughout WeatherDB. A single
//! error enum ([`Error`]) represents every failure mode, which keeps the
//! handle API simple: every operation returns [`Result<T>`].
//!
//! ## Rust Pattern: thiserror
//!
//! The `thiserror` crate derives `std::error::Error` and `Display` from the
//! `#[error(...)]` attributes, and `#[from]` generates the `From` impls that
//! let `?` convert `rusqlite` and I/O errors automatically.
//!
//! ## Error Categories
//!
//! | Category | Examples | Typical Response |
//! |----------|----------|------------------|
//! | Storage | SQLite error at open or during a write | Fatal at open, logged inside the owner |
//! | Caller | Bad query parameters, unknown field | Fix the call site |
//! | Lifecycle | Store already shut down | Stop issuing requests |
//!
//! "Not found" and "not enough history" are deliberately *not* errors:
//! lookups return `Option` and queries pad their output.

use thiserror::Error;

use crate::types::MeasurementKind;

// =============================================================================
// Error Type
// =============================================================================

/// All errors that can occur in WeatherDB operations.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Storage Errors
    // =========================================================================

    /// SQLite operation failed.
    ///
    /// # When This Happens
    ///
    /// - The database file cannot be opened or created (returned from `open`)
    /// - Disk full or locked while applying a sample (logged by the owner,
    ///   the sample is rolled back and dropped)
    /// - SQL syntax error (indicates a bug in WeatherDB)
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Schema version mismatch detected on open.
    ///
    /// # When This Happens
    ///
    /// Opening a database created by a different WeatherDB schema version.
    #[error("schema error: {0}")]
    Schema(String),

    // =========================================================================
    // Caller Errors
    // =========================================================================

    /// Query parameters are out of range (zero points, zero resolution).
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The requested field does not exist in the table a query resolved to.
    ///
    /// Raw-only fields (for example `wind_direction`) are not present in the
    /// rollup tables, so they can only be queried at sub-minute resolution.
    #[error("unknown field '{field}' for {kind}")]
    UnknownField {
        /// Measurement kind the query targeted
        kind: MeasurementKind,
        /// Field name supplied by the caller
        field: String,
    },

    /// A multi-entity kind was ingested without an identifier.
    #[error("{0} readings require an identifier")]
    MissingIdentifier(MeasurementKind),

    /// A single-entity kind was given an identifier.
    #[error("{0} readings do not take an identifier")]
    UnexpectedIdentifier(MeasurementKind),

    /// A hand-built sample does not match its kind's field layout.
    #[error("invalid sample: {0}")]
    InvalidSample(String),

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================

    /// The owner thread has shut down; the request was not (or will not be)
    /// executed.
    #[error("store has shut down")]
    Closed,

    /// The owner thread or its runtime could not be started.
    #[error("failed to start owner thread: {0}")]
    Spawn(#[from] std::io::Error),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A `Result` type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Tests
// =============================================================================
