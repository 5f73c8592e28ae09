//! # SQLite Schema for WeatherDB
//!
//! This module creates and verifies the on-disk layout. Table definitions are
//! generated from the kind descriptors in [`crate::types`], so every
//! measurement kind gets the same shape.
//!
//! ## Table Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Schema Overview (per measurement kind)               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  <kind>                 <kind>_minute / _hour / _day                    │
//! │  ┌──────────────┐       ┌───────────────────────────┐                   │
//! │  │ id (PK)      │       │ id (PK)                   │                   │
//! │  │ time         │──────►│ time  (bucket start)      │ UNIQUE(time       │
//! │  │ [identifier] │       │ [identifier]              │   [, identifier]) │
//! │  │ field…       │       │ rolled-up field…          │                   │
//! │  └──────────────┘       │ count                     │                   │
//! │   append-only           └───────────────────────────┘                   │
//! │                          one row per bucket, updated in place           │
//! │                                                                         │
//! │  settings                       weatherdb_metadata                      │
//! │  ┌─────────────────┐            ┌─────────────────┐                     │
//! │  │ key (UNIQUE)    │            │ key (PK)        │                     │
//! │  │ value           │            │ value           │                     │
//! │  └─────────────────┘            └─────────────────┘                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Compatibility
//!
//! Table and column names (including the `id integer primary key` and
//! `count` columns) follow the layout existing station databases already use,
//! so an older database opens without migration. The metadata table is added
//! on first open.
//!
//! ## Why `UNIQUE(time, identifier)`?
//!
//! The rollup engine relies on `INSERT ... ON CONFLICT(time, identifier)`.
//! SQLite only accepts a conflict target that matches a unique index exactly,
//! so the constraint is part of the table definition rather than a separate
//! index.

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::types::{Granularity, MeasurementKind};
use crate::{Error, Result};

// =============================================================================
// Schema Version
// =============================================================================

/// Current schema version. Increment when making breaking schema changes.
///
/// There are no migrations: a mismatching version is an error on open.
const SCHEMA_VERSION: i32 = 1;

// =============================================================================
// DDL Statements
// =============================================================================

/// Generic key/value settings (graph resolution, logging period, ...).
///
/// Written with `REPLACE INTO`, so `key` must be unique.
const CREATE_SETTINGS: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
    id    INTEGER PRIMARY KEY,
    key   TEXT NOT NULL UNIQUE,
    value TEXT
)
"#;

/// Metadata table for schema versioning.
const CREATE_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS weatherdb_metadata (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
"#;

/// Builds the raw table for a kind.
///
/// Raw rows are append-only. `id` doubles as the insertion order tiebreaker
/// when two samples share a timestamp.
pub(crate) fn raw_table_ddl(kind: MeasurementKind) -> String {
    let mut columns = vec![
        "id INTEGER PRIMARY KEY".to_string(),
        "time INTEGER NOT NULL".to_string(),
    ];
    if kind.has_identifier() {
        columns.push("identifier INTEGER NOT NULL".to_string());
    }
    columns.extend(kind.fields().iter().map(|f| format!("{} INTEGER", f.name)));

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        kind.table(),
        columns.join(",\n    ")
    )
}

/// Builds the time index (and per-device index) for a raw table.
///
/// Downsampling at sub-minute resolution reads the newest raw rows, and the
/// rain period lookup scans by `(identifier, time)`.
pub(crate) fn raw_index_ddl(kind: MeasurementKind) -> String {
    let table = kind.table();
    let mut ddl = format!("CREATE INDEX IF NOT EXISTS {table}_time ON {table}(time);");
    if kind.has_identifier() {
        ddl.push_str(&format!(
            "\nCREATE INDEX IF NOT EXISTS {table}_identifier_time ON {table}(identifier, time);"
        ));
    }
    ddl
}

/// Builds one rollup table for a kind at a granularity.
///
/// Only fields with a rollup policy are present. `count` is the number of raw
/// samples folded into the row and is always at least 1.
pub(crate) fn rollup_table_ddl(kind: MeasurementKind, granularity: Granularity) -> String {
    let mut columns = vec![
        "id INTEGER PRIMARY KEY".to_string(),
        "time INTEGER NOT NULL".to_string(),
    ];
    if kind.has_identifier() {
        columns.push("identifier INTEGER NOT NULL".to_string());
    }
    columns.extend(kind.rollup_fields().map(|f| format!("{} INTEGER", f.name)));
    columns.push("count INTEGER NOT NULL DEFAULT 1".to_string());
    columns.push(if kind.has_identifier() {
        "UNIQUE(time, identifier)".to_string()
    } else {
        "UNIQUE(time)".to_string()
    });

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        kind.rollup_table(granularity),
        columns.join(",\n    ")
    )
}

// =============================================================================
// Database Wrapper
// =============================================================================

/// A SQLite connection with the WeatherDB schema applied.
///
/// `Database` only exists to get a connection into a known state; after
/// opening, [`Database::into_connection`] hands the connection to
/// [`crate::Storage`], which owns it for the rest of its life.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database file, creating and initializing it if necessary.
    ///
    /// # Errors
    ///
    /// - `Error::Sqlite` if the file can't be opened or created
    /// - `Error::Schema` if the schema version doesn't match
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let mut db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Creates an in-memory database for testing.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Applies pragmas, creates every table, and checks the schema version.
    ///
    /// Every statement uses `IF NOT EXISTS`, so this is safe to run against a
    /// database that is already initialized.
    fn initialize(&mut self) -> Result<()> {
        // =====================================================================
        // SQLite Pragmas
        // =====================================================================

        // WAL: external readers (e.g. a backup tool) never block the owner.
        self.conn.execute_batch("PRAGMA journal_mode = WAL")?;
        // Sync WAL on commit only. A crash may lose the last sample, which
        // the next sensor callback replaces within seconds.
        self.conn.execute_batch("PRAGMA synchronous = NORMAL")?;

        // =====================================================================
        // Create Tables
        // =====================================================================

        self.conn.execute_batch(CREATE_METADATA)?;
        self.conn.execute_batch(CREATE_SETTINGS)?;

        for kind in MeasurementKind::ALL {
            self.conn.execute_batch(&raw_table_ddl(kind))?;
            self.conn.execute_batch(&raw_index_ddl(kind))?;
            for granularity in Granularity::ALL {
                self.conn.execute_batch(&rollup_table_ddl(kind, granularity))?;
            }
        }

        self.verify_or_set_version()?;

        debug!(version = SCHEMA_VERSION, "schema initialized");
        Ok(())
    }

    /// Verifies the schema version, or sets it if this is a new database.
    fn verify_or_set_version(&mut self) -> Result<()> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM weatherdb_metadata WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            None => {
                self.conn.execute(
                    "INSERT INTO weatherdb_metadata (key, value) VALUES ('schema_version', ?)",
                    [SCHEMA_VERSION.to_string()],
                )?;
            }
            Some(v) if v == SCHEMA_VERSION.to_string() => {}
            Some(v) => {
                return Err(Error::Schema(format!(
                    "schema version mismatch: database has version {v}, but this WeatherDB version requires {SCHEMA_VERSION}"
                )));
            }
        }

        Ok(())
    }

    /// Consumes the wrapper and returns the initialized connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

// =============================================================================
// Tests
// =============================================================================
