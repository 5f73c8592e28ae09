//! # Downsample Query Engine
//!
//! Turns the stored history of one field into a fixed-length series of
//! `num` points, each covering `resolution` seconds, ready to be drawn as a
//! trend graph.
//!
//! ## Algorithm
//!
//! ```text
//! resolution        source table        weight
//! ──────────        ────────────        ──────
//!   < 60 s          <kind>              1
//!   < 1 h           <kind>_minute       count
//!   < 1 day         <kind>_hour         count
//!   otherwise       <kind>_day          count
//!
//! per_point = resolution / granularity         (integer division)
//! limit     = num * per_point
//!
//! rows (newest first, at most `limit`)
//!   ┌────────────┬────────────┬────────────┬──────┐
//!   │  chunk 0   │  chunk 1   │  chunk 2   │ tail │   tail < per_point rows
//!   └────────────┴────────────┴────────────┴──────┘   is dropped
//!        │            │            │
//!        ▼            ▼            ▼
//!   Σ(v / w) / per_point       (additive mode)
//!   max(0, v…)                 (counter mode)
//!
//! output = [oldest computed] * (num - computed) ++ reversed(computed)
//! ```
//!
//! A rollup row stores a sum and the number of samples in it, so `v / w` is
//! the bucket mean. Max and latest fields are already representative values
//! and use weight 1.
//!
//! ## Missing Data
//!
//! Missing history is never an error. Too few rows produce a left-padded
//! series; no rows at all produce `num` zeros.

use rusqlite::{Connection, OptionalExtension};

use crate::types::{Aggregate, Granularity, Identifier, MeasurementKind, Timestamp};
use crate::{Error, Result};

// =============================================================================
// Query Description
// =============================================================================

/// A downsampled series request.
///
/// In the default additive mode, sum fields are averaged per sample
/// (divided by the bucket `count`); max and latest fields such as gust speed
/// and rain are taken as stored and never divided by `count`.
///
/// # Example
///
/// ```rust
/// use weatherdb::{MeasurementKind, QuerySpec};
///
/// // 60 points, one per 10 minutes, of station 3's temperature.
/// let spec = QuerySpec::new(MeasurementKind::Station, "temperature", 60, 600).identifier(3);
/// assert_eq!(spec.num, 60);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub kind: MeasurementKind,
    pub field: String,
    /// Number of output points.
    pub num: usize,
    /// Seconds covered by each output point.
    pub resolution: i64,
    /// Restrict to one device (multi-entity kinds only).
    pub identifier: Option<Identifier>,
    /// Take the chunk maximum instead of the mean. Used for cumulative
    /// counters such as rain.
    pub counter_mode: bool,
}

impl QuerySpec {
    pub fn new(kind: MeasurementKind, field: impl Into<String>, num: usize, resolution: i64) -> Self {
        Self {
            kind,
            field: field.into(),
            num,
            resolution,
            identifier: None,
            counter_mode: false,
        }
    }

    pub fn identifier(mut self, identifier: Identifier) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub fn counter_mode(mut self) -> Self {
        self.counter_mode = true;
        self
    }
}

// =============================================================================
// Source Selection
// =============================================================================

/// Table a query reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Raw,
    Rollup(Granularity),
}

impl Source {
    /// Picks the coarsest table whose granularity does not exceed `resolution`.
    pub fn for_resolution(resolution: i64) -> Self {
        if resolution < Granularity::Minute.seconds() {
            Source::Raw
        } else if resolution < Granularity::Hour.seconds() {
            Source::Rollup(Granularity::Minute)
        } else if resolution < Granularity::Day.seconds() {
            Source::Rollup(Granularity::Hour)
        } else {
            Source::Rollup(Granularity::Day)
        }
    }

    /// Seconds represented by one row. Raw rows count as one second.
    pub fn granularity_secs(self) -> i64 {
        match self {
            Source::Raw => 1,
            Source::Rollup(g) => g.seconds(),
        }
    }

    fn table(self, kind: MeasurementKind) -> String {
        match self {
            Source::Raw => kind.table().to_string(),
            Source::Rollup(g) => kind.rollup_table(g),
        }
    }
}

// =============================================================================
// Pure Downsampling
// =============================================================================

/// Folds newest-first `(value, weight)` rows into `num` points, oldest first.
///
/// Rows are split into consecutive chunks of `per_point`; a trailing chunk
/// with fewer rows is dropped.
pub fn downsample(rows: &[(f64, f64)], num: usize, per_point: usize, counter_mode: bool) -> Vec<f64> {
    if num == 0 {
        return Vec::new();
    }
    if per_point == 0 {
        return vec![0.0; num];
    }

    let computed: Vec<f64> = rows
        .chunks_exact(per_point)
        .take(num)
        .map(|chunk| {
            if counter_mode {
                chunk.iter().map(|(v, _)| *v).fold(0.0, f64::max)
            } else {
                let total: f64 = chunk
                    .iter()
                    .map(|(v, w)| if *w > 0.0 { v / w } else { *v })
                    .sum();
                total / per_point as f64
            }
        })
        .collect();

    let Some(&oldest) = computed.last() else {
        return vec![0.0; num];
    };

    let mut series = vec![oldest; num - computed.len()];
    series.extend(computed.iter().rev());
    series
}

// =============================================================================
// Queries Against the Store
// =============================================================================

/// Runs a downsampled series query.
///
/// # Errors
///
/// - `Error::InvalidQuery` if `num` or `resolution` is not positive
/// - `Error::UnknownField` if the field is not stored in the chosen table
/// - `Error::UnexpectedIdentifier` if an identifier is given for a
///   single-entity kind
/// - `Error::Sqlite` on read failure
pub fn query(conn: &Connection, spec: &QuerySpec) -> Result<Vec<f64>> {
    if spec.num == 0 {
        return Err(Error::InvalidQuery("num must be at least 1".to_string()));
    }
    if spec.resolution <= 0 {
        return Err(Error::InvalidQuery(format!(
            "resolution must be positive, got {}",
            spec.resolution
        )));
    }
    if spec.identifier.is_some() && !spec.kind.has_identifier() {
        return Err(Error::UnexpectedIdentifier(spec.kind));
    }

    let source = Source::for_resolution(spec.resolution);
    let unknown = || Error::UnknownField {
        kind: spec.kind,
        field: spec.field.clone(),
    };
    let field = spec.kind.field(&spec.field).ok_or_else(unknown)?;

    // Only field names from the kind descriptor reach the SQL text.
    let weight = match (source, field.rollup) {
        (Source::Raw, _) => "1",
        (Source::Rollup(_), Some(Aggregate::Sum)) => "count",
        (Source::Rollup(_), Some(Aggregate::Max | Aggregate::Latest)) => "1",
        (Source::Rollup(_), None) => return Err(unknown()),
    };

    let too_large = || {
        Error::InvalidQuery(format!(
            "{} points at {} s is too large",
            spec.num, spec.resolution
        ))
    };
    let per_point =
        usize::try_from(spec.resolution / source.granularity_secs()).map_err(|_| too_large())?;
    let limit = spec
        .num
        .checked_mul(per_point)
        .and_then(|rows| i64::try_from(rows).ok())
        .ok_or_else(too_large)?;

    let table = source.table(spec.kind);
    let mut sql = format!("SELECT {}, {weight} FROM {table}", field.name);
    if spec.identifier.is_some() {
        sql.push_str(" WHERE identifier = ?2");
    }
    sql.push_str(" ORDER BY time DESC, id DESC LIMIT ?1");

    let mut stmt = conn.prepare_cached(&sql)?;
    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(f64, f64)> {
        let value: Option<f64> = row.get(0)?;
        let weight: f64 = row.get(1)?;
        Ok((value.unwrap_or(0.0), weight))
    };
    let rows: Vec<(f64, f64)> = match spec.identifier {
        Some(id) => stmt
            .query_map(rusqlite::params![limit, id], map_row)?
            .collect::<rusqlite::Result<_>>()?,
        None => stmt
            .query_map(rusqlite::params![limit], map_row)?
            .collect::<rusqlite::Result<_>>()?,
    };

    Ok(downsample(&rows, spec.num, per_point, spec.counter_mode))
}

/// Rain that fell at station `identifier` during the last `period` seconds
/// before `now`.
///
/// Computed from the raw cumulative counter as the latest value minus the
/// first value recorded at or after `now - period`. A counter reset inside the
/// window would make that negative; the result is clamped to 0.
///
/// Returns `None` when the station has no readings in the window.
pub fn rain_over_period(
    conn: &Connection,
    identifier: Identifier,
    period: i64,
    now: Timestamp,
) -> Result<Option<f64>> {
    let end: Option<Option<i64>> = conn
        .prepare_cached(
            "SELECT rain FROM station WHERE identifier = ?1 ORDER BY time DESC, id DESC LIMIT 1",
        )?
        .query_row([identifier], |row| row.get(0))
        .optional()?;

    let start: Option<Option<i64>> = conn
        .prepare_cached(
            "SELECT rain FROM station WHERE identifier = ?1 AND time >= ?2 ORDER BY time ASC, id ASC LIMIT 1",
        )?
        .query_row([identifier, now - period], |row| row.get(0))
        .optional()?;

    Ok(match (end.flatten(), start.flatten()) {
        (Some(end), Some(start)) => Some((end - start).max(0) as f64),
        _ => None,
    })
}

/// Rain per period for the last `num` periods at station `identifier`,
/// oldest first.
///
/// Reads `num + 1` counter-mode points and returns the differences between
/// neighbours, each clamped to 0.
pub fn rain_period_series(
    conn: &Connection,
    num: usize,
    period: i64,
    identifier: Identifier,
) -> Result<Vec<f64>> {
    let points = num
        .checked_add(1)
        .ok_or_else(|| Error::InvalidQuery(format!("{num} periods is too many")))?;
    let spec = QuerySpec::new(MeasurementKind::Station, "rain", points, period)
        .identifier(identifier)
        .counter_mode();
    let points = query(conn, &spec)?;
    Ok(points.windows(2).map(|w| (w[1] - w[0]).max(0.0)).collect())
}

// =============================================================================
// Tests
// =============================================================================
