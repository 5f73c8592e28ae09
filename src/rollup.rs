//! # Rollup Engine
//!
//! Applies one sample to the store: the raw row plus one accumulator row per
//! granularity, all in a single transaction.
//!
//! ## Write Path
//!
//! ```text
//! Sample { kind: Co2, ts: 1699920125, [410, 2150, 45] }
//!    │
//!    ├─► INSERT INTO co2 (time, ...) VALUES (1699920125, ...)
//!    │
//!    ├─► upsert co2_minute  bucket 1699920120
//!    ├─► upsert co2_hour    bucket 1699920000
//!    ├─► upsert co2_day     bucket 1699920000
//!    │
//!    └─► COMMIT
//! ```
//!
//! ## Atomic Upsert
//!
//! Each rollup write is one statement:
//!
//! ```sql
//! INSERT INTO co2_minute (time, co2_concentration, temperature, humidity, count)
//! VALUES (?1, ?2, ?3, ?4, 1)
//! ON CONFLICT(time) DO UPDATE SET
//!     co2_concentration = co2_concentration + excluded.co2_concentration,
//!     ...
//!     count = count + 1
//! ```
//!
//! The first sample of a bucket seeds the row with its own values and
//! `count = 1`; every later sample accumulates according to the field's
//! [`Aggregate`] policy. Sums and maxima do not depend on arrival order.
//!
//! ## Failure
//!
//! Any failing statement aborts the transaction: the raw row and all three
//! rollups are rolled back together. The owner logs the error and moves on
//! to the next request.

use rusqlite::{params_from_iter, types::Value, Connection, TransactionBehavior};

use crate::types::{Aggregate, Granularity, MeasurementKind, Sample};
use crate::Result;

// =============================================================================
// SQL Generation
// =============================================================================

/// `INSERT` statement for the raw table of `kind`.
pub(crate) fn raw_insert_sql(kind: MeasurementKind) -> String {
    let mut columns = vec!["time"];
    if kind.has_identifier() {
        columns.push("identifier");
    }
    columns.extend(kind.fields().iter().map(|f| f.name));

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        kind.table(),
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Upsert statement for the rollup table of `kind` at `granularity`.
///
/// Parameters: bucket start, identifier (multi-entity kinds only), then the
/// rollup fields in column order.
pub(crate) fn rollup_upsert_sql(kind: MeasurementKind, granularity: Granularity) -> String {
    let mut key = vec!["time"];
    if kind.has_identifier() {
        key.push("identifier");
    }

    let mut columns = key.clone();
    let mut updates = Vec::new();
    for field in kind.rollup_fields() {
        columns.push(field.name);
        let name = field.name;
        updates.push(match field.rollup {
            Some(Aggregate::Sum) => format!("{name} = {name} + excluded.{name}"),
            Some(Aggregate::Max) => format!("{name} = MAX({name}, excluded.{name})"),
            Some(Aggregate::Latest) | None => format!("{name} = excluded.{name}"),
        });
    }
    updates.push("count = count + 1".to_string());

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {table} ({columns}, count) VALUES ({placeholders}, 1) \
         ON CONFLICT({key}) DO UPDATE SET {updates}",
        table = kind.rollup_table(granularity),
        columns = columns.join(", "),
        placeholders = placeholders.join(", "),
        key = key.join(", "),
        updates = updates.join(", "),
    )
}

// =============================================================================
// Apply
// =============================================================================

/// Writes `sample` to its raw table and folds it into the minute, hour and
/// day rollups as one committed unit.
///
/// # Errors
///
/// - `Error::MissingIdentifier` / `Error::UnexpectedIdentifier` /
///   `Error::InvalidSample` if the sample does not match its kind
/// - `Error::Sqlite` if any statement fails; nothing is written in that case
pub fn apply(conn: &mut Connection, sample: &Sample) -> Result<()> {
    sample.validate()?;
    let kind = sample.kind;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    {
        let mut raw: Vec<Value> = Vec::with_capacity(sample.values.len() + 2);
        raw.push(Value::Integer(sample.timestamp));
        if let Some(id) = sample.identifier {
            raw.push(Value::Integer(id));
        }
        raw.extend(sample.values.iter().map(|v| Value::Integer(*v)));
        tx.prepare_cached(&raw_insert_sql(kind))?
            .execute(params_from_iter(raw))?;

        for granularity in Granularity::ALL {
            let mut args: Vec<Value> = Vec::with_capacity(sample.values.len() + 2);
            args.push(Value::Integer(granularity.bucket_start(sample.timestamp)));
            if let Some(id) = sample.identifier {
                args.push(Value::Integer(id));
            }
            args.extend(sample.rollup_values().map(|(_, v)| Value::Integer(v)));
            tx.prepare_cached(&rollup_upsert_sql(kind, granularity))?
                .execute(params_from_iter(args))?;
        }
    }

    tx.commit()?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
