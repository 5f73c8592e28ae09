//! # Settings Store
//!
//! Generic string key/value persistence for UI preferences such as the graph
//! resolution index and the logging period. Values are opaque to the store.
//!
//! Writes use `REPLACE INTO`, which deletes and reinserts the row on a `key`
//! conflict. The row `id` changes, but nothing references it.

use rusqlite::{params, Connection, OptionalExtension};

use crate::Result;

/// Index into the display's list of graph resolutions.
pub const GRAPH_RESOLUTION: &str = "graph_resolution";

/// Index into the display's list of logging periods.
pub const LOGGING_PERIOD: &str = "logging_period";

/// Returns the stored value for `key`, or `None` if the key was never set.
///
/// A key stored with a NULL value also reads as `None`.
pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> = conn
        .prepare_cached("SELECT value FROM settings WHERE key = ?1")?
        .query_row([key], |row| row.get(0))
        .optional()?;
    Ok(value.flatten())
}

/// Inserts or replaces the value for `key`.
pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.prepare_cached("REPLACE INTO settings (key, value) VALUES (?1, ?2)")?
        .execute(params![key, value])?;
    Ok(())
}

/// Returns the stored value, or stores `default` and returns it.
pub fn get_or_init(conn: &Connection, key: &str, default: &str) -> Result<String> {
    if let Some(value) = get(conn, key)? {
        return Ok(value);
    }
    set(conn, key, default)?;
    Ok(default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Database;

    fn conn() -> Connection {
        Database::open_in_memory()
            .expect("should create db")
            .into_connection()
    }

    #[test]
    fn test_missing_key_is_none() {
        let conn = conn();
        assert_eq!(get(&conn, GRAPH_RESOLUTION).expect("get"), None);
    }

    #[test]
    fn test_set_then_get() {
        let conn = conn();
        set(&conn, GRAPH_RESOLUTION, "3").expect("set");
        assert_eq!(get(&conn, GRAPH_RESOLUTION).expect("get").as_deref(), Some("3"));
    }

    #[test]
    fn test_set_replaces() {
        let conn = conn();
        set(&conn, LOGGING_PERIOD, "1").expect("set");
        set(&conn, LOGGING_PERIOD, "4").expect("set again");

        assert_eq!(get(&conn, LOGGING_PERIOD).expect("get").as_deref(), Some("4"));
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))
            .expect("count");
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_get_or_init() {
        let conn = conn();
        assert_eq!(get_or_init(&conn, GRAPH_RESOLUTION, "1").expect("init"), "1");
        set(&conn, GRAPH_RESOLUTION, "2").expect("set");
        assert_eq!(get_or_init(&conn, GRAPH_RESOLUTION, "1").expect("existing"), "2");
    }
}
