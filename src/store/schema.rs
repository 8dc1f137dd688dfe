//! Schema for the in-memory result store
//!
//! Tables:
//! - race_result: one row per driver per race, loaded once at startup
//!
//! Additional configured datasets (qualifying, pit stops, ...) are created
//! dynamically from their CSV schema, see `db::InMemoryDb::load_tables`.

use rusqlite::{Connection, Result};

/// Create the core tables
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS race_result (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            driver TEXT NOT NULL,
            constructor TEXT NOT NULL,
            season INTEGER NOT NULL,
            round INTEGER NOT NULL,
            position INTEGER,
            points REAL NOT NULL
        )
        "#,
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_race_result_driver ON race_result (driver, season, round)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_race_result_constructor ON race_result (constructor, season, round)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM race_result", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
