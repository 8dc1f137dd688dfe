//! In-memory SQL store over the loaded race result datasets.
//!
//! The full history is loaded wholesale at startup into an in-memory
//! SQLite database; the ranking queries run as plain SQL aggregation.

use anyhow::{bail, Context, Result};
use polars::prelude::*;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::schema::create_tables;
use crate::ranking::RankedRow;

/// Table queried by the trend computation
pub const RACE_RESULT_TABLE: &str = "race_result";

/// Constructor points total and rank for one (season, round).
///
/// Rank is 1-based by descending summed points; ties break by constructor
/// name ascending so repeated runs order identically.
#[derive(Debug, Clone)]
pub struct ConstructorStanding {
    pub constructor: String,
    pub season: i32,
    pub round: i32,
    pub points: f64,
    pub position: u32,
}

/// In-memory store, read-only after the startup bulk load.
pub struct InMemoryDb {
    conn: Mutex<Connection>,
}

impl InMemoryDb {
    /// Create an empty store
    pub fn open() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory store")?;
        create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to lock store connection: {}", e))
    }

    // ==================== Bulk Load ====================

    /// Load every configured dataset into its own table.
    ///
    /// `race_result` goes through typed ingestion; any other dataset is
    /// materialized directly from its CSV schema. A malformed `race_result`
    /// file is a startup failure, not something to recover from mid-session.
    pub fn load_tables(&self, tables: &HashMap<String, String>) -> Result<()> {
        let mut names: Vec<&String> = tables.keys().collect();
        names.sort();

        for name in names {
            let path = &tables[name];
            let df = read_csv(path)?;
            if name == RACE_RESULT_TABLE {
                let rows = self
                    .ingest_race_results(&df)
                    .with_context(|| format!("Malformed race_result data in '{}'", path))?;
                tracing::info!("Loaded {} race_result rows from {}", rows, path);
            } else {
                self.create_table_from_frame(name, &df)
                    .with_context(|| format!("Failed to load table '{}' from '{}'", name, path))?;
                tracing::info!("Loaded table '{}' from {}", name, path);
            }
        }

        Ok(())
    }

    /// Typed ingestion of the race result table.
    pub fn ingest_race_results(&self, df: &DataFrame) -> Result<usize> {
        let drivers = column(df, "driver")?;
        let constructors = column(df, "constructor")?;
        let seasons = column(df, "season")?;
        let rounds = column(df, "round")?;
        let positions = column(df, "position")?;
        let points = column(df, "points")?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO race_result (driver, constructor, season, round, position, points)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;

            for i in 0..df.height() {
                let driver = str_at(drivers, i)?
                    .with_context(|| format!("row {}: driver is null", i))?;
                let constructor = str_at(constructors, i)?
                    .with_context(|| format!("row {}: constructor is null", i))?;
                let season = int_at(seasons, i)?
                    .with_context(|| format!("row {}: season is null", i))?;
                let round = int_at(rounds, i)?
                    .with_context(|| format!("row {}: round is null", i))?;
                // Null position = non-finisher, kept as NULL
                let position = int_at(positions, i)?;
                let pts = float_at(points, i)?
                    .with_context(|| format!("row {}: points is null", i))?;

                stmt.execute(rusqlite::params![
                    driver,
                    constructor,
                    season,
                    round,
                    position,
                    pts
                ])?;
            }
        }
        tx.commit()?;

        Ok(df.height())
    }

    /// Materialize an auxiliary dataset as its own table, columns mapped
    /// from the frame's schema.
    fn create_table_from_frame(&self, name: &str, df: &DataFrame) -> Result<()> {
        let columns = df.get_columns();
        if columns.is_empty() {
            bail!("dataset has no columns");
        }

        let column_defs: Vec<String> = columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(c.name()), sqlite_type(c.dtype())))
            .collect();

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "CREATE TABLE {} ({})",
                quote_ident(name),
                column_defs.join(", ")
            ),
            [],
        )?;

        {
            let placeholders: Vec<String> =
                (1..=columns.len()).map(|i| format!("?{}", i)).collect();
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} VALUES ({})",
                quote_ident(name),
                placeholders.join(", ")
            ))?;

            for i in 0..df.height() {
                let mut values = Vec::with_capacity(columns.len());
                for col in columns {
                    values.push(sql_value(col.get(i)?));
                }
                stmt.execute(rusqlite::params_from_iter(values))?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    // ==================== Query Operations ====================

    /// Distinct driver names, sorted
    pub fn list_drivers(&self) -> Result<Vec<String>> {
        self.list_distinct("driver")
    }

    /// Distinct raw constructor names, sorted
    pub fn list_constructors(&self) -> Result<Vec<String>> {
        self.list_distinct("constructor")
    }

    fn list_distinct(&self, column: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT {col} FROM race_result ORDER BY {col} ASC",
            col = column
        ))?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Driver-mode ranking rows for the selected drivers, ordered by
    /// (driver, season, round). The finishing position is the rank metric.
    pub fn driver_results(&self, drivers: &[String]) -> Result<Vec<RankedRow>> {
        if drivers.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; drivers.len()].join(", ");
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT driver, season, round, position
            FROM race_result
            WHERE driver IN ({})
            ORDER BY driver ASC, season ASC, round ASC
            "#,
            placeholders
        ))?;

        let rows = stmt
            .query_map(rusqlite::params_from_iter(drivers), |row| {
                Ok(RankedRow {
                    entity: row.get(0)?,
                    season: row.get(1)?,
                    round: row.get(2)?,
                    position: row.get::<_, Option<i64>>(3)?.map(|p| p as f64),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Full constructor standings: points summed per (constructor, season,
    /// round) and ranked within each (season, round) group.
    pub fn constructor_standings(&self) -> Result<Vec<ConstructorStanding>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                constructor,
                season,
                round,
                SUM(points) AS constructor_point,
                ROW_NUMBER() OVER (
                    PARTITION BY season, round
                    ORDER BY SUM(points) DESC, constructor ASC
                ) AS constructor_position
            FROM race_result
            GROUP BY constructor, season, round
            ORDER BY constructor ASC, season ASC, round ASC
            "#,
        )?;

        let standings = stmt
            .query_map([], |row| {
                Ok(ConstructorStanding {
                    constructor: row.get(0)?,
                    season: row.get(1)?,
                    round: row.get(2)?,
                    points: row.get(3)?,
                    position: row.get::<_, i64>(4)? as u32,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(standings)
    }

    /// Number of race result rows
    pub fn row_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM race_result", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Insert a single result row (test fixtures)
    #[cfg(test)]
    pub fn insert_result(
        &self,
        driver: &str,
        constructor: &str,
        season: i32,
        round: i32,
        position: Option<i64>,
        points: f64,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO race_result (driver, constructor, season, round, position, points)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            rusqlite::params![driver, constructor, season, round, position, points],
        )?;
        Ok(())
    }
}

/// Read a CSV into a frame
fn read_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to open CSV '{}'", path.display()))?
        .finish()
        .with_context(|| format!("Failed to parse CSV '{}'", path.display()))?;
    Ok(df)
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .with_context(|| format!("race_result is missing column '{}'", name))
}

// Column readers tolerate the dtype drift CSV inference produces (an
// all-integral points column comes back as Int64, a position column with
// gaps may come back as Float64 in some exports).

fn str_at(col: &Column, i: usize) -> Result<Option<String>> {
    match col.dtype() {
        DataType::String => Ok(col.str()?.get(i).map(|s| s.to_string())),
        other => bail!("column '{}' has unsupported type {}", col.name(), other),
    }
}

fn int_at(col: &Column, i: usize) -> Result<Option<i64>> {
    match col.dtype() {
        DataType::Int64 => Ok(col.i64()?.get(i)),
        DataType::Int32 => Ok(col.i32()?.get(i).map(i64::from)),
        DataType::Float64 => Ok(col.f64()?.get(i).map(|v| v as i64)),
        other => bail!("column '{}' has unsupported type {}", col.name(), other),
    }
}

fn float_at(col: &Column, i: usize) -> Result<Option<f64>> {
    match col.dtype() {
        DataType::Float64 => Ok(col.f64()?.get(i)),
        DataType::Float32 => Ok(col.f32()?.get(i).map(f64::from)),
        DataType::Int64 => Ok(col.i64()?.get(i).map(|v| v as f64)),
        DataType::Int32 => Ok(col.i32()?.get(i).map(f64::from)),
        other => bail!("column '{}' has unsupported type {}", col.name(), other),
    }
}

fn sqlite_type(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Boolean
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => "INTEGER",
        DataType::Float32 | DataType::Float64 => "REAL",
        _ => "TEXT",
    }
}

fn sql_value(value: AnyValue) -> rusqlite::types::Value {
    use rusqlite::types::Value;

    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Integer(b as i64),
        AnyValue::String(s) => Value::Text(s.to_string()),
        AnyValue::StringOwned(s) => Value::Text(s.to_string()),
        AnyValue::Int8(v) => Value::Integer(v as i64),
        AnyValue::Int16(v) => Value::Integer(v as i64),
        AnyValue::Int32(v) => Value::Integer(v as i64),
        AnyValue::Int64(v) => Value::Integer(v),
        AnyValue::UInt8(v) => Value::Integer(v as i64),
        AnyValue::UInt16(v) => Value::Integer(v as i64),
        AnyValue::UInt32(v) => Value::Integer(v as i64),
        AnyValue::UInt64(v) => Value::Integer(v as i64),
        AnyValue::Float32(v) => Value::Real(v as f64),
        AnyValue::Float64(v) => Value::Real(v),
        other => Value::Text(other.to_string()),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn seeded_db() -> InMemoryDb {
        let db = InMemoryDb::open().unwrap();
        // 2020 round 1: two drivers per constructor
        db.insert_result("Hamilton", "Mercedes", 2020, 1, Some(1), 25.0)
            .unwrap();
        db.insert_result("Bottas", "Mercedes", 2020, 1, Some(2), 18.0)
            .unwrap();
        db.insert_result("Verstappen", "Red Bull", 2020, 1, Some(3), 15.0)
            .unwrap();
        db.insert_result("Albon", "Red Bull", 2020, 1, None, 0.0)
            .unwrap();
        // 2020 round 2
        db.insert_result("Hamilton", "Mercedes", 2020, 2, Some(2), 18.0)
            .unwrap();
        db.insert_result("Verstappen", "Red Bull", 2020, 2, Some(1), 25.0)
            .unwrap();
        db
    }

    #[test]
    fn test_list_drivers_distinct_sorted() {
        let db = seeded_db();
        let drivers = db.list_drivers().unwrap();
        assert_eq!(drivers, vec!["Albon", "Bottas", "Hamilton", "Verstappen"]);
    }

    #[test]
    fn test_driver_results_order_and_null_position() {
        let db = seeded_db();
        let rows = db
            .driver_results(&["Verstappen".to_string(), "Albon".to_string()])
            .unwrap();

        assert_eq!(rows.len(), 3);
        // Ordered by driver, then chronology
        assert_eq!(rows[0].entity, "Albon");
        assert_eq!(rows[0].position, None);
        assert_eq!(rows[1].entity, "Verstappen");
        assert_eq!(rows[1].position, Some(3.0));
        assert_eq!(rows[2].round, 2);
    }

    #[test]
    fn test_driver_results_unknown_driver_is_absent() {
        let db = seeded_db();
        let rows = db.driver_results(&["Senna".to_string()]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_constructor_standings_rank_by_points() {
        let db = seeded_db();
        let standings = db.constructor_standings().unwrap();

        // Mercedes round 1: 43 points -> rank 1; Red Bull 15 -> rank 2
        let merc_r1 = standings
            .iter()
            .find(|s| s.constructor == "Mercedes" && s.round == 1)
            .unwrap();
        assert_eq!(merc_r1.points, 43.0);
        assert_eq!(merc_r1.position, 1);

        let rb_r1 = standings
            .iter()
            .find(|s| s.constructor == "Red Bull" && s.round == 1)
            .unwrap();
        assert_eq!(rb_r1.position, 2);

        // Round 2: Red Bull 25 beats Mercedes 18
        let rb_r2 = standings
            .iter()
            .find(|s| s.constructor == "Red Bull" && s.round == 2)
            .unwrap();
        assert_eq!(rb_r2.position, 1);
    }

    #[test]
    fn test_constructor_standings_tie_breaks_by_name() {
        let db = InMemoryDb::open().unwrap();
        db.insert_result("A", "Zeta", 2021, 1, Some(1), 10.0).unwrap();
        db.insert_result("B", "Alpha", 2021, 1, Some(2), 10.0).unwrap();

        let standings = db.constructor_standings().unwrap();
        let alpha = standings.iter().find(|s| s.constructor == "Alpha").unwrap();
        let zeta = standings.iter().find(|s| s.constructor == "Zeta").unwrap();

        // Equal points: name ascending wins the lower rank, every run
        assert_eq!(alpha.position, 1);
        assert_eq!(zeta.position, 2);
    }

    #[test]
    fn test_ingest_race_results_from_frame() {
        let db = InMemoryDb::open().unwrap();
        let df = df!(
            "driver" => &["X", "Y"],
            "constructor" => &["C1", "C2"],
            "season" => &[2020i64, 2020],
            "round" => &[1i64, 1],
            "position" => &[Some(3i64), None],
            "points" => &[15.0, 0.0],
        )
        .unwrap();

        let inserted = db.ingest_race_results(&df).unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(db.row_count().unwrap(), 2);

        let rows = db.driver_results(&["Y".to_string()]).unwrap();
        assert_eq!(rows[0].position, None);
    }

    #[test]
    fn test_ingest_rejects_missing_column() {
        let db = InMemoryDb::open().unwrap();
        let df = df!(
            "driver" => &["X"],
            "season" => &[2020i64],
        )
        .unwrap();

        let err = db.ingest_race_results(&df).unwrap_err();
        assert!(err.to_string().contains("constructor"));
    }

    #[test]
    fn test_ingest_accepts_integer_points() {
        let db = InMemoryDb::open().unwrap();
        // CSV inference yields Int64 when every points value is integral
        let df = df!(
            "driver" => &["X"],
            "constructor" => &["C"],
            "season" => &[2020i64],
            "round" => &[1i64],
            "position" => &[Some(1i64)],
            "points" => &[25i64],
        )
        .unwrap();

        db.ingest_race_results(&df).unwrap();
        assert_eq!(db.row_count().unwrap(), 1);
    }

    #[test]
    fn test_load_tables_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race_result.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "driver,constructor,season,round,position,points").unwrap();
        writeln!(file, "Hamilton,Mercedes,2020,1,1,25.0").unwrap();
        writeln!(file, "Albon,Red Bull,2020,1,,0.0").unwrap();

        let db = InMemoryDb::open().unwrap();
        let mut tables = HashMap::new();
        tables.insert(
            RACE_RESULT_TABLE.to_string(),
            path.to_string_lossy().to_string(),
        );
        db.load_tables(&tables).unwrap();

        assert_eq!(db.row_count().unwrap(), 2);
        let rows = db.driver_results(&["Albon".to_string()]).unwrap();
        assert_eq!(rows[0].position, None);
    }

    #[test]
    fn test_load_tables_creates_auxiliary_table() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("race_result.csv");
        let mut file = std::fs::File::create(&results).unwrap();
        writeln!(file, "driver,constructor,season,round,position,points").unwrap();
        writeln!(file, "Hamilton,Mercedes,2020,1,1,25.0").unwrap();

        let qualifying = dir.path().join("qualifying.csv");
        let mut file = std::fs::File::create(&qualifying).unwrap();
        writeln!(file, "driver,season,round,q1_sec").unwrap();
        writeln!(file, "Hamilton,2020,1,70.5").unwrap();

        let db = InMemoryDb::open().unwrap();
        let mut tables = HashMap::new();
        tables.insert(
            RACE_RESULT_TABLE.to_string(),
            results.to_string_lossy().to_string(),
        );
        tables.insert(
            "qualifying".to_string(),
            qualifying.to_string_lossy().to_string(),
        );
        db.load_tables(&tables).unwrap();

        let conn = db.conn().unwrap();
        let q1: f64 = conn
            .query_row("SELECT q1_sec FROM qualifying", [], |row| row.get(0))
            .unwrap();
        assert_eq!(q1, 70.5);
    }
}
