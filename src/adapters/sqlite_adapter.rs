//! SQLite adapter: closing prices and prediction sets in one database.

use crate::domain::error::PredtrackError;
use crate::domain::prediction::PredictionSet;
use crate::ports::price_port::{PricePort, Quote};
use crate::ports::store_port::PredictionStore;
use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: r2d2::Error) -> PredtrackError {
    PredtrackError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> PredtrackError {
    PredtrackError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, PredtrackError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| PredtrackError::Database {
        reason: format!("invalid date '{}': {}", s, e),
    })
}

impl SqliteAdapter {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PredtrackError> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(4).build(manager).map_err(db_err)?;
        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, PredtrackError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;
        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), PredtrackError> {
        let conn = self.pool.get().map_err(db_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS closes (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                close REAL NOT NULL,
                PRIMARY KEY (symbol, date)
            );
            CREATE TABLE IF NOT EXISTS prediction_sets (
                date TEXT PRIMARY KEY,
                payload TEXT NOT NULL
            );",
        )
        .map_err(query_err)?;

        Ok(())
    }

    pub fn insert_closes(&self, symbol: &str, closes: &[(NaiveDate, f64)]) -> Result<(), PredtrackError> {
        let mut conn = self.pool.get().map_err(db_err)?;
        let tx = conn.transaction().map_err(query_err)?;

        for (date, close) in closes {
            tx.execute(
                "INSERT OR REPLACE INTO closes (symbol, date, close) VALUES (?1, ?2, ?3)",
                params![symbol, date.format("%Y-%m-%d").to_string(), close],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(())
    }
}

impl PricePort for SqliteAdapter {
    fn close(&self, symbol: &str, date: NaiveDate) -> Result<Quote, PredtrackError> {
        let conn = self.pool.get().map_err(db_err)?;
        let date_str = date.format("%Y-%m-%d").to_string();

        let close: Option<f64> = conn
            .query_row(
                "SELECT close FROM closes WHERE symbol = ?1 AND date = ?2",
                params![symbol, date_str],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err)?;
        if let Some(close) = close {
            return Ok(Quote::Close(close));
        }

        let latest: Option<String> = conn
            .query_row(
                "SELECT MAX(date) FROM closes WHERE symbol = ?1",
                params![symbol],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        match latest {
            Some(latest) if date_str > latest => Ok(Quote::NotYetAvailable),
            Some(_) => Ok(Quote::Unavailable),
            None => Ok(Quote::Unavailable),
        }
    }
}

impl PredictionStore for SqliteAdapter {
    fn get(&self, date: NaiveDate) -> Result<Option<PredictionSet>, PredtrackError> {
        let conn = self.pool.get().map_err(db_err)?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM prediction_sets WHERE date = ?1",
                params![date.format("%Y-%m-%d").to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err)?;

        payload
            .map(|p| {
                serde_json::from_str(&p).map_err(|e| PredtrackError::Database {
                    reason: format!("corrupt prediction set for {}: {}", date, e),
                })
            })
            .transpose()
    }

    fn put(&mut self, set: &PredictionSet) -> Result<(), PredtrackError> {
        let payload = serde_json::to_string(set).map_err(|e| PredtrackError::Store {
            reason: e.to_string(),
        })?;
        let conn = self.pool.get().map_err(db_err)?;
        conn.execute(
            "INSERT OR REPLACE INTO prediction_sets (date, payload) VALUES (?1, ?2)",
            params![set.reference_date.format("%Y-%m-%d").to_string(), payload],
        )
        .map_err(query_err)?;
        Ok(())
    }

    fn all_dates(&self) -> Result<Vec<NaiveDate>, PredtrackError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare("SELECT date FROM prediction_sets ORDER BY date ASC")
            .map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(query_err)?;

        let mut dates = Vec::new();
        for row in rows {
            dates.push(parse_date(&row.map_err(query_err)?)?);
        }
        Ok(dates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prediction::{Direction, Horizon, PredictionRecord, PriceTarget};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn adapter() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        adapter
    }

    #[test]
    fn in_memory_initialization() {
        adapter();
    }

    #[test]
    fn close_lookup() {
        let adapter = adapter();
        adapter
            .insert_closes("2330", &[(d(2025, 10, 13), 590.0), (d(2025, 10, 15), 605.0)])
            .unwrap();

        assert_eq!(adapter.close("2330", d(2025, 10, 15)).unwrap(), Quote::Close(605.0));
        assert_eq!(adapter.close("2330", d(2025, 10, 14)).unwrap(), Quote::Unavailable);
        assert_eq!(
            adapter.close("2330", d(2025, 10, 16)).unwrap(),
            Quote::NotYetAvailable
        );
        assert_eq!(adapter.close("2303", d(2025, 10, 15)).unwrap(), Quote::Unavailable);
    }

    #[test]
    fn insert_closes_replaces_existing() {
        let adapter = adapter();
        adapter.insert_closes("2330", &[(d(2025, 10, 15), 600.0)]).unwrap();
        adapter.insert_closes("2330", &[(d(2025, 10, 15), 605.0)]).unwrap();
        assert_eq!(adapter.close("2330", d(2025, 10, 15)).unwrap(), Quote::Close(605.0));
    }

    #[test]
    fn prediction_sets_round_trip() {
        let mut adapter = adapter();
        let record = PredictionRecord::new("2330", "台積電", d(2025, 10, 14), Direction::Up)
            .with_target(PriceTarget::new(600.0, 610.0).unwrap())
            .with_prev_close(590.0);
        let set = adapter.upsert(d(2025, 10, 14), vec![record]).unwrap();
        adapter.upsert(d(2025, 10, 13), vec![]).unwrap();

        let loaded = adapter.get(d(2025, 10, 14)).unwrap().unwrap();
        assert_eq!(loaded, set);
        assert_eq!(loaded.summary[&Horizon::T1].total, 1);
        assert_eq!(adapter.all_dates().unwrap(), vec![d(2025, 10, 13), d(2025, 10, 14)]);
        assert!(adapter.get(d(2025, 10, 1)).unwrap().is_none());
    }

    #[test]
    fn corrupt_payload_is_an_error() {
        let adapter = adapter();
        let conn = adapter.pool.get().unwrap();
        conn.execute(
            "INSERT INTO prediction_sets (date, payload) VALUES ('2025-10-14', 'not json')",
            [],
        )
        .unwrap();
        drop(conn);
        assert!(matches!(
            adapter.get(d(2025, 10, 14)),
            Err(PredtrackError::Database { .. })
        ));
    }
}
