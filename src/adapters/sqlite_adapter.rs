//! SQLite price and funding store.

use chrono::NaiveDateTime;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

use crate::domain::costs::FundingPoint;
use crate::domain::error::VoltraderError;
use crate::domain::price_series::PricePoint;
use crate::ports::data_port::{FundingRateSource, PriceStore};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_error(e: r2d2::Error) -> VoltraderError {
    VoltraderError::Source {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> VoltraderError {
    VoltraderError::SourceQuery {
        reason: e.to_string(),
    }
}

fn parse_stored_timestamp(value: String) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            value.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

impl SqliteAdapter {
    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32) -> Result<Self, VoltraderError> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(pool_error)?;
        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, VoltraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;
        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), VoltraderError> {
        let conn = self.pool.get().map_err(pool_error)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS prices (
                symbol TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                close REAL NOT NULL,
                PRIMARY KEY (symbol, timestamp)
            );
            CREATE TABLE IF NOT EXISTS funding_rates (
                symbol TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                rate REAL NOT NULL,
                PRIMARY KEY (symbol, timestamp)
            );",
        )
        .map_err(query_error)?;
        Ok(())
    }

    pub fn insert_prices(&self, symbol: &str, points: &[PricePoint]) -> Result<(), VoltraderError> {
        let mut conn = self.pool.get().map_err(pool_error)?;
        let tx = conn.transaction().map_err(query_error)?;
        for p in points {
            tx.execute(
                "INSERT OR REPLACE INTO prices (symbol, timestamp, close) VALUES (?1, ?2, ?3)",
                params![
                    symbol,
                    p.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    p.close
                ],
            )
            .map_err(query_error)?;
        }
        tx.commit().map_err(query_error)?;
        Ok(())
    }

    pub fn insert_funding(
        &self,
        symbol: &str,
        points: &[FundingPoint],
    ) -> Result<(), VoltraderError> {
        let mut conn = self.pool.get().map_err(pool_error)?;
        let tx = conn.transaction().map_err(query_error)?;
        for p in points {
            tx.execute(
                "INSERT OR REPLACE INTO funding_rates (symbol, timestamp, rate) VALUES (?1, ?2, ?3)",
                params![
                    symbol,
                    p.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    p.rate
                ],
            )
            .map_err(query_error)?;
        }
        tx.commit().map_err(query_error)?;
        Ok(())
    }
}

impl PriceStore for SqliteAdapter {
    fn fetch_raw(&self, symbol: &str) -> Result<Vec<PricePoint>, VoltraderError> {
        let conn = self.pool.get().map_err(pool_error)?;
        let mut stmt = conn
            .prepare(
                "SELECT timestamp, close FROM prices WHERE symbol = ?1 ORDER BY timestamp ASC",
            )
            .map_err(query_error)?;
        let rows = stmt
            .query_map(params![symbol], |row| {
                let timestamp = parse_stored_timestamp(row.get(0)?)?;
                Ok(PricePoint::new(timestamp, row.get(1)?))
            })
            .map_err(query_error)?;

        let mut points = Vec::new();
        for row in rows {
            points.push(row.map_err(query_error)?);
        }
        Ok(points)
    }

    fn list_symbols(&self) -> Result<Vec<String>, VoltraderError> {
        let conn = self.pool.get().map_err(pool_error)?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM prices ORDER BY symbol")
            .map_err(query_error)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_error)?;

        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(row.map_err(query_error)?);
        }
        Ok(symbols)
    }
}

impl FundingRateSource for SqliteAdapter {
    fn fetch_funding_series(&self, symbol: &str) -> Result<Vec<FundingPoint>, VoltraderError> {
        let conn = self.pool.get().map_err(pool_error)?;
        let mut stmt = conn
            .prepare(
                "SELECT timestamp, rate FROM funding_rates WHERE symbol = ?1 ORDER BY timestamp ASC",
            )
            .map_err(query_error)?;
        let rows = stmt
            .query_map(params![symbol], |row| {
                Ok(FundingPoint {
                    timestamp: parse_stored_timestamp(row.get(0)?)?,
                    rate: row.get(1)?,
                })
            })
            .map_err(query_error)?;

        let mut points = Vec::new();
        for row in rows {
            points.push(row.map_err(query_error)?);
        }
        Ok(points)
    }
}
