//! CSV file store for prices and funding rates.
//!
//! Prices live in `{base}/{symbol}.csv` with a `timestamp` (or `date`/`time`)
//! column and a `close` (or `price`) column. Funding rates live in
//! `{base}/{symbol}_funding.csv` with `timestamp` and `funding_rate` (or
//! `rate`) columns.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

use crate::domain::costs::FundingPoint;
use crate::domain::error::VoltraderError;
use crate::domain::price_series::PricePoint;
use crate::ports::data_port::{FundingRateSource, PriceStore};

const FUNDING_SUFFIX: &str = "_funding";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn price_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn funding_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}{}.csv", symbol, FUNDING_SUFFIX))
    }

    /// Parse `(timestamp, value)` rows, locating columns by header name.
    fn read_pairs(
        &self,
        path: &PathBuf,
        time_columns: &[&str],
        value_columns: &[&str],
    ) -> Result<Vec<(NaiveDateTime, f64)>, VoltraderError> {
        let content = fs::read_to_string(path).map_err(|e| VoltraderError::Source {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| VoltraderError::Source {
                reason: format!("CSV header error in {}: {}", path.display(), e),
            })?
            .clone();
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.contains(&h.trim().to_ascii_lowercase().as_str()))
        };
        let time_idx = find(time_columns).ok_or_else(|| VoltraderError::Source {
            reason: format!("missing {} column in {}", time_columns[0], path.display()),
        })?;
        let value_idx = find(value_columns).ok_or_else(|| VoltraderError::Source {
            reason: format!("missing {} column in {}", value_columns[0], path.display()),
        })?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| VoltraderError::Source {
                reason: format!("CSV parse error: {}", e),
            })?;

            let ts_str = record.get(time_idx).unwrap_or_default();
            let timestamp = parse_timestamp(ts_str).ok_or_else(|| VoltraderError::Source {
                reason: format!("invalid timestamp '{}'", ts_str),
            })?;

            let value_str = record.get(value_idx).unwrap_or_default().trim();
            // Empty cells are gaps; resampling forward-fills them.
            let value = if value_str.is_empty() {
                f64::NAN
            } else {
                value_str.parse().map_err(|e| VoltraderError::Source {
                    reason: format!("invalid value '{}': {}", value_str, e),
                })?
            };
            rows.push((timestamp, value));
        }
        Ok(rows)
    }
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, RFC 3339, or Unix epoch
/// seconds/milliseconds.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(epoch) = s.parse::<i64>() {
        // Anything past 10^11 cannot be seconds in a sane range.
        let dt = if epoch.abs() >= 100_000_000_000 {
            DateTime::from_timestamp_millis(epoch)
        } else {
            DateTime::from_timestamp(epoch, 0)
        };
        return dt.map(|d| d.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl PriceStore for CsvAdapter {
    fn fetch_raw(&self, symbol: &str) -> Result<Vec<PricePoint>, VoltraderError> {
        let path = self.price_path(symbol);
        if !path.exists() {
            return Err(VoltraderError::NoData {
                symbol: symbol.to_string(),
                frequency: "raw".to_string(),
            });
        }
        let rows = self.read_pairs(&path, &["timestamp", "date", "time"], &["close", "price"])?;
        tracing::debug!(symbol, rows = rows.len(), path = %path.display(), "read price csv");
        Ok(rows
            .into_iter()
            .map(|(timestamp, close)| PricePoint::new(timestamp, close))
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, VoltraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| VoltraderError::Source {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| VoltraderError::Source {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(stem) = name_str.strip_suffix(".csv") {
                if !stem.ends_with(FUNDING_SUFFIX) {
                    symbols.push(stem.to_string());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

impl FundingRateSource for CsvAdapter {
    /// A missing funding file means no funding was paid.
    fn fetch_funding_series(&self, symbol: &str) -> Result<Vec<FundingPoint>, VoltraderError> {
        let path = self.funding_path(symbol);
        if !path.exists() {
            tracing::info!(symbol, "no funding file, assuming zero funding");
            return Ok(Vec::new());
        }
        let rows = self.read_pairs(
            &path,
            &["timestamp", "date", "time"],
            &["funding_rate", "fundingrate", "rate"],
        )?;
        Ok(rows
            .into_iter()
            .map(|(timestamp, rate)| FundingPoint { timestamp, rate })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        fs::write(
            path.join("BTCUSDT.csv"),
            "timestamp,close\n\
             2024-01-15,42000.5\n\
             2024-01-16 00:00:00,42500.0\n\
             2024-01-17,\n",
        )
        .unwrap();
        fs::write(
            path.join("BTCUSDT_funding.csv"),
            "timestamp,funding_rate\n1705305600000,0.0001\n1705334400000,-0.00005\n",
        )
        .unwrap();
        fs::write(path.join("ETHUSDT.csv"), "date,open,close\n").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_raw_returns_rows() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let points = adapter.fetch_raw("BTCUSDT").unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].timestamp, parse_timestamp("2024-01-15").unwrap());
        assert_eq!(points[0].close, 42000.5);
        assert_eq!(points[1].close, 42500.0);
        assert!(points[2].close.is_nan());
    }

    #[test]
    fn close_column_found_by_name() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path.clone());
        fs::write(path.join("SOL.csv"), "date,open,close\n2024-01-01,1.0,2.0\n").unwrap();
        let points = adapter.fetch_raw("SOL").unwrap();
        assert_eq!(points[0].close, 2.0);
    }

    #[test]
    fn missing_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(matches!(
            adapter.fetch_raw("DOGE"),
            Err(VoltraderError::NoData { .. })
        ));
    }

    #[test]
    fn bad_value_is_source_error() {
        let (_dir, path) = setup_test_data();
        fs::write(path.join("BAD.csv"), "timestamp,close\n2024-01-01,abc\n").unwrap();
        let adapter = CsvAdapter::new(path);
        assert!(matches!(
            adapter.fetch_raw("BAD"),
            Err(VoltraderError::Source { .. })
        ));
    }

    #[test]
    fn list_symbols_skips_funding_files() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_symbols().unwrap(), vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn funding_series_parses_epoch_millis() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let funding = adapter.fetch_funding_series("BTCUSDT").unwrap();
        assert_eq!(funding.len(), 2);
        assert_eq!(
            funding[0].timestamp,
            parse_timestamp("2024-01-15 08:00:00").unwrap()
        );
        assert_eq!(funding[1].rate, -0.00005);
        assert!(adapter.fetch_funding_series("ETHUSDT").unwrap().is_empty());
    }

    #[test]
    fn parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-01 12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("1709296200"), Some(expected));
        assert_eq!(parse_timestamp("1709296200000"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
