#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use voltrader::domain::backtest::BacktestConfig;
use voltrader::domain::costs::FundingPoint;
use voltrader::domain::error::VoltraderError;
use voltrader::domain::instrument::Instrument;
pub use voltrader::domain::price_series::PricePoint;
use voltrader::domain::price_series::{Frequency, PriceSeries};
use voltrader::ports::data_port::{FundingRateSource, PriceStore};

pub struct MockStore {
    pub prices: HashMap<String, Vec<PricePoint>>,
    pub funding: HashMap<String, Vec<FundingPoint>>,
    pub errors: HashMap<String, String>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            funding: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_prices(mut self, symbol: &str, points: Vec<PricePoint>) -> Self {
        self.prices.insert(symbol.to_string(), points);
        self
    }

    pub fn with_funding(mut self, symbol: &str, points: Vec<FundingPoint>) -> Self {
        self.funding.insert(symbol.to_string(), points);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl PriceStore for MockStore {
    fn fetch_raw(&self, symbol: &str) -> Result<Vec<PricePoint>, VoltraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(VoltraderError::Source {
                reason: reason.clone(),
            });
        }
        Ok(self.prices.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, VoltraderError> {
        let mut symbols: Vec<String> = self.prices.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

impl FundingRateSource for MockStore {
    fn fetch_funding_series(&self, symbol: &str) -> Result<Vec<FundingPoint>, VoltraderError> {
        Ok(self.funding.get(symbol).cloned().unwrap_or_default())
    }
}

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn day(i: usize) -> NaiveDateTime {
    start() + chrono::Duration::days(i as i64)
}

/// Pinned "now" well after every fixture.
pub fn as_of() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2030, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_points(closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PricePoint::new(day(i), c))
        .collect()
}

pub fn make_instrument(symbol: &str, closes: &[f64]) -> Instrument {
    let prices =
        PriceSeries::new_as_of(symbol, Frequency::DAILY, make_points(closes), as_of()).unwrap();
    let config = sample_config(symbol);
    Instrument::new(config.instrument, prices).unwrap()
}

/// Flat for `flat` periods, then a linear rise of `slope` per period.
pub fn flat_then_rising(flat: usize, rising: usize, level: f64, slope: f64) -> Vec<f64> {
    (0..flat + rising)
        .map(|i| {
            if i < flat {
                level
            } else {
                level + slope * (i - flat + 1) as f64
            }
        })
        .collect()
}

/// A noisy oscillation with drift; produces trades in both directions.
pub fn wavy_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 + 0.05 * t + 8.0 * (t / 25.0).sin() + 1.5 * (t * 1.7).cos()
        })
        .collect()
}

pub fn sample_config(symbol: &str) -> BacktestConfig {
    let mut config = BacktestConfig {
        min_calibration_periods: Some(30),
        ..BacktestConfig::default()
    };
    config.instrument.symbol = symbol.to_string();
    config
}

pub fn daily_funding(n: usize, rate: f64) -> Vec<FundingPoint> {
    (0..n)
        .map(|i| FundingPoint {
            timestamp: day(i),
            rate,
        })
        .collect()
}
