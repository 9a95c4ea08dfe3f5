//! Seeded synthetic price store.
//!
//! Generates a deterministic close series for one symbol so the pipeline can
//! be exercised without market data. Two models:
//!
//! - geometric Brownian motion: `S0 * exp((mu - sigma^2/2) t + sigma W_t)`
//! - a triangular trend of period `cycle` and height `amplitude`, plus
//!   Gaussian noise of `sigma * amplitude`, exponentiated to stay positive.

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::domain::costs::FundingPoint;
use crate::domain::error::VoltraderError;
use crate::domain::price_series::{Frequency, PricePoint};
use crate::ports::data_port::{FundingRateSource, PriceStore};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyntheticModel {
    Gbm {
        initial_price: f64,
        /// Annual drift.
        mu: f64,
        /// Annual volatility.
        sigma: f64,
        periods_per_year: f64,
    },
    Trend {
        initial_price: f64,
        cycle: usize,
        amplitude: f64,
        sigma: f64,
    },
}

impl Default for SyntheticModel {
    fn default() -> Self {
        SyntheticModel::Gbm {
            initial_price: 100.0,
            mu: 0.1,
            sigma: 0.2,
            periods_per_year: 365.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticAdapter {
    symbol: String,
    model: SyntheticModel,
    seed: u64,
    periods: usize,
    start: NaiveDateTime,
    frequency: Frequency,
    funding_rate: f64,
}

impl SyntheticAdapter {
    pub fn new(
        symbol: &str,
        model: SyntheticModel,
        seed: u64,
        periods: usize,
        start: NaiveDateTime,
        frequency: Frequency,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            model,
            seed,
            periods,
            start,
            frequency,
            funding_rate: 0.0,
        }
    }

    /// Emit a constant funding rate once per period.
    pub fn with_funding_rate(mut self, rate: f64) -> Self {
        self.funding_rate = rate;
        self
    }

    fn timestamp(&self, i: usize) -> NaiveDateTime {
        self.start + chrono::Duration::seconds(self.frequency.seconds() * i as i64)
    }

    pub fn generate(&self) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        match self.model {
            SyntheticModel::Gbm {
                initial_price,
                mu,
                sigma,
                periods_per_year,
            } => {
                let dt = 1.0 / periods_per_year;
                let drift = (mu - 0.5 * sigma * sigma) * dt;
                let mut log_price = initial_price.ln();
                (0..self.periods)
                    .map(|i| {
                        if i > 0 {
                            let shock: f64 = rng.sample(StandardNormal);
                            log_price += drift + sigma * dt.sqrt() * shock;
                        }
                        log_price.exp()
                    })
                    .collect()
            }
            SyntheticModel::Trend {
                initial_price,
                cycle,
                amplitude,
                sigma,
            } => {
                let cycle = cycle.max(1);
                let step = amplitude / cycle as f64;
                let half = amplitude * 0.5;
                (0..self.periods)
                    .map(|i| {
                        let phase = i % (2 * cycle);
                        let trend = if phase < cycle {
                            -half + step * phase as f64
                        } else {
                            half - step * (phase - cycle) as f64
                        };
                        let shock: f64 = rng.sample(StandardNormal);
                        let noise = shock * sigma * amplitude;
                        initial_price * (trend + noise).exp()
                    })
                    .collect()
            }
        }
    }
}

impl PriceStore for SyntheticAdapter {
    fn fetch_raw(&self, symbol: &str) -> Result<Vec<PricePoint>, VoltraderError> {
        if symbol != self.symbol {
            return Err(VoltraderError::NoData {
                symbol: symbol.to_string(),
                frequency: self.frequency.to_string(),
            });
        }
        Ok(self
            .generate()
            .into_iter()
            .enumerate()
            .map(|(i, close)| PricePoint::new(self.timestamp(i), close))
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, VoltraderError> {
        Ok(vec![self.symbol.clone()])
    }
}

impl FundingRateSource for SyntheticAdapter {
    fn fetch_funding_series(&self, symbol: &str) -> Result<Vec<FundingPoint>, VoltraderError> {
        if symbol != self.symbol || self.funding_rate == 0.0 {
            return Ok(Vec::new());
        }
        Ok((0..self.periods)
            .map(|i| FundingPoint {
                timestamp: self.timestamp(i),
                rate: self.funding_rate,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn gbm(seed: u64) -> SyntheticAdapter {
        SyntheticAdapter::new(
            "SYNTH",
            SyntheticModel::default(),
            seed,
            500,
            start(),
            Frequency::DAILY,
        )
    }

    #[test]
    fn same_seed_same_prices() {
        assert_eq!(gbm(7).generate(), gbm(7).generate());
        assert_ne!(gbm(7).generate(), gbm(8).generate());
    }

    #[test]
    fn gbm_prices_are_positive_and_start_at_initial() {
        let prices = gbm(1).generate();
        assert_eq!(prices.len(), 500);
        assert!((prices[0] - 100.0).abs() < 1e-9);
        assert!(prices.iter().all(|p| *p > 0.0 && p.is_finite()));
    }

    #[test]
    fn gbm_log_returns_have_model_volatility() {
        let adapter = SyntheticAdapter::new(
            "SYNTH",
            SyntheticModel::default(),
            21,
            5_000,
            start(),
            Frequency::DAILY,
        );
        let prices = adapter.generate();
        let log_returns: Vec<f64> = prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
        let n = log_returns.len() as f64;
        let mean = log_returns.iter().sum::<f64>() / n;
        let var = log_returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let expected = 0.2 / 365.0_f64.sqrt();
        assert!((var.sqrt() / expected - 1.0).abs() < 0.05, "{}", var.sqrt());
    }

    #[test]
    fn trend_model_is_positive() {
        let adapter = SyntheticAdapter::new(
            "SYNTH",
            SyntheticModel::Trend {
                initial_price: 50.0,
                cycle: 50,
                amplitude: 1.0,
                sigma: 0.2,
            },
            3,
            365,
            start(),
            Frequency::DAILY,
        );
        let prices = adapter.generate();
        assert_eq!(prices.len(), 365);
        assert!(prices.iter().all(|p| *p > 0.0));
    }

    #[test]
    fn fetch_raw_spaces_points_by_frequency() {
        let adapter = SyntheticAdapter::new(
            "SYNTH",
            SyntheticModel::default(),
            1,
            3,
            start(),
            "4H".parse().unwrap(),
        );
        let points = adapter.fetch_raw("SYNTH").unwrap();
        assert_eq!(points[1].timestamp - points[0].timestamp, chrono::Duration::hours(4));
        assert!(matches!(
            adapter.fetch_raw("OTHER"),
            Err(VoltraderError::NoData { .. })
        ));
        assert_eq!(adapter.list_symbols().unwrap(), vec!["SYNTH"]);
    }

    #[test]
    fn funding_is_optional() {
        assert!(gbm(1).fetch_funding_series("SYNTH").unwrap().is_empty());
        let funded = gbm(1).with_funding_rate(0.0001);
        let funding = funded.fetch_funding_series("SYNTH").unwrap();
        assert_eq!(funding.len(), 500);
        assert_eq!(funding[0].rate, 0.0001);
    }
}
