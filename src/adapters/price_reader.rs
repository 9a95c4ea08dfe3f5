//! Turns raw store rows into a validated fixed-frequency `PriceSeries`.

use chrono::NaiveDateTime;

use crate::domain::costs::FundingPoint;
use crate::domain::error::VoltraderError;
use crate::domain::price_series::{Frequency, PriceSeries, Resampled, resample_last};
use crate::ports::data_port::{FundingRateSource, PriceSeriesSource, PriceStore};

/// Wraps any [`PriceStore`], resampling to the requested frequency with the
/// last close per bucket, forward-filling empty buckets, and validating the
/// result.
pub struct PriceReader<S> {
    store: S,
    as_of: Option<NaiveDateTime>,
}

impl<S: PriceStore> PriceReader<S> {
    pub fn new(store: S) -> Self {
        Self { store, as_of: None }
    }

    /// Pin "now" for the future-dated check instead of the wall clock.
    pub fn as_of(mut self, now: NaiveDateTime) -> Self {
        self.as_of = Some(now);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: PriceStore> PriceSeriesSource for PriceReader<S> {
    fn fetch_price_series(
        &self,
        symbol: &str,
        frequency: Frequency,
    ) -> Result<PriceSeries, VoltraderError> {
        let raw = self.store.fetch_raw(symbol)?;
        if raw.is_empty() {
            return Err(VoltraderError::NoData {
                symbol: symbol.to_string(),
                frequency: frequency.to_string(),
            });
        }

        let Resampled {
            points: mut resampled,
            filled,
        } = resample_last(&raw, frequency);
        let leading_gaps = resampled
            .iter()
            .take_while(|p| p.close.is_nan())
            .count();
        if leading_gaps > 0 {
            tracing::warn!(
                symbol,
                dropped = leading_gaps,
                "dropping leading periods without a price"
            );
            resampled.drain(..leading_gaps);
        }
        if resampled.is_empty() {
            return Err(VoltraderError::NoData {
                symbol: symbol.to_string(),
                frequency: frequency.to_string(),
            });
        }

        if filled > 0 {
            tracing::warn!(symbol, filled, %frequency, "forward-filled empty periods");
        }
        tracing::info!(
            symbol,
            raw_rows = raw.len(),
            periods = resampled.len(),
            %frequency,
            "price series loaded"
        );

        match self.as_of {
            Some(now) => PriceSeries::new_as_of(symbol, frequency, resampled, now),
            None => PriceSeries::new(symbol, frequency, resampled),
        }
    }
}

impl<S: PriceStore + FundingRateSource> FundingRateSource for PriceReader<S> {
    fn fetch_funding_series(&self, symbol: &str) -> Result<Vec<FundingPoint>, VoltraderError> {
        self.store.fetch_funding_series(symbol)
    }
}
