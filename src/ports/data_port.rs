//! Data access port traits.

use crate::domain::costs::FundingPoint;
use crate::domain::error::VoltraderError;
use crate::domain::price_series::{Frequency, PricePoint, PriceSeries};

/// Raw, unvalidated storage of close prices.
pub trait PriceStore {
    /// Every stored row for `symbol`, in storage order.
    fn fetch_raw(&self, symbol: &str) -> Result<Vec<PricePoint>, VoltraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, VoltraderError>;
}

/// A validated, fixed-frequency price history.
pub trait PriceSeriesSource {
    fn fetch_price_series(
        &self,
        symbol: &str,
        frequency: Frequency,
    ) -> Result<PriceSeries, VoltraderError>;
}

/// Funding-rate observations, unaligned. The backtest aligns them to the
/// price index.
pub trait FundingRateSource {
    fn fetch_funding_series(&self, symbol: &str) -> Result<Vec<FundingPoint>, VoltraderError>;
}
