//! Traded instrument: identity, contract specification and its price history.

use crate::domain::error::VoltraderError;
use crate::domain::price_series::PriceSeries;
use crate::domain::series;

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSpec {
    pub symbol: String,
    /// Notional multiplier per contract.
    pub contract_unit: f64,
    /// Annualisation constant (365 for crypto, 256 or 252 for futures/equities).
    pub trading_days_per_year: u32,
}

impl InstrumentSpec {
    pub fn validate(&self) -> Result<(), VoltraderError> {
        if self.symbol.trim().is_empty() {
            return Err(VoltraderError::ConfigMissing {
                section: "instrument".into(),
                key: "symbol".into(),
            });
        }
        if !self.contract_unit.is_finite() || self.contract_unit <= 0.0 {
            return Err(VoltraderError::invalid(
                "instrument",
                "contract_unit",
                "contract_unit must be positive",
            ));
        }
        if self.trading_days_per_year == 0 {
            return Err(VoltraderError::invalid(
                "instrument",
                "trading_days_per_year",
                "trading_days_per_year must be at least 1",
            ));
        }
        Ok(())
    }
}

/// An instrument owns its price series; the series is immutable once fetched.
#[derive(Debug, Clone)]
pub struct Instrument {
    spec: InstrumentSpec,
    prices: PriceSeries,
}

impl Instrument {
    pub fn new(spec: InstrumentSpec, prices: PriceSeries) -> Result<Self, VoltraderError> {
        spec.validate()?;
        Ok(Self { spec, prices })
    }

    pub fn symbol(&self) -> &str {
        &self.spec.symbol
    }

    pub fn contract_unit(&self) -> f64 {
        self.spec.contract_unit
    }

    pub fn trading_days_per_year(&self) -> u32 {
        self.spec.trading_days_per_year
    }

    pub fn spec(&self) -> &InstrumentSpec {
        &self.spec
    }

    pub fn prices(&self) -> &PriceSeries {
        &self.prices
    }

    pub fn closes(&self) -> &[f64] {
        self.prices.closes()
    }

    /// Price change per period (undefined in the first period).
    pub fn raw_returns(&self) -> Vec<f64> {
        series::diff(self.closes())
    }

    /// Fractional return per period (undefined in the first period).
    pub fn perc_returns(&self) -> Vec<f64> {
        series::pct_change(self.closes())
    }
}
