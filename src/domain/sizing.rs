//! Volatility-targeted position sizing.

use crate::domain::error::VoltraderError;
use crate::domain::series::{self, zero_safe_divide};

/// Account-level risk budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskBudget {
    pub trading_capital: f64,
    /// Target annualized volatility of the account, as a fraction (0.20 = 20%).
    pub annual_risk_target: f64,
}

impl RiskBudget {
    pub fn validate(&self) -> Result<(), VoltraderError> {
        if !self.trading_capital.is_finite() || self.trading_capital <= 0.0 {
            return Err(VoltraderError::invalid(
                "account",
                "trading_capital",
                "trading_capital must be positive",
            ));
        }
        if !self.annual_risk_target.is_finite() || self.annual_risk_target <= 0.0 {
            return Err(VoltraderError::invalid(
                "account",
                "annual_risk_target",
                "annual_risk_target must be positive",
            ));
        }
        Ok(())
    }

    pub fn daily_cash_risk(&self, trading_days_per_year: u32) -> f64 {
        self.trading_capital * self.annual_risk_target / (trading_days_per_year as f64).sqrt()
    }
}

impl Default for RiskBudget {
    fn default() -> Self {
        Self {
            trading_capital: 10_000.0,
            annual_risk_target: 0.20,
        }
    }
}

/// Converts a capped forecast into an ideal contract count per period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSizer {
    daily_cash_risk: f64,
    contract_unit: f64,
    target_avg_abs: f64,
}

impl PositionSizer {
    pub fn new(
        budget: RiskBudget,
        contract_unit: f64,
        trading_days_per_year: u32,
        target_avg_abs: f64,
    ) -> Result<Self, VoltraderError> {
        budget.validate()?;
        if trading_days_per_year == 0 {
            return Err(VoltraderError::invalid(
                "instrument",
                "trading_days_per_year",
                "trading_days_per_year must be at least 1",
            ));
        }
        Ok(Self {
            daily_cash_risk: budget.daily_cash_risk(trading_days_per_year),
            contract_unit,
            target_avg_abs,
        })
    }

    pub fn daily_cash_risk(&self) -> f64 {
        self.daily_cash_risk
    }

    /// Cash risk of holding one contract for one period.
    pub fn daily_contract_risk(&self, close: f64, perc_vol: f64) -> f64 {
        close * self.contract_unit * perc_vol
    }

    /// Contracts needed to carry the full daily cash risk target.
    pub fn contracts_needed(&self, closes: &[f64], perc_vol: &[f64]) -> Vec<f64> {
        closes
            .iter()
            .zip(perc_vol)
            .map(|(&c, &v)| zero_safe_divide(self.daily_cash_risk, self.daily_contract_risk(c, v)))
            .collect()
    }

    /// Ideal continuous position; undefined inputs collapse to a flat position.
    pub fn ideal_positions(&self, closes: &[f64], perc_vol: &[f64], forecast: &[f64]) -> Vec<f64> {
        let ideal: Vec<f64> = self
            .contracts_needed(closes, perc_vol)
            .iter()
            .zip(forecast)
            .map(|(n, f)| n * f / self.target_avg_abs)
            .collect();
        series::fill_nan(&ideal, 0.0)
    }

    /// Position size at an average forecast. Periods with zero or undefined
    /// risk are gaps and take the previous defined size.
    pub fn average_position(&self, closes: &[f64], perc_vol: &[f64]) -> Vec<f64> {
        let avg: Vec<f64> = closes
            .iter()
            .zip(perc_vol)
            .map(|(&c, &v)| {
                let unit_risk = self.daily_contract_risk(c, v);
                if unit_risk.is_nan() || unit_risk == 0.0 {
                    f64::NAN
                } else {
                    self.daily_cash_risk / unit_risk
                }
            })
            .collect();
        series::ffill(&avg)
    }
}
