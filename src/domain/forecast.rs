//! Forecast scaling.
//!
//! A raw rule output is first divided by the instrument's price-difference
//! volatility, then rescaled so its expanding median absolute value sits at
//! `target_avg_abs`, and finally clipped to `±cap`.
//!
//! The scaling factor is back-filled over the calibration warm-up, so early
//! periods use a factor computed from later data. This is non-causal and
//! biases any backtest that trades during calibration.

use crate::domain::error::VoltraderError;
use crate::domain::series;

/// Every intermediate stage of the scaling, aligned to the price index.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledForecast {
    pub vol_adjusted: Vec<f64>,
    pub scaling_factor: Vec<f64>,
    pub scaled: Vec<f64>,
    pub capped: Vec<f64>,
}

impl ScaledForecast {
    pub fn len(&self) -> usize {
        self.capped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capped.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastScaler {
    target_avg_abs: f64,
    cap: f64,
    min_calibration_periods: usize,
}

impl ForecastScaler {
    pub const DEFAULT_TARGET_AVG_ABS: f64 = 10.0;
    pub const DEFAULT_CAP: f64 = 20.0;

    pub fn new(
        target_avg_abs: f64,
        cap: f64,
        min_calibration_periods: usize,
    ) -> Result<Self, VoltraderError> {
        if !target_avg_abs.is_finite() || target_avg_abs <= 0.0 {
            return Err(VoltraderError::invalid(
                "strategy",
                "forecast_target",
                "forecast_target must be positive",
            ));
        }
        if !cap.is_finite() || cap <= 0.0 {
            return Err(VoltraderError::invalid(
                "strategy",
                "forecast_cap",
                "forecast_cap must be positive",
            ));
        }
        if min_calibration_periods == 0 {
            return Err(VoltraderError::invalid(
                "strategy",
                "min_calibration_periods",
                "min_calibration_periods must be at least 1",
            ));
        }
        Ok(Self {
            target_avg_abs,
            cap,
            min_calibration_periods,
        })
    }

    /// Default target and cap, calibrating over two years of periods.
    pub fn with_defaults(trading_days_per_year: u32) -> Result<Self, VoltraderError> {
        Self::new(
            Self::DEFAULT_TARGET_AVG_ABS,
            Self::DEFAULT_CAP,
            2 * trading_days_per_year as usize,
        )
    }

    pub fn target_avg_abs(&self) -> f64 {
        self.target_avg_abs
    }

    pub fn cap(&self) -> f64 {
        self.cap
    }

    pub fn min_calibration_periods(&self) -> usize {
        self.min_calibration_periods
    }

    /// `raw` and `instrument_vol` must be aligned to the same index.
    pub fn scale(&self, raw: &[f64], instrument_vol: &[f64]) -> ScaledForecast {
        debug_assert_eq!(raw.len(), instrument_vol.len());

        let vol_adjusted: Vec<f64> = raw
            .iter()
            .zip(instrument_vol)
            .map(|(&r, &v)| if v.is_nan() || v == 0.0 { f64::NAN } else { r / v })
            .collect();

        let abs_adjusted: Vec<f64> = vol_adjusted.iter().map(|v| v.abs()).collect();
        let base = series::expanding_median(&abs_adjusted, self.min_calibration_periods);
        let factor: Vec<f64> = base
            .iter()
            .map(|&b| {
                if b.is_nan() || b == 0.0 {
                    f64::NAN
                } else {
                    self.target_avg_abs / b
                }
            })
            .collect();
        let scaling_factor = series::bfill(&factor);

        let scaled: Vec<f64> = vol_adjusted
            .iter()
            .zip(&scaling_factor)
            .map(|(v, f)| v * f)
            .collect();
        let capped = series::clip(&scaled, -self.cap, self.cap);

        ScaledForecast {
            vol_adjusted,
            scaling_factor,
            scaled,
            capped,
        }
    }
}
