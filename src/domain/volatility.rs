use crate::domain::error::VoltraderError;
use crate::domain::indicator::Decay;
use crate::domain::indicator::stddev::ewm_std;

/// Exponentially weighted rolling standard deviation.
///
/// Applied to price differences for forecast normalization and to
/// percentage returns for position sizing. Never fails on NaN or zero input;
/// periods without enough history come back as NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityEstimator {
    span: usize,
    min_periods: usize,
}

impl VolatilityEstimator {
    pub const DEFAULT_SPAN: usize = 35;
    pub const DEFAULT_MIN_PERIODS: usize = 10;

    pub fn new(span: usize, min_periods: usize) -> Result<Self, VoltraderError> {
        if span == 0 {
            return Err(VoltraderError::invalid(
                "strategy",
                "vol_span",
                "vol_span must be at least 1",
            ));
        }
        if min_periods == 0 {
            return Err(VoltraderError::invalid(
                "strategy",
                "vol_min_periods",
                "vol_min_periods must be at least 1",
            ));
        }
        Ok(Self { span, min_periods })
    }

    pub fn span(&self) -> usize {
        self.span
    }

    pub fn min_periods(&self) -> usize {
        self.min_periods
    }

    pub fn estimate(&self, series: &[f64]) -> Vec<f64> {
        ewm_std(series, Decay::Span(self.span as f64), self.min_periods)
    }
}

impl Default for VolatilityEstimator {
    fn default() -> Self {
        Self {
            span: Self::DEFAULT_SPAN,
            min_periods: Self::DEFAULT_MIN_PERIODS,
        }
    }
}
