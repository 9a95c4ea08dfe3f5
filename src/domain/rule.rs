//! Trading rules: price series in, raw (unscaled) forecast out.

use std::fmt;

use crate::domain::error::VoltraderError;
use crate::domain::indicator::Decay;
use crate::domain::indicator::ema::ewm_mean;

/// A rule produces one raw forecast value per input price, undefined (NaN)
/// until its lookback is satisfied.
pub trait TradingRule {
    fn name(&self) -> String;

    fn raw_forecast(&self, prices: &[f64]) -> Vec<f64>;
}

/// Exponential moving-average crossover: EMA(fast) - EMA(slow).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emac {
    fast_span: usize,
    slow_span: usize,
}

impl Emac {
    pub const DEFAULT_FAST_SPAN: usize = 8;

    /// `slow_span` defaults to 4x `fast_span`.
    pub fn new(fast_span: usize, slow_span: Option<usize>) -> Result<Self, VoltraderError> {
        let slow_span = slow_span.unwrap_or(fast_span * 4);
        if fast_span == 0 {
            return Err(VoltraderError::invalid(
                "strategy",
                "fast_span",
                "fast_span must be at least 1",
            ));
        }
        if slow_span <= fast_span {
            return Err(VoltraderError::invalid(
                "strategy",
                "slow_span",
                "slow_span must be greater than fast_span",
            ));
        }
        Ok(Self {
            fast_span,
            slow_span,
        })
    }

    pub fn fast_span(&self) -> usize {
        self.fast_span
    }

    pub fn slow_span(&self) -> usize {
        self.slow_span
    }
}

impl Default for Emac {
    fn default() -> Self {
        Self {
            fast_span: Self::DEFAULT_FAST_SPAN,
            slow_span: Self::DEFAULT_FAST_SPAN * 4,
        }
    }
}

impl TradingRule for Emac {
    fn name(&self) -> String {
        format!("EMAC({},{})", self.fast_span, self.slow_span)
    }

    fn raw_forecast(&self, prices: &[f64]) -> Vec<f64> {
        let fast = ewm_mean(prices, Decay::Span(self.fast_span as f64), self.fast_span);
        let slow = ewm_mean(prices, Decay::Span(self.slow_span as f64), self.slow_span);
        fast.iter().zip(&slow).map(|(f, s)| f - s).collect()
    }
}

/// Configured rule variant, resolved into a [`TradingRule`] by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSpec {
    Emac { fast_span: usize, slow_span: usize },
}

impl RuleSpec {
    pub fn build(&self) -> Result<Box<dyn TradingRule>, VoltraderError> {
        match *self {
            RuleSpec::Emac {
                fast_span,
                slow_span,
            } => Ok(Box::new(Emac::new(fast_span, Some(slow_span))?)),
        }
    }
}

impl Default for RuleSpec {
    fn default() -> Self {
        let emac = Emac::default();
        RuleSpec::Emac {
            fast_span: emac.fast_span,
            slow_span: emac.slow_span,
        }
    }
}

impl fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleSpec::Emac {
                fast_span,
                slow_span,
            } => write!(f, "EMAC({},{})", fast_span, slow_span),
        }
    }
}
