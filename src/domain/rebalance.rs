//! Threshold-gated rebalancing.
//!
//! The realized position only jumps to the ideal position when the relative
//! deviation `|ideal - realized| / |ideal|` exceeds the threshold. The first
//! period adopts the ideal position without trading.

use crate::domain::error::VoltraderError;
use crate::domain::series::zero_safe_divide;

/// A change of the realized position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    pub period: usize,
    /// Signed change in contracts.
    pub contract_diff: f64,
    /// +1 when the new position is long, -1 otherwise.
    pub direction: i8,
    pub previous_position: f64,
    pub new_position: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceOutcome {
    pub realized: Vec<f64>,
    pub trades: Vec<Trade>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rebalancer {
    threshold: f64,
    realized: Option<f64>,
    period: usize,
}

impl Rebalancer {
    pub const DEFAULT_THRESHOLD: f64 = 0.10;

    /// `threshold` is a fraction in `[0, 1]`.
    pub fn new(threshold: f64) -> Result<Self, VoltraderError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(VoltraderError::invalid(
                "strategy",
                "rebalance_threshold",
                "rebalance_threshold must be within [0, 1]",
            ));
        }
        Ok(Self {
            threshold,
            realized: None,
            period: 0,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Currently held position, `None` before the first step.
    pub fn realized_position(&self) -> Option<f64> {
        self.realized
    }

    /// Relative deviation of `previous` from `ideal`.
    pub fn deviation(ideal: f64, previous: f64) -> f64 {
        zero_safe_divide((ideal - previous).abs(), ideal.abs())
    }

    /// Feed the next period's ideal position. Undefined ideals count as flat.
    pub fn step(&mut self, ideal: f64) -> Option<Trade> {
        let ideal = if ideal.is_nan() { 0.0 } else { ideal };
        let period = self.period;
        self.period += 1;

        let Some(previous) = self.realized else {
            self.realized = Some(ideal);
            return None;
        };

        if Self::deviation(ideal, previous) > self.threshold {
            self.realized = Some(ideal);
            Some(Trade {
                period,
                contract_diff: ideal - previous,
                direction: if ideal > 0.0 { 1 } else { -1 },
                previous_position: previous,
                new_position: ideal,
            })
        } else {
            None
        }
    }

    /// Run a fresh state machine over a whole series.
    pub fn run(&self, ideal: &[f64]) -> RebalanceOutcome {
        let mut state = Self {
            threshold: self.threshold,
            realized: None,
            period: 0,
        };
        let mut realized = Vec::with_capacity(ideal.len());
        let mut trades = Vec::new();
        for &target in ideal {
            if let Some(trade) = state.step(target) {
                trades.push(trade);
            }
            realized.push(state.realized.unwrap_or(0.0));
        }
        RebalanceOutcome { realized, trades }
    }
}

impl Default for Rebalancer {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            realized: None,
            period: 0,
        }
    }
}
