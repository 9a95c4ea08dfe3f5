//! Exponentially weighted indicators over period-aligned series.
//!
//! - [`ema::ewm_mean`]: bias-adjusted exponentially weighted mean
//! - [`stddev::ewm_std`]: bias-corrected exponentially weighted standard deviation
//!
//! Both follow the "adjusted weights" convention: observation `i` periods
//! back carries weight `(1 - alpha)^i`, normalised by the sum of weights
//! actually seen. NaN inputs are not counted as observations but still age
//! the existing weights.

pub mod ema;
pub mod stddev;

/// How the decay factor `alpha` is parameterised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decay {
    /// `alpha = 2 / (span + 1)`
    Span(f64),
}

impl Decay {
    pub fn alpha(&self) -> f64 {
        match *self {
            Decay::Span(span) => 2.0 / (span + 1.0),
        }
    }
}
