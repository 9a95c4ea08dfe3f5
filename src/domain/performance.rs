//! P&L and risk/return statistics for a completed run.
//!
//! Returns are expressed as a percentage of trading capital per period.
//! Drawdown uses the additive convention: the running peak of cumulative
//! percent return minus the cumulative percent return, in percentage points.

use crate::domain::costs::CostLedger;
use crate::domain::error::VoltraderError;
use crate::domain::indicator::Decay;
use crate::domain::indicator::stddev::ewm_std;
use crate::domain::series;

/// Tail percentiles of a normal distribution: p1/p30 and p99/p70 both equal
/// roughly 4.43, so a relative ratio of 1.0 means normal-looking tails.
pub const NORMAL_TAIL_RATIO: f64 = 4.43;

/// Everything the engine needs from the earlier stages, aligned to the
/// price index.
#[derive(Debug, Clone, Copy)]
pub struct PerformanceInputs<'a> {
    pub closes: &'a [f64],
    pub realized_positions: &'a [f64],
    pub average_position: &'a [f64],
    pub instrument_perc_returns: &'a [f64],
    pub costs: &'a CostLedger,
    pub trade_count: usize,
}

/// Per-period series derived during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSeries {
    pub raw_pnl: Vec<f64>,
    pub post_cost_pnl: Vec<f64>,
    pub cumulative_pnl: Vec<f64>,
    pub pre_cost_returns: Vec<f64>,
    pub returns: Vec<f64>,
    pub rolling_sharpe_pre_cost: Vec<f64>,
    pub rolling_sharpe: Vec<f64>,
    pub cost_drag: Vec<f64>,
    pub drawdown: Vec<f64>,
}

/// Read-only summary of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSnapshot {
    pub periods: usize,
    /// Sum of per-period percent returns.
    pub total_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_pre_cost: f64,
    pub sharpe_post_cost: f64,
    pub cost_drag: f64,
    pub instrument_sharpe: f64,
    pub turnover: f64,
    pub skew: f64,
    pub left_tail: f64,
    pub right_tail: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub total_fees: f64,
    pub total_slippage: f64,
    pub total_funding: f64,
    pub trade_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceEngine {
    trading_capital: f64,
    trading_days_per_year: u32,
    sharpe_decay: Decay,
    sharpe_min_periods: usize,
}

impl PerformanceEngine {
    pub const SHARPE_SPAN: f64 = 35.0;
    pub const SHARPE_MIN_PERIODS: usize = 10;

    pub fn new(trading_capital: f64, trading_days_per_year: u32) -> Result<Self, VoltraderError> {
        if !trading_capital.is_finite() || trading_capital <= 0.0 {
            return Err(VoltraderError::invalid(
                "account",
                "trading_capital",
                "trading_capital must be positive",
            ));
        }
        if trading_days_per_year == 0 {
            return Err(VoltraderError::invalid(
                "instrument",
                "trading_days_per_year",
                "trading_days_per_year must be at least 1",
            ));
        }
        Ok(Self {
            trading_capital,
            trading_days_per_year,
            sharpe_decay: Decay::Span(Self::SHARPE_SPAN),
            sharpe_min_periods: Self::SHARPE_MIN_PERIODS,
        })
    }

    pub fn evaluate(&self, inputs: &PerformanceInputs<'_>) -> (PerformanceSeries, PerformanceSnapshot) {
        let n = inputs.closes.len();
        let mut raw_pnl = vec![0.0; n];
        for t in 1..n {
            let price_change = inputs.closes[t] - inputs.closes[t - 1];
            raw_pnl[t] = inputs.realized_positions[t - 1] * price_change;
        }

        let costs = inputs.costs.per_period_total();
        let post_cost_pnl: Vec<f64> = raw_pnl.iter().zip(&costs).map(|(p, c)| p - c).collect();
        let cumulative_pnl = series::cumsum(&post_cost_pnl);

        let pre_cost_returns = self.percent_of_capital(&raw_pnl);
        let returns = self.percent_of_capital(&post_cost_pnl);

        let rolling_sharpe_pre_cost = self.rolling_sharpe(&pre_cost_returns);
        let rolling_sharpe = self.rolling_sharpe(&returns);
        let cost_drag: Vec<f64> = rolling_sharpe_pre_cost
            .iter()
            .zip(&rolling_sharpe)
            .map(|(pre, post)| pre - post)
            .collect();

        let drawdown = drawdown(&returns);
        let instrument_returns: Vec<f64> = inputs
            .instrument_perc_returns
            .iter()
            .map(|r| r * 100.0)
            .collect();

        let days = self.trading_days_per_year as f64;
        let mean = series::nan_mean(&returns);
        let (left_tail, right_tail) = tail_ratios(&returns);
        let sharpe_pre_cost = series::last(&rolling_sharpe_pre_cost);
        let sharpe_post_cost = series::last(&rolling_sharpe);

        let snapshot = PerformanceSnapshot {
            periods: n,
            total_return: returns.iter().sum(),
            annualized_return: mean * days,
            annualized_volatility: sample_std(&returns) * days.sqrt(),
            sharpe_pre_cost,
            sharpe_post_cost,
            cost_drag: sharpe_pre_cost - sharpe_post_cost,
            instrument_sharpe: series::last(&self.rolling_sharpe(&instrument_returns)),
            turnover: annualized_turnover(
                inputs.realized_positions,
                inputs.average_position,
                self.trading_days_per_year,
            ),
            skew: skew(&returns),
            left_tail,
            right_tail,
            max_drawdown: drawdown.iter().copied().fold(0.0, f64::max),
            max_drawdown_duration: drawdown_duration(&drawdown),
            total_fees: inputs.costs.total_fees(),
            total_slippage: inputs.costs.total_slippage(),
            total_funding: inputs.costs.total_funding(),
            trade_count: inputs.trade_count,
        };

        let perf = PerformanceSeries {
            raw_pnl,
            post_cost_pnl,
            cumulative_pnl,
            pre_cost_returns,
            returns,
            rolling_sharpe_pre_cost,
            rolling_sharpe,
            cost_drag,
            drawdown,
        };
        (perf, snapshot)
    }

    fn percent_of_capital(&self, pnl: &[f64]) -> Vec<f64> {
        pnl.iter().map(|p| p / self.trading_capital * 100.0).collect()
    }

    /// Annualized full-sample mean over a rolling EWM volatility.
    pub fn rolling_sharpe(&self, returns: &[f64]) -> Vec<f64> {
        rolling_sharpe(
            returns,
            self.trading_days_per_year,
            self.sharpe_decay,
            self.sharpe_min_periods,
        )
    }
}

/// `sqrt(N) * mean(returns) / ewm_std(returns)`; undefined where the
/// volatility is undefined or zero.
pub fn rolling_sharpe(
    returns: &[f64],
    trading_days_per_year: u32,
    decay: Decay,
    min_periods: usize,
) -> Vec<f64> {
    let mean = series::nan_mean(returns);
    let scale = (trading_days_per_year as f64).sqrt();
    ewm_std(returns, decay, min_periods)
        .into_iter()
        .map(|vol| {
            if vol.is_nan() || vol == 0.0 {
                f64::NAN
            } else {
                scale * mean / vol
            }
        })
        .collect()
}

/// Mean absolute change of the position normalized by the average position,
/// annualized. Zero when no period pair is defined.
pub fn annualized_turnover(
    positions: &[f64],
    average_position: &[f64],
    trading_days_per_year: u32,
) -> f64 {
    let normalized: Vec<f64> = positions
        .iter()
        .zip(average_position)
        .map(|(&p, &avg)| {
            if !avg.is_finite() || avg == 0.0 {
                f64::NAN
            } else {
                p / avg
            }
        })
        .collect();

    let changes: Vec<f64> = series::diff(&normalized)
        .into_iter()
        .filter(|d| !d.is_nan())
        .map(f64::abs)
        .collect();
    if changes.is_empty() {
        return 0.0;
    }
    changes.iter().sum::<f64>() / changes.len() as f64 * trading_days_per_year as f64
}

/// Bias-adjusted sample skewness (G1). Undefined below three observations.
pub fn skew(values: &[f64]) -> f64 {
    let defined: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let n = defined.len();
    if n < 3 {
        return f64::NAN;
    }
    let nf = n as f64;
    let mean = defined.iter().sum::<f64>() / nf;
    let m2 = defined.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / nf;
    let m3 = defined.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / nf;
    if m2 == 0.0 {
        return 0.0;
    }
    let g1 = m3 / m2.powf(1.5);
    (nf * (nf - 1.0)).sqrt() / (nf - 2.0) * g1
}

/// Relative (left, right) tail ratios of mean-centered returns.
pub fn tail_ratios(returns: &[f64]) -> (f64, f64) {
    let mean = series::nan_mean(returns);
    let centered: Vec<f64> = returns.iter().map(|r| r - mean).collect();
    let ratio = |extreme: f64, moderate: f64| {
        let m = series::percentile(&centered, moderate);
        if m == 0.0 || m.is_nan() {
            f64::NAN
        } else {
            series::percentile(&centered, extreme) / m / NORMAL_TAIL_RATIO
        }
    };
    (ratio(1.0, 30.0), ratio(99.0, 70.0))
}

/// Additive drawdown series in percentage points (always >= 0).
pub fn drawdown(percent_returns: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    series::cumsum(percent_returns)
        .into_iter()
        .map(|cum| {
            peak = peak.max(cum);
            peak - cum
        })
        .collect()
}

/// Longest run of consecutive periods spent below a previous peak.
fn drawdown_duration(drawdown: &[f64]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for &dd in drawdown {
        if dd > 0.0 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn sample_std(values: &[f64]) -> f64 {
    let defined: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if defined.len() < 2 {
        return f64::NAN;
    }
    let n = defined.len() as f64;
    let mean = defined.iter().sum::<f64>() / n;
    let var = defined.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}
