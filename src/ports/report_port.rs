//! Report output port trait.

use chrono::NaiveDateTime;

use crate::domain::backtest::BacktestResult;
use crate::domain::costs::TradeEvent;
use crate::domain::error::VoltraderError;
use crate::domain::performance::PerformanceSnapshot;

/// Everything a sink may render: the summary, the per-period series under
/// stable column names, and the priced trades.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub symbol: String,
    pub rule_name: String,
    pub snapshot: PerformanceSnapshot,
    pub timestamps: Vec<NaiveDateTime>,
    pub series: Vec<(String, Vec<f64>)>,
    pub trades: Vec<TradeEvent>,
}

impl Report {
    pub fn from_result(result: &BacktestResult) -> Self {
        let named = |name: &str, values: &[f64]| (name.to_string(), values.to_vec());
        let series = vec![
            named("close", &result.closes),
            named("raw_forecast", &result.raw_forecast),
            named("price_vol", &result.price_vol),
            named("perc_vol", &result.perc_vol),
            named("vol_adjusted_forecast", &result.forecast.vol_adjusted),
            named("scaling_factor", &result.forecast.scaling_factor),
            named("scaled_forecast", &result.forecast.scaled),
            named("capped_forecast", &result.forecast.capped),
            named("ideal_position", &result.ideal_positions),
            named("realized_position", &result.realized_positions),
            named("funding_rate", &result.funding_rates),
            named("fees", &result.costs.fees),
            named("slippage", &result.costs.slippage),
            named("funding", &result.costs.funding),
            named("raw_pnl", &result.performance.raw_pnl),
            named("post_cost_pnl", &result.performance.post_cost_pnl),
            named("cumulative_pnl", &result.performance.cumulative_pnl),
            named("pct_return", &result.performance.returns),
            named("rolling_sharpe", &result.performance.rolling_sharpe),
            named("cost_drag", &result.performance.cost_drag),
            named("drawdown", &result.performance.drawdown),
        ];
        Self {
            symbol: result.symbol.clone(),
            rule_name: result.rule_name.clone(),
            snapshot: result.snapshot.clone(),
            timestamps: result.timestamps.clone(),
            series,
            trades: result.trades.clone(),
        }
    }

    pub fn series(&self, name: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }
}

/// Port for rendering or exporting a finished run.
pub trait ReportSink {
    fn write(&self, report: &Report) -> Result<(), VoltraderError>;
}
