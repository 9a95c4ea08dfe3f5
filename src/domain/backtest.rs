//! Backtest pipeline.
//!
//! BacktestConfig carries every tunable of a run; `Backtest` validates it
//! once and then runs the stages over a full price history:
//! rule -> volatility -> forecast scaling -> sizing -> rebalancing -> costs
//! -> performance. Runs share no state and are repeatable.

use chrono::NaiveDateTime;

use crate::domain::costs::{CostLedger, CostModel, FundingPoint, TradeEvent, align_funding};
use crate::domain::error::VoltraderError;
use crate::domain::forecast::{ForecastScaler, ScaledForecast};
use crate::domain::instrument::{Instrument, InstrumentSpec};
use crate::domain::performance::{
    PerformanceEngine, PerformanceInputs, PerformanceSeries, PerformanceSnapshot,
};
use crate::domain::price_series::Frequency;
use crate::domain::rebalance::Rebalancer;
use crate::domain::rule::{RuleSpec, TradingRule};
use crate::domain::series;
use crate::domain::sizing::{PositionSizer, RiskBudget};
use crate::domain::volatility::VolatilityEstimator;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub instrument: InstrumentSpec,
    pub frequency: Frequency,
    pub risk: RiskBudget,
    pub rule: RuleSpec,
    pub vol_span: usize,
    pub vol_min_periods: usize,
    pub forecast_target: f64,
    pub forecast_cap: f64,
    /// Defaults to two years of periods when unset.
    pub min_calibration_periods: Option<usize>,
    /// Fraction in [0, 1].
    pub rebalance_threshold: f64,
    pub fee_fraction: f64,
    pub slippage_fraction: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            instrument: InstrumentSpec {
                symbol: "BTCUSDT".to_string(),
                contract_unit: 1.0,
                trading_days_per_year: 365,
            },
            frequency: Frequency::DAILY,
            risk: RiskBudget::default(),
            rule: RuleSpec::default(),
            vol_span: VolatilityEstimator::DEFAULT_SPAN,
            vol_min_periods: VolatilityEstimator::DEFAULT_MIN_PERIODS,
            forecast_target: ForecastScaler::DEFAULT_TARGET_AVG_ABS,
            forecast_cap: ForecastScaler::DEFAULT_CAP,
            min_calibration_periods: None,
            rebalance_threshold: Rebalancer::DEFAULT_THRESHOLD,
            fee_fraction: 0.00055,
            slippage_fraction: 0.0005,
        }
    }
}

/// Every intermediate series of a run, aligned to the price index.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub symbol: String,
    pub rule_name: String,
    pub timestamps: Vec<NaiveDateTime>,
    pub closes: Vec<f64>,
    pub raw_forecast: Vec<f64>,
    pub price_vol: Vec<f64>,
    pub perc_vol: Vec<f64>,
    pub forecast: ScaledForecast,
    pub ideal_positions: Vec<f64>,
    pub realized_positions: Vec<f64>,
    pub average_position: Vec<f64>,
    pub funding_rates: Vec<f64>,
    pub trades: Vec<TradeEvent>,
    pub costs: CostLedger,
    pub performance: PerformanceSeries,
    pub snapshot: PerformanceSnapshot,
}

pub struct Backtest {
    config: BacktestConfig,
    rule: Box<dyn TradingRule>,
    volatility: VolatilityEstimator,
    rebalancer: Rebalancer,
    cost_model: CostModel,
}

impl std::fmt::Debug for Backtest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backtest")
            .field("config", &self.config)
            .field("rule", &self.rule.name())
            .finish()
    }
}

impl Backtest {
    /// Validate the configuration and build every stage up front.
    pub fn new(config: BacktestConfig) -> Result<Self, VoltraderError> {
        config.instrument.validate()?;
        config.risk.validate()?;
        let rule = config.rule.build()?;
        let volatility = VolatilityEstimator::new(config.vol_span, config.vol_min_periods)?;
        // Fails early on bad target/cap even though calibration length
        // depends on the instrument.
        ForecastScaler::new(
            config.forecast_target,
            config.forecast_cap,
            config.min_calibration_periods.unwrap_or(1),
        )?;
        let rebalancer = Rebalancer::new(config.rebalance_threshold)?;
        let cost_model = CostModel::new(config.fee_fraction, config.slippage_fraction)?;
        PerformanceEngine::new(
            config.risk.trading_capital,
            config.instrument.trading_days_per_year,
        )?;

        Ok(Self {
            config,
            rule,
            volatility,
            rebalancer,
            cost_model,
        })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn rule_name(&self) -> String {
        self.rule.name()
    }

    fn scaler_for(&self, instrument: &Instrument) -> Result<ForecastScaler, VoltraderError> {
        let calibration = self
            .config
            .min_calibration_periods
            .unwrap_or(2 * instrument.trading_days_per_year() as usize);
        ForecastScaler::new(
            self.config.forecast_target,
            self.config.forecast_cap,
            calibration,
        )
    }

    pub fn run(
        &self,
        instrument: &Instrument,
        funding: &[FundingPoint],
    ) -> Result<BacktestResult, VoltraderError> {
        let prices = instrument.prices();
        let closes = instrument.closes();
        let days = instrument.trading_days_per_year();
        tracing::info!(
            symbol = instrument.symbol(),
            periods = closes.len(),
            rule = %self.rule.name(),
            "starting backtest"
        );

        let raw_forecast = self.rule.raw_forecast(closes);
        let price_vol = self.volatility.estimate(&instrument.raw_returns());
        let perc_returns = instrument.perc_returns();
        let perc_vol = self.volatility.estimate(&perc_returns);

        let forecast = self.scaler_for(instrument)?.scale(&raw_forecast, &price_vol);
        tracing::info!(
            defined = forecast.capped.iter().filter(|v| !v.is_nan()).count(),
            "forecast scaled"
        );

        let sizer = PositionSizer::new(
            self.config.risk,
            instrument.contract_unit(),
            days,
            self.config.forecast_target,
        )?;
        let ideal_positions = sizer.ideal_positions(closes, &perc_vol, &forecast.capped);
        let average_position = sizer.average_position(closes, &perc_vol);

        let rebalanced = self.rebalancer.run(&ideal_positions);
        tracing::info!(trades = rebalanced.trades.len(), "positions rebalanced");

        let funding_rates = align_funding(funding, prices.timestamps(), prices.frequency());
        if !funding.is_empty() && funding_rates.iter().all(|r| *r == 0.0) {
            tracing::warn!(
                symbol = instrument.symbol(),
                observations = funding.len(),
                "no funding observation overlaps the price index"
            );
        }
        let (costs, trades) = self.cost_model.apply(
            &rebalanced.trades,
            prices.timestamps(),
            closes,
            instrument.contract_unit(),
            &ideal_positions,
            &funding_rates,
        );

        let engine = PerformanceEngine::new(self.config.risk.trading_capital, days)?;
        let (performance, snapshot) = engine.evaluate(&PerformanceInputs {
            closes,
            realized_positions: &rebalanced.realized,
            average_position: &average_position,
            instrument_perc_returns: &perc_returns,
            costs: &costs,
            trade_count: trades.len(),
        });
        tracing::info!(
            sharpe = snapshot.sharpe_post_cost,
            turnover = snapshot.turnover,
            max_drawdown = snapshot.max_drawdown,
            "backtest complete"
        );

        Ok(BacktestResult {
            symbol: instrument.symbol().to_string(),
            rule_name: self.rule.name(),
            timestamps: prices.timestamps().to_vec(),
            closes: closes.to_vec(),
            raw_forecast,
            price_vol,
            perc_vol,
            forecast,
            ideal_positions,
            realized_positions: rebalanced.realized,
            average_position,
            funding_rates,
            trades,
            costs,
            performance,
            snapshot,
        })
    }
}

impl BacktestResult {
    /// Cumulative percent return, the curve the drawdown is measured on.
    pub fn cumulative_returns(&self) -> Vec<f64> {
        series::cumsum(&self.performance.returns)
    }
}
