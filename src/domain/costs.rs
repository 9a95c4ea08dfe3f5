//! Trading costs: fees, slippage and perpetual funding.
//!
//! Fees and slippage are charged only in periods where the rebalancer
//! trades. Funding accrues every period on the ideal notional held over the
//! previous period.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use crate::domain::error::VoltraderError;
use crate::domain::price_series::Frequency;
use crate::domain::rebalance::Trade;

/// A funding-rate observation as reported by the venue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FundingPoint {
    pub timestamp: NaiveDateTime,
    /// Fractional rate paid by longs (received by shorts) for the interval.
    pub rate: f64,
}

/// A priced rebalance.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub period: usize,
    pub timestamp: NaiveDateTime,
    pub contract_diff: f64,
    pub direction: i8,
    pub notional_traded: f64,
    pub execution_price: f64,
    pub slippage_paid: f64,
    pub fees_paid: f64,
}

/// Per-period costs for one run, aligned to the price index.
#[derive(Debug, Clone, PartialEq)]
pub struct CostLedger {
    pub fees: Vec<f64>,
    pub slippage: Vec<f64>,
    pub funding: Vec<f64>,
}

impl CostLedger {
    pub fn zeroed(len: usize) -> Self {
        Self {
            fees: vec![0.0; len],
            slippage: vec![0.0; len],
            funding: vec![0.0; len],
        }
    }

    pub fn total_fees(&self) -> f64 {
        self.fees.iter().sum()
    }

    pub fn total_slippage(&self) -> f64 {
        self.slippage.iter().sum()
    }

    pub fn total_funding(&self) -> f64 {
        self.funding.iter().sum()
    }

    /// Combined cost charged in each period.
    pub fn per_period_total(&self) -> Vec<f64> {
        self.fees
            .iter()
            .zip(&self.slippage)
            .zip(&self.funding)
            .map(|((f, s), u)| f + s + u)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    fee_fraction: f64,
    slippage_fraction: f64,
}

impl CostModel {
    /// Fractions of traded notional (0.00055 = 0.055%).
    pub fn new(fee_fraction: f64, slippage_fraction: f64) -> Result<Self, VoltraderError> {
        if !fee_fraction.is_finite() || fee_fraction < 0.0 {
            return Err(VoltraderError::invalid(
                "costs",
                "fee_pct",
                "fee must be non-negative",
            ));
        }
        if !slippage_fraction.is_finite() || slippage_fraction < 0.0 {
            return Err(VoltraderError::invalid(
                "costs",
                "slippage_pct",
                "slippage must be non-negative",
            ));
        }
        Ok(Self {
            fee_fraction,
            slippage_fraction,
        })
    }

    pub fn fee_fraction(&self) -> f64 {
        self.fee_fraction
    }

    pub fn slippage_fraction(&self) -> f64 {
        self.slippage_fraction
    }

    /// Price concession per contract unit at `close`.
    pub fn slippage_amount(&self, close: f64) -> f64 {
        close * self.slippage_fraction
    }

    /// Buys fill above the close, sells below.
    pub fn execution_price(&self, close: f64, direction: i8) -> f64 {
        if direction >= 0 {
            close + self.slippage_amount(close)
        } else {
            close - self.slippage_amount(close)
        }
    }

    pub fn price_trade(
        &self,
        trade: &Trade,
        timestamp: NaiveDateTime,
        close: f64,
        contract_unit: f64,
    ) -> TradeEvent {
        let notional_traded = trade.contract_diff * close * contract_unit;
        TradeEvent {
            period: trade.period,
            timestamp,
            contract_diff: trade.contract_diff,
            direction: trade.direction,
            notional_traded,
            execution_price: self.execution_price(close, trade.direction),
            slippage_paid: trade.contract_diff.abs() * self.slippage_amount(close) * contract_unit,
            fees_paid: notional_traded.abs() * self.fee_fraction,
        }
    }

    /// Price every trade and assemble the per-period ledger.
    ///
    /// `funding_rates` must already be aligned to the price index (see
    /// [`align_funding`]); `ideal_positions` drive the funding notional.
    pub fn apply(
        &self,
        trades: &[Trade],
        timestamps: &[NaiveDateTime],
        closes: &[f64],
        contract_unit: f64,
        ideal_positions: &[f64],
        funding_rates: &[f64],
    ) -> (CostLedger, Vec<TradeEvent>) {
        let len = closes.len();
        let mut ledger = CostLedger::zeroed(len);
        let mut events = Vec::with_capacity(trades.len());

        for trade in trades {
            let Some(&close) = closes.get(trade.period) else {
                continue;
            };
            let timestamp = timestamps.get(trade.period).copied().unwrap_or_default();
            let event = self.price_trade(trade, timestamp, close, contract_unit);
            ledger.fees[trade.period] += event.fees_paid;
            ledger.slippage[trade.period] += event.slippage_paid;
            tracing::debug!(
                period = event.period,
                contracts = event.contract_diff,
                price = event.execution_price,
                fees = event.fees_paid,
                slippage = event.slippage_paid,
                "rebalance trade"
            );
            events.push(event);
        }

        for t in 1..len {
            let held_notional = ideal_positions[t - 1] * closes[t - 1] * contract_unit;
            let rate = funding_rates.get(t).copied().unwrap_or(0.0);
            ledger.funding[t] = held_notional * rate;
        }

        (ledger, events)
    }
}

/// Sum funding rates per frequency bucket and left-join onto the price
/// timestamps. Periods without a funding observation pay nothing.
pub fn align_funding(
    points: &[FundingPoint],
    timestamps: &[NaiveDateTime],
    frequency: Frequency,
) -> Vec<f64> {
    let mut buckets: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
    for p in points.iter().filter(|p| p.rate.is_finite()) {
        *buckets.entry(frequency.floor(p.timestamp)).or_insert(0.0) += p.rate;
    }
    timestamps
        .iter()
        .map(|ts| buckets.get(ts).copied().unwrap_or(0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn buy(period: usize, diff: f64) -> Trade {
        Trade {
            period,
            contract_diff: diff,
            direction: if diff > 0.0 { 1 } else { -1 },
            previous_position: 0.0,
            new_position: diff,
        }
    }

    #[test]
    fn rejects_negative_costs() {
        assert!(CostModel::new(-0.001, 0.0).is_err());
        assert!(matches!(
            CostModel::new(0.0, -0.1),
            Err(VoltraderError::ConfigInvalid { key, .. }) if key == "slippage_pct"
        ));
    }

    #[test]
    fn execution_price_direction() {
        let model = CostModel::new(0.0, 0.01).unwrap();
        assert!((model.execution_price(100.0, 1) - 101.0).abs() < 1e-12);
        assert!((model.execution_price(100.0, -1) - 99.0).abs() < 1e-12);
    }

    #[test]
    fn trade_costs() {
        let model = CostModel::new(0.001, 0.0005).unwrap();
        let trade = Trade {
            period: 1,
            contract_diff: -4.0,
            direction: -1,
            previous_position: 10.0,
            new_position: 6.0,
        };
        let event = model.price_trade(&trade, ts(2, 0), 200.0, 0.5);
        assert!((event.notional_traded + 400.0).abs() < 1e-12);
        assert!((event.fees_paid - 0.4).abs() < 1e-12);
        assert!((event.slippage_paid - 0.2).abs() < 1e-12);
        assert!((event.execution_price - 199.9).abs() < 1e-12);
    }

    #[test]
    fn no_trade_means_no_fees_but_funding_accrues() {
        let model = CostModel::new(0.001, 0.001).unwrap();
        let times = [ts(1, 0), ts(2, 0), ts(3, 0)];
        let closes = [100.0, 100.0, 100.0];
        let ideal = [2.0, 2.0, 2.0];
        let funding = [0.5, 0.01, 0.0];
        let (ledger, events) = model.apply(&[], &times, &closes, 1.0, &ideal, &funding);
        assert!(events.is_empty());
        assert_eq!(ledger.total_fees(), 0.0);
        assert_eq!(ledger.total_slippage(), 0.0);
        assert_eq!(ledger.funding[0], 0.0);
        assert!((ledger.funding[1] - 2.0).abs() < 1e-12);
        assert_eq!(ledger.funding[2], 0.0);
    }

    #[test]
    fn ledger_books_trade_in_its_period() {
        let model = CostModel::new(0.001, 0.0).unwrap();
        let times = [ts(1, 0), ts(2, 0)];
        let (ledger, events) = model.apply(
            &[buy(1, 15.0)],
            &times,
            &[100.0, 100.0],
            1.0,
            &[100.0, 115.0],
            &[0.0, 0.0],
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, ts(2, 0));
        assert_eq!(ledger.fees[0], 0.0);
        assert!((ledger.fees[1] - 1.5).abs() < 1e-12);
        assert_eq!(ledger.per_period_total()[1], ledger.fees[1]);
    }

    #[test]
    fn funding_is_summed_per_bucket_and_left_joined() {
        let points = [
            FundingPoint { timestamp: ts(1, 0), rate: 0.0001 },
            FundingPoint { timestamp: ts(1, 8), rate: 0.0002 },
            FundingPoint { timestamp: ts(1, 16), rate: -0.0001 },
            FundingPoint { timestamp: ts(3, 8), rate: 0.0003 },
            FundingPoint { timestamp: ts(9, 0), rate: 0.5 },
        ];
        let times = [ts(1, 0), ts(2, 0), ts(3, 0)];
        let aligned = align_funding(&points, &times, Frequency::DAILY);
        assert!((aligned[0] - 0.0002).abs() < 1e-15);
        assert_eq!(aligned[1], 0.0);
        assert!((aligned[2] - 0.0003).abs() < 1e-15);
    }
}
