//! Core domain types and logic: the sizing, rebalancing and scoring pipeline.

pub mod error;
pub mod series;
pub mod indicator;
pub mod price_series;
pub mod instrument;
pub mod rule;
pub mod volatility;
pub mod forecast;
pub mod sizing;
pub mod rebalance;
pub mod costs;
pub mod performance;
pub mod backtest;
pub mod config_validation;
