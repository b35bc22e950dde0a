//! Core domain types and logic.

pub mod ohlcv;
pub mod feed;
pub mod indicator;
pub mod strategy;
pub mod monte_carlo;
pub mod position;
pub mod ledger;
pub mod backtest;
pub mod metrics;
pub mod sweep;
pub mod config_validation;
pub mod error;
