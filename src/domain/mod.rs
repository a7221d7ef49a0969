//! Core domain types and decision logic.

pub mod ohlcv;
pub mod indicator;
pub mod signal;
pub mod cadence;
pub mod sizing;
pub mod position;
pub mod order;
pub mod strategy;
pub mod broker;
pub mod backtest;
pub mod universe;
pub mod config_validation;
pub mod error;
