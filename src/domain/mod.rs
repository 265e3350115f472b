//! Core domain types and logic.

pub mod series;
pub mod signal;
pub mod position;
pub mod equity;
pub mod backtest;
pub mod statistics;
pub mod montecarlo;
pub mod config_validation;
pub mod error;
