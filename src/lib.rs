//! equitrack: equity curve simulation, vectorized backtesting and
//! performance statistics for signal-driven trading strategies.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], and a thin driver in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
