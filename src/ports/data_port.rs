//! Inbound market data: prices, strategy signals and executed fills.

use crate::domain::equity::TradeDirection;
use crate::domain::error::EngineError;
use crate::domain::series::{Series, Timestamp};
use crate::domain::signal::SignalSet;

/// One executed fill as read from an external trade log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeFill {
    pub timestamp: Timestamp,
    pub price: f64,
    pub volume: f64,
    pub direction: TradeDirection,
}

pub trait DataPort {
    fn fetch_prices(&self, symbol: &str) -> Result<Series<f64>, EngineError>;

    fn fetch_signals(&self, symbol: &str) -> Result<SignalSet, EngineError>;

    /// Fills in timestamp order.
    fn fetch_trades(&self, symbol: &str) -> Result<Vec<TradeFill>, EngineError>;
}
