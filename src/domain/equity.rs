//! Equity curves and the trade-driven equity calculator.

use std::fmt;
use std::str::FromStr;

use super::error::EngineError;
use super::series::{Series, Timestamp};
use super::statistics::{StatisticRegistry, StatisticValue, StatisticsMode, StatisticsReport};

/// An executed fill. `volume` is signed: positive bought, negative sold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    pub timestamp: Timestamp,
    pub price: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl TradeDirection {
    pub fn signed(&self, volume: f64) -> f64 {
        match self {
            TradeDirection::Buy => volume,
            TradeDirection::Sell => -volume,
        }
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeDirection::Buy => f.write_str("buy"),
            TradeDirection::Sell => f.write_str("sell"),
        }
    }
}

impl FromStr for TradeDirection {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(TradeDirection::Buy),
            "sell" => Ok(TradeDirection::Sell),
            _ => Err(EngineError::InvalidDirection(s.trim().to_string())),
        }
    }
}

/// Append-only history of equity changes.
///
/// Timestamps never decrease; the running total always equals the sum of
/// the recorded changes. Trades are kept for audit only and do not feed any
/// statistic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquityCurve {
    changes: Vec<f64>,
    times: Vec<Timestamp>,
    cumsum: f64,
    trades: Vec<Trade>,
}

impl EquityCurve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_change(&mut self, timestamp: Timestamp, change: f64) -> Result<(), EngineError> {
        ensure_not_before(self.last_timestamp(), timestamp)?;
        self.changes.push(change);
        self.cumsum += change;
        self.times.push(timestamp);
        Ok(())
    }

    /// Record an absolute equity level as the change from the running total.
    pub fn add_point(&mut self, timestamp: Timestamp, equity: f64) -> Result<(), EngineError> {
        ensure_not_before(self.last_timestamp(), timestamp)?;
        self.changes.push(equity - self.cumsum);
        self.cumsum = equity;
        self.times.push(timestamp);
        Ok(())
    }

    pub fn add_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn changes(&self) -> &[f64] {
        &self.changes
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.times
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn cumulative(&self) -> f64 {
        self.cumsum
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.times.last().copied()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Cumulative equity aligned to the recorded timestamps.
    pub fn series(&self) -> Series<f64> {
        let values = self
            .changes
            .iter()
            .scan(0.0, |acc, c| {
                *acc += c;
                Some(*acc)
            })
            .collect();
        Series::from_ordered(self.times.clone(), values)
    }

    pub fn statistic(&self, name: &str) -> Result<StatisticValue, EngineError> {
        self.statistic_with(StatisticRegistry::standard(), name)
    }

    pub fn statistic_with(
        &self,
        registry: &StatisticRegistry,
        name: &str,
    ) -> Result<StatisticValue, EngineError> {
        self.ensure_not_empty()?;
        registry.compute_named(name, &self.changes)
    }

    pub fn statistics(&self, mode: &str) -> Result<StatisticsReport, EngineError> {
        self.statistics_with(StatisticRegistry::standard(), mode)
    }

    pub fn statistics_with(
        &self,
        registry: &StatisticRegistry,
        mode: &str,
    ) -> Result<StatisticsReport, EngineError> {
        let mode: StatisticsMode = mode.parse()?;
        self.ensure_not_empty()?;
        Ok(registry.report(mode, &self.changes))
    }

    fn ensure_not_empty(&self) -> Result<(), EngineError> {
        if self.changes.is_empty() {
            return Err(EngineError::EmptyData {
                what: "statistics".into(),
            });
        }
        Ok(())
    }
}

/// Event-driven equity simulation for a single instrument.
///
/// `var` is the negated cash spent; equity at any price is
/// `var + pos * price`. Only `new_trade` mutates `pos` and `var`.
#[derive(Debug, Clone, Default)]
pub struct EquityCalculator {
    full_curve: EquityCurve,
    trades_curve: EquityCurve,
    pos: f64,
    var: f64,
}

impl EquityCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_curves(full_curve: EquityCurve, trades_curve: EquityCurve) -> Self {
        EquityCalculator {
            full_curve,
            trades_curve,
            pos: 0.0,
            var: 0.0,
        }
    }

    /// Mark the position to market on the full curve.
    pub fn new_price(&mut self, timestamp: Timestamp, price: f64) -> Result<(), EngineError> {
        let equity = self.equity_at(price);
        self.full_curve.add_point(timestamp, equity)
    }

    /// Apply a fill, then record post-trade equity and the fill itself on
    /// the trades curve. A fill dated before the last price tick is rejected
    /// without touching any state.
    pub fn new_trade(
        &mut self,
        timestamp: Timestamp,
        price: f64,
        volume: f64,
        direction: TradeDirection,
    ) -> Result<(), EngineError> {
        ensure_not_before(self.full_curve.last_timestamp(), timestamp)?;
        ensure_not_before(self.trades_curve.last_timestamp(), timestamp)?;

        let volume = direction.signed(volume);
        self.var -= price * volume;
        self.pos += volume;

        let equity = self.equity_at(price);
        self.trades_curve.add_point(timestamp, equity)?;
        self.trades_curve.add_trade(Trade {
            timestamp,
            price,
            volume,
        });
        tracing::debug!(%timestamp, price, volume, pos = self.pos, equity, "trade applied");
        Ok(())
    }

    pub fn position(&self) -> f64 {
        self.pos
    }

    pub fn var(&self) -> f64 {
        self.var
    }

    pub fn equity_at(&self, price: f64) -> f64 {
        self.var + self.pos * price
    }

    pub fn full_curve(&self) -> &EquityCurve {
        &self.full_curve
    }

    pub fn trades_curve(&self) -> &EquityCurve {
        &self.trades_curve
    }

    pub fn into_curves(self) -> (EquityCurve, EquityCurve) {
        (self.full_curve, self.trades_curve)
    }
}

fn ensure_not_before(last: Option<Timestamp>, attempted: Timestamp) -> Result<(), EngineError> {
    match last {
        Some(last) if attempted < last => Err(EngineError::OutOfOrder {
            attempted: attempted.to_string(),
            last: last.to_string(),
        }),
        _ => Ok(()),
    }
}
