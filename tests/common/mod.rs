#![allow(dead_code)]

use chrono::NaiveDate;
use equitrack::domain::equity::TradeDirection;
use equitrack::domain::error::EngineError;
use equitrack::domain::series::{Series, Timestamp};
use equitrack::domain::signal::{SignalName, SignalSet};
use equitrack::ports::data_port::{DataPort, TradeFill};
use std::collections::HashMap;

pub struct MockDataPort {
    pub prices: HashMap<String, Series<f64>>,
    pub signals: HashMap<String, SignalSet>,
    pub trades: HashMap<String, Vec<TradeFill>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            signals: HashMap::new(),
            trades: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_prices(mut self, symbol: &str, prices: Series<f64>) -> Self {
        self.prices.insert(symbol.to_string(), prices);
        self
    }

    pub fn with_signals(mut self, symbol: &str, signals: SignalSet) -> Self {
        self.signals.insert(symbol.to_string(), signals);
        self
    }

    pub fn with_trades(mut self, symbol: &str, trades: Vec<TradeFill>) -> Self {
        self.trades.insert(symbol.to_string(), trades);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    fn check(&self, symbol: &str) -> Result<(), EngineError> {
        match self.errors.get(symbol) {
            Some(reason) => Err(EngineError::Data {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(&self, symbol: &str) -> Result<Series<f64>, EngineError> {
        self.check(symbol)?;
        Ok(self.prices.get(symbol).cloned().unwrap_or_else(Series::empty))
    }

    fn fetch_signals(&self, symbol: &str) -> Result<SignalSet, EngineError> {
        self.check(symbol)?;
        Ok(self.signals.get(symbol).cloned().unwrap_or_default())
    }

    fn fetch_trades(&self, symbol: &str) -> Result<Vec<TradeFill>, EngineError> {
        self.check(symbol)?;
        Ok(self.trades.get(symbol).cloned().unwrap_or_default())
    }
}

/// Midnight on day `offset` counted from 2024-01-01.
pub fn ts(offset: i64) -> Timestamp {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::days(offset)
}

pub fn index(n: usize) -> Vec<Timestamp> {
    (0..n as i64).map(ts).collect()
}

pub fn series(values: &[f64]) -> Series<f64> {
    Series::new(index(values.len()), values.to_vec()).unwrap()
}

/// Boolean signal set on a shared daily index.
pub fn bool_signals(columns: &[(SignalName, &[bool])]) -> SignalSet {
    let mut set = SignalSet::new();
    for (name, values) in columns {
        set = set
            .with_bools(*name, index(values.len()), values.to_vec())
            .unwrap();
    }
    set
}

pub fn fill(offset: i64, price: f64, volume: f64, direction: TradeDirection) -> TradeFill {
    TradeFill {
        timestamp: ts(offset),
        price,
        volume,
        direction,
    }
}
