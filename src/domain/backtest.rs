//! Vectorized backtest over a precomputed position series.
//!
//! [`fast_execute`] handles only fixed-price market entries implied by the
//! position series. Stops, limits and any other conditional intrabar
//! execution need the event-driven [`EquityCalculator`](super::equity::EquityCalculator).

use super::equity::EquityCurve;
use super::error::EngineError;
use super::series::{Series, Timestamp};

/// Which return column of an [`ExecutionFrame`] to accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnStream {
    /// One return per bar.
    Bars,
    /// One compounded return per closed trade.
    Trades,
}

impl std::str::FromStr for ReturnStream {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bars" => Ok(ReturnStream::Bars),
            "trades" => Ok(ReturnStream::Trades),
            other => Err(EngineError::InvalidParameter {
                name: "curve".into(),
                reason: format!("expected 'trades' or 'bars', got '{other}'"),
            }),
        }
    }
}

/// Result table of [`fast_execute`], one row per bar.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionFrame {
    pub index: Vec<Timestamp>,
    /// Per-bar strategy return; bar 0 is 0.
    pub equity: Vec<f64>,
    /// Compounded return of the trade ending at this crossing bar.
    pub trade_equity: Vec<Option<f64>>,
    pub long_equity: Vec<Option<f64>>,
    pub short_equity: Vec<Option<f64>>,
    pub positions: Vec<f64>,
    pub crosspoint: Vec<u8>,
}

impl ExecutionFrame {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Running product of `1 + equity` per bar.
    pub fn equity_curve(&self) -> Series<f64> {
        Series::from_ordered(self.index.clone(), compound(self.equity.iter().copied()))
    }

    /// Trade returns with the undefined rows removed.
    pub fn trade_returns(&self) -> Series<f64> {
        let (index, values): (Vec<Timestamp>, Vec<f64>) = self
            .index
            .iter()
            .zip(&self.trade_equity)
            .filter_map(|(ts, r)| r.map(|r| (*ts, r)))
            .unzip();
        Series::from_ordered(index, values)
    }

    /// Running product of `1 + trade return` over crossing bars.
    pub fn trade_equity_curve(&self) -> Series<f64> {
        let (index, returns) = self.trade_returns().into_parts();
        Series::from_ordered(index, compound(returns.into_iter()))
    }

    pub fn to_equity_curve(&self, stream: ReturnStream) -> Result<EquityCurve, EngineError> {
        let returns = match stream {
            ReturnStream::Bars => Series::from_ordered(self.index.clone(), self.equity.clone()),
            ReturnStream::Trades => self.trade_returns(),
        };
        let mut curve = EquityCurve::new();
        for (ts, r) in returns.iter() {
            curve.add_change(ts, *r)?;
        }
        Ok(curve)
    }
}

fn compound(returns: impl Iterator<Item = f64>) -> Vec<f64> {
    returns
        .scan(1.0, |acc, r| {
            *acc *= 1.0 + r;
            Some(*acc)
        })
        .collect()
}

/// Compute per-bar and per-trade returns for `positions` traded at `price`.
///
/// The return realized on bar `i` is the price change from `i - 1` times the
/// position held entering the bar. Bars 0 and 1 are always crossing points so
/// the first trade return is measured from the start of the series.
pub fn fast_execute(
    price: &Series<f64>,
    positions: &Series<f64>,
) -> Result<ExecutionFrame, EngineError> {
    if !price.shares_index(positions) {
        return Err(EngineError::IndexMismatch {
            left: "price".into(),
            right: "positions".into(),
        });
    }
    let n = price.len();
    if n < 2 {
        return Err(EngineError::InsufficientData {
            what: "fast_execute bars".into(),
            have: n,
            need: 2,
        });
    }

    let p = price.values();
    let pos = positions.values();

    let mut long_close = vec![false; n];
    let mut short_close = vec![false; n];
    let mut crosspoint = vec![false; n];
    let mut equity = vec![0.0; n];
    for i in 1..n {
        long_close[i] = pos[i] <= 0.0 && pos[i - 1] > 0.0;
        short_close[i] = pos[i] >= 0.0 && pos[i - 1] < 0.0;
        crosspoint[i] = long_close[i] || short_close[i];
        equity[i] = (p[i] / p[i - 1] - 1.0) * pos[i - 1];
    }
    crosspoint[0] = true;
    crosspoint[1] = true;

    let cumulative = compound(equity.iter().copied());
    let mut trade_equity = vec![None; n];
    let mut previous: Option<f64> = None;
    for i in (0..n).filter(|&i| crosspoint[i]) {
        if let Some(prev) = previous {
            let r = cumulative[i] / prev - 1.0;
            if !r.is_nan() {
                trade_equity[i] = Some(r);
            }
        }
        previous = Some(cumulative[i]);
    }

    let pick = |mask: &[bool]| -> Vec<Option<f64>> {
        trade_equity
            .iter()
            .zip(mask)
            .map(|(r, &m)| if m { *r } else { None })
            .collect()
    };
    let long_equity = pick(&long_close);
    let short_equity = pick(&short_close);

    tracing::debug!(
        bars = n,
        trades = trade_equity.iter().flatten().count(),
        "fast_execute complete"
    );

    Ok(ExecutionFrame {
        index: price.index().to_vec(),
        equity,
        trade_equity,
        long_equity,
        short_equity,
        positions: pos.to_vec(),
        crosspoint: crosspoint.into_iter().map(u8::from).collect(),
    })
}
