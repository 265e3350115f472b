//! Performance statistics over per-period equity changes.
//!
//! Every statistic is a pure function of the full changes array. The
//! [`StatisticRegistry`] maps names (and their aliases) onto the closed
//! [`Statistic`] enum and carries the Monte Carlo parameters used by
//! `maxdd_montecarlo`.
//!
//! Ratio statistics whose denominator is zero fail with
//! [`EngineError::DegenerateStatistic`] rather than returning infinity.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use super::error::EngineError;
use super::montecarlo::{MonteCarloConfig, MonteCarloReport, maxdd_montecarlo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Statistic {
    Average,
    Sd,
    MeanProfit,
    MeanLoss,
    SdProfits,
    SdLosses,
    Winrate,
    FinalEquity,
    ProfitFactor,
    Sharpe,
    Sortino,
    Maxdd,
    MaxddMontecarlo,
    RecoveryFactor,
}

impl Statistic {
    /// The `"full"` set, in report order.
    pub const FULL: [Statistic; 13] = [
        Statistic::Average,
        Statistic::Sd,
        Statistic::MeanProfit,
        Statistic::MeanLoss,
        Statistic::SdProfits,
        Statistic::SdLosses,
        Statistic::Winrate,
        Statistic::FinalEquity,
        Statistic::ProfitFactor,
        Statistic::Sharpe,
        Statistic::Sortino,
        Statistic::Maxdd,
        Statistic::MaxddMontecarlo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Average => "average",
            Statistic::Sd => "sd",
            Statistic::MeanProfit => "mean_profit",
            Statistic::MeanLoss => "mean_loss",
            Statistic::SdProfits => "sd_profits",
            Statistic::SdLosses => "sd_losses",
            Statistic::Winrate => "winrate",
            Statistic::FinalEquity => "final_equity",
            Statistic::ProfitFactor => "profit_factor",
            Statistic::Sharpe => "sharpe",
            Statistic::Sortino => "sortino",
            Statistic::Maxdd => "maxdd",
            Statistic::MaxddMontecarlo => "maxdd_montecarlo",
            Statistic::RecoveryFactor => "recovery_factor",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const ALIASES: [(&str, Statistic); 8] = [
    ("profit", Statistic::FinalEquity),
    ("pf", Statistic::ProfitFactor),
    ("sharpe_ratio", Statistic::Sharpe),
    ("sortino_ratio", Statistic::Sortino),
    ("maximum_drawdown", Statistic::Maxdd),
    ("max_drawdown", Statistic::Maxdd),
    ("max_dd", Statistic::Maxdd),
    ("rf", Statistic::RecoveryFactor),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticsMode {
    Full,
}

impl StatisticsMode {
    pub fn statistics(&self) -> &'static [Statistic] {
        match self {
            StatisticsMode::Full => &Statistic::FULL,
        }
    }
}

impl FromStr for StatisticsMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(StatisticsMode::Full),
            other => Err(EngineError::UnsupportedStatisticsMode {
                mode: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatisticValue {
    Scalar(f64),
    Distribution(MonteCarloReport),
}

impl StatisticValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            StatisticValue::Scalar(v) => Some(*v),
            StatisticValue::Distribution(_) => None,
        }
    }

    pub fn as_distribution(&self) -> Option<&MonteCarloReport> {
        match self {
            StatisticValue::Distribution(r) => Some(r),
            StatisticValue::Scalar(_) => None,
        }
    }
}

/// One result per requested statistic; a failure never hides the others.
#[derive(Debug)]
pub struct StatisticsReport {
    entries: Vec<(Statistic, Result<StatisticValue, EngineError>)>,
}

impl StatisticsReport {
    pub fn get(&self, statistic: Statistic) -> Option<&Result<StatisticValue, EngineError>> {
        self.entries
            .iter()
            .find(|(s, _)| *s == statistic)
            .map(|(_, r)| r)
    }

    pub fn scalar(&self, statistic: Statistic) -> Option<f64> {
        match self.get(statistic) {
            Some(Ok(value)) => value.as_scalar(),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Statistic, &Result<StatisticValue, EngineError>)> {
        self.entries.iter().map(|(s, r)| (*s, r))
    }

    pub fn failures(&self) -> impl Iterator<Item = (Statistic, &EngineError)> {
        self.entries.iter().filter_map(|(s, r)| match r {
            Err(e) => Some((*s, e)),
            Ok(_) => None,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Immutable name → statistic mapping, built once and passed by reference.
#[derive(Debug, Clone)]
pub struct StatisticRegistry {
    names: BTreeMap<&'static str, Statistic>,
    montecarlo: MonteCarloConfig,
}

impl Default for StatisticRegistry {
    fn default() -> Self {
        Self::new(MonteCarloConfig::default())
    }
}

impl StatisticRegistry {
    pub fn new(montecarlo: MonteCarloConfig) -> Self {
        let mut names: BTreeMap<&'static str, Statistic> = Statistic::FULL
            .iter()
            .chain(std::iter::once(&Statistic::RecoveryFactor))
            .map(|s| (s.name(), *s))
            .collect();
        names.extend(ALIASES);
        StatisticRegistry { names, montecarlo }
    }

    /// Shared registry with default Monte Carlo parameters (entropy-seeded).
    pub fn standard() -> &'static StatisticRegistry {
        static STANDARD: OnceLock<StatisticRegistry> = OnceLock::new();
        STANDARD.get_or_init(StatisticRegistry::default)
    }

    pub fn montecarlo(&self) -> &MonteCarloConfig {
        &self.montecarlo
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.names.keys().copied()
    }

    /// Case-insensitive name lookup.
    pub fn lookup(&self, name: &str) -> Result<Statistic, EngineError> {
        self.names
            .get(name.to_lowercase().as_str())
            .copied()
            .ok_or_else(|| EngineError::UnknownStatistic {
                name: name.to_string(),
            })
    }

    pub fn compute_named(&self, name: &str, changes: &[f64]) -> Result<StatisticValue, EngineError> {
        let statistic = self.lookup(name)?;
        self.compute(statistic, changes)
    }

    pub fn compute(&self, statistic: Statistic, changes: &[f64]) -> Result<StatisticValue, EngineError> {
        let scalar = match statistic {
            Statistic::Average => average(changes)?,
            Statistic::Sd => sd(changes)?,
            Statistic::MeanProfit => mean_profit(changes),
            Statistic::MeanLoss => mean_loss(changes),
            Statistic::SdProfits => sd_profits(changes),
            Statistic::SdLosses => sd_losses(changes),
            Statistic::Winrate => winrate(changes)?,
            Statistic::FinalEquity => final_equity(changes),
            Statistic::ProfitFactor => profit_factor(changes)?,
            Statistic::Sharpe => sharpe(changes)?,
            Statistic::Sortino => sortino(changes)?,
            Statistic::Maxdd => maxdd(changes),
            Statistic::RecoveryFactor => recovery_factor(changes)?,
            Statistic::MaxddMontecarlo => {
                let mut rng = self.montecarlo.rng();
                let report = maxdd_montecarlo(changes, &self.montecarlo, &mut rng)?;
                return Ok(StatisticValue::Distribution(report));
            }
        };
        Ok(StatisticValue::Scalar(scalar))
    }

    pub fn report(&self, mode: StatisticsMode, changes: &[f64]) -> StatisticsReport {
        let entries = mode
            .statistics()
            .iter()
            .map(|&s| (s, self.compute(s, changes)))
            .collect();
        StatisticsReport { entries }
    }
}

pub fn average(changes: &[f64]) -> Result<f64, EngineError> {
    if changes.is_empty() {
        return Err(EngineError::EmptyData {
            what: "average".into(),
        });
    }
    Ok(mean(changes))
}

/// Population standard deviation.
pub fn sd(changes: &[f64]) -> Result<f64, EngineError> {
    if changes.is_empty() {
        return Err(EngineError::EmptyData { what: "sd".into() });
    }
    Ok(std_dev(changes))
}

/// NaN when there are no profitable periods.
pub fn mean_profit(changes: &[f64]) -> f64 {
    mean(&profits(changes))
}

/// NaN when there are no losing periods.
pub fn mean_loss(changes: &[f64]) -> f64 {
    mean(&losses(changes))
}

pub fn sd_profits(changes: &[f64]) -> f64 {
    std_dev(&profits(changes))
}

pub fn sd_losses(changes: &[f64]) -> f64 {
    std_dev(&losses(changes))
}

/// Profitable periods per losing period.
pub fn winrate(changes: &[f64]) -> Result<f64, EngineError> {
    let wins = changes.iter().filter(|&&c| c > 0.0).count();
    let lost = changes.iter().filter(|&&c| c < 0.0).count();
    if lost == 0 {
        return Err(degenerate(Statistic::Winrate, "no losing periods"));
    }
    Ok(wins as f64 / lost as f64)
}

pub fn final_equity(changes: &[f64]) -> f64 {
    changes.iter().sum()
}

pub fn profit_factor(changes: &[f64]) -> Result<f64, EngineError> {
    let gross_profit: f64 = profits(changes).iter().sum();
    let gross_loss: f64 = losses(changes).iter().sum::<f64>().abs();
    if gross_loss == 0.0 {
        return Err(degenerate(Statistic::ProfitFactor, "no losses"));
    }
    Ok(gross_profit / gross_loss)
}

pub fn sharpe(changes: &[f64]) -> Result<f64, EngineError> {
    let avg = average(changes)?;
    let deviation = sd(changes)?;
    if deviation == 0.0 {
        return Err(degenerate(Statistic::Sharpe, "zero standard deviation"));
    }
    Ok(avg / deviation)
}

pub fn sortino(changes: &[f64]) -> Result<f64, EngineError> {
    let avg = average(changes)?;
    let downside = sd_losses(changes);
    if downside.is_nan() {
        return Err(degenerate(Statistic::Sortino, "no losing periods"));
    }
    if downside == 0.0 {
        return Err(degenerate(Statistic::Sortino, "zero downside deviation"));
    }
    Ok(avg / downside)
}

/// Largest peak-to-trough decline of the cumulative sum, with the peak
/// starting at zero equity.
pub fn maxdd(changes: &[f64]) -> f64 {
    let mut peak = 0.0_f64;
    let mut equity = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for change in changes {
        equity += change;
        if equity > peak {
            peak = equity;
        }
        if peak - equity > max_dd {
            max_dd = peak - equity;
        }
    }
    max_dd
}

pub fn recovery_factor(changes: &[f64]) -> Result<f64, EngineError> {
    let dd = maxdd(changes);
    if dd == 0.0 {
        return Err(degenerate(Statistic::RecoveryFactor, "zero drawdown"));
    }
    Ok(final_equity(changes) / dd)
}

fn profits(changes: &[f64]) -> Vec<f64> {
    changes.iter().copied().filter(|&c| c > 0.0).collect()
}

fn losses(changes: &[f64]) -> Vec<f64> {
    changes.iter().copied().filter(|&c| c < 0.0).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.is_nan() {
        return f64::NAN;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn degenerate(statistic: Statistic, reason: &str) -> EngineError {
    EngineError::DegenerateStatistic {
        statistic: statistic.name().to_string(),
        reason: reason.to_string(),
    }
}
