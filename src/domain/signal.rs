//! Named signal columns as handed over by a signal producer.
//!
//! Columns arrive dynamically typed (the producer may hand over integer or
//! float flags); the position resolver only accepts boolean columns.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::EngineError;
use super::series::{Series, Timestamp, check_ordered};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalName {
    LongEntry,
    LongExit,
    ShortEntry,
    ShortExit,
    Long,
    Short,
}

impl SignalName {
    pub const ALL: [SignalName; 6] = [
        SignalName::LongEntry,
        SignalName::LongExit,
        SignalName::ShortEntry,
        SignalName::ShortExit,
        SignalName::Long,
        SignalName::Short,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalName::LongEntry => "long_entry",
            SignalName::LongExit => "long_exit",
            SignalName::ShortEntry => "short_entry",
            SignalName::ShortExit => "short_exit",
            SignalName::Long => "long",
            SignalName::Short => "short",
        }
    }

    /// Names belonging to the entry/exit vocabulary.
    pub fn is_event(&self) -> bool {
        !matches!(self, SignalName::Long | SignalName::Short)
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalName {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        SignalName::ALL
            .into_iter()
            .find(|n| n.as_str() == lowered)
            .ok_or_else(|| EngineError::Data {
                reason: format!("unknown signal name `{}`", s.trim()),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalData {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl SignalData {
    pub fn dtype(&self) -> &'static str {
        match self {
            SignalData::Bool(_) => "bool",
            SignalData::Int(_) => "int",
            SignalData::Float(_) => "float",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SignalData::Bool(v) => v.len(),
            SignalData::Int(v) => v.len(),
            SignalData::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One signal column with its own index.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    index: Vec<Timestamp>,
    data: SignalData,
}

impl Signal {
    pub fn new(index: Vec<Timestamp>, data: SignalData) -> Result<Self, EngineError> {
        if index.len() != data.len() {
            return Err(EngineError::LengthMismatch {
                index: index.len(),
                values: data.len(),
            });
        }
        check_ordered(&index)?;
        Ok(Signal { index, data })
    }

    pub fn index(&self) -> &[Timestamp] {
        &self.index
    }

    pub fn data(&self) -> &SignalData {
        &self.data
    }

    /// Boolean view of the column; any other dtype is a `SignalType` error.
    pub fn to_bools(&self, name: SignalName) -> Result<Series<bool>, EngineError> {
        match &self.data {
            SignalData::Bool(v) => Series::new(self.index.clone(), v.clone()),
            other => Err(EngineError::SignalType {
                name: name.to_string(),
                dtype: other.dtype().to_string(),
            }),
        }
    }
}

/// Mapping from signal name to column. Absent names are simply not set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSet {
    signals: BTreeMap<SignalName, Signal>,
}

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: SignalName, signal: Signal) -> Self {
        self.insert(name, signal);
        self
    }

    pub fn with_bools(
        self,
        name: SignalName,
        index: Vec<Timestamp>,
        values: Vec<bool>,
    ) -> Result<Self, EngineError> {
        let signal = Signal::new(index, SignalData::Bool(values))?;
        Ok(self.with(name, signal))
    }

    pub fn insert(&mut self, name: SignalName, signal: Signal) -> Option<Signal> {
        self.signals.insert(name, signal)
    }

    pub fn get(&self, name: SignalName) -> Option<&Signal> {
        self.signals.get(&name)
    }

    pub fn names(&self) -> impl Iterator<Item = SignalName> + '_ {
        self.signals.keys().copied()
    }
}
