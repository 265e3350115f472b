//! Time-indexed series shared by every engine component.

use chrono::NaiveDateTime;

use super::error::EngineError;

pub type Timestamp = NaiveDateTime;

/// Ordered `(timestamp, value)` pairs with a non-decreasing index.
#[derive(Debug, Clone, PartialEq)]
pub struct Series<T> {
    index: Vec<Timestamp>,
    values: Vec<T>,
}

impl<T> Series<T> {
    pub fn new(index: Vec<Timestamp>, values: Vec<T>) -> Result<Self, EngineError> {
        if index.len() != values.len() {
            return Err(EngineError::LengthMismatch {
                index: index.len(),
                values: values.len(),
            });
        }
        check_ordered(&index)?;
        Ok(Series { index, values })
    }

    /// Caller guarantees equal lengths and a non-decreasing index.
    pub(crate) fn from_ordered(index: Vec<Timestamp>, values: Vec<T>) -> Self {
        debug_assert_eq!(index.len(), values.len());
        Series { index, values }
    }

    pub fn empty() -> Self {
        Series {
            index: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn index(&self) -> &[Timestamp] {
        &self.index
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<(Timestamp, &T)> {
        self.values.get(i).map(|v| (self.index[i], v))
    }

    pub fn last(&self) -> Option<(Timestamp, &T)> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// True when both series carry the identical index.
    pub fn shares_index<U>(&self, other: &Series<U>) -> bool {
        self.index == other.index
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, &T)> + '_ {
        self.index.iter().copied().zip(self.values.iter())
    }

    /// Re-attach this series' index to freshly computed values of the same length.
    pub(crate) fn with_values<U>(&self, values: Vec<U>) -> Series<U> {
        debug_assert_eq!(values.len(), self.index.len());
        Series {
            index: self.index.clone(),
            values,
        }
    }

    pub fn into_parts(self) -> (Vec<Timestamp>, Vec<T>) {
        (self.index, self.values)
    }
}

pub(crate) fn check_ordered(index: &[Timestamp]) -> Result<(), EngineError> {
    match index.windows(2).position(|w| w[1] < w[0]) {
        Some(i) => Err(EngineError::UnorderedIndex { position: i + 1 }),
        None => Ok(()),
    }
}
