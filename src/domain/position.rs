//! Signal-to-position resolution.
//!
//! Two policies with different temporal semantics:
//! - entry/exit (`long_entry`, `long_exit`, `short_entry`, `short_exit`):
//!   events set a target and the target is held until the next event;
//! - state (`long`, `short`): the position is recomputed from scratch on
//!   every bar, with no memory of earlier bars.

use super::error::EngineError;
use super::series::{Series, Timestamp};
use super::signal::{SignalName, SignalSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverMode {
    EntryExit,
    State,
}

impl ResolverMode {
    /// Select the policy from the vocabulary present in `signals`.
    pub fn detect(signals: &SignalSet) -> Result<Self, EngineError> {
        let has_events = signals.names().any(|n| n.is_event());
        let has_state = signals.names().any(|n| !n.is_event());
        match (has_events, has_state) {
            (true, true) => Err(EngineError::MixedSignalVocabulary),
            (true, false) => Ok(ResolverMode::EntryExit),
            (false, true) => Ok(ResolverMode::State),
            (false, false) => Err(EngineError::MissingEntrySignal),
        }
    }
}

/// Resolve a signal set with the policy its vocabulary selects.
pub fn resolve_positions(signals: &SignalSet) -> Result<Series<f64>, EngineError> {
    let mode = ResolverMode::detect(signals)?;
    tracing::debug!(?mode, "resolving positions");
    match mode {
        ResolverMode::EntryExit => entry_exit_positions(signals),
        ResolverMode::State => state_positions(signals),
    }
}

/// Entry/exit policy: forward-filled long and short legs, summed.
///
/// The long leg is set to 1 on `long_entry` and reset to 0 on `long_exit` or
/// `short_entry`; the short leg mirrors it with -1. Later rules win on the
/// same bar, so a bar where both entries fire leaves both legs at 0.
/// Bars before the first event are 0.
pub fn entry_exit_positions(signals: &SignalSet) -> Result<Series<f64>, EngineError> {
    let long_entry = bool_signal(signals, SignalName::LongEntry)?;
    let short_entry = bool_signal(signals, SignalName::ShortEntry)?;

    let index: Vec<Timestamp> = match (&long_entry, &short_entry) {
        (None, None) => return Err(EngineError::MissingEntrySignal),
        (Some(l), Some(s)) => {
            ensure_same_index(l, s, SignalName::LongEntry, SignalName::ShortEntry)?;
            l.index().to_vec()
        }
        (Some(l), None) => l.index().to_vec(),
        (None, Some(s)) => s.index().to_vec(),
    };

    let long_exit = paired_exit(
        signals,
        SignalName::LongExit,
        SignalName::LongEntry,
        long_entry.as_ref(),
    )?;
    let short_exit = paired_exit(
        signals,
        SignalName::ShortExit,
        SignalName::ShortEntry,
        short_entry.as_ref(),
    )?;

    let n = index.len();
    let mut total = vec![0.0; n];

    if let Some(entry) = &long_entry {
        let mut leg: Vec<Option<f64>> = vec![None; n];
        mark(&mut leg, entry, 1.0);
        if let Some(exit) = &long_exit {
            mark(&mut leg, exit, 0.0);
        }
        if let Some(opposite) = &short_entry {
            mark(&mut leg, opposite, 0.0);
        }
        add_forward_filled(&mut total, &leg);
    }

    if let Some(entry) = &short_entry {
        let mut leg: Vec<Option<f64>> = vec![None; n];
        mark(&mut leg, entry, -1.0);
        if let Some(exit) = &short_exit {
            mark(&mut leg, exit, 0.0);
        }
        if let Some(opposite) = &long_entry {
            mark(&mut leg, opposite, 0.0);
        }
        add_forward_filled(&mut total, &leg);
    }

    if let (Some(l), Some(s)) = (&long_entry, &short_entry) {
        for ts in both_fire(l, s) {
            tracing::warn!(%ts, "long_entry and short_entry fire together; position is flat");
        }
    }

    Series::new(index, total)
}

/// State policy: `+1` where `long` holds, `-1` where `short` holds, summed.
pub fn state_positions(signals: &SignalSet) -> Result<Series<f64>, EngineError> {
    let long = bool_signal(signals, SignalName::Long)?;
    let short = bool_signal(signals, SignalName::Short)?;

    let base = match (&long, &short) {
        (None, None) => return Err(EngineError::MissingEntrySignal),
        (Some(l), Some(s)) => {
            ensure_same_index(l, s, SignalName::Long, SignalName::Short)?;
            l
        }
        (Some(l), None) => l,
        (None, Some(s)) => s,
    };

    let mut total = vec![0.0; base.len()];
    if let Some(l) = &long {
        for (p, &on) in total.iter_mut().zip(l.values()) {
            if on {
                *p += 1.0;
            }
        }
    }
    if let Some(s) = &short {
        for (p, &on) in total.iter_mut().zip(s.values()) {
            if on {
                *p -= 1.0;
            }
        }
    }

    Ok(base.with_values(total))
}

/// Bars where `long_entry` and `short_entry` are both true. Empty when
/// either column is absent.
pub fn conflicting_entries(signals: &SignalSet) -> Result<Vec<Timestamp>, EngineError> {
    let long_entry = bool_signal(signals, SignalName::LongEntry)?;
    let short_entry = bool_signal(signals, SignalName::ShortEntry)?;
    match (&long_entry, &short_entry) {
        (Some(l), Some(s)) => {
            ensure_same_index(l, s, SignalName::LongEntry, SignalName::ShortEntry)?;
            Ok(both_fire(l, s))
        }
        _ => Ok(Vec::new()),
    }
}

fn both_fire(a: &Series<bool>, b: &Series<bool>) -> Vec<Timestamp> {
    a.iter()
        .zip(b.values())
        .filter(|((_, x), y)| **x && **y)
        .map(|((ts, _), _)| ts)
        .collect()
}

fn bool_signal(signals: &SignalSet, name: SignalName) -> Result<Option<Series<bool>>, EngineError> {
    signals.get(name).map(|s| s.to_bools(name)).transpose()
}

fn paired_exit(
    signals: &SignalSet,
    exit: SignalName,
    entry: SignalName,
    entry_series: Option<&Series<bool>>,
) -> Result<Option<Series<bool>>, EngineError> {
    let Some(signal) = signals.get(exit) else {
        return Ok(None);
    };
    let Some(entry_series) = entry_series else {
        return Err(EngineError::OrphanExitSignal {
            exit: exit.to_string(),
            entry: entry.to_string(),
        });
    };
    let series = signal.to_bools(exit)?;
    ensure_same_index(&series, entry_series, exit, entry)?;
    Ok(Some(series))
}

fn ensure_same_index(
    a: &Series<bool>,
    b: &Series<bool>,
    a_name: SignalName,
    b_name: SignalName,
) -> Result<(), EngineError> {
    if a.shares_index(b) {
        Ok(())
    } else {
        Err(EngineError::IndexMismatch {
            left: a_name.to_string(),
            right: b_name.to_string(),
        })
    }
}

fn mark(leg: &mut [Option<f64>], mask: &Series<bool>, value: f64) {
    for (slot, &on) in leg.iter_mut().zip(mask.values()) {
        if on {
            *slot = Some(value);
        }
    }
}

fn add_forward_filled(total: &mut [f64], leg: &[Option<f64>]) {
    let mut held = 0.0;
    for (t, slot) in total.iter_mut().zip(leg) {
        if let Some(v) = slot {
            held = *v;
        }
        *t += held;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::{Signal, SignalData};
    use chrono::NaiveDate;

    fn index(n: u32) -> Vec<Timestamp> {
        (1..=n)
            .map(|d| {
                NaiveDate::from_ymd_opt(2024, 3, d)
                    .unwrap()
                    .and_hms_opt(9, 30, 0)
                    .unwrap()
            })
            .collect()
    }

    fn bools(s: &str) -> Vec<bool> {
        s.chars().map(|c| c == 'T').collect()
    }

    fn set(entries: &[(SignalName, &str)]) -> SignalSet {
        entries.iter().fold(SignalSet::new(), |acc, (name, pattern)| {
            let values = bools(pattern);
            let idx = index(values.len() as u32);
            acc.with_bools(*name, idx, values).unwrap()
        })
    }

    #[test]
    fn long_entry_exit_forward_fills() {
        let signals = set(&[
            (SignalName::LongEntry, "TFFF"),
            (SignalName::LongExit, "FFTF"),
        ]);
        let p = resolve_positions(&signals).unwrap();
        assert_eq!(p.values(), &[1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn leading_bars_without_event_are_flat() {
        let signals = set(&[(SignalName::LongEntry, "FFTF")]);
        let p = entry_exit_positions(&signals).unwrap();
        assert_eq!(p.values(), &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn short_entry_closes_long_and_opens_short() {
        let signals = set(&[
            (SignalName::LongEntry, "TFFFF"),
            (SignalName::ShortEntry, "FFTFF"),
            (SignalName::ShortExit, "FFFFT"),
        ]);
        let p = entry_exit_positions(&signals).unwrap();
        assert_eq!(p.values(), &[1.0, 1.0, -1.0, -1.0, 0.0]);
    }

    #[test]
    fn short_only_entry_exit() {
        let signals = set(&[
            (SignalName::ShortEntry, "FTFF"),
            (SignalName::ShortExit, "FFFT"),
        ]);
        let p = entry_exit_positions(&signals).unwrap();
        assert_eq!(p.values(), &[0.0, -1.0, -1.0, 0.0]);
    }

    #[test]
    fn simultaneous_entries_are_flat() {
        let signals = set(&[
            (SignalName::LongEntry, "TFTF"),
            (SignalName::ShortEntry, "FFTF"),
        ]);
        let p = entry_exit_positions(&signals).unwrap();
        assert_eq!(p.values(), &[1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn conflicting_entries_lists_shared_bars() {
        let signals = set(&[
            (SignalName::LongEntry, "TFTFT"),
            (SignalName::ShortEntry, "FFTFT"),
        ]);
        let idx = index(5);
        assert_eq!(conflicting_entries(&signals).unwrap(), vec![idx[2], idx[4]]);
    }

    #[test]
    fn conflicting_entries_empty_for_one_sided_or_state_sets() {
        let long_only = set(&[(SignalName::LongEntry, "TT")]);
        let state = set(&[(SignalName::Long, "TT"), (SignalName::Short, "TT")]);
        assert!(conflicting_entries(&long_only).unwrap().is_empty());
        assert!(conflicting_entries(&state).unwrap().is_empty());
    }

    #[test]
    fn exit_and_entry_on_same_bar_exit_wins() {
        let signals = set(&[
            (SignalName::LongEntry, "TFT"),
            (SignalName::LongExit, "FFT"),
        ]);
        let p = entry_exit_positions(&signals).unwrap();
        assert_eq!(p.values(), &[1.0, 1.0, 0.0]);
    }

    #[test]
    fn state_mode_has_no_memory() {
        let signals = set(&[(SignalName::Long, "TFTF"), (SignalName::Short, "FFFF")]);
        let p = resolve_positions(&signals).unwrap();
        assert_eq!(p.values(), &[1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn state_mode_sums_legs() {
        let signals = set(&[(SignalName::Long, "TTFF"), (SignalName::Short, "FTTF")]);
        let p = state_positions(&signals).unwrap();
        assert_eq!(p.values(), &[1.0, 0.0, -1.0, 0.0]);
    }

    #[test]
    fn state_mode_short_only() {
        let signals = set(&[(SignalName::Short, "FTF")]);
        let p = state_positions(&signals).unwrap();
        assert_eq!(p.values(), &[0.0, -1.0, 0.0]);
    }

    #[test]
    fn non_bool_entry_is_signal_error() {
        let signals = SignalSet::new().with(
            SignalName::LongEntry,
            Signal::new(index(3), SignalData::Float(vec![1.0, 0.0, 0.0])).unwrap(),
        );
        let err = resolve_positions(&signals).unwrap_err();
        assert!(matches!(err, EngineError::SignalType { .. }));
    }

    #[test]
    fn non_bool_exit_is_signal_error() {
        let signals = set(&[(SignalName::LongEntry, "TFF")]).with(
            SignalName::LongExit,
            Signal::new(index(3), SignalData::Int(vec![0, 0, 1])).unwrap(),
        );
        let err = resolve_positions(&signals).unwrap_err();
        assert!(matches!(err, EngineError::SignalType { ref name, .. } if name == "long_exit"));
    }

    #[test]
    fn mismatched_entry_indices_fail() {
        let long = Signal::new(index(3), SignalData::Bool(bools("TFF"))).unwrap();
        let short = Signal::new(index(4), SignalData::Bool(bools("FFTF"))).unwrap();
        let signals = SignalSet::new()
            .with(SignalName::LongEntry, long)
            .with(SignalName::ShortEntry, short);
        let err = resolve_positions(&signals).unwrap_err();
        assert!(matches!(err, EngineError::IndexMismatch { .. }));
    }

    #[test]
    fn mismatched_exit_index_fails() {
        let entry = Signal::new(index(3), SignalData::Bool(bools("TFF"))).unwrap();
        let exit = Signal::new(index(2), SignalData::Bool(bools("FT"))).unwrap();
        let signals = SignalSet::new()
            .with(SignalName::LongEntry, entry)
            .with(SignalName::LongExit, exit);
        let err = resolve_positions(&signals).unwrap_err();
        assert!(matches!(
            err,
            EngineError::IndexMismatch { ref left, ref right } if left == "long_exit" && right == "long_entry"
        ));
    }

    #[test]
    fn mismatched_state_indices_fail() {
        let long = Signal::new(index(3), SignalData::Bool(bools("TFF"))).unwrap();
        let short = Signal::new(index(2), SignalData::Bool(bools("FT"))).unwrap();
        let signals = SignalSet::new()
            .with(SignalName::Long, long)
            .with(SignalName::Short, short);
        assert!(matches!(
            state_positions(&signals),
            Err(EngineError::IndexMismatch { .. })
        ));
    }

    #[test]
    fn empty_set_is_ambiguous() {
        let err = resolve_positions(&SignalSet::new()).unwrap_err();
        assert!(matches!(err, EngineError::MissingEntrySignal));
    }

    #[test]
    fn exits_alone_are_missing_entry() {
        let signals = set(&[(SignalName::LongExit, "FT")]);
        assert!(matches!(
            entry_exit_positions(&signals),
            Err(EngineError::MissingEntrySignal)
        ));
    }

    #[test]
    fn orphan_exit_fails() {
        let signals = set(&[
            (SignalName::LongEntry, "TF"),
            (SignalName::ShortExit, "FT"),
        ]);
        let err = entry_exit_positions(&signals).unwrap_err();
        assert!(matches!(
            err,
            EngineError::OrphanExitSignal { ref exit, .. } if exit == "short_exit"
        ));
    }

    #[test]
    fn mixed_vocabulary_fails() {
        let signals = set(&[(SignalName::LongEntry, "TF"), (SignalName::Short, "FT")]);
        assert!(matches!(
            resolve_positions(&signals),
            Err(EngineError::MixedSignalVocabulary)
        ));
    }

    #[test]
    fn detect_selects_mode() {
        let events = set(&[(SignalName::ShortEntry, "TF")]);
        let state = set(&[(SignalName::Long, "TF")]);
        assert_eq!(ResolverMode::detect(&events).unwrap(), ResolverMode::EntryExit);
        assert_eq!(ResolverMode::detect(&state).unwrap(), ResolverMode::State);
    }

    #[test]
    fn resolution_is_deterministic() {
        let signals = set(&[
            (SignalName::LongEntry, "TFFTFFFT"),
            (SignalName::LongExit, "FFTFFTFF"),
            (SignalName::ShortEntry, "FFFFTFFF"),
        ]);
        let a = resolve_positions(&signals).unwrap();
        let b = resolve_positions(&signals).unwrap();
        let bits = |s: &Series<f64>| s.values().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
        assert_eq!(a.index(), b.index());
    }
}
