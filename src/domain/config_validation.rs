//! Configuration validation.
//!
//! Every key is checked before any data is loaded. Numeric keys are read as
//! raw strings so that a malformed value is reported instead of silently
//! replaced by its default.

use crate::domain::backtest::ReturnStream;
use crate::domain::error::EngineError;
use crate::domain::statistics::StatisticsMode;
use crate::ports::config_port::ConfigPort;
use std::str::FromStr;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), EngineError> {
    validate_data_path(config)?;
    validate_montecarlo(config)?;
    validate_statistics(config)?;
    Ok(())
}

pub fn validate_montecarlo(config: &dyn ConfigPort) -> Result<(), EngineError> {
    validate_runs(config)?;
    validate_length(config)?;
    parse_optional::<usize>(config, "montecarlo", "serial_dependence")?;
    parse_optional::<u64>(config, "montecarlo", "seed")?;
    validate_quantiles(config)?;
    Ok(())
}

pub fn validate_statistics(config: &dyn ConfigPort) -> Result<(), EngineError> {
    parse_optional::<StatisticsMode>(config, "statistics", "mode")?;
    parse_optional::<ReturnStream>(config, "statistics", "curve")?;
    Ok(())
}

/// Parse `[section] key` when present. Blank values count as absent.
pub fn parse_optional<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, EngineError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match config.get_string(section, key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| EngineError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            }),
        _ => Ok(None),
    }
}

/// The `[data] symbol` key, required unless supplied another way.
pub fn require_symbol(config: &dyn ConfigPort) -> Result<String, EngineError> {
    match config.get_string("data", "symbol") {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(EngineError::ConfigMissing {
            section: "data".to_string(),
            key: "symbol".to_string(),
        }),
    }
}

fn validate_data_path(config: &dyn ConfigPort) -> Result<(), EngineError> {
    match config.get_string("data", "path") {
        Some(s) if s.trim().is_empty() => Err(EngineError::ConfigInvalid {
            section: "data".to_string(),
            key: "path".to_string(),
            reason: "path must not be blank".to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_runs(config: &dyn ConfigPort) -> Result<(), EngineError> {
    if let Some(0) = parse_optional::<usize>(config, "montecarlo", "runs")? {
        return Err(EngineError::ConfigInvalid {
            section: "montecarlo".to_string(),
            key: "runs".to_string(),
            reason: "runs must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_length(config: &dyn ConfigPort) -> Result<(), EngineError> {
    if let Some(0) = parse_optional::<usize>(config, "montecarlo", "length")? {
        return Err(EngineError::ConfigInvalid {
            section: "montecarlo".to_string(),
            key: "length".to_string(),
            reason: "length must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_quantiles(config: &dyn ConfigPort) -> Result<(), EngineError> {
    if config.get_string("montecarlo", "quantiles").is_none() {
        return Ok(());
    }
    let invalid = |reason: &str| EngineError::ConfigInvalid {
        section: "montecarlo".to_string(),
        key: "quantiles".to_string(),
        reason: reason.to_string(),
    };
    let levels = config
        .get_double_list("montecarlo", "quantiles")
        .ok_or_else(|| invalid("quantiles must be a comma-separated list of numbers"))?;
    if levels.iter().any(|q| !(0.0..=1.0).contains(q)) {
        return Err(invalid("quantiles must be between 0 and 1"));
    }
    Ok(())
}
