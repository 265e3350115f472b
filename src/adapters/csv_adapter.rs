//! CSV file data adapter.
//!
//! Reads `<symbol>_prices.csv`, `<symbol>_signals.csv` and
//! `<symbol>_trades.csv` from a base directory.

use crate::domain::equity::TradeDirection;
use crate::domain::error::EngineError;
use crate::domain::series::{check_ordered, Series, Timestamp};
use crate::domain::signal::{Signal, SignalData, SignalName, SignalSet};
use crate::ports::data_port::{DataPort, TradeFill};
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, kind: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, kind))
    }

    fn read(&self, symbol: &str, kind: &str) -> Result<(StringRecord, Vec<StringRecord>), EngineError> {
        let path = self.csv_path(symbol, kind);
        let content = fs::read_to_string(&path).map_err(|e| EngineError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| EngineError::Data {
                reason: format!("CSV header error in {}: {}", path.display(), e),
            })?
            .clone();
        let records = rdr
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| EngineError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
        Ok((headers, records))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_prices(&self, symbol: &str) -> Result<Series<f64>, EngineError> {
        let (_, records) = self.read(symbol, "prices")?;
        let mut index = Vec::with_capacity(records.len());
        let mut prices = Vec::with_capacity(records.len());
        for record in &records {
            index.push(parse_timestamp(field(record, 0, "timestamp")?)?);
            prices.push(parse_f64(record, 1, "price")?);
        }
        Series::new(index, prices)
    }

    fn fetch_signals(&self, symbol: &str) -> Result<SignalSet, EngineError> {
        let (headers, records) = self.read(symbol, "signals")?;
        let names = headers
            .iter()
            .skip(1)
            .map(str::parse::<SignalName>)
            .collect::<Result<Vec<_>, _>>()?;

        let mut index = Vec::with_capacity(records.len());
        let mut columns: Vec<Vec<&str>> = vec![Vec::with_capacity(records.len()); names.len()];
        for record in &records {
            index.push(parse_timestamp(field(record, 0, "timestamp")?)?);
            for (i, column) in columns.iter_mut().enumerate() {
                column.push(field(record, i + 1, names[i].as_str())?);
            }
        }

        let mut signals = SignalSet::new();
        for (name, raw) in names.into_iter().zip(columns) {
            let signal = Signal::new(index.clone(), infer_column(name, &raw)?)?;
            if signals.insert(name, signal).is_some() {
                return Err(EngineError::Data {
                    reason: format!("duplicate signal column `{}`", name),
                });
            }
        }
        Ok(signals)
    }

    fn fetch_trades(&self, symbol: &str) -> Result<Vec<TradeFill>, EngineError> {
        let (_, records) = self.read(symbol, "trades")?;
        let fills = records
            .iter()
            .map(|record| -> Result<TradeFill, EngineError> {
                Ok(TradeFill {
                    timestamp: parse_timestamp(field(record, 0, "timestamp")?)?,
                    price: parse_f64(record, 1, "price")?,
                    volume: parse_f64(record, 2, "volume")?,
                    direction: field(record, 3, "direction")?.parse::<TradeDirection>()?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let times: Vec<Timestamp> = fills.iter().map(|f| f.timestamp).collect();
        check_ordered(&times)?;
        Ok(fills)
    }
}

fn field<'a>(record: &'a StringRecord, i: usize, name: &str) -> Result<&'a str, EngineError> {
    record.get(i).ok_or_else(|| EngineError::Data {
        reason: format!("missing {} column", name),
    })
}

fn parse_f64(record: &StringRecord, i: usize, name: &str) -> Result<f64, EngineError> {
    field(record, i, name)?
        .parse()
        .map_err(|e| EngineError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

/// Accepts `YYYY-MM-DD HH:MM:SS` or a bare date at midnight.
fn parse_timestamp(raw: &str) -> Result<Timestamp, EngineError> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(ts);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| EngineError::Data {
            reason: format!("invalid timestamp `{}`, expected YYYY-MM-DD[ HH:MM:SS]", raw),
        })
}

fn infer_column(name: SignalName, raw: &[&str]) -> Result<SignalData, EngineError> {
    let bools: Option<Vec<bool>> = raw
        .iter()
        .map(|v| match v.to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        })
        .collect();
    if let Some(values) = bools {
        return Ok(SignalData::Bool(values));
    }
    if let Ok(values) = raw
        .iter()
        .map(|v| v.parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
    {
        return Ok(SignalData::Int(values));
    }
    raw.iter()
        .map(|v| v.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map(SignalData::Float)
        .map_err(|e| EngineError::Data {
            reason: format!("invalid value in signal column `{}`: {}", name, e),
        })
}
