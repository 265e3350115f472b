//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{fast_execute, ExecutionFrame, ReturnStream};
use crate::domain::config_validation::{parse_optional, require_symbol, validate_config};
use crate::domain::equity::{EquityCalculator, EquityCurve};
use crate::domain::series::Timestamp;
use crate::domain::error::EngineError;
use crate::domain::montecarlo::{MonteCarloConfig, DEFAULT_QUANTILES, DEFAULT_RUNS};
use crate::domain::position::{conflicting_entries, resolve_positions};
use crate::domain::statistics::{StatisticRegistry, StatisticValue, StatisticsReport};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "equitrack", about = "Equity curve simulation and strategy statistics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve signals into positions and run the vectorized backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Replay prices and a trade log through the equity calculator
    Replay {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            data_dir,
        } => run_backtest(&config, symbol.as_deref(), data_dir.as_ref()),
        Command::Replay {
            config,
            symbol,
            data_dir,
        } => run_replay(&config, symbol.as_deref(), data_dir.as_ref()),
        Command::Validate { config } => run_validate(&config),
    }
}

/// Everything a run needs besides the data itself.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub symbol: String,
    pub data_dir: PathBuf,
    pub mode: String,
    pub curve: ReturnStream,
    pub montecarlo: MonteCarloConfig,
}

pub struct BacktestOutcome {
    pub frame: ExecutionFrame,
    pub curve: EquityCurve,
    pub report: StatisticsReport,
    /// Bars where `long_entry` and `short_entry` both fired.
    pub conflicting_entries: Vec<Timestamp>,
}

/// The trades curve is empty when no fill was replayed, so its report is
/// kept separately from the full curve's.
pub struct ReplayOutcome {
    pub calculator: EquityCalculator,
    pub full_report: StatisticsReport,
    pub trades_report: Result<StatisticsReport, EngineError>,
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn build_montecarlo_config(config: &dyn ConfigPort) -> Result<MonteCarloConfig, EngineError> {
    let quantiles = match config.get_string("montecarlo", "quantiles") {
        Some(_) => config
            .get_double_list("montecarlo", "quantiles")
            .ok_or_else(|| EngineError::ConfigInvalid {
                section: "montecarlo".into(),
                key: "quantiles".into(),
                reason: "quantiles must be a comma-separated list of numbers".into(),
            })?,
        None => DEFAULT_QUANTILES.to_vec(),
    };

    Ok(MonteCarloConfig {
        runs: parse_optional(config, "montecarlo", "runs")?.unwrap_or(DEFAULT_RUNS),
        length: parse_optional(config, "montecarlo", "length")?,
        serial_dependence: parse_optional(config, "montecarlo", "serial_dependence")?,
        quantiles,
        seed: parse_optional(config, "montecarlo", "seed")?,
    })
}

/// Validate the config and merge in command-line overrides.
pub fn build_run_settings(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
    data_dir_override: Option<&PathBuf>,
) -> Result<RunSettings, EngineError> {
    validate_config(config)?;

    let symbol = match symbol_override {
        Some(s) => s.to_string(),
        None => require_symbol(config)?,
    };
    let data_dir = match data_dir_override {
        Some(dir) => dir.clone(),
        None => PathBuf::from(
            config
                .get_string("data", "path")
                .unwrap_or_else(|| ".".to_string()),
        ),
    };

    Ok(RunSettings {
        symbol,
        data_dir,
        mode: config
            .get_string("statistics", "mode")
            .unwrap_or_else(|| "full".to_string()),
        curve: parse_optional(config, "statistics", "curve")?.unwrap_or(ReturnStream::Trades),
        montecarlo: build_montecarlo_config(config)?,
    })
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    settings: &RunSettings,
) -> Result<BacktestOutcome, EngineError> {
    let prices = data_port.fetch_prices(&settings.symbol)?;
    let signals = data_port.fetch_signals(&settings.symbol)?;
    eprintln!(
        "Loaded {} bars and {} signal columns for {}",
        prices.len(),
        signals.names().count(),
        settings.symbol
    );

    let positions = resolve_positions(&signals)?;
    let conflicts = conflicting_entries(&signals)?;
    if !conflicts.is_empty() {
        eprintln!(
            "warning: long_entry and short_entry both fire on {} bar(s), first at {}; held flat",
            conflicts.len(),
            conflicts[0]
        );
    }
    let frame = fast_execute(&prices, &positions)?;
    let curve = frame.to_equity_curve(settings.curve)?;
    eprintln!(
        "Backtest complete: {} bars, {} crossing points",
        frame.len(),
        frame.crosspoint.iter().filter(|&&c| c == 1).count()
    );

    let registry = StatisticRegistry::new(settings.montecarlo.clone());
    let report = curve.statistics_with(&registry, &settings.mode)?;
    Ok(BacktestOutcome {
        frame,
        curve,
        report,
        conflicting_entries: conflicts,
    })
}

pub fn run_replay_pipeline(
    data_port: &dyn DataPort,
    settings: &RunSettings,
) -> Result<ReplayOutcome, EngineError> {
    let prices = data_port.fetch_prices(&settings.symbol)?;
    let fills = data_port.fetch_trades(&settings.symbol)?;
    eprintln!(
        "Replaying {} price ticks and {} fills for {}",
        prices.len(),
        fills.len(),
        settings.symbol
    );

    let mut calculator = EquityCalculator::new();
    let mut ticks = prices.iter().peekable();
    let mut fills = fills.into_iter().peekable();
    loop {
        // A tick is applied before a fill carrying the same timestamp.
        let tick_first = match (ticks.peek(), fills.peek()) {
            (Some((ts, _)), Some(fill)) => *ts <= fill.timestamp,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        if tick_first {
            if let Some((ts, price)) = ticks.next() {
                calculator.new_price(ts, *price)?;
            }
        } else if let Some(fill) = fills.next() {
            calculator.new_trade(fill.timestamp, fill.price, fill.volume, fill.direction)?;
        }
    }

    let registry = StatisticRegistry::new(settings.montecarlo.clone());
    let full_report = calculator
        .full_curve()
        .statistics_with(&registry, &settings.mode)?;
    let trades_report = calculator
        .trades_curve()
        .statistics_with(&registry, &settings.mode);
    Ok(ReplayOutcome {
        calculator,
        full_report,
        trades_report,
    })
}

/// Render a report as aligned `name value` lines; failures keep their row.
pub fn format_report(title: &str, report: &StatisticsReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {title} ===");
    for (statistic, result) in report.iter() {
        let name = statistic.name();
        match result {
            Ok(StatisticValue::Scalar(v)) => {
                let _ = writeln!(out, "{name:<18}{v:.6}");
            }
            Ok(StatisticValue::Distribution(mc)) => {
                let _ = writeln!(
                    out,
                    "{name:<18}mean {:.6}  sd {:.6}  runs {}",
                    mc.mean,
                    mc.sd,
                    mc.samples.len()
                );
                for (level, value) in &mc.quantiles {
                    let _ = writeln!(out, "{:<18}q{level:<8}{value:.6}", "");
                }
            }
            Err(e) => {
                let _ = writeln!(out, "{name:<18}error: {e}");
            }
        }
    }
    out
}

/// A report section whose curve could not be evaluated at all.
pub fn format_failed_section(title: &str, err: &EngineError) -> String {
    format!("=== {title} ===\nerror: {err}\n")
}

fn prepare(
    config_path: &Path,
    symbol: Option<&str>,
    data_dir: Option<&PathBuf>,
) -> Result<RunSettings, ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    build_run_settings(&adapter, symbol, data_dir).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn run_backtest(config_path: &Path, symbol: Option<&str>, data_dir: Option<&PathBuf>) -> ExitCode {
    let settings = match prepare(config_path, symbol, data_dir) {
        Ok(s) => s,
        Err(code) => return code,
    };
    eprintln!("Reading data from {}", settings.data_dir.display());
    let data_port = CsvAdapter::new(settings.data_dir.clone());

    match run_backtest_pipeline(&data_port, &settings) {
        Ok(outcome) => {
            let title = match settings.curve {
                ReturnStream::Trades => "Trade Returns",
                ReturnStream::Bars => "Bar Returns",
            };
            print!("{}", format_report(title, &outcome.report));
            report_failures(&outcome.report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_replay(config_path: &Path, symbol: Option<&str>, data_dir: Option<&PathBuf>) -> ExitCode {
    let settings = match prepare(config_path, symbol, data_dir) {
        Ok(s) => s,
        Err(code) => return code,
    };
    eprintln!("Reading data from {}", settings.data_dir.display());
    let data_port = CsvAdapter::new(settings.data_dir.clone());

    match run_replay_pipeline(&data_port, &settings) {
        Ok(outcome) => {
            eprintln!(
                "Final position {} with cash {:.2}",
                outcome.calculator.position(),
                outcome.calculator.var()
            );
            print!("{}", format_report("Full Curve", &outcome.full_report));
            println!();
            report_failures(&outcome.full_report);
            match &outcome.trades_report {
                Ok(report) => {
                    print!("{}", format_report("Trades Curve", report));
                    report_failures(report);
                }
                Err(e) => {
                    print!("{}", format_failed_section("Trades Curve", e));
                    eprintln!("warning: trades curve: {e}");
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    match build_montecarlo_config(&adapter) {
        Ok(mc) => {
            eprintln!(
                "Monte Carlo: {} runs, {:?} resampling, quantiles {:?}",
                mc.runs,
                mc.scheme(),
                mc.quantiles
            );
        }
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }
    eprintln!("Config validated successfully");
    ExitCode::SUCCESS
}

fn report_failures(report: &StatisticsReport) {
    let failed = report.failures().count();
    if failed > 0 {
        eprintln!("warning: {failed} statistic(s) could not be computed");
    }
}
