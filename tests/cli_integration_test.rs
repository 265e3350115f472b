//! CLI integration tests with real INI and CSV files on disk.
//!
//! Tests cover:
//! - Run settings from config files with command-line overrides
//! - Backtest and replay pipelines over `CsvAdapter`
//! - Exit codes of `cli::run` for success, config and data failures

mod common;

use approx::assert_abs_diff_eq;
use clap::Parser;
use equitrack::adapters::csv_adapter::CsvAdapter;
use equitrack::adapters::file_config_adapter::FileConfigAdapter;
use equitrack::cli::{self, Cli};
use equitrack::domain::backtest::ReturnStream;
use equitrack::domain::error::EngineError;
use equitrack::domain::statistics::Statistic;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn write_market_data(dir: &Path) {
    fs::write(
        dir.join("BHP_prices.csv"),
        "timestamp,price\n\
         2024-03-01,100\n\
         2024-03-04,100\n\
         2024-03-05,110\n\
         2024-03-06,121\n\
         2024-03-07,121\n",
    )
    .unwrap();
    fs::write(
        dir.join("BHP_signals.csv"),
        "timestamp,long_entry,long_exit\n\
         2024-03-01,false,false\n\
         2024-03-04,true,false\n\
         2024-03-05,false,false\n\
         2024-03-06,false,true\n\
         2024-03-07,false,false\n",
    )
    .unwrap();
    fs::write(
        dir.join("BHP_trades.csv"),
        "timestamp,price,volume,direction\n\
         2024-03-04,100,3,buy\n\
         2024-03-06,121,3,sell\n",
    )
    .unwrap();
}

fn config_for(dir: &Path, extra: &str) -> String {
    format!(
        "[data]\npath = {}\nsymbol = BHP\n\n[montecarlo]\nruns = 40\nseed = 17\n{}",
        dir.display(),
        extra
    )
}

fn is_success(code: ExitCode) -> bool {
    format!("{:?}", code) == format!("{:?}", ExitCode::SUCCESS)
}

fn same_code(a: ExitCode, b: ExitCode) -> bool {
    format!("{:?}", a) == format!("{:?}", b)
}

mod settings {
    use super::*;

    #[test]
    fn settings_from_file() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_ini(&config_for(dir.path(), "\n[statistics]\ncurve = bars\n"));
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();

        let settings = cli::build_run_settings(&adapter, None, None).unwrap();
        assert_eq!(settings.symbol, "BHP");
        assert_eq!(settings.data_dir, dir.path());
        assert_eq!(settings.curve, ReturnStream::Bars);
        assert_eq!(settings.montecarlo.runs, 40);
        assert_eq!(settings.montecarlo.seed, Some(17));
    }

    #[test]
    fn invalid_quantiles_rejected() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_ini(&config_for(dir.path(), "quantiles = 0.5, 2.0\n"));
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();

        let err = cli::build_run_settings(&adapter, None, None).unwrap_err();
        assert!(matches!(err, EngineError::ConfigInvalid { key, .. } if key == "quantiles"));
    }
}

mod pipelines {
    use super::*;

    #[test]
    fn backtest_over_csv_files() {
        let dir = TempDir::new().unwrap();
        write_market_data(dir.path());
        let adapter = FileConfigAdapter::from_string(&config_for(dir.path(), "")).unwrap();
        let settings = cli::build_run_settings(&adapter, None, None).unwrap();
        let port = CsvAdapter::new(settings.data_dir.clone());

        let outcome = cli::run_backtest_pipeline(&port, &settings).unwrap();
        assert_eq!(outcome.frame.positions, vec![0.0, 1.0, 1.0, 0.0, 0.0]);
        assert_abs_diff_eq!(
            outcome.report.scalar(Statistic::FinalEquity).unwrap(),
            0.21,
            epsilon = 1e-9
        );
    }

    #[test]
    fn replay_over_csv_files() {
        let dir = TempDir::new().unwrap();
        write_market_data(dir.path());
        let adapter = FileConfigAdapter::from_string(&config_for(dir.path(), "")).unwrap();
        let settings = cli::build_run_settings(&adapter, None, None).unwrap();
        let port = CsvAdapter::new(settings.data_dir.clone());

        let outcome = cli::run_replay_pipeline(&port, &settings).unwrap();
        assert_abs_diff_eq!(outcome.calculator.position(), 0.0);
        assert_abs_diff_eq!(
            outcome
                .trades_report
                .as_ref()
                .unwrap()
                .scalar(Statistic::FinalEquity)
                .unwrap(),
            63.0,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            outcome.full_report.scalar(Statistic::FinalEquity).unwrap(),
            63.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn report_text_lists_every_statistic() {
        let dir = TempDir::new().unwrap();
        write_market_data(dir.path());
        let adapter = FileConfigAdapter::from_string(&config_for(dir.path(), "")).unwrap();
        let settings = cli::build_run_settings(&adapter, None, None).unwrap();
        let outcome =
            cli::run_backtest_pipeline(&CsvAdapter::new(settings.data_dir.clone()), &settings)
                .unwrap();

        let text = cli::format_report("Trade Returns", &outcome.report);
        for statistic in Statistic::FULL {
            assert!(text.contains(statistic.name()), "missing {}", statistic);
        }
    }
}

mod exit_codes {
    use super::*;

    fn run(args: &[&str]) -> ExitCode {
        cli::run(Cli::try_parse_from(args).unwrap())
    }

    #[test]
    fn backtest_succeeds() {
        let dir = TempDir::new().unwrap();
        write_market_data(dir.path());
        let file = write_temp_ini(&config_for(dir.path(), ""));
        let code = run(&[
            "equitrack",
            "backtest",
            "--config",
            file.path().to_str().unwrap(),
        ]);
        assert!(is_success(code));
    }

    #[test]
    fn replay_succeeds() {
        let dir = TempDir::new().unwrap();
        write_market_data(dir.path());
        let file = write_temp_ini(&config_for(dir.path(), ""));
        let code = run(&["equitrack", "replay", "-c", file.path().to_str().unwrap()]);
        assert!(is_success(code));
    }

    #[test]
    fn replay_without_trade_log_fills_succeeds() {
        let dir = TempDir::new().unwrap();
        write_market_data(dir.path());
        fs::write(
            dir.path().join("BHP_trades.csv"),
            "timestamp,price,volume,direction\n",
        )
        .unwrap();
        let file = write_temp_ini(&config_for(dir.path(), ""));
        let code = run(&["equitrack", "replay", "-c", file.path().to_str().unwrap()]);
        assert!(is_success(code));
    }

    #[test]
    fn validate_succeeds() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_ini(&config_for(dir.path(), ""));
        let code = run(&["equitrack", "validate", "-c", file.path().to_str().unwrap()]);
        assert!(is_success(code));
    }

    #[test]
    fn validate_reports_config_error() {
        let file = write_temp_ini("[montecarlo]\nruns = 0\n");
        let code = run(&["equitrack", "validate", "-c", file.path().to_str().unwrap()]);
        assert!(same_code(code, ExitCode::from(2)));
    }

    #[test]
    fn missing_config_file_fails() {
        let code = run(&["equitrack", "validate", "-c", "/nonexistent/equitrack.ini"]);
        assert!(same_code(code, ExitCode::from(2)));
    }

    #[test]
    fn missing_data_is_a_data_error() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_ini(&config_for(dir.path(), ""));
        let code = run(&[
            "equitrack",
            "backtest",
            "-c",
            file.path().to_str().unwrap(),
            "--symbol",
            "XYZ",
        ]);
        assert!(same_code(code, ExitCode::from(3)));
    }
}
