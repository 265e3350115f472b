use clap::Parser;
use equitrack::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
