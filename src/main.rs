//! Metamorph
//!
//! Command-line entry point for catalog validation and inspection.

use clap::Parser;
use metamorph_cli::{Cli, run};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(version = metamorph_cli::VERSION, command = ?cli.command, "metamorph starting");

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", colored::Colorize::red("error:"), e);
            ExitCode::FAILURE
        }
    }
}
