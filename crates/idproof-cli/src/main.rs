//! idproof CLI - document and selfie identity verification.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{Cli, Commands, ExitCode};
use config::AppConfig;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load();

    let exit_code = match cli.command {
        Commands::Verify(args) => {
            let args = commands::verify::VerifyArgs::with_config(args, &config);
            commands::verify::run(&args).unwrap_or_else(|e| {
                eprintln!("error: {e:#}");
                ExitCode::Error
            })
        }
        Commands::Dob(args) => {
            let args = commands::dob::DobArgs::with_config(args, &config);
            commands::dob::run(&args, &config).unwrap_or_else(|e| {
                eprintln!("error: {e:#}");
                ExitCode::Error
            })
        }
    };

    exit_code.into()
}
