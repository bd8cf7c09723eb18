//! CLI command definitions and handlers.

pub mod dob;
pub mod verify;

use clap::{Parser, Subcommand};

/// idproof - verify a person from an ID document photo and a selfie
#[derive(Parser)]
#[command(name = "idproof")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the document and selfie stages and print the verdict
    Verify(verify::VerifyArgs),
    /// Extract a date of birth from OCR text
    Dob(dob::DobArgs),
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Verified, or a date of birth was found.
    Success,
    /// Rejected, or no date of birth was found.
    Negative,
    /// Invalid input or an unexpected failure.
    Error,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        match code {
            ExitCode::Success => Self::SUCCESS,
            ExitCode::Negative => Self::from(1),
            ExitCode::Error => Self::from(2),
        }
    }
}
