//! Dob command - find a date of birth in OCR text.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use idproof_core::modules::{eligibility, DobLabel};
use idproof_core::{DobExtractor, DobParser, Eligibility};
use serde::Serialize;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::debug;

use super::ExitCode;
use crate::config::AppConfig;
use crate::output::JsonOutput;

/// Parse a `YYYY-MM-DD` date.
fn parse_date(s: &str) -> Result<Date, String> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .map_err(|_| format!("'{s}' is not a YYYY-MM-DD date"))
}

/// Parse a two-digit year pivot (0-99).
fn parse_pivot(s: &str) -> Result<u8, String> {
    let value: u8 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value <= 99 {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0..=99"))
    }
}

/// Arguments for DOB extraction.
#[derive(Args, Clone)]
pub struct DobArgs {
    /// OCR text (reads stdin when neither this nor --file is given)
    #[arg(conflicts_with = "file")]
    pub text: Option<String>,

    /// File containing OCR text
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Date ages are computed on (default: today, UTC)
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
    pub today: Option<Date>,

    /// Two-digit years below this are read as 20xx
    #[arg(long, value_parser = parse_pivot)]
    pub pivot: Option<u8>,

    /// Minimum eligible age
    #[arg(long)]
    pub min_age: Option<u32>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl DobArgs {
    /// Apply configuration file values, respecting CLI precedence.
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        args.pivot = args.pivot.or(config.dob.two_digit_year_pivot);
        args.min_age = args.min_age.or(config.consistency.min_age);
        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(false);
        }
        args
    }

    fn read_text(&self) -> Result<String> {
        if let Some(text) = &self.text {
            return Ok(text.clone());
        }
        if let Some(path) = &self.file {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct DobReport {
    dob: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    confidence: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<DobLabel>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    eligibility: Option<Eligibility>,
}

/// Runs the dob command.
///
/// # Errors
///
/// Returns an error if the input cannot be read or output cannot be written.
pub fn run(args: &DobArgs, config: &AppConfig) -> Result<ExitCode> {
    let text = args.read_text()?;
    let today = args
        .today
        .unwrap_or_else(|| OffsetDateTime::now_utc().date());

    let mut parser_config = config.parser_config();
    if let Some(pivot) = args.pivot {
        parser_config.two_digit_year_pivot = pivot;
    }
    let min_age = args
        .min_age
        .unwrap_or_else(|| config.consistency_config().min_age);

    let extractor = DobExtractor::new(config.extraction_config(), DobParser::new(parser_config));
    let report = match extractor.extract(&text, today) {
        Some(found) => {
            debug!("Found date of birth '{}' ({:?})", found.text, found.label);
            DobReport {
                dob: Some(found.date),
                text: Some(found.text),
                confidence: found.confidence,
                label: Some(found.label),
                eligibility: Some(eligibility(found.age, min_age)),
            }
        }
        None => DobReport {
            dob: None,
            text: None,
            confidence: 0,
            label: None,
            eligibility: None,
        },
    };

    JsonOutput::stdout(args.pretty).write(&report)?;

    Ok(if report.dob.is_some() {
        ExitCode::Success
    } else {
        ExitCode::Negative
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2025-01-01").unwrap(), date!(2025 - 01 - 01));
        assert!(parse_date("01/01/2025").is_err());
    }

    #[test]
    fn test_parse_pivot_bounds() {
        assert_eq!(parse_pivot("40").unwrap(), 40);
        assert!(parse_pivot("100").is_err());
        assert!(parse_pivot("x").is_err());
    }

    #[test]
    fn test_missing_report_shape() {
        let report = DobReport {
            dob: None,
            text: None,
            confidence: 0,
            label: None,
            eligibility: None,
        };
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"dob":null,"confidence":0}"#
        );
    }

    #[test]
    fn test_found_report_flattens_eligibility() {
        let report = DobReport {
            dob: Some(date!(1995 - 08 - 15)),
            text: Some("15/08/1995".into()),
            confidence: 90,
            label: Some(DobLabel::Dob),
            eligibility: Some(eligibility(29, 18)),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["dob"], "1995-08-15");
        assert_eq!(value["label"], "dob");
        assert_eq!(value["age"], 29);
        assert_eq!(value["eligible"], true);
        assert_eq!(value["age_group"], "Adult");
    }
}
