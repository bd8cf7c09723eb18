//! Verify command - run both upload stages and print the verdict.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use idproof_adapters::{CommandEngine, FsImageStore, OfflineEngine, TesseractOcr};
use idproof_core::{
    Capabilities, ConsistencyMode, FaceCapability, OverallStatus, PipelineConfig,
    QualitySignalCapability, SessionId, SystemClock, TextExtractionCapability, VerificationPipeline,
};
use tracing::{debug, info, warn};

use super::ExitCode;
use crate::config::{parse_mode, AppConfig};
use crate::output::{JsonOutput, StageProgress};

/// Where document text comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OcrSource {
    /// The `ocr` op of the configured engine
    #[default]
    Engine,
    /// The `tesseract` command-line tool
    Tesseract,
}

/// Consistency comparison mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Compare against the adjusted age
    Point,
    /// Compare against the nearest bound of the estimated range
    Range,
}

impl From<ModeArg> for ConsistencyMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Point => Self::Point,
            ModeArg::Range => Self::Range,
        }
    }
}

/// Arguments for a single verification run.
#[derive(Args, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct VerifyArgs {
    /// Photo of the identity document
    #[arg(long, value_name = "PATH")]
    pub document: PathBuf,

    /// Live selfie
    #[arg(long, value_name = "PATH")]
    pub selfie: PathBuf,

    /// Vision/OCR engine program
    #[arg(long, value_name = "CMD")]
    pub engine: Option<PathBuf>,

    /// Argument passed to the engine before the op name (repeatable)
    #[arg(long = "engine-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// Source of document text
    #[arg(long, value_enum)]
    pub ocr: Option<OcrSource>,

    /// Tesseract language list
    #[arg(long, value_name = "LANGS")]
    pub tesseract_lang: Option<String>,

    /// Minimum eligible age
    #[arg(long)]
    pub min_age: Option<u32>,

    /// Allowed age disagreement in years
    #[arg(long)]
    pub tolerance: Option<u32>,

    /// Age consistency mode
    #[arg(long, value_enum)]
    pub consistency_mode: Option<ModeArg>,

    /// Let a degraded face match verify
    #[arg(long)]
    pub accept_degraded_match: bool,

    /// Directory for stored uploads (default: a temporary directory)
    #[arg(long, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Keep stored uploads after the run
    #[arg(long)]
    pub keep_uploads: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Show a stage spinner
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Merged config (populated by `with_config`, not from CLI).
    #[arg(skip)]
    config: Option<AppConfig>,
}

impl VerifyArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Built-in defaults
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if args.engine.is_none() {
            args.engine.clone_from(&config.engine.command);
        }
        if args.engine_args.is_empty() {
            args.engine_args = config.engine.args.clone().unwrap_or_default();
        }
        if args.ocr.is_none() {
            args.ocr = config.engine.ocr.as_deref().and_then(|s| match s {
                "engine" => Some(OcrSource::Engine),
                "tesseract" => Some(OcrSource::Tesseract),
                _ => None,
            });
        }
        if args.tesseract_lang.is_none() {
            args.tesseract_lang
                .clone_from(&config.engine.tesseract_languages);
        }

        args.min_age = args.min_age.or(config.consistency.min_age);
        args.tolerance = args.tolerance.or(config.consistency.tolerance);
        if args.consistency_mode.is_none() {
            args.consistency_mode = config
                .consistency
                .mode
                .as_deref()
                .and_then(parse_mode)
                .map(|m| match m {
                    ConsistencyMode::Point => ModeArg::Point,
                    ConsistencyMode::Range => ModeArg::Range,
                });
        }
        if !args.accept_degraded_match {
            args.accept_degraded_match = config.consistency.accept_degraded_match.unwrap_or(false);
        }

        if args.store_dir.is_none() {
            args.store_dir.clone_from(&config.storage.dir);
        }
        if !args.keep_uploads {
            args.keep_uploads = config.storage.keep_uploads.unwrap_or(false);
        }
        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(false);
        }
        if !args.progress {
            args.progress = config.output.progress.unwrap_or(false);
        }

        args.config = Some(config.clone());
        args
    }

    /// Pipeline settings from the merged config with CLI overrides applied.
    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = self
            .config
            .as_ref()
            .map_or_else(PipelineConfig::default, AppConfig::pipeline_config);

        if let Some(min_age) = self.min_age {
            config.consistency.min_age = min_age;
        }
        if let Some(tolerance) = self.tolerance {
            config.consistency.tolerance = tolerance;
        }
        if let Some(mode) = self.consistency_mode {
            config.consistency.mode = mode.into();
        }
        config.consistency.accept_degraded_match = self.accept_degraded_match;
        config
    }

    fn capabilities(&self, store: Arc<FsImageStore>) -> Capabilities {
        let faces: Arc<dyn FaceCapability>;
        let quality: Arc<dyn QualitySignalCapability>;
        let engine_ocr: Arc<dyn TextExtractionCapability>;
        if let Some(program) = &self.engine {
            info!("Using engine {}", program.display());
            let engine = Arc::new(CommandEngine::new(program).with_args(&self.engine_args));
            faces = engine.clone();
            quality = engine.clone();
            engine_ocr = engine;
        } else {
            warn!("No engine configured; face and quality checks are unavailable");
            faces = Arc::new(OfflineEngine);
            quality = Arc::new(OfflineEngine);
            engine_ocr = Arc::new(OfflineEngine);
        }

        let ocr: Arc<dyn TextExtractionCapability> = match self.ocr.unwrap_or_default() {
            OcrSource::Engine => engine_ocr,
            OcrSource::Tesseract => {
                let mut tesseract = TesseractOcr::default();
                if let Some(lang) = &self.tesseract_lang {
                    tesseract = tesseract.with_languages(lang.clone());
                }
                Arc::new(tesseract)
            }
        };

        Capabilities {
            ocr,
            faces,
            quality,
            store,
        }
    }
}

/// Runs the verify command.
///
/// # Errors
///
/// Returns an error for unreadable input files, rejected uploads, and
/// storage failures.
pub fn run(args: &VerifyArgs) -> Result<ExitCode> {
    let document = read_upload(&args.document)?;
    let selfie = read_upload(&args.selfie)?;

    let (store_root, scratch) = match &args.store_dir {
        Some(dir) => (dir.clone(), None),
        None => {
            let temp = tempfile::Builder::new()
                .prefix("idproof-")
                .tempdir()
                .context("failed to create upload directory")?;
            (temp.path().to_path_buf(), Some(temp))
        }
    };
    debug!("Storing uploads under {}", store_root.display());
    let store = Arc::new(FsImageStore::new(&store_root));

    let show_spinner = args.progress && std::io::stderr().is_terminal();
    let progress = Arc::new(StageProgress::new(args.quiet, show_spinner));

    let pipeline = VerificationPipeline::new(
        args.pipeline_config(),
        args.capabilities(store),
        Arc::new(SystemClock),
    )
    .with_progress(progress);

    let outcome = verify(&pipeline, args, &document, &selfie);

    if args.keep_uploads {
        let kept = scratch.map_or(store_root, tempfile::TempDir::keep);
        info!("Uploads kept under {}", kept.display());
    }

    outcome
}

fn verify(
    pipeline: &VerificationPipeline,
    args: &VerifyArgs,
    document: &[u8],
    selfie: &[u8],
) -> Result<ExitCode> {
    let session = pipeline.start_session();
    let result = run_stages(pipeline, session, args, document, selfie);

    if !args.keep_uploads {
        if let Err(e) = pipeline.close_session(session) {
            debug!("Session {session} already gone: {e}");
        }
    }

    result
}

fn run_stages(
    pipeline: &VerificationPipeline,
    session: SessionId,
    args: &VerifyArgs,
    document: &[u8],
    selfie: &[u8],
) -> Result<ExitCode> {
    pipeline
        .submit_document(session, &file_name(&args.document), document)
        .context("document rejected")?;
    let verdict = pipeline
        .submit_selfie(session, &file_name(&args.selfie), selfie)
        .context("selfie rejected")?;

    let snapshot = pipeline.status(session)?;
    JsonOutput::stdout(args.pretty).write(&snapshot)?;

    Ok(match verdict.overall_status {
        OverallStatus::Verified => ExitCode::Success,
        OverallStatus::Rejected => ExitCode::Negative,
    })
}

fn read_upload(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::commands::{Cli, Commands};

    fn parse(argv: &[&str]) -> VerifyArgs {
        let mut full = vec!["idproof", "verify", "--document", "d.png", "--selfie", "s.png"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Verify(args) => args,
            Commands::Dob(_) => unreachable!(),
        }
    }

    #[test]
    fn test_cli_overrides_config() {
        let config: AppConfig = toml::from_str(
            "[consistency]\nmin_age = 21\ntolerance = 3\nmode = 'point'\n",
        )
        .unwrap();
        let args = VerifyArgs::with_config(parse(&["--min-age", "25"]), &config);
        let pipeline = args.pipeline_config();

        assert_eq!(pipeline.consistency.min_age, 25);
        assert_eq!(pipeline.consistency.tolerance, 3);
        assert_eq!(pipeline.consistency.mode, ConsistencyMode::Point);
    }

    #[test]
    fn test_config_supplies_engine() {
        let config: AppConfig =
            toml::from_str("[engine]\ncommand = 'engine.sh'\nargs = ['--fast']\nocr = 'tesseract'\n")
                .unwrap();
        let args = VerifyArgs::with_config(parse(&[]), &config);

        assert_eq!(args.engine, Some(PathBuf::from("engine.sh")));
        assert_eq!(args.engine_args, vec!["--fast".to_string()]);
        assert_eq!(args.ocr, Some(OcrSource::Tesseract));
    }

    #[test]
    fn test_cli_engine_args_replace_config() {
        let config: AppConfig = toml::from_str("[engine]\nargs = ['--fast']\n").unwrap();
        let args = VerifyArgs::with_config(parse(&["--engine-arg", "--slow"]), &config);
        assert_eq!(args.engine_args, vec!["--slow".to_string()]);
    }

    #[test]
    fn test_file_name_strips_directories() {
        assert_eq!(file_name(Path::new("/tmp/uploads/card.JPG")), "card.JPG");
        assert_eq!(file_name(Path::new("/")), "");
    }
}
