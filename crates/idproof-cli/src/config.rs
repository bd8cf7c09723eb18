//! Configuration file support for idproof.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/idproof/config.toml` (lowest priority)
//! - Project-local: `.idproof.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use idproof_core::{
    AgeRange, BiometricConfig, ConsistencyConfig, ConsistencyMode, DobParserConfig,
    ExtractionConfig, PipelineConfig, QualityThresholds, SessionConfig,
};
use serde::Deserialize;
use tracing::{debug, info};

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Session lifetime.
    pub session: SessionSection,
    /// Date-of-birth parsing.
    pub dob: DobSection,
    /// DOB extraction confidence.
    pub extraction: ExtractionSection,
    /// Selfie quality thresholds.
    pub quality: QualitySection,
    /// Face match and age calibration.
    pub biometric: BiometricSection,
    /// Age consistency and eligibility.
    pub consistency: ConsistencySection,
    /// External engines.
    pub engine: EngineSection,
    /// Upload storage.
    pub storage: StorageSection,
    /// Output formatting.
    pub output: OutputSection,
}

/// Session configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Session timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Date-of-birth parsing configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DobSection {
    /// Two-digit years below this are read as 20xx.
    pub two_digit_year_pivot: Option<u8>,
    /// Largest plausible age.
    pub max_age: Option<u32>,
}

/// Extraction confidence configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionSection {
    /// Confidence of the highest-priority pattern.
    pub base_confidence: Option<u8>,
    /// Confidence lost per pattern rank.
    pub confidence_step: Option<u8>,
    /// Minimum confidence.
    pub confidence_floor: Option<u8>,
}

/// Quality gate configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct QualitySection {
    /// Sharpness below this is blurry.
    pub blur_threshold: Option<f64>,
    /// Brightness below this is too dark, above `255 - x` too bright.
    pub dark_threshold: Option<f64>,
}

/// Biometric calibration configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct BiometricSection {
    /// Years subtracted from the visual age.
    pub age_correction: Option<u32>,
    /// Lowest adjusted age.
    pub age_floor: Option<u32>,
    /// Half-width of the estimated range.
    pub range_spread: Option<u32>,
    /// Confidence reported with a degraded match (0-100).
    pub neutral_confidence: Option<f64>,
}

/// Consistency configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ConsistencySection {
    /// Allowed age disagreement in years.
    pub tolerance: Option<u32>,
    /// "point" or "range".
    pub mode: Option<String>,
    /// Minimum eligible age.
    pub min_age: Option<u32>,
    /// Let a degraded face match verify.
    pub accept_degraded_match: Option<bool>,
}

/// External engine configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Engine program.
    pub command: Option<PathBuf>,
    /// Arguments passed before the op name.
    pub args: Option<Vec<String>>,
    /// OCR source: "engine" or "tesseract".
    pub ocr: Option<String>,
    /// Tesseract language list.
    pub tesseract_languages: Option<String>,
}

/// Storage configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Upload directory.
    pub dir: Option<PathBuf>,
    /// Keep uploads after the run.
    pub keep_uploads: Option<bool>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show stage progress.
    pub progress: Option<bool>,
}

/// Parses a consistency mode name.
pub fn parse_mode(s: &str) -> Option<ConsistencyMode> {
    match s {
        "point" => Some(ConsistencyMode::Point),
        "range" => Some(ConsistencyMode::Range),
        _ => None,
    }
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/idproof/config.toml`
    /// 2. Project-local: `.idproof.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// Validate configuration values are within acceptable ranges.
    fn validate(&self) -> Result<(), String> {
        if let Some(p) = self.dob.two_digit_year_pivot {
            if p > 99 {
                return Err(format!("dob.two_digit_year_pivot must be 0-99, got {p}"));
            }
        }
        for (name, value) in [
            ("extraction.base_confidence", self.extraction.base_confidence),
            ("extraction.confidence_floor", self.extraction.confidence_floor),
        ] {
            if let Some(v) = value {
                if v > 100 {
                    return Err(format!("{name} must be 0-100, got {v}"));
                }
            }
        }
        if let Some(c) = self.biometric.neutral_confidence {
            if !(0.0..=100.0).contains(&c) {
                return Err(format!(
                    "biometric.neutral_confidence must be 0-100, got {c}"
                ));
            }
        }
        if let Some(t) = self.quality.dark_threshold {
            if !(0.0..=127.5).contains(&t) {
                return Err(format!("quality.dark_threshold must be 0-127.5, got {t}"));
            }
        }
        if let Some(ref m) = self.consistency.mode {
            if parse_mode(m).is_none() {
                return Err(format!(
                    "consistency.mode must be 'point' or 'range', got '{m}'"
                ));
            }
        }
        if let Some(ref o) = self.engine.ocr {
            if o != "engine" && o != "tesseract" {
                return Err(format!(
                    "engine.ocr must be 'engine' or 'tesseract', got '{o}'"
                ));
            }
        }

        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        self.session.timeout_secs = other.session.timeout_secs.or(self.session.timeout_secs);

        self.dob.two_digit_year_pivot = other
            .dob
            .two_digit_year_pivot
            .or(self.dob.two_digit_year_pivot);
        self.dob.max_age = other.dob.max_age.or(self.dob.max_age);

        self.extraction.base_confidence = other
            .extraction
            .base_confidence
            .or(self.extraction.base_confidence);
        self.extraction.confidence_step = other
            .extraction
            .confidence_step
            .or(self.extraction.confidence_step);
        self.extraction.confidence_floor = other
            .extraction
            .confidence_floor
            .or(self.extraction.confidence_floor);

        self.quality.blur_threshold = other.quality.blur_threshold.or(self.quality.blur_threshold);
        self.quality.dark_threshold = other.quality.dark_threshold.or(self.quality.dark_threshold);

        self.biometric.age_correction = other
            .biometric
            .age_correction
            .or(self.biometric.age_correction);
        self.biometric.age_floor = other.biometric.age_floor.or(self.biometric.age_floor);
        self.biometric.range_spread = other.biometric.range_spread.or(self.biometric.range_spread);
        self.biometric.neutral_confidence = other
            .biometric
            .neutral_confidence
            .or(self.biometric.neutral_confidence);

        self.consistency.tolerance = other.consistency.tolerance.or(self.consistency.tolerance);
        self.consistency.mode = other
            .consistency
            .mode
            .or_else(|| self.consistency.mode.take());
        self.consistency.min_age = other.consistency.min_age.or(self.consistency.min_age);
        self.consistency.accept_degraded_match = other
            .consistency
            .accept_degraded_match
            .or(self.consistency.accept_degraded_match);

        self.engine.command = other.engine.command.or_else(|| self.engine.command.take());
        self.engine.args = other.engine.args.or_else(|| self.engine.args.take());
        self.engine.ocr = other.engine.ocr.or_else(|| self.engine.ocr.take());
        self.engine.tesseract_languages = other
            .engine
            .tesseract_languages
            .or_else(|| self.engine.tesseract_languages.take());

        self.storage.dir = other.storage.dir.or_else(|| self.storage.dir.take());
        self.storage.keep_uploads = other.storage.keep_uploads.or(self.storage.keep_uploads);

        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
    }

    /// Date parser settings, falling back to built-in defaults.
    pub fn parser_config(&self) -> DobParserConfig {
        let d = DobParserConfig::default();
        DobParserConfig {
            two_digit_year_pivot: self.dob.two_digit_year_pivot.unwrap_or(d.two_digit_year_pivot),
            max_age: self.dob.max_age.unwrap_or(d.max_age),
        }
    }

    /// Extraction settings, falling back to built-in defaults.
    pub fn extraction_config(&self) -> ExtractionConfig {
        let d = ExtractionConfig::default();
        let e = &self.extraction;
        ExtractionConfig {
            base_confidence: e.base_confidence.unwrap_or(d.base_confidence),
            confidence_step: e.confidence_step.unwrap_or(d.confidence_step),
            confidence_floor: e.confidence_floor.unwrap_or(d.confidence_floor),
        }
    }

    /// Consistency settings, falling back to built-in defaults.
    pub fn consistency_config(&self) -> ConsistencyConfig {
        let d = ConsistencyConfig::default();
        let c = &self.consistency;
        ConsistencyConfig {
            tolerance: c.tolerance.unwrap_or(d.tolerance),
            mode: c.mode.as_deref().and_then(parse_mode).unwrap_or(d.mode),
            min_age: c.min_age.unwrap_or(d.min_age),
            accept_degraded_match: c.accept_degraded_match.unwrap_or(d.accept_degraded_match),
        }
    }

    /// Full pipeline settings, falling back to built-in defaults.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let session = self
            .session
            .timeout_secs
            .and_then(|s| i64::try_from(s).ok())
            .map_or_else(SessionConfig::default, |s| SessionConfig {
                timeout: time::Duration::seconds(s),
            });

        let q = QualityThresholds::default();
        let quality = QualityThresholds {
            blur_threshold: self.quality.blur_threshold.unwrap_or(q.blur_threshold),
            dark_threshold: self.quality.dark_threshold.unwrap_or(q.dark_threshold),
        };

        let b = BiometricConfig::default();
        let bio = &self.biometric;
        let age_floor = bio.age_floor.unwrap_or(b.age_floor);
        let biometric = BiometricConfig {
            age_correction: bio.age_correction.unwrap_or(b.age_correction),
            age_floor,
            range_spread: bio.range_spread.unwrap_or(b.range_spread),
            neutral_confidence: bio.neutral_confidence.unwrap_or(b.neutral_confidence),
            fallback_range: AgeRange::new(
                b.fallback_range.low.max(age_floor),
                b.fallback_range.high.max(age_floor),
            ),
            fallback_age: b.fallback_age.max(age_floor),
        };

        PipelineConfig {
            session,
            parser: self.parser_config(),
            extraction: self.extraction_config(),
            quality,
            biometric,
            consistency: self.consistency_config(),
            upload: idproof_core::UploadPolicy::default(),
        }
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("idproof").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.idproof.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(".idproof.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_core_defaults() {
        let config = AppConfig::default();
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.parser.two_digit_year_pivot, 50);
        assert_eq!(pipeline.extraction.base_confidence, 90);
        assert_eq!(pipeline.consistency.tolerance, 10);
        assert_eq!(pipeline.consistency.mode, ConsistencyMode::Range);
        assert_eq!(pipeline.session.timeout, time::Duration::hours(1));
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: AppConfig = toml::from_str("").expect("parse empty config");
        assert!(config.consistency.min_age.is_none());
        assert!(config.engine.command.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r"
[session]
timeout_secs = 600

[dob]
two_digit_year_pivot = 30
max_age = 120

[extraction]
base_confidence = 100
confidence_step = 20
confidence_floor = 20

[quality]
blur_threshold = 80.0
dark_threshold = 40.0

[biometric]
age_correction = 4
age_floor = 16
range_spread = 6
neutral_confidence = 40.0

[consistency]
tolerance = 5
mode = 'point'
min_age = 21
accept_degraded_match = true

[engine]
command = '/opt/idproof/engine'
args = ['--gpu']
ocr = 'tesseract'
tesseract_languages = 'eng'

[storage]
dir = '/var/lib/idproof/uploads'
keep_uploads = true

[output]
pretty = true
progress = false
";
        let config: AppConfig = toml::from_str(toml).expect("parse full config");
        assert!(config.validate().is_ok());

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.session.timeout, time::Duration::minutes(10));
        assert_eq!(pipeline.parser.two_digit_year_pivot, 30);
        assert_eq!(pipeline.extraction.base_confidence, 100);
        assert_eq!(pipeline.biometric.age_correction, 4);
        assert_eq!(pipeline.biometric.fallback_range, AgeRange::new(18, 35));
        assert_eq!(pipeline.consistency.mode, ConsistencyMode::Point);
        assert_eq!(pipeline.consistency.min_age, 21);
        assert!(pipeline.consistency.accept_degraded_match);
        assert_eq!(config.engine.args, Some(vec!["--gpu".to_string()]));
        assert_eq!(config.storage.keep_uploads, Some(true));
    }

    #[test]
    fn test_merge_configs() {
        let mut base: AppConfig = toml::from_str(
            r"
[consistency]
tolerance = 5
min_age = 21

[engine]
command = '/usr/bin/base-engine'
",
        )
        .expect("parse base");

        let override_config: AppConfig = toml::from_str(
            r"
[consistency]
tolerance = 8

[output]
pretty = true
",
        )
        .expect("parse override");

        base.merge(override_config);

        assert_eq!(base.consistency.tolerance, Some(8));
        assert_eq!(base.consistency.min_age, Some(21));
        assert_eq!(base.engine.command, Some(PathBuf::from("/usr/bin/base-engine")));
        assert_eq!(base.output.pretty, Some(true));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config: AppConfig = toml::from_str("[consistency]\nmode = 'fuzzy'\n").unwrap();
        assert!(config.validate().unwrap_err().contains("consistency.mode"));

        let config: AppConfig = toml::from_str("[biometric]\nneutral_confidence = 0.5e3\n").unwrap();
        assert!(config.validate().is_err());

        let config: AppConfig = toml::from_str("[engine]\nocr = 'easyocr'\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_find_config_in_parents() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp.path().join(".idproof.toml"), "").unwrap();

        assert_eq!(
            find_config_in_parents(&nested),
            Some(temp.path().join(".idproof.toml"))
        );
    }
}
