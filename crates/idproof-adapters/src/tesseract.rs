//! Tesseract OCR adapter.

use std::io::ErrorKind;
use std::process::Command;

use idproof_core::{CapabilityError, ImageRef, TextExtractionCapability};
use tracing::{debug, warn};

/// OCR through the `tesseract` command-line tool.
///
/// Runs `tesseract <image> stdout -l <languages> --oem 3 --psm 6`.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
    languages: String,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            languages: "eng+hin".to_string(),
        }
    }
}

impl TesseractOcr {
    /// Uses `binary` instead of `tesseract` from `PATH`.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Sets the language list, e.g. `eng+hin`.
    #[must_use]
    pub fn with_languages(mut self, languages: impl Into<String>) -> Self {
        self.languages = languages.into();
        self
    }
}

impl TextExtractionCapability for TesseractOcr {
    fn extract_text(&self, image: &ImageRef) -> Result<String, CapabilityError> {
        let output = Command::new(&self.binary)
            .arg(image.as_str())
            .arg("stdout")
            .args(["-l", &self.languages, "--oem", "3", "--psm", "6"])
            .output()
            .map_err(|e| {
                warn!("Failed to run {}: {e}", self.binary);
                if e.kind() == ErrorKind::NotFound {
                    CapabilityError::Unavailable("tesseract is not installed".into())
                } else {
                    CapabilityError::Unavailable("tesseract could not be started".into())
                }
            })?;

        if !output.status.success() {
            warn!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(CapabilityError::Unreadable(format!(
                "tesseract exited with {}",
                output.status
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract read {} characters", text.len());
        Ok(text)
    }
}
