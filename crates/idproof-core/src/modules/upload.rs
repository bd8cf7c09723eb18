//! Upload validation.
//!
//! Checks that an uploaded file is an allowed, decodable image of usable size
//! before it reaches storage or any engine.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, ImageReader};
use tracing::debug;

use crate::domain::ValidationError;

/// Upload acceptance rules.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Allowed file extensions, lowercase and without the dot.
    pub allowed_extensions: Vec<String>,
    /// Maximum upload size in bytes.
    pub max_bytes: usize,
    /// Minimum image width in pixels.
    pub min_width: u32,
    /// Minimum image height in pixels.
    pub min_height: u32,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: ["png", "jpg", "jpeg", "gif", "bmp"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_bytes: 16 * 1024 * 1024,
            min_width: 100,
            min_height: 100,
        }
    }
}

const ACCEPTED_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Bmp,
    ImageFormat::Gif,
];

impl UploadPolicy {
    /// Validates an upload by its original filename and contents.
    ///
    /// # Errors
    ///
    /// Returns the first rule the upload breaks.
    pub fn validate(&self, filename: &str, bytes: &[u8]) -> Result<(), ValidationError> {
        if bytes.is_empty() || filename.trim().is_empty() {
            return Err(ValidationError::EmptyUpload);
        }

        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !self.allowed_extensions.iter().any(|a| *a == extension) {
            return Err(ValidationError::DisallowedFileType(
                extension,
                self.allowed_extensions.join(", "),
            ));
        }

        if bytes.len() > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size: bytes.len(),
                max: self.max_bytes,
            });
        }

        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|_| ValidationError::UnreadableImage)?;
        match reader.format() {
            Some(format) if ACCEPTED_FORMATS.contains(&format) => {}
            _ => return Err(ValidationError::UnreadableImage),
        }
        let (width, height) = reader
            .into_dimensions()
            .map_err(|_| ValidationError::UnreadableImage)?;

        if width < self.min_width || height < self.min_height {
            return Err(ValidationError::ImageTooSmall {
                width,
                height,
                min_width: self.min_width,
                min_height: self.min_height,
            });
        }

        debug!("Accepted upload {width}x{height}, {} bytes", bytes.len());
        Ok(())
    }
}
