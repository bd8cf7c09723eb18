//! Vision and OCR capability ports.
//!
//! Implementations wrap external engines. The core only reasons over their
//! outputs and never inspects pixels.

use serde::{Deserialize, Serialize};

use crate::domain::{CapabilityError, ImageRef};

/// OCR engine.
pub trait TextExtractionCapability: Send + Sync {
    /// Extracts raw text from an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be read or the engine is unavailable.
    fn extract_text(&self, image: &ImageRef) -> Result<String, CapabilityError>;
}

/// Raw output of a face comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceComparison {
    /// Engine's own same-person decision.
    pub verified: bool,
    /// Embedding distance.
    pub distance: f64,
    /// Distance threshold the engine decided with.
    pub threshold: f64,
}

/// Face detection, comparison and age estimation engine.
pub trait FaceCapability: Send + Sync {
    /// Counts the faces detected in an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is unavailable or the image unreadable.
    fn detect_faces(&self, image: &ImageRef) -> Result<usize, CapabilityError>;

    /// Compares the faces in two images.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::NoFaceDetected`] if either image has no face.
    fn compare(&self, a: &ImageRef, b: &ImageRef) -> Result<FaceComparison, CapabilityError>;

    /// Estimates the apparent age of the face in an image.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::NoFaceDetected`] if the image has no face.
    fn estimate_age(&self, image: &ImageRef) -> Result<u32, CapabilityError>;
}

/// Scalar image-quality signals.
pub trait QualitySignalCapability: Send + Sync {
    /// Sharpness score; higher is sharper.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal cannot be computed.
    fn blur_score(&self, image: &ImageRef) -> Result<f64, CapabilityError>;

    /// Mean luminance in 0-255.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal cannot be computed.
    fn brightness(&self, image: &ImageRef) -> Result<f64, CapabilityError>;
}
