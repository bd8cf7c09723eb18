//! External vision/OCR engine bridge.
//!
//! The engine is any program invoked as `<program> [args..] <op> <image..>`
//! that prints one JSON object on stdout:
//!
//! | op             | reply                                               |
//! |----------------|-----------------------------------------------------|
//! | `ocr`          | `{"text": "..."}`                                   |
//! | `detect-faces` | `{"faces": 1}`                                      |
//! | `compare`      | `{"verified": true, "distance": 0.1, "threshold": 0.4}` |
//! | `estimate-age` | `{"age": 31}`                                       |
//! | `quality`      | `{"blur": 120.5, "brightness": 131.0}`              |
//!
//! Any op may instead reply `{"error": "no_face"}` or
//! `{"error": "unreadable"}`. A program that cannot be started, exits
//! non-zero without an error reply, or prints something else makes the
//! capability unavailable.

use std::path::PathBuf;
use std::process::Command;
use std::sync::{Mutex, PoisonError};

use idproof_core::{
    CapabilityError, FaceCapability, FaceComparison, ImageRef, QualitySignalCapability,
    TextExtractionCapability,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Deserialize)]
#[serde(untagged)]
enum Reply<T> {
    Error { error: String },
    Ok(T),
}

#[derive(Deserialize)]
struct TextReply {
    text: String,
}

#[derive(Deserialize)]
struct FacesReply {
    faces: usize,
}

#[derive(Deserialize)]
struct AgeReply {
    age: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct QualityReply {
    blur: f64,
    brightness: f64,
}

/// Subprocess-backed engine implementing every capability port.
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
    /// Last quality reply, keyed by image, so both signals cost one call.
    quality_cache: Mutex<Option<(ImageRef, QualityReply)>>,
}

impl CommandEngine {
    /// Creates a bridge to `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            quality_cache: Mutex::new(None),
        }
    }

    /// Arguments passed before the op name.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn call<T: DeserializeOwned>(&self, op: &str, images: &[&ImageRef]) -> Result<T, CapabilityError> {
        debug!("Engine op '{op}' on {} image(s)", images.len());

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(op)
            .args(images.iter().map(|i| i.as_str()))
            .output()
            .map_err(|e| {
                warn!("Failed to start engine {}: {e}", self.program.display());
                CapabilityError::Unavailable("engine could not be started".into())
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match serde_json::from_str::<Reply<T>>(stdout.trim()) {
            Ok(Reply::Error { error }) => Err(map_engine_error(&error)),
            Ok(Reply::Ok(value)) if output.status.success() => Ok(value),
            Ok(Reply::Ok(_)) | Err(_) if !output.status.success() => {
                warn!(
                    "Engine op '{op}' exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                Err(CapabilityError::Unavailable(format!(
                    "engine exited with {}",
                    output.status
                )))
            }
            _ => {
                warn!("Engine op '{op}' printed an unexpected reply");
                Err(CapabilityError::Unavailable("unexpected engine reply".into()))
            }
        }
    }

    fn quality(&self, image: &ImageRef) -> Result<QualityReply, CapabilityError> {
        let mut cache = self
            .quality_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some((cached, reply)) = cache.as_ref() {
            if cached == image {
                return Ok(*reply);
            }
        }
        let reply: QualityReply = self.call("quality", &[image])?;
        *cache = Some((image.clone(), reply));
        Ok(reply)
    }
}

fn map_engine_error(error: &str) -> CapabilityError {
    match error {
        "no_face" => CapabilityError::NoFaceDetected,
        "unreadable" => CapabilityError::Unreadable("engine could not decode the image".into()),
        other => CapabilityError::Unavailable(format!("engine error: {other}")),
    }
}

impl TextExtractionCapability for CommandEngine {
    fn extract_text(&self, image: &ImageRef) -> Result<String, CapabilityError> {
        self.call::<TextReply>("ocr", &[image]).map(|r| r.text)
    }
}

impl FaceCapability for CommandEngine {
    fn detect_faces(&self, image: &ImageRef) -> Result<usize, CapabilityError> {
        self.call::<FacesReply>("detect-faces", &[image]).map(|r| r.faces)
    }

    fn compare(&self, a: &ImageRef, b: &ImageRef) -> Result<FaceComparison, CapabilityError> {
        self.call("compare", &[a, b])
    }

    fn estimate_age(&self, image: &ImageRef) -> Result<u32, CapabilityError> {
        self.call::<AgeReply>("estimate-age", &[image]).map(|r| r.age)
    }
}

impl QualitySignalCapability for CommandEngine {
    fn blur_score(&self, image: &ImageRef) -> Result<f64, CapabilityError> {
        self.quality(image).map(|q| q.blur)
    }

    fn brightness(&self, image: &ImageRef) -> Result<f64, CapabilityError> {
        self.quality(image).map(|q| q.brightness)
    }
}

impl std::fmt::Debug for CommandEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEngine")
            .field("program", &self.program)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// Engine stand-in used when none is configured. Every call is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineEngine;

fn offline<T>() -> Result<T, CapabilityError> {
    Err(CapabilityError::Unavailable("no engine configured".into()))
}

impl TextExtractionCapability for OfflineEngine {
    fn extract_text(&self, _image: &ImageRef) -> Result<String, CapabilityError> {
        offline()
    }
}

impl FaceCapability for OfflineEngine {
    fn detect_faces(&self, _image: &ImageRef) -> Result<usize, CapabilityError> {
        offline()
    }

    fn compare(&self, _a: &ImageRef, _b: &ImageRef) -> Result<FaceComparison, CapabilityError> {
        offline()
    }

    fn estimate_age(&self, _image: &ImageRef) -> Result<u32, CapabilityError> {
        offline()
    }
}

impl QualitySignalCapability for OfflineEngine {
    fn blur_score(&self, _image: &ImageRef) -> Result<f64, CapabilityError> {
        offline()
    }

    fn brightness(&self, _image: &ImageRef) -> Result<f64, CapabilityError> {
        offline()
    }
}
