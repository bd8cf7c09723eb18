//! Error taxonomy for the verification core.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which of the two uploads an error or reference concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    /// The identity document image.
    Document,
    /// The live selfie.
    Selfie,
}

impl UploadKind {
    /// Storage label for this upload kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Selfie => "selfie",
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Caller mistakes. Surfaced directly and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The session id is not a well-formed token.
    #[error("invalid session id format")]
    MalformedSessionId,

    /// A required upload is missing.
    #[error("{0} image must be uploaded first")]
    MissingUpload(UploadKind),

    /// The upload was empty.
    #[error("no file provided")]
    EmptyUpload,

    /// The file extension is not on the allow-list.
    #[error("invalid file type '{0}'. Allowed: {1}")]
    DisallowedFileType(String, String),

    /// The upload exceeds the size limit.
    #[error("file too large: {size} bytes (maximum {max})")]
    TooLarge {
        /// Upload size in bytes.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The bytes do not decode as a supported image.
    #[error("unsupported or unreadable image")]
    UnreadableImage,

    /// The image is smaller than the minimum dimensions.
    #[error("image too small: {width}x{height} (minimum {min_width}x{min_height})")]
    ImageTooSmall {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
        /// Minimum width.
        min_width: u32,
        /// Minimum height.
        min_height: u32,
    },
}

/// Errors returned by the session store and the verification pipeline.
///
/// Messages are safe to show to an end user: they never carry storage paths
/// or adapter internals. Details are logged where the error is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Invalid input from the caller.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The session does not exist or has expired.
    #[error("session not found or expired")]
    SessionNotFound,

    /// The session is not in a state that accepts this stage.
    #[error("{0}")]
    StageConflict(String),

    /// The storage collaborator failed.
    #[error("failed to store or read an upload")]
    Storage,

    /// Anything unexpected.
    #[error("internal error")]
    Internal,
}

/// Failures reported by the external vision/OCR capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// No face was found in the image.
    #[error("no face detected")]
    NoFaceDetected,

    /// The engine could not read the image.
    #[error("image could not be read: {0}")]
    Unreadable(String),

    /// The engine is not installed, crashed, or returned garbage.
    #[error("capability unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_converts_into_verification_error() {
        let err: VerificationError = ValidationError::MissingUpload(UploadKind::Document).into();
        assert_eq!(err.to_string(), "document image must be uploaded first");
    }

    #[test]
    fn test_messages_do_not_leak_detail() {
        assert_eq!(VerificationError::Storage.to_string(), "failed to store or read an upload");
        assert_eq!(VerificationError::Internal.to_string(), "internal error");
    }
}
