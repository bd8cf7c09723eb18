//! Verification session state and its stage transitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};
use uuid::Uuid;

use super::{ImageRef, UploadKind, ValidationError, VerificationError, VerificationResult};

/// Opaque session handle given to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for SessionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::MalformedSessionId)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline progress. Only ever advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session exists, no successful document stage yet.
    Created,
    /// A date of birth was extracted from the document.
    DocumentUploaded,
    /// The selfie stage produced a verdict. Terminal.
    VerificationComplete,
}

/// Data produced by the document stage.
///
/// A failed extraction is still recorded: `dob` and `age` stay empty, the
/// confidence is zero and `failure` says why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStage {
    /// Extracted date of birth.
    pub dob: Option<Date>,
    /// The date text as it appeared on the document.
    pub dob_text: Option<String>,
    /// Extraction confidence (0-100).
    pub confidence: u8,
    /// Age derived from the date of birth.
    pub age: Option<u32>,
    /// Why extraction produced nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl DocumentStage {
    /// A successful extraction.
    #[must_use]
    pub fn extracted(dob: Date, dob_text: impl Into<String>, confidence: u8, age: u32) -> Self {
        Self {
            dob: Some(dob),
            dob_text: Some(dob_text.into()),
            confidence,
            age: Some(age),
            failure: None,
        }
    }

    /// A failed extraction.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            dob: None,
            dob_text: None,
            confidence: 0,
            age: None,
            failure: Some(reason.into()),
        }
    }

    /// Whether a date of birth and age were obtained.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.dob.is_some() && self.age.is_some()
    }
}

/// Per-user verification state across the document and selfie uploads.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationSession {
    id: SessionId,
    created_at: OffsetDateTime,
    document_ref: Option<ImageRef>,
    selfie_ref: Option<ImageRef>,
    document: Option<DocumentStage>,
    result: Option<VerificationResult>,
    status: SessionStatus,
}

impl VerificationSession {
    /// Creates an empty session.
    #[must_use]
    pub const fn new(id: SessionId, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            created_at,
            document_ref: None,
            selfie_ref: None,
            document: None,
            result: None,
            status: SessionStatus::Created,
        }
    }

    /// Session id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Stored document reference.
    #[must_use]
    pub const fn document_ref(&self) -> Option<&ImageRef> {
        self.document_ref.as_ref()
    }

    /// Stored selfie reference.
    #[must_use]
    pub const fn selfie_ref(&self) -> Option<&ImageRef> {
        self.selfie_ref.as_ref()
    }

    /// Recorded document stage, successful or not.
    #[must_use]
    pub const fn document_stage(&self) -> Option<&DocumentStage> {
        self.document.as_ref()
    }

    /// Extracted date of birth.
    #[must_use]
    pub fn extracted_dob(&self) -> Option<Date> {
        self.document.as_ref().and_then(|d| d.dob)
    }

    /// Confidence paired with the extracted date of birth.
    #[must_use]
    pub fn dob_confidence(&self) -> u8 {
        self.document.as_ref().map_or(0, |d| d.confidence)
    }

    /// Age derived from the document.
    #[must_use]
    pub fn extracted_age(&self) -> Option<u32> {
        self.document.as_ref().and_then(|d| d.age)
    }

    /// Final verdict, once the selfie stage ran.
    #[must_use]
    pub const fn result(&self) -> Option<&VerificationResult> {
        self.result.as_ref()
    }

    /// Whether the session is past its lifetime at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime, timeout: Duration) -> bool {
        now - self.created_at >= timeout
    }

    /// Attaches the document image, returning the reference it replaced.
    ///
    /// Re-uploading is allowed until a date of birth has been extracted.
    pub(crate) fn attach_document(
        &mut self,
        image: ImageRef,
    ) -> Result<Option<ImageRef>, VerificationError> {
        self.ensure_accepts_document()?;
        Ok(self.document_ref.replace(image))
    }

    /// Records the document stage.
    ///
    /// Accepted while no successful stage exists. A failed extraction is
    /// stored but leaves the status at `Created` so the user can retry.
    pub(crate) fn record_document_stage(
        &mut self,
        stage: DocumentStage,
    ) -> Result<(), VerificationError> {
        self.ensure_accepts_document()?;
        if stage.is_complete() {
            self.status = SessionStatus::DocumentUploaded;
        }
        self.document = Some(stage);
        Ok(())
    }

    /// Attaches the selfie image, returning the reference it replaced.
    pub(crate) fn attach_selfie(
        &mut self,
        image: ImageRef,
    ) -> Result<Option<ImageRef>, VerificationError> {
        self.ensure_accepts_selfie()?;
        Ok(self.selfie_ref.replace(image))
    }

    /// Records the final verdict. Happens at most once.
    pub(crate) fn record_selfie_stage(
        &mut self,
        result: VerificationResult,
    ) -> Result<(), VerificationError> {
        self.ensure_open()?;
        self.result = Some(result);
        self.status = SessionStatus::VerificationComplete;
        Ok(())
    }

    /// Takes both image references, leaving the session without uploads.
    pub(crate) fn take_images(&mut self) -> Vec<ImageRef> {
        self.document_ref
            .take()
            .into_iter()
            .chain(self.selfie_ref.take())
            .collect()
    }

    /// Fails unless the document stage can still run.
    pub(crate) fn ensure_accepts_document(&self) -> Result<(), VerificationError> {
        if self.status != SessionStatus::Created {
            return Err(VerificationError::StageConflict(
                "document stage already completed for this session".into(),
            ));
        }
        Ok(())
    }

    /// Fails unless the selfie stage can run.
    pub(crate) fn ensure_accepts_selfie(&self) -> Result<(), VerificationError> {
        self.ensure_open()?;
        if self.document_ref.is_none() {
            return Err(ValidationError::MissingUpload(UploadKind::Document).into());
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), VerificationError> {
        if self.status == SessionStatus::VerificationComplete {
            return Err(VerificationError::StageConflict(
                "verification already completed for this session".into(),
            ));
        }
        Ok(())
    }

    /// Caller-facing view without storage references.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let document = self.document.as_ref();
        SessionSnapshot {
            session_id: self.id.to_string(),
            status: self.status,
            created_at: self.created_at,
            dob: self.extracted_dob(),
            dob_text: document.and_then(|d| d.dob_text.clone()),
            dob_confidence: self.dob_confidence(),
            extracted_age: self.extracted_age(),
            dob_failure: document.and_then(|d| d.failure.clone()),
            has_document: self.document_ref.is_some(),
            has_selfie: self.selfie_ref.is_some(),
            result: self.result.clone(),
        }
    }
}

/// Serializable session view for callers. Never includes storage references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session id.
    pub session_id: String,
    /// Current status.
    pub status: SessionStatus,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Extracted date of birth.
    pub dob: Option<Date>,
    /// Date text as read from the document.
    pub dob_text: Option<String>,
    /// Extraction confidence.
    pub dob_confidence: u8,
    /// Age from the document.
    pub extracted_age: Option<u32>,
    /// Why extraction failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob_failure: Option<String>,
    /// Whether a document image is attached.
    pub has_document: bool,
    /// Whether a selfie image is attached.
    pub has_selfie: bool,
    /// Final verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<VerificationResult>,
}
