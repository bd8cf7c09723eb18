//! Session-aware verification pipeline.
//!
//! Sequences the two upload stages of a session. The document stage stores
//! the ID image and extracts a date of birth. The selfie stage stores the
//! selfie, then runs the quality gate, face match, age estimate and
//! consistency check and records the verdict.
//!
//! Engine failures never abort a stage. They are logged and surface in the
//! result as degraded flags and fixed notes.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::store::{SessionConfig, SessionStore};
use crate::domain::{
    AgeEstimate, DocumentStage, FaceMatch, ImageRef, Outcome, SessionId, SessionSnapshot,
    UploadKind, VerificationError, VerificationResult, VerificationSession,
};
use crate::modules::{
    BiometricConfig, BiometricMatcher, ConsistencyConfig, ConsistencyEngine, DobExtractor,
    DobParser, DobParserConfig, ExtractionConfig, QualityGate, QualityThresholds, UploadPolicy,
};
use crate::ports::{
    Clock, FaceCapability, ImageStore, ProgressSink, QualitySignalCapability, SilentProgress,
    StageEvent, TextExtractionCapability,
};

const NOTE_NO_DOB: &str = "could not extract date of birth from the document";
const NOTE_QUALITY_UNAVAILABLE: &str = "selfie quality could not be assessed";
const NOTE_FACE_DEGRADED: &str = "face comparison unavailable; neutral verdict used";
const NOTE_AGE_NO_FACE: &str = "no face detected for age estimation";
const NOTE_AGE_DEGRADED: &str = "age estimation unavailable; fallback range used";
const NOTE_NO_DOCUMENT_AGE: &str = "document age unavailable; age consistency not checked";
const NOTE_NO_ESTIMATE: &str = "visual age unavailable; age consistency not checked";

/// Configuration for every stage of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Session lifetime.
    pub session: SessionConfig,
    /// Date parsing.
    pub parser: DobParserConfig,
    /// DOB extraction confidence.
    pub extraction: ExtractionConfig,
    /// Selfie quality thresholds.
    pub quality: QualityThresholds,
    /// Face match and age calibration.
    pub biometric: BiometricConfig,
    /// Age consistency and eligibility.
    pub consistency: ConsistencyConfig,
    /// Upload acceptance rules.
    pub upload: UploadPolicy,
}

/// External collaborators the pipeline drives.
#[derive(Clone)]
pub struct Capabilities {
    /// OCR engine.
    pub ocr: Arc<dyn TextExtractionCapability>,
    /// Face engine.
    pub faces: Arc<dyn FaceCapability>,
    /// Quality signal engine.
    pub quality: Arc<dyn QualitySignalCapability>,
    /// Upload storage.
    pub store: Arc<dyn ImageStore>,
}

/// The verification pipeline.
pub struct VerificationPipeline {
    sessions: SessionStore,
    extractor: DobExtractor,
    quality: QualityGate,
    matcher: BiometricMatcher,
    consistency: ConsistencyEngine,
    upload: UploadPolicy,
    caps: Capabilities,
    progress: Arc<dyn ProgressSink>,
}

impl VerificationPipeline {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(config: PipelineConfig, caps: Capabilities, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: SessionStore::new(config.session, clock),
            extractor: DobExtractor::new(config.extraction, DobParser::new(config.parser)),
            quality: QualityGate::new(config.quality),
            matcher: BiometricMatcher::new(config.biometric),
            consistency: ConsistencyEngine::new(config.consistency),
            upload: config.upload,
            caps,
            progress: Arc::new(SilentProgress),
        }
    }

    /// Reports stage events to `sink`.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// The underlying session store.
    #[must_use]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Starts a new session.
    pub fn start_session(&self) -> SessionId {
        let session = self.sessions.create_session();
        info!("Started verification session {session}");
        self.progress.on_event(StageEvent::SessionStarted { session });
        session
    }

    /// Runs the document stage.
    ///
    /// A document without a readable date of birth is still recorded. The
    /// session then stays open for another document upload.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad upload, `SessionNotFound` for an
    /// unknown or expired session, `StageConflict` once a date of birth has
    /// been recorded, and `Storage` if the upload cannot be stored.
    pub fn submit_document(
        &self,
        id: SessionId,
        filename: &str,
        bytes: &[u8],
    ) -> Result<DocumentStage, VerificationError> {
        self.upload.validate(filename, bytes)?;
        let today = self.sessions.now().date();

        self.sessions.update(id, |session| {
            session.ensure_accepts_document()?;

            let image = self.save(bytes, UploadKind::Document)?;
            if let Some(previous) = session.attach_document(image.clone())? {
                self.discard(&previous);
            }
            self.progress
                .on_event(StageEvent::DocumentReceived { session: id });

            let stage = match self
                .extractor
                .extract_from_image(self.caps.ocr.as_ref(), &image, today)
            {
                Outcome::Ok(dob) => {
                    info!("Session {id}: date of birth extracted (confidence {})", dob.confidence);
                    self.progress.on_event(StageEvent::DobExtracted {
                        session: id,
                        confidence: dob.confidence,
                        age: dob.age,
                    });
                    DocumentStage::extracted(dob.date, dob.text, dob.confidence, dob.age)
                }
                other => {
                    let reason = other.reason().unwrap_or(NOTE_NO_DOB);
                    warn!("Session {id}: no date of birth: {reason}");
                    self.progress.on_event(StageEvent::DobMissing {
                        session: id,
                        reason: NOTE_NO_DOB.to_string(),
                    });
                    DocumentStage::failed(NOTE_NO_DOB)
                }
            };

            session.record_document_stage(stage.clone())?;
            Ok(stage)
        })
    }

    /// Runs the selfie stage and records the verdict.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad upload or a missing document,
    /// `SessionNotFound` for an unknown or expired session, `StageConflict`
    /// once a verdict exists, and `Storage` if the upload cannot be stored.
    pub fn submit_selfie(
        &self,
        id: SessionId,
        filename: &str,
        bytes: &[u8],
    ) -> Result<VerificationResult, VerificationError> {
        self.upload.validate(filename, bytes)?;

        self.sessions.update(id, |session| {
            session.ensure_accepts_selfie()?;

            let selfie = self.save(bytes, UploadKind::Selfie)?;
            if let Some(previous) = session.attach_selfie(selfie.clone())? {
                self.discard(&previous);
            }
            self.progress
                .on_event(StageEvent::SelfieReceived { session: id });

            let result = self.evaluate(session, &selfie, self.sessions.now())?;
            session.record_selfie_stage(result.clone())?;

            info!("Session {id}: verification {:?}", result.overall_status);
            self.progress.on_event(StageEvent::Verdict {
                session: id,
                status: result.overall_status,
            });
            Ok(result)
        })
    }

    fn evaluate(
        &self,
        session: &VerificationSession,
        selfie: &ImageRef,
        now: OffsetDateTime,
    ) -> Result<VerificationResult, VerificationError> {
        let id = session.id();
        let document = session
            .document_ref()
            .cloned()
            .ok_or(VerificationError::Internal)?;
        let faces = self.caps.faces.as_ref();
        let mut notes = Vec::new();

        let quality_issues = match self.quality.assess_image(self.caps.quality.as_ref(), selfie) {
            Outcome::Ok(issues) | Outcome::Degraded { value: issues, .. } => issues,
            Outcome::Failed(reason) => {
                warn!("Session {id}: {reason}");
                notes.push(NOTE_QUALITY_UNAVAILABLE.to_string());
                Vec::new()
            }
        };
        self.progress.on_event(StageEvent::QualityAssessed {
            session: id,
            issues: quality_issues.len(),
        });

        let face = self.matcher.match_faces(faces, &document, selfie);
        if face.is_degraded() {
            notes.push(NOTE_FACE_DEGRADED.to_string());
        }
        let verdict = face.value().cloned().unwrap_or_else(FaceMatch::no_face);
        self.progress.on_event(StageEvent::FacesCompared {
            session: id,
            verified: verdict.verified,
            confidence: verdict.confidence,
            degraded: face.is_degraded(),
        });

        let age = self.matcher.estimate_age(faces, selfie);
        match &age {
            Outcome::Ok(_) => {}
            Outcome::Degraded { .. } => notes.push(NOTE_AGE_DEGRADED.to_string()),
            Outcome::Failed(_) => notes.push(NOTE_AGE_NO_FACE.to_string()),
        }
        let estimate: Option<&AgeEstimate> = age.value();
        self.progress.on_event(StageEvent::AgeEstimated {
            session: id,
            age: estimate.map(|e| e.adjusted_age),
            degraded: age.is_degraded(),
        });

        let document_age = session.extracted_age();
        let consistency = match (document_age, age.genuine()) {
            (Some(declared), Some(estimate)) => Some(self.consistency.check(declared, estimate)),
            (None, _) => {
                notes.push(NOTE_NO_DOCUMENT_AGE.to_string());
                None
            }
            (Some(_), None) => {
                notes.push(NOTE_NO_ESTIMATE.to_string());
                None
            }
        };
        let age_consistent = consistency.map(|c| c.consistent);
        let eligibility = document_age.map(|a| self.consistency.eligibility(a));
        let overall_status = self.consistency.overall_status(&face, age_consistent);

        debug!(
            "Session {id}: face={}, consistent={age_consistent:?}, status={overall_status:?}",
            verdict.verified
        );

        Ok(VerificationResult {
            face_verified: verdict.verified,
            face_confidence: verdict.confidence,
            face_degraded: face.is_degraded(),
            estimated_age: estimate.map(|e| e.adjusted_age),
            estimated_age_range: estimate.map(|e| e.range),
            age_estimate_degraded: age.is_degraded(),
            age_consistent,
            age_consistency: consistency,
            eligibility,
            overall_status,
            quality_issues,
            notes,
            timestamp: now,
        })
    }

    /// Caller-facing view of a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for unknown or expired sessions.
    pub fn status(&self, id: SessionId) -> Result<SessionSnapshot, VerificationError> {
        self.sessions.get(id).map(|s| s.snapshot())
    }

    /// Evicts expired sessions and deletes their uploads. Returns how many
    /// sessions were evicted.
    pub fn sweep_expired(&self) -> usize {
        let expired = self.sessions.sweep_expired();
        let evicted = expired.len();
        for mut session in expired {
            for image in session.take_images() {
                self.discard(&image);
            }
        }
        if evicted > 0 {
            info!("Evicted {evicted} expired session(s)");
            self.progress.on_event(StageEvent::SessionsSwept { evicted });
        }
        evicted
    }

    /// Ends a session and deletes its uploads.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if no such session is stored.
    pub fn close_session(&self, id: SessionId) -> Result<(), VerificationError> {
        let mut session = self
            .sessions
            .remove(id)
            .ok_or(VerificationError::SessionNotFound)?;
        for image in session.take_images() {
            self.discard(&image);
        }
        debug!("Closed session {id}");
        Ok(())
    }

    fn save(&self, bytes: &[u8], kind: UploadKind) -> Result<ImageRef, VerificationError> {
        self.caps.store.save(bytes, kind.label()).map_err(|e| {
            warn!("Failed to store {kind} upload: {e:#}");
            VerificationError::Storage
        })
    }

    fn discard(&self, image: &ImageRef) {
        match self.caps.store.delete(image) {
            Ok(true) => debug!("Deleted upload {image}"),
            Ok(false) => {}
            Err(e) => warn!("Failed to delete upload: {e:#}"),
        }
    }
}

impl std::fmt::Debug for VerificationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationPipeline")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}
