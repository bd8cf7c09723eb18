//! idproof core - verification orchestration and decision logic.
//!
//! This crate contains the domain types, the collaborator ports, the decision
//! modules (date-of-birth parsing, DOB extraction, image-quality gating,
//! biometric calibration, age consistency) and the session-aware
//! [`VerificationPipeline`] that sequences them across the document and selfie
//! upload stages.

pub mod domain;
pub mod modules;
pub mod ports;
pub mod service;

pub use domain::{
    AgeEstimate, AgeGroup, AgeRange, CapabilityError, ConsistencyVerdict, DocumentStage,
    Eligibility, FaceMatch, ImageRef, Outcome, OverallStatus, QualityIssue, SessionId,
    SessionSnapshot, SessionStatus, UploadKind, ValidationError, VerificationError,
    VerificationResult, VerificationSession,
};
pub use modules::{
    BiometricConfig, ConsistencyConfig, ConsistencyMode, DobExtractor, DobParser,
    DobParserConfig, ExtractionConfig, QualityThresholds, UploadPolicy,
};
pub use ports::{
    Clock, FaceCapability, FaceComparison, ImageStore, ProgressSink, QualitySignalCapability,
    SilentProgress, StageEvent, SystemClock, TextExtractionCapability,
};
pub use service::{Capabilities, PipelineConfig, SessionConfig, SessionStore, VerificationPipeline};
