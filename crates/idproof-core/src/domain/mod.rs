//! Core domain types for identity verification.

mod error;
mod image_ref;
mod outcome;
mod result;
mod session;

pub use error::{CapabilityError, UploadKind, ValidationError, VerificationError};
pub use image_ref::ImageRef;
pub use outcome::Outcome;
pub use result::{
    AgeEstimate, AgeGroup, AgeRange, ConsistencyVerdict, Eligibility, FaceMatch, OverallStatus,
    QualityIssue, VerificationResult,
};
pub use session::{
    DocumentStage, SessionId, SessionSnapshot, SessionStatus, VerificationSession,
};
