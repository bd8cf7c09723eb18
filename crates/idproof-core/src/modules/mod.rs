//! Decision modules.
//!
//! Each module holds one piece of verification logic. They reason over
//! engine outputs and text, never over pixels.

mod biometric;
mod consistency;
mod dob;
mod extraction;
mod quality;
mod upload;

pub use biometric::{confidence_from_distance, BiometricConfig, BiometricMatcher};
pub use consistency::{
    check_consistency, eligibility, AgeEvidence, ConsistencyConfig, ConsistencyEngine,
    ConsistencyMode,
};
pub use dob::{age_on, DateTemplate, DobError, DobParser, DobParserConfig, ParsedDob};
pub use extraction::{DobExtraction, DobExtractor, DobLabel, ExtractionConfig};
pub use quality::{QualityGate, QualityThresholds};
pub use upload::UploadPolicy;
