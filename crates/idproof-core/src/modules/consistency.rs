//! Age consistency and eligibility decisions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{
    AgeEstimate, AgeGroup, AgeRange, ConsistencyVerdict, Eligibility, FaceMatch, Outcome,
    OverallStatus,
};

/// Which form of the visual estimate is compared with the document age.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyMode {
    /// Compare with the adjusted point estimate.
    Point,
    /// Compare with the estimated range.
    #[default]
    Range,
}

/// Configuration for the consistency engine.
#[derive(Debug, Clone)]
pub struct ConsistencyConfig {
    /// Years of disagreement still considered consistent.
    pub tolerance: u32,
    /// Estimate form to compare against.
    pub mode: ConsistencyMode,
    /// Minimum age for eligibility.
    pub min_age: u32,
    /// Whether a degraded face verdict may still verify.
    pub accept_degraded_match: bool,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            tolerance: 10,
            mode: ConsistencyMode::Range,
            min_age: 18,
            accept_degraded_match: false,
        }
    }
}

/// Visual evidence of age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeEvidence {
    /// A single estimated age.
    Point(u32),
    /// An estimated range.
    Range(AgeRange),
}

/// Compares a declared age with visual evidence.
///
/// The difference is the absolute gap for a point, and the distance to the
/// nearest bound for a range (zero inside it). Consistency holds when the
/// difference is within `tolerance`. Confidence loses 5 points per year of
/// difference.
#[must_use]
pub fn check_consistency(declared: u32, evidence: AgeEvidence, tolerance: u32) -> ConsistencyVerdict {
    let difference = match evidence {
        AgeEvidence::Point(estimate) => declared.abs_diff(estimate),
        AgeEvidence::Range(range) if range.contains(declared) => 0,
        AgeEvidence::Range(range) if declared < range.low => range.low - declared,
        AgeEvidence::Range(range) => declared - range.high,
    };

    ConsistencyVerdict {
        consistent: difference <= tolerance,
        difference,
        tolerance,
        confidence: 100u32.saturating_sub(difference.saturating_mul(5)),
    }
}

/// Eligibility of an age against a minimum.
#[must_use]
pub const fn eligibility(age: u32, min_age: u32) -> Eligibility {
    Eligibility {
        eligible: age >= min_age,
        age,
        min_age,
        age_group: AgeGroup::for_age(age),
    }
}

/// Combines the face verdict with age consistency into the final status.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyEngine {
    config: ConsistencyConfig,
}

impl ConsistencyEngine {
    /// Creates an engine with the given configuration.
    #[must_use]
    pub const fn new(config: ConsistencyConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ConsistencyConfig {
        &self.config
    }

    /// Checks a document age against a calibrated estimate in the configured mode.
    #[must_use]
    pub fn check(&self, declared: u32, estimate: &AgeEstimate) -> ConsistencyVerdict {
        let evidence = match self.config.mode {
            ConsistencyMode::Point => AgeEvidence::Point(estimate.adjusted_age),
            ConsistencyMode::Range => AgeEvidence::Range(estimate.range),
        };
        let verdict = check_consistency(declared, evidence, self.config.tolerance);
        debug!(
            "Age consistency: declared={declared}, evidence={evidence:?}, difference={}, consistent={}",
            verdict.difference, verdict.consistent
        );
        verdict
    }

    /// Eligibility against the configured minimum age.
    #[must_use]
    pub const fn eligibility(&self, age: u32) -> Eligibility {
        eligibility(age, self.config.min_age)
    }

    /// Final verdict.
    ///
    /// Verified only when the faces matched and the ages agree. A missing
    /// consistency result means it could not be checked and does not count
    /// against the user. A degraded face verdict only counts when configured.
    #[must_use]
    pub fn overall_status(
        &self,
        face: &Outcome<FaceMatch>,
        age_consistent: Option<bool>,
    ) -> OverallStatus {
        let face_ok = match face {
            Outcome::Ok(m) => m.verified,
            Outcome::Degraded { value, .. } => self.config.accept_degraded_match && value.verified,
            Outcome::Failed(_) => false,
        };

        if face_ok && age_consistent.unwrap_or(true) {
            OverallStatus::Verified
        } else {
            OverallStatus::Rejected
        }
    }
}
