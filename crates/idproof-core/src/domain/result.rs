//! Verification verdict types.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Inclusive age range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    /// Lower bound.
    pub low: u32,
    /// Upper bound.
    pub high: u32,
}

impl AgeRange {
    /// Creates a range, swapping the bounds if given in reverse.
    #[must_use]
    pub const fn new(low: u32, high: u32) -> Self {
        if low <= high {
            Self { low, high }
        } else {
            Self {
                low: high,
                high: low,
            }
        }
    }

    /// Whether `age` lies inside the range.
    #[must_use]
    pub const fn contains(&self, age: u32) -> bool {
        self.low <= age && age <= self.high
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

/// Face comparison verdict between the document photo and the selfie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    /// Whether the faces belong to the same person.
    pub verified: bool,
    /// Match confidence (0-100).
    pub confidence: f64,
    /// Raw embedding distance, when a comparison ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Engine decision threshold, when a comparison ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl FaceMatch {
    /// A negative verdict with zero confidence (no face to compare).
    #[must_use]
    pub const fn no_face() -> Self {
        Self {
            verified: false,
            confidence: 0.0,
            distance: None,
            threshold: None,
        }
    }
}

/// Calibrated visual age estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeEstimate {
    /// Age reported by the engine before correction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_age: Option<u32>,
    /// Age after bias correction.
    pub adjusted_age: u32,
    /// Range derived around the adjusted age.
    pub range: AgeRange,
}

/// Outcome of comparing a document age with a visual estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyVerdict {
    /// Whether the ages agree within tolerance.
    pub consistent: bool,
    /// Distance between the declared age and the estimate (0 inside a range).
    pub difference: u32,
    /// Tolerance applied.
    pub tolerance: u32,
    /// Agreement confidence (0-100), 5 points lost per year of difference.
    pub confidence: u32,
}

/// Coarse age bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeGroup {
    /// Under 13.
    Child,
    /// 13 to 17.
    Minor,
    /// 18 to 24.
    #[serde(rename = "Young Adult")]
    YoungAdult,
    /// 25 to 34.
    Adult,
    /// 35 to 49.
    #[serde(rename = "Middle Age")]
    MiddleAge,
    /// 50 to 64.
    Senior,
    /// 65 and over.
    Elderly,
}

impl AgeGroup {
    /// Buckets an age. Intervals are half-open with inclusive lower bounds.
    #[must_use]
    pub const fn for_age(age: u32) -> Self {
        match age {
            0..=12 => Self::Child,
            13..=17 => Self::Minor,
            18..=24 => Self::YoungAdult,
            25..=34 => Self::Adult,
            35..=49 => Self::MiddleAge,
            50..=64 => Self::Senior,
            _ => Self::Elderly,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Child => "Child",
            Self::Minor => "Minor",
            Self::YoungAdult => "Young Adult",
            Self::Adult => "Adult",
            Self::MiddleAge => "Middle Age",
            Self::Senior => "Senior",
            Self::Elderly => "Elderly",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Age-based eligibility decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    /// Whether the age meets the minimum.
    pub eligible: bool,
    /// Age evaluated.
    pub age: u32,
    /// Minimum required age.
    pub min_age: u32,
    /// Bucket the age falls into.
    pub age_group: AgeGroup,
}

/// Advisory image-quality finding.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityIssue {
    /// Sharpness below threshold.
    #[serde(rename = "blurry")]
    Blurry,
    /// Mean brightness below the dark threshold.
    #[serde(rename = "too dark")]
    TooDark,
    /// Mean brightness above the bright threshold.
    #[serde(rename = "too bright")]
    TooBright,
}

impl QualityIssue {
    /// Issue label as reported to callers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Blurry => "blurry",
            Self::TooDark => "too dark",
            Self::TooBright => "too bright",
        }
    }
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Final verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    /// Face matched and ages are consistent.
    Verified,
    /// Anything else.
    Rejected,
}

/// Immutable record produced by the selfie stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Face comparison verdict.
    pub face_verified: bool,
    /// Face comparison confidence (0-100).
    pub face_confidence: f64,
    /// The face verdict is a neutral stand-in, not a real comparison.
    pub face_degraded: bool,
    /// Calibrated visual age.
    pub estimated_age: Option<u32>,
    /// Range around the calibrated visual age.
    pub estimated_age_range: Option<AgeRange>,
    /// The age estimate is a stand-in, not a real estimate.
    pub age_estimate_degraded: bool,
    /// Whether document and visual ages agree; `None` when not checked.
    pub age_consistent: Option<bool>,
    /// Consistency detail, when checked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_consistency: Option<ConsistencyVerdict>,
    /// Eligibility from the document age, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<Eligibility>,
    /// Final verdict.
    pub overall_status: OverallStatus,
    /// Advisory selfie quality findings, in rule order.
    pub quality_issues: Vec<QualityIssue>,
    /// Qualitative notes about checks that could not run normally.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    /// When the verdict was produced.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl VerificationResult {
    /// Whether the overall verdict is positive.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self.overall_status, OverallStatus::Verified)
    }
}
