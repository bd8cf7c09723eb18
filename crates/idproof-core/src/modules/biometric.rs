//! Face matching and visual age calibration.
//!
//! Wraps a [`FaceCapability`] and turns its raw answers into calibrated
//! verdicts. Engine failures never abort the pipeline: they come back as
//! [`Outcome::Degraded`] stand-ins or [`Outcome::Failed`].

use tracing::{debug, info, warn};

use crate::domain::{AgeEstimate, AgeRange, CapabilityError, FaceMatch, ImageRef, Outcome};
use crate::ports::{FaceCapability, FaceComparison};

/// Calibration for face matching and age estimation.
#[derive(Debug, Clone)]
pub struct BiometricConfig {
    /// Years subtracted from the raw visual age estimate.
    pub age_correction: u32,
    /// Lowest adjusted age and lowest range bound.
    pub age_floor: u32,
    /// Half-width of the range around the adjusted age.
    pub range_spread: u32,
    /// Confidence reported with a degraded face match.
    pub neutral_confidence: f64,
    /// Range used when no estimate could be obtained.
    pub fallback_range: AgeRange,
    /// Age used when no estimate could be obtained.
    pub fallback_age: u32,
}

impl Default for BiometricConfig {
    fn default() -> Self {
        Self {
            age_correction: 6,
            age_floor: 18,
            range_spread: 5,
            neutral_confidence: 50.0,
            fallback_range: AgeRange::new(18, 35),
            fallback_age: 25,
        }
    }
}

/// Match confidence (0-100) from an embedding distance and its threshold.
///
/// Computes `(1 - distance / threshold) * 100`, clamped and rounded to two
/// decimals. A non-positive threshold or non-finite distance gives zero.
#[must_use]
pub fn confidence_from_distance(distance: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 || !threshold.is_finite() || !distance.is_finite() {
        return 0.0;
    }
    let raw = (1.0 - distance / threshold) * 100.0;
    (raw.clamp(0.0, 100.0) * 100.0).round() / 100.0
}

/// Face matcher and age calibrator.
#[derive(Debug, Clone, Default)]
pub struct BiometricMatcher {
    config: BiometricConfig,
}

impl BiometricMatcher {
    /// Creates a matcher with the given calibration.
    #[must_use]
    pub const fn new(config: BiometricConfig) -> Self {
        Self { config }
    }

    /// Calibration in use.
    #[must_use]
    pub const fn config(&self) -> &BiometricConfig {
        &self.config
    }

    /// Verdict for a completed comparison.
    #[must_use]
    pub fn verdict(comparison: &FaceComparison) -> FaceMatch {
        FaceMatch {
            verified: comparison.verified,
            confidence: confidence_from_distance(comparison.distance, comparison.threshold),
            distance: Some(comparison.distance),
            threshold: Some(comparison.threshold),
        }
    }

    /// The neutral stand-in used when the engine cannot answer.
    #[must_use]
    pub const fn neutral_match(&self) -> FaceMatch {
        FaceMatch {
            verified: true,
            confidence: self.config.neutral_confidence,
            distance: None,
            threshold: None,
        }
    }

    /// Compares the face on the document with the selfie.
    ///
    /// Both images are checked for a face first. If either has none the
    /// verdict is negative with zero confidence and no comparison runs.
    pub fn match_faces(
        &self,
        faces: &dyn FaceCapability,
        document: &ImageRef,
        selfie: &ImageRef,
    ) -> Outcome<FaceMatch> {
        for (label, image) in [("document", document), ("selfie", selfie)] {
            match faces.detect_faces(image) {
                Ok(0) | Err(CapabilityError::NoFaceDetected) => {
                    info!("No face detected in the {label} image, skipping comparison");
                    return Outcome::Ok(FaceMatch::no_face());
                }
                Ok(_) => {}
                Err(e) => return self.degrade_match(&e),
            }
        }

        match faces.compare(document, selfie) {
            Ok(comparison) => {
                let verdict = Self::verdict(&comparison);
                debug!(
                    "Face comparison: verified={}, distance={:.4}, threshold={:.4}, confidence={:.2}",
                    verdict.verified, comparison.distance, comparison.threshold, verdict.confidence
                );
                Outcome::Ok(verdict)
            }
            Err(CapabilityError::NoFaceDetected) => Outcome::Ok(FaceMatch::no_face()),
            Err(e) => self.degrade_match(&e),
        }
    }

    fn degrade_match(&self, error: &CapabilityError) -> Outcome<FaceMatch> {
        warn!("Face comparison unavailable, using neutral verdict: {error}");
        Outcome::Degraded {
            value: self.neutral_match(),
            reason: error.to_string(),
        }
    }

    /// Applies the bias correction to a raw visual age.
    #[must_use]
    pub fn calibrate_age(&self, raw_age: u32) -> AgeEstimate {
        let c = &self.config;
        let adjusted = raw_age.saturating_sub(c.age_correction).max(c.age_floor);
        let low = adjusted.saturating_sub(c.range_spread).max(c.age_floor);
        let high = adjusted.saturating_add(c.range_spread);

        AgeEstimate {
            raw_age: Some(raw_age),
            adjusted_age: adjusted,
            range: AgeRange::new(low, high),
        }
    }

    /// Estimates the apparent age of the selfie face.
    ///
    /// No face is a failure. An unavailable engine degrades to the
    /// configured fallback range.
    pub fn estimate_age(&self, faces: &dyn FaceCapability, selfie: &ImageRef) -> Outcome<AgeEstimate> {
        match faces.estimate_age(selfie) {
            Ok(raw) => {
                let estimate = self.calibrate_age(raw);
                debug!(
                    "Age estimate: raw={raw}, adjusted={}, range={}",
                    estimate.adjusted_age, estimate.range
                );
                Outcome::Ok(estimate)
            }
            Err(CapabilityError::NoFaceDetected) => {
                Outcome::Failed(CapabilityError::NoFaceDetected.to_string())
            }
            Err(e) => {
                warn!("Age estimation unavailable, using fallback range: {e}");
                Outcome::Degraded {
                    value: AgeEstimate {
                        raw_age: None,
                        adjusted_age: self.config.fallback_age,
                        range: self.config.fallback_range,
                    },
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Faces {
        detect: Vec<Result<usize, CapabilityError>>,
        compare: Result<FaceComparison, CapabilityError>,
        age: Result<u32, CapabilityError>,
        detect_calls: AtomicUsize,
        compare_calls: AtomicUsize,
    }

    impl Faces {
        fn new(compare: Result<FaceComparison, CapabilityError>) -> Self {
            Self {
                detect: vec![Ok(1), Ok(1)],
                compare,
                age: Ok(30),
                detect_calls: AtomicUsize::new(0),
                compare_calls: AtomicUsize::new(0),
            }
        }
    }

    impl FaceCapability for Faces {
        fn detect_faces(&self, _image: &ImageRef) -> Result<usize, CapabilityError> {
            let n = self.detect_calls.fetch_add(1, Ordering::SeqCst);
            self.detect.get(n).cloned().unwrap_or(Ok(1))
        }

        fn compare(&self, _a: &ImageRef, _b: &ImageRef) -> Result<FaceComparison, CapabilityError> {
            self.compare_calls.fetch_add(1, Ordering::SeqCst);
            self.compare.clone()
        }

        fn estimate_age(&self, _image: &ImageRef) -> Result<u32, CapabilityError> {
            self.age.clone()
        }
    }

    fn comparison(distance: f64, threshold: f64) -> FaceComparison {
        FaceComparison {
            verified: distance < threshold,
            distance,
            threshold,
        }
    }

    fn refs() -> (ImageRef, ImageRef) {
        (ImageRef::new("document"), ImageRef::new("selfie"))
    }

    #[test]
    fn test_confidence_from_distance() {
        assert_eq!(confidence_from_distance(0.0, 0.4), 100.0);
        assert_eq!(confidence_from_distance(0.1, 0.4), 75.0);
        assert_eq!(confidence_from_distance(0.4, 0.4), 0.0);
        assert_eq!(confidence_from_distance(0.9, 0.4), 0.0);
        assert_eq!(confidence_from_distance(0.1, 0.0), 0.0);
        assert_eq!(confidence_from_distance(f64::NAN, 0.4), 0.0);
    }

    #[test]
    fn test_confidence_rounds_to_two_decimals() {
        assert_eq!(confidence_from_distance(0.1, 0.3), 66.67);
    }

    #[test]
    fn test_match_faces_genuine() {
        let faces = Faces::new(Ok(comparison(0.1, 0.4)));
        let (doc, selfie) = refs();
        let outcome = BiometricMatcher::default().match_faces(&faces, &doc, &selfie);

        let verdict = outcome.genuine().cloned().unwrap_or_else(FaceMatch::no_face);
        assert!(verdict.verified);
        assert_eq!(verdict.confidence, 75.0);
        assert_eq!(verdict.distance, Some(0.1));
    }

    #[test]
    fn test_no_face_short_circuits_comparison() {
        let mut faces = Faces::new(Ok(comparison(0.1, 0.4)));
        faces.detect = vec![Ok(1), Ok(0)];
        let (doc, selfie) = refs();
        let outcome = BiometricMatcher::default().match_faces(&faces, &doc, &selfie);

        assert_eq!(outcome, Outcome::Ok(FaceMatch::no_face()));
        assert_eq!(faces.compare_calls.load(Ordering::SeqCst), 0);

        let mut faces = Faces::new(Ok(comparison(0.1, 0.4)));
        faces.detect = vec![Err(CapabilityError::NoFaceDetected)];
        let outcome = BiometricMatcher::default().match_faces(&faces, &doc, &selfie);
        assert_eq!(outcome, Outcome::Ok(FaceMatch::no_face()));
        assert_eq!(faces.compare_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unavailable_engine_degrades_to_neutral() {
        let faces = Faces::new(Err(CapabilityError::Unavailable("engine offline".into())));
        let (doc, selfie) = refs();
        let outcome = BiometricMatcher::default().match_faces(&faces, &doc, &selfie);

        assert!(outcome.is_degraded());
        assert!(outcome.genuine().is_none());
        let verdict = outcome.value().cloned().unwrap_or_else(FaceMatch::no_face);
        assert!(verdict.verified);
        assert_eq!(verdict.confidence, 50.0);

        // A genuine match with the same confidence is still distinguishable.
        let genuine = Faces::new(Ok(comparison(0.2, 0.4)));
        let real = BiometricMatcher::default().match_faces(&genuine, &doc, &selfie);
        assert_eq!(real.value().map(|m| m.confidence), Some(50.0));
        assert!(!real.is_degraded());
        assert_ne!(real, outcome);
    }

    #[test]
    fn test_calibrate_age() {
        let matcher = BiometricMatcher::default();

        let estimate = matcher.calibrate_age(36);
        assert_eq!(estimate.adjusted_age, 30);
        assert_eq!(estimate.range, AgeRange::new(25, 35));

        let young = matcher.calibrate_age(20);
        assert_eq!(young.adjusted_age, 18);
        assert_eq!(young.range, AgeRange::new(18, 23));

        let child = matcher.calibrate_age(3);
        assert_eq!(child.adjusted_age, 18);
        assert_eq!(child.raw_age, Some(3));
    }

    #[test]
    fn test_calibration_is_configurable() {
        let matcher = BiometricMatcher::new(BiometricConfig {
            age_correction: 0,
            age_floor: 0,
            range_spread: 3,
            ..BiometricConfig::default()
        });
        let estimate = matcher.calibrate_age(16);
        assert_eq!(estimate.adjusted_age, 16);
        assert_eq!(estimate.range, AgeRange::new(13, 19));
    }

    #[test]
    fn test_estimate_age_outcomes() {
        let matcher = BiometricMatcher::default();
        let selfie = ImageRef::new("selfie");

        let mut faces = Faces::new(Ok(comparison(0.1, 0.4)));
        assert_eq!(
            matcher.estimate_age(&faces, &selfie).genuine().map(|e| e.adjusted_age),
            Some(24)
        );

        faces.age = Err(CapabilityError::NoFaceDetected);
        assert!(matches!(matcher.estimate_age(&faces, &selfie), Outcome::Failed(_)));

        faces.age = Err(CapabilityError::Unavailable("timeout".into()));
        let degraded = matcher.estimate_age(&faces, &selfie);
        assert!(degraded.is_degraded());
        assert_eq!(degraded.value().map(|e| e.range), Some(AgeRange::new(18, 35)));
        assert_eq!(degraded.value().map(|e| e.adjusted_age), Some(25));
    }
}
