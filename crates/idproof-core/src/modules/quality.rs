//! Image-quality gate.
//!
//! Turns the blur and brightness signals reported by the vision engine into
//! advisory issues. The gate never blocks a face match; its findings are
//! reported alongside the verdict.

use tracing::debug;

use crate::domain::{ImageRef, Outcome, QualityIssue};
use crate::ports::QualitySignalCapability;

/// Thresholds for the quality gate.
#[derive(Debug, Clone)]
pub struct QualityThresholds {
    /// Sharpness scores below this are blurry.
    pub blur_threshold: f64,
    /// Mean brightness below this is too dark; above `255 - dark_threshold`
    /// is too bright.
    pub dark_threshold: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            blur_threshold: 100.0,
            dark_threshold: 50.0,
        }
    }
}

/// Quality gate over engine-supplied signals.
#[derive(Debug, Clone, Default)]
pub struct QualityGate {
    thresholds: QualityThresholds,
}

impl QualityGate {
    /// Creates a gate with the given thresholds.
    #[must_use]
    pub const fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    /// Reports every issue the signals indicate, in rule order.
    #[must_use]
    pub fn assess(&self, blur_score: f64, brightness_mean: f64) -> Vec<QualityIssue> {
        let mut issues = Vec::new();

        if blur_score < self.thresholds.blur_threshold {
            issues.push(QualityIssue::Blurry);
        }
        if brightness_mean < self.thresholds.dark_threshold {
            issues.push(QualityIssue::TooDark);
        }
        if brightness_mean > 255.0 - self.thresholds.dark_threshold {
            issues.push(QualityIssue::TooBright);
        }

        issues
    }

    /// Fetches the signals for an image and assesses them.
    pub fn assess_image(
        &self,
        signals: &dyn QualitySignalCapability,
        image: &ImageRef,
    ) -> Outcome<Vec<QualityIssue>> {
        let blur = match signals.blur_score(image) {
            Ok(score) => score,
            Err(e) => return Outcome::Failed(format!("blur score unavailable: {e}")),
        };
        let brightness = match signals.brightness(image) {
            Ok(mean) => mean,
            Err(e) => return Outcome::Failed(format!("brightness unavailable: {e}")),
        };

        debug!("Quality signals: blur={blur:.1}, brightness={brightness:.1}");
        Outcome::Ok(self.assess(blur, brightness))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CapabilityError;

    struct Signals {
        blur: Result<f64, CapabilityError>,
        brightness: Result<f64, CapabilityError>,
    }

    impl QualitySignalCapability for Signals {
        fn blur_score(&self, _image: &ImageRef) -> Result<f64, CapabilityError> {
            self.blur.clone()
        }

        fn brightness(&self, _image: &ImageRef) -> Result<f64, CapabilityError> {
            self.brightness.clone()
        }
    }

    #[test]
    fn test_default_thresholds() {
        let t = QualityThresholds::default();
        assert!((t.blur_threshold - 100.0).abs() < f64::EPSILON);
        assert!((t.dark_threshold - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_good_image_has_no_issues() {
        let gate = QualityGate::default();
        assert!(gate.assess(250.0, 128.0).is_empty());
    }

    #[test]
    fn test_reports_all_issues() {
        let gate = QualityGate::default();
        assert_eq!(
            gate.assess(10.0, 20.0),
            vec![QualityIssue::Blurry, QualityIssue::TooDark]
        );
        assert_eq!(
            gate.assess(10.0, 230.0),
            vec![QualityIssue::Blurry, QualityIssue::TooBright]
        );
    }

    #[test]
    fn test_threshold_edges_are_exclusive() {
        let gate = QualityGate::default();
        assert!(gate.assess(100.0, 50.0).is_empty());
        assert!(gate.assess(100.0, 205.0).is_empty());
        assert_eq!(gate.assess(99.9, 205.1), vec![QualityIssue::Blurry, QualityIssue::TooBright]);
    }

    #[test]
    fn test_assess_image() {
        let gate = QualityGate::default();
        let image = ImageRef::new("selfie");

        let ok = Signals {
            blur: Ok(40.0),
            brightness: Ok(120.0),
        };
        assert_eq!(
            gate.assess_image(&ok, &image),
            Outcome::Ok(vec![QualityIssue::Blurry])
        );

        let broken = Signals {
            blur: Ok(40.0),
            brightness: Err(CapabilityError::Unavailable("offline".into())),
        };
        assert!(matches!(gate.assess_image(&broken, &image), Outcome::Failed(_)));
    }
}
