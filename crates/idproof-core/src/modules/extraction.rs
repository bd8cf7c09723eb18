//! Date-of-birth extraction from OCR text.
//!
//! Applies a prioritized pattern list to raw OCR output. The first pattern
//! that yields a parseable date wins; its rank determines the confidence.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use time::Date;
use tracing::debug;

use super::dob::DobParser;
use crate::domain::{ImageRef, Outcome};
use crate::ports::TextExtractionCapability;

/// Date shapes accepted after a label.
const DATE: &str = r"\d{2}[/-]\d{2}[/-]\d{4}|\d{4}[/-]\d{2}[/-]\d{2}|\d{2}[/-]\d{2}[/-]\d{2}";

/// Which pattern located the date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DobLabel {
    /// `DOB: ...`
    Dob,
    /// `Date of Birth: ...`
    DateOfBirth,
    /// `जन्म तिथि: ...`
    Hindi,
    /// A bare date anywhere in the text.
    Unlabeled,
}

struct DobPattern {
    label: DobLabel,
    regex: Regex,
}

/// Patterns in priority order.
fn patterns() -> &'static [DobPattern] {
    static PATTERNS: OnceLock<Vec<DobPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (DobLabel::Dob, format!(r"(?i)\bDOB\s*[:\-]?\s*({DATE})\b")),
            (
                DobLabel::DateOfBirth,
                format!(r"(?i)\bDate\s+of\s+Birth\s*[:\-]?\s*({DATE})\b"),
            ),
            (DobLabel::Hindi, format!(r"जन्म\s*तिथि\s*[:\-]?\s*({DATE})\b")),
            (DobLabel::Unlabeled, format!(r"\b({DATE})\b")),
        ]
        .into_iter()
        .filter_map(|(label, source)| {
            Regex::new(&source)
                .ok()
                .map(|regex| DobPattern { label, regex })
        })
        .collect()
    })
}

/// Confidence scoring for DOB extraction.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Confidence for the highest-priority pattern.
    pub base_confidence: u8,
    /// Confidence lost per rank.
    pub confidence_step: u8,
    /// Minimum confidence for any match.
    pub confidence_floor: u8,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_confidence: 90,
            confidence_step: 20,
            confidence_floor: 20,
        }
    }
}

impl ExtractionConfig {
    /// Confidence for a match by the pattern at `rank` (0-based).
    #[must_use]
    pub fn confidence_for(&self, rank: usize) -> u8 {
        let penalty = u8::try_from(rank)
            .unwrap_or(u8::MAX)
            .saturating_mul(self.confidence_step);
        self.base_confidence
            .saturating_sub(penalty)
            .max(self.confidence_floor)
            .min(100)
    }
}

/// A located and validated date of birth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DobExtraction {
    /// Date text as found, label stripped.
    pub text: String,
    /// Parsed date.
    pub date: Date,
    /// Age on the extraction day.
    pub age: u32,
    /// Confidence (0-100).
    pub confidence: u8,
    /// Pattern that matched.
    pub label: DobLabel,
}

/// DOB extractor over raw OCR text.
#[derive(Debug, Clone, Default)]
pub struct DobExtractor {
    config: ExtractionConfig,
    parser: DobParser,
}

impl DobExtractor {
    /// Creates an extractor.
    #[must_use]
    pub const fn new(config: ExtractionConfig, parser: DobParser) -> Self {
        Self { config, parser }
    }

    /// Finds the date of birth in `raw` text, computing age as of `today`.
    ///
    /// Patterns are tried in priority order. A pattern whose first match
    /// does not parse into a plausible date is skipped in favour of the
    /// next one.
    #[must_use]
    pub fn extract(&self, raw: &str, today: Date) -> Option<DobExtraction> {
        let text = raw.replace(['\n', '\r'], " ");

        for (rank, pattern) in patterns().iter().enumerate() {
            let Some(found) = pattern.regex.captures(&text).and_then(|c| c.get(1)) else {
                continue;
            };
            let candidate = found.as_str().trim();

            match self.parser.parse_with_age(candidate, today) {
                Ok((parsed, age)) => {
                    let confidence = self.config.confidence_for(rank);
                    debug!(
                        "DOB '{candidate}' matched {:?} pattern (confidence {confidence})",
                        pattern.label
                    );
                    return Some(DobExtraction {
                        text: candidate.to_string(),
                        date: parsed.date,
                        age,
                        confidence,
                        label: pattern.label,
                    });
                }
                Err(e) => {
                    debug!("Discarding {:?} match '{candidate}': {e}", pattern.label);
                }
            }
        }

        None
    }

    /// Runs OCR on an image and extracts the date of birth.
    ///
    /// OCR failures and texts without a usable date are both `Failed`; the
    /// pipeline continues without a document age either way.
    pub fn extract_from_image(
        &self,
        ocr: &dyn TextExtractionCapability,
        image: &ImageRef,
        today: Date,
    ) -> Outcome<DobExtraction> {
        match ocr.extract_text(image) {
            Ok(text) => self.extract(&text, today).map_or_else(
                || Outcome::Failed("could not extract date of birth from the document".into()),
                Outcome::Ok,
            ),
            Err(e) => Outcome::Failed(format!("text extraction failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::domain::CapabilityError;

    const TODAY: Date = date!(2025 - 01 - 01);

    struct FixedOcr(Result<String, CapabilityError>);

    impl TextExtractionCapability for FixedOcr {
        fn extract_text(&self, _image: &ImageRef) -> Result<String, CapabilityError> {
            self.0.clone()
        }
    }

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(patterns().len(), 4);
    }

    #[test]
    fn test_confidence_is_monotonic_and_floored() {
        let config = ExtractionConfig::default();
        assert_eq!(config.confidence_for(0), 90);
        assert_eq!(config.confidence_for(1), 70);
        assert_eq!(config.confidence_for(2), 50);
        assert_eq!(config.confidence_for(3), 30);
        assert_eq!(config.confidence_for(4), 20);
        assert_eq!(config.confidence_for(100), 20);
        assert!(config.confidence_for(0) > config.confidence_for(1));
        assert!(config.confidence_for(1) > config.confidence_for(2));
    }

    #[test]
    fn test_labeled_beats_unlabeled() {
        let extractor = DobExtractor::default();
        let text = "Issued 01/02/2020\nGOVERNMENT OF INDIA\nDOB: 15/08/1995\nMALE";
        let found = extractor.extract(text, TODAY).unwrap_or_else(|| panic!("no DOB"));

        assert_eq!(found.text, "15/08/1995");
        assert_eq!(found.label, DobLabel::Dob);
        assert_eq!(found.confidence, 90);
        assert_eq!(found.age, 29);
    }

    #[test]
    fn test_date_of_birth_label() {
        let extractor = DobExtractor::default();
        let found = extractor
            .extract("Name: A Person\nDate of Birth : 01-01-1990", TODAY)
            .unwrap_or_else(|| panic!("no DOB"));
        assert_eq!(found.label, DobLabel::DateOfBirth);
        assert_eq!(found.confidence, 70);
        assert_eq!(found.date, date!(1990 - 01 - 01));
    }

    #[test]
    fn test_hindi_label() {
        let extractor = DobExtractor::default();
        let found = extractor
            .extract("जन्म तिथि: 20/11/1988", TODAY)
            .unwrap_or_else(|| panic!("no DOB"));
        assert_eq!(found.label, DobLabel::Hindi);
        assert_eq!(found.confidence, 50);
    }

    #[test]
    fn test_bilingual_label_prefers_dob() {
        let extractor = DobExtractor::default();
        let found = extractor
            .extract("जन्म तिथि/DOB: 20/11/1988", TODAY)
            .unwrap_or_else(|| panic!("no DOB"));
        assert_eq!(found.label, DobLabel::Dob);
    }

    #[test]
    fn test_unlabeled_fallback() {
        let extractor = DobExtractor::default();
        let found = extractor
            .extract("some text 15/08/1995 more text", TODAY)
            .unwrap_or_else(|| panic!("no DOB"));
        assert_eq!(found.label, DobLabel::Unlabeled);
        assert_eq!(found.confidence, 30);
    }

    #[test]
    fn test_unparsable_label_falls_through() {
        let extractor = DobExtractor::default();
        // 45/13/1995 matches the DOB pattern but is not a date.
        let found = extractor
            .extract("DOB: 45/13/1995\nDate of Birth: 15/08/1995", TODAY)
            .unwrap_or_else(|| panic!("no DOB"));
        assert_eq!(found.label, DobLabel::DateOfBirth);
        assert_eq!(found.text, "15/08/1995");
        assert_eq!(found.confidence, 70);
    }

    #[test]
    fn test_implausible_age_falls_through() {
        let extractor = DobExtractor::default();
        assert!(extractor.extract("DOB: 01/01/2090", TODAY).is_none());
    }

    #[test]
    fn test_no_date() {
        let extractor = DobExtractor::default();
        assert!(extractor.extract("GOVERNMENT OF INDIA", TODAY).is_none());
        assert!(extractor.extract("", TODAY).is_none());
    }

    #[test]
    fn test_extract_from_image_outcomes() {
        let extractor = DobExtractor::default();
        let image = ImageRef::new("doc");

        let ok = FixedOcr(Ok("DOB: 15/08/1995".into()));
        assert!(matches!(
            extractor.extract_from_image(&ok, &image, TODAY),
            Outcome::Ok(DobExtraction { confidence: 90, .. })
        ));

        let empty = FixedOcr(Ok("nothing here".into()));
        assert!(matches!(
            extractor.extract_from_image(&empty, &image, TODAY),
            Outcome::Failed(_)
        ));

        let broken = FixedOcr(Err(CapabilityError::Unavailable("tesseract missing".into())));
        assert!(matches!(
            extractor.extract_from_image(&broken, &image, TODAY),
            Outcome::Failed(_)
        ));
    }
}
