//! Mock implementations of core port traits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, bail};
use idproof_core::domain::{CapabilityError, ImageRef};
use idproof_core::ports::{
    Clock, FaceCapability, FaceComparison, ImageStore, ProgressSink, QualitySignalCapability,
    StageEvent, TextExtractionCapability,
};
use time::{Duration, OffsetDateTime};

fn bump(counter: &Mutex<usize>) {
    *counter.lock().unwrap_or_else(PoisonError::into_inner) += 1;
}

fn read(counter: &Mutex<usize>) -> usize {
    *counter.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock OCR engine.
///
/// Returns the same answer for every image until changed.
pub struct MockTextExtraction {
    response: Mutex<Result<String, CapabilityError>>,
    calls: Arc<Mutex<usize>>,
}

impl MockTextExtraction {
    /// OCR that reads `text` from every image.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            response: Mutex::new(Ok(text.into())),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// OCR that fails on every image.
    #[must_use]
    pub fn failing(error: CapabilityError) -> Self {
        Self {
            response: Mutex::new(Err(error)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Replaces the text returned from now on.
    pub fn set_text(&self, text: impl Into<String>) {
        *self.response.lock().unwrap_or_else(PoisonError::into_inner) = Ok(text.into());
    }

    /// Number of OCR calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        read(&self.calls)
    }
}

impl TextExtractionCapability for MockTextExtraction {
    fn extract_text(&self, _image: &ImageRef) -> Result<String, CapabilityError> {
        bump(&self.calls);
        self.response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Mock face engine.
///
/// Defaults to one face per image, a close match and a raw age of 30.
pub struct MockFaceCapability {
    faces: Result<usize, CapabilityError>,
    comparison: Result<FaceComparison, CapabilityError>,
    age: Result<u32, CapabilityError>,
    detect_calls: Arc<Mutex<usize>>,
    compare_calls: Arc<Mutex<usize>>,
    age_calls: Arc<Mutex<usize>>,
}

impl MockFaceCapability {
    /// Creates a mock with the default answers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            faces: Ok(1),
            comparison: Ok(FaceComparison {
                verified: true,
                distance: 0.1,
                threshold: 0.4,
            }),
            age: Ok(30),
            detect_calls: Arc::new(Mutex::new(0)),
            compare_calls: Arc::new(Mutex::new(0)),
            age_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Reports `count` faces in every image.
    #[must_use]
    pub fn with_faces(mut self, count: usize) -> Self {
        self.faces = Ok(count);
        self
    }

    /// Comparison at `distance` against `threshold`; verified when closer.
    #[must_use]
    pub fn with_comparison(mut self, distance: f64, threshold: f64) -> Self {
        self.comparison = Ok(FaceComparison {
            verified: distance < threshold,
            distance,
            threshold,
        });
        self
    }

    /// Raw age returned by the estimator.
    #[must_use]
    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Ok(age);
        self
    }

    /// Fails every call with `error`.
    #[must_use]
    pub fn failing(mut self, error: &CapabilityError) -> Self {
        self.faces = Err(error.clone());
        self.comparison = Err(error.clone());
        self.age = Err(error.clone());
        self
    }

    /// Fails only the comparison with `error`.
    #[must_use]
    pub fn with_compare_error(mut self, error: CapabilityError) -> Self {
        self.comparison = Err(error);
        self
    }

    /// Fails only the age estimate with `error`.
    #[must_use]
    pub fn with_age_error(mut self, error: CapabilityError) -> Self {
        self.age = Err(error);
        self
    }

    /// Number of face detection calls.
    #[must_use]
    pub fn detect_count(&self) -> usize {
        read(&self.detect_calls)
    }

    /// Number of comparison calls.
    #[must_use]
    pub fn compare_count(&self) -> usize {
        read(&self.compare_calls)
    }

    /// Number of age estimation calls.
    #[must_use]
    pub fn age_count(&self) -> usize {
        read(&self.age_calls)
    }
}

impl Default for MockFaceCapability {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceCapability for MockFaceCapability {
    fn detect_faces(&self, _image: &ImageRef) -> Result<usize, CapabilityError> {
        bump(&self.detect_calls);
        self.faces.clone()
    }

    fn compare(&self, _a: &ImageRef, _b: &ImageRef) -> Result<FaceComparison, CapabilityError> {
        bump(&self.compare_calls);
        self.comparison.clone()
    }

    fn estimate_age(&self, _image: &ImageRef) -> Result<u32, CapabilityError> {
        bump(&self.age_calls);
        self.age.clone()
    }
}

/// Mock quality signals. Defaults to a sharp, well-lit image.
pub struct MockQualitySignals {
    blur: Result<f64, CapabilityError>,
    brightness: Result<f64, CapabilityError>,
}

impl MockQualitySignals {
    /// Signals with the given values.
    #[must_use]
    pub const fn new(blur: f64, brightness: f64) -> Self {
        Self {
            blur: Ok(blur),
            brightness: Ok(brightness),
        }
    }

    /// Signals that cannot be computed.
    #[must_use]
    pub fn failing(error: &CapabilityError) -> Self {
        Self {
            blur: Err(error.clone()),
            brightness: Err(error.clone()),
        }
    }
}

impl Default for MockQualitySignals {
    fn default() -> Self {
        Self::new(250.0, 128.0)
    }
}

impl QualitySignalCapability for MockQualitySignals {
    fn blur_score(&self, _image: &ImageRef) -> Result<f64, CapabilityError> {
        self.blur.clone()
    }

    fn brightness(&self, _image: &ImageRef) -> Result<f64, CapabilityError> {
        self.brightness.clone()
    }
}

/// In-memory image store.
pub struct MemoryImageStore {
    images: Mutex<HashMap<String, Vec<u8>>>,
    next: Mutex<usize>,
    fail_saves: bool,
}

impl MemoryImageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            images: Mutex::new(HashMap::new()),
            next: Mutex::new(0),
            fail_saves: false,
        }
    }

    /// A store whose saves always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::new()
        }
    }

    /// Number of stored images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `image` is stored.
    #[must_use]
    pub fn contains(&self, image: &ImageRef) -> bool {
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(image.as_str())
    }
}

impl Default for MemoryImageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageStore for MemoryImageStore {
    fn save(&self, bytes: &[u8], label: &str) -> anyhow::Result<ImageRef> {
        if self.fail_saves {
            bail!("disk full");
        }
        let n = {
            let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
            *next += 1;
            *next
        };
        let key = format!("mem://{label}/{n}");
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), bytes.to_vec());
        Ok(ImageRef::new(key))
    }

    fn read(&self, image: &ImageRef) -> anyhow::Result<Vec<u8>> {
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(image.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("unknown image {image}"))
    }

    fn delete(&self, image: &ImageRef) -> anyhow::Result<bool> {
        Ok(self
            .images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(image.as_str())
            .is_some())
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    /// Creates a clock at `start`.
    #[must_use]
    pub const fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    /// Sets the clock.
    pub fn set(&self, at: OffsetDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
pub struct MockProgressSink {
    events: Arc<Mutex<Vec<StageEvent>>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<StageEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of captured events matching `pred`.
    #[must_use]
    pub fn count(&self, pred: impl Fn(&StageEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl Default for MockProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: StageEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryImageStore::new();
        let image = store.save(b"bytes", "document").unwrap();

        assert!(store.contains(&image));
        assert_eq!(store.read(&image).unwrap(), b"bytes");
        assert!(store.delete(&image).unwrap());
        assert!(!store.delete(&image).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_failing_store() {
        let store = MemoryImageStore::failing();
        assert!(store.save(b"bytes", "selfie").is_err());
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(datetime!(2025-01-01 00:00 UTC));
        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now(), datetime!(2025-01-01 01:30 UTC));
    }

    #[test]
    fn test_mock_face_counts_calls() {
        let faces = MockFaceCapability::new().with_age(40);
        let image = ImageRef::new("a");

        assert_eq!(faces.estimate_age(&image), Ok(40));
        assert_eq!(faces.detect_faces(&image), Ok(1));
        assert_eq!(faces.age_count(), 1);
        assert_eq!(faces.detect_count(), 1);
        assert_eq!(faces.compare_count(), 0);
    }

    #[test]
    fn test_mock_progress_sink() {
        let sink = MockProgressSink::new();
        sink.on_event(StageEvent::SessionsSwept { evicted: 2 });

        assert_eq!(sink.events().len(), 1);
        assert_eq!(
            sink.count(|e| matches!(e, StageEvent::SessionsSwept { evicted: 2 })),
            1
        );
    }
}
