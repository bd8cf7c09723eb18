//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the verification core and the
//! external collaborators: storage, OCR, face and quality engines, the clock
//! and progress reporting.

mod capabilities;
mod clock;
mod image_store;
mod progress;

pub use capabilities::{
    FaceCapability, FaceComparison, QualitySignalCapability, TextExtractionCapability,
};
pub use clock::{Clock, SystemClock};
pub use image_store::ImageStore;
pub use progress::{ProgressSink, SilentProgress, StageEvent};
