//! Test support utilities for idproof.
//!
//! Provides mock capabilities, an in-memory image store, a manual clock and
//! synthetic upload builders for testing the verification pipeline.
//!
//! # Example
//!
//! ```
//! use idproof_test_support::{MockFaceCapability, OcrTextBuilder, SyntheticImageBuilder};
//!
//! let upload = SyntheticImageBuilder::checkerboard_png(128, 128);
//! let text = OcrTextBuilder::new().labeled_dob("DOB", "15/08/1995").build();
//! let faces = MockFaceCapability::new().with_comparison(0.1, 0.4).with_age(36);
//! # let _ = (upload, text, faces);
//! ```

mod builders;
mod mocks;

pub use builders::{OcrTextBuilder, SyntheticImageBuilder};
pub use mocks::{
    ManualClock, MemoryImageStore, MockFaceCapability, MockProgressSink, MockQualitySignals,
    MockTextExtraction,
};
