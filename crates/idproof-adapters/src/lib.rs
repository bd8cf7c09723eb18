//! idproof adapters - concrete implementations of the core ports.
//!
//! This crate provides adapters for:
//! - Filesystem upload storage
//! - External vision/OCR engines driven as subprocesses
//! - Tesseract OCR

pub mod engine;
pub mod fs;
pub mod tesseract;

pub use engine::{CommandEngine, OfflineEngine};
pub use fs::FsImageStore;
pub use tesseract::TesseractOcr;
