//! Storage port for uploaded images.

use crate::domain::ImageRef;

/// Port for storing uploaded images.
pub trait ImageStore: Send + Sync {
    /// Stores bytes and returns an opaque reference.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn save(&self, bytes: &[u8], label: &str) -> anyhow::Result<ImageRef>;

    /// Reads the bytes behind a reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference is unknown or reading fails.
    fn read(&self, image: &ImageRef) -> anyhow::Result<Vec<u8>>;

    /// Deletes an image. Returns whether something was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    fn delete(&self, image: &ImageRef) -> anyhow::Result<bool>;
}
