//! Filesystem adapter for storing uploads.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use idproof_core::{ImageRef, ImageStore};
use tracing::debug;
use uuid::Uuid;

/// Stores uploads as files under a root directory.
///
/// References are file paths, so engines that take paths can read the
/// stored images directly.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    /// Creates a store rooted at `root`. The directory is created on first save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a reference to a path inside the root.
    fn resolve(&self, image: &ImageRef) -> Result<PathBuf> {
        let path = Path::new(image.as_str());
        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        if escapes || !path.starts_with(&self.root) {
            bail!("image reference is outside the upload directory");
        }
        Ok(path.to_path_buf())
    }
}

/// File extension for the detected image format.
fn extension_for(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("bin")
}

/// Keeps labels safe to use in file names.
fn sanitize(label: &str) -> String {
    let clean: String = label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if clean.is_empty() {
        "upload".to_string()
    } else {
        clean
    }
}

impl ImageStore for FsImageStore {
    fn save(&self, bytes: &[u8], label: &str) -> Result<ImageRef> {
        std::fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create upload directory: {}", self.root.display())
        })?;

        let name = format!("{}_{}.{}", sanitize(label), Uuid::new_v4(), extension_for(bytes));
        let path = self.root.join(name);
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write upload: {}", path.display()))?;

        debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(ImageRef::new(path.to_string_lossy().into_owned()))
    }

    fn read(&self, image: &ImageRef) -> Result<Vec<u8>> {
        let path = self.resolve(image)?;
        std::fs::read(&path).with_context(|| format!("Failed to read upload: {}", path.display()))
    }

    fn delete(&self, image: &ImageRef) -> Result<bool> {
        let path = self.resolve(image)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to delete upload: {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("document"), "document");
        assert_eq!(sanitize("../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize("///"), "upload");
    }

    #[test]
    fn test_extension_for_unknown_bytes() {
        assert_eq!(extension_for(b"plain text"), "bin");
    }

    #[test]
    fn test_resolve_rejects_outside_refs() {
        let store = FsImageStore::new("/var/uploads");
        assert!(store.resolve(&ImageRef::new("/etc/passwd")).is_err());
        assert!(store
            .resolve(&ImageRef::new("/var/uploads/../secret.png"))
            .is_err());
        assert!(store
            .resolve(&ImageRef::new("/var/uploads/selfie_1.png"))
            .is_ok());
    }
}
