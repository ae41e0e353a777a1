//! Short-lived files holding render captures.
//!
//! A [`TransientArtifact`] owns its file: dropping it removes the file, so every
//! exit path of a request (served, failed, cancelled) cleans up.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Identifies the capture of one page for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKey {
    pub chapter_id: String,
    pub page_index: usize,
    nonce: Uuid,
}

impl ArtifactKey {
    pub fn new(chapter_id: &str, page_index: usize) -> Self {
        Self {
            chapter_id: chapter_id.to_string(),
            page_index,
            nonce: Uuid::new_v4(),
        }
    }

    /// File name unique to this request, safe to use inside the temp directory
    pub fn file_name(&self) -> String {
        let chapter: String = self
            .chapter_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .take(64)
            .collect();
        format!("page_{}_{}_{}.png", chapter, self.page_index, self.nonce.simple())
    }
}

/// A captured page image persisted to disk for the lifetime of one request
#[derive(Debug)]
pub struct TransientArtifact {
    path: PathBuf,
    len: usize,
}

impl TransientArtifact {
    /// Write `bytes` to a new file in `dir`.
    ///
    /// Fails if the file already exists. A partially written file is removed
    /// before the error is returned.
    pub fn write(dir: &Path, key: &ArtifactKey, bytes: &[u8]) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(key.file_name());

        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        let artifact = Self { path, len: bytes.len() };
        file.write_all(bytes)?;
        file.flush()?;

        log::debug!("Wrote transient artifact {} ({} bytes)", artifact.path.display(), artifact.len);
        Ok(artifact)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for TransientArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed transient artifact {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "Failed to remove transient artifact {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
