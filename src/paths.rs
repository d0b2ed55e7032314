//! Project root discovery and directory resolution.
//!
//! Working directories and fixture trees are located relative to the
//! enclosing project root, found by walking upward until a marker file
//! (by default `Cargo.toml`) is present.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Marker file that identifies a project root.
pub const DEFAULT_MARKER: &str = "Cargo.toml";

/// Walks upward from `start` until a directory containing `marker` is found.
///
/// Failure here is fatal: without a project root no other path can be
/// resolved.
pub fn find_project_root(start: &Path, marker: &str) -> Result<PathBuf> {
    let start = if start.is_absolute() {
        start.to_path_buf()
    } else {
        std::env::current_dir()?.join(start)
    };

    start
        .ancestors()
        .find(|dir| dir.join(marker).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::ProjectRootNotFound {
            start: start.clone(),
            marker: marker.to_string(),
        })
}

/// Resolves `segments` against `root` and creates the directory if missing.
///
/// Only the final directory is created; its parent must already exist.
/// Calling this twice with the same arguments is a no-op the second time.
/// An empty `segments` slice refers to `root` itself.
pub fn ensure_directory<S: AsRef<Path>>(root: &Path, segments: &[S]) -> Result<DirResolver> {
    let resolved = segments
        .iter()
        .fold(root.to_path_buf(), |acc, segment| acc.join(segment.as_ref()));

    create_dir_once(&resolved)?;
    Ok(DirResolver::new(resolved))
}

/// Creates a single directory, treating one that already exists as success.
///
/// Concurrent runs sharing a working directory may race here; whichever
/// loses still succeeds.
pub(crate) fn create_dir_once(path: &Path) -> std::io::Result<()> {
    match std::fs::create_dir(path) {
        Ok(()) => {
            tracing::debug!(path = ?path, "created directory");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Resolves paths relative to a fixed base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirResolver {
    base: PathBuf,
}

impl DirResolver {
    /// Creates a resolver scoped to `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Returns the base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Joins `segments` onto the base directory.
    ///
    /// Returns `None` when no segments are given or any segment is empty,
    /// so "nothing requested" is never confused with the base itself.
    /// Absolute segments replace everything before them.
    pub fn resolve<S: AsRef<Path>>(&self, segments: &[S]) -> Option<PathBuf> {
        if segments.is_empty()
            || segments
                .iter()
                .any(|s| s.as_ref().as_os_str().is_empty())
        {
            return None;
        }
        Some(
            segments
                .iter()
                .fold(self.base.clone(), |acc, segment| acc.join(segment.as_ref())),
        )
    }

    /// Resolves an optional single segment, as used for fixture lookups.
    pub fn resolve_opt(&self, segment: Option<&str>) -> Option<PathBuf> {
        segment.and_then(|s| self.resolve(&[s]))
    }
}
