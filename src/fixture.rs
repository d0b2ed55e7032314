//! Fixture copying into per-run working directories.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::paths::create_dir_once;

/// Predicate deciding which fixture paths are copied.
///
/// The predicate sees the full source path of each candidate below the
/// fixture root. A rejected directory is skipped together with its contents.
#[derive(Clone)]
pub struct SourceFilter {
    predicate: Arc<dyn Fn(&Path) -> bool + Send + Sync>,
    label: String,
}

impl SourceFilter {
    /// Accepts every path.
    pub fn all() -> Self {
        Self {
            predicate: Arc::new(|_| true),
            label: "all".to_string(),
        }
    }

    /// Wraps an arbitrary predicate.
    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            label: "custom".to_string(),
        }
    }

    /// Accepts paths whose text matches `pattern`.
    pub fn regex(pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern)
            .map_err(|e| Error::Config(format!("invalid source filter {:?}: {}", pattern, e)))?;
        Ok(Self {
            predicate: Arc::new(move |path| re.is_match(&path.to_string_lossy())),
            label: format!("regex({})", pattern),
        })
    }

    /// Rejects paths whose file name matches any of the glob `patterns`.
    pub fn exclude_globs<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let set = build_globset(patterns)?;
        let label = patterns
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(",");
        Ok(Self {
            predicate: Arc::new(move |path| {
                let name = path.file_name().map(Path::new).unwrap_or(path);
                !set.is_match(name)
            }),
            label: format!("exclude({})", label),
        })
    }

    /// Returns true if `path` should be copied.
    pub fn accepts(&self, path: &Path) -> bool {
        (self.predicate)(path)
    }
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for SourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SourceFilter").field(&self.label).finish()
    }
}

fn build_globset<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern.as_ref()).map_err(|e| {
            Error::Config(format!("invalid glob {:?}: {}", pattern.as_ref(), e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::Config(format!("invalid glob set: {}", e)))
}

/// Populates `dest` for one run.
///
/// With a `source`, its filtered contents are copied recursively into
/// `dest`. Without one, `dest` is simply created. The copy finishes before
/// this future resolves, so no program ever starts in a partial tree.
pub async fn populate(source: Option<PathBuf>, dest: PathBuf, filter: SourceFilter) -> Result<()> {
    match source {
        Some(source) => {
            let task_dest = dest.clone();
            let task_source = source.clone();
            tokio::task::spawn_blocking(move || copy_tree(&task_source, &task_dest, &filter))
                .await
                .map_err(|e| Error::Copy {
                    source_dir: source,
                    dest,
                    reason: format!("copy task failed: {}", e),
                })?
                .map(|_| ())
        }
        None => match tokio::fs::create_dir(&dest).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(Error::Io(e)),
        },
    }
}

/// Copies the filtered contents of `source` into `dest`, returning the
/// number of files copied.
pub fn copy_tree(source: &Path, dest: &Path, filter: &SourceFilter) -> Result<usize> {
    let copy_err = |reason: String| Error::Copy {
        source_dir: source.to_path_buf(),
        dest: dest.to_path_buf(),
        reason,
    };

    if !source.is_dir() {
        return Err(copy_err("source is not a directory".to_string()));
    }
    create_dir_once(dest).map_err(|e| copy_err(e.to_string()))?;

    let mut copied = 0;
    let walker = WalkDir::new(source)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| filter.accepts(entry.path()));

    for entry in walker {
        let entry = entry.map_err(|e| copy_err(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| copy_err(e.to_string()))?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            create_dir_once(&target).map_err(|e| copy_err(e.to_string()))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target).map_err(|e| copy_err(e.to_string()))?;
            copied += 1;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| copy_err(e.to_string()))?;
            copied += 1;
        }
    }

    tracing::debug!(source = ?source, dest = ?dest, files = copied, "copied fixture");
    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    let pointee = std::fs::read_link(link)?;
    match std::fs::remove_file(target) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    match std::os::unix::fs::symlink(pointee, target) {
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        other => other,
    }
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::copy(link, target).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), "alpha").unwrap();
        std::fs::write(temp.path().join("b.log"), "noise").unwrap();
        std::fs::create_dir(temp.path().join("nested")).unwrap();
        std::fs::write(temp.path().join("nested").join("c.txt"), "gamma").unwrap();
        temp
    }

    #[test]
    fn copies_everything_by_default() {
        let src = fixture_tree();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("run");

        let copied = copy_tree(src.path(), &dest, &SourceFilter::all()).unwrap();

        assert_eq!(copied, 3);
        assert!(dest.join("a.txt").is_file());
        assert!(dest.join("b.log").is_file());
        assert_eq!(
            std::fs::read_to_string(dest.join("nested").join("c.txt")).unwrap(),
            "gamma"
        );
    }

    #[test]
    fn filter_rejects_log_files() {
        let src = fixture_tree();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("run");
        let filter = SourceFilter::from_fn(|p| p.extension().map_or(true, |e| e != "log"));

        copy_tree(src.path(), &dest, &filter).unwrap();

        assert!(dest.join("a.txt").is_file());
        assert!(!dest.join("b.log").exists());
    }

    #[test]
    fn rejected_directory_is_not_descended() {
        let src = fixture_tree();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("run");
        let filter = SourceFilter::exclude_globs(&["nested"]).unwrap();

        copy_tree(src.path(), &dest, &filter).unwrap();

        assert!(dest.join("a.txt").is_file());
        assert!(!dest.join("nested").exists());
    }

    #[test]
    fn regex_filter_matches_full_path() {
        let filter = SourceFilter::regex(r"\.txt$").unwrap();
        assert!(filter.accepts(Path::new("/fixtures/app/a.txt")));
        assert!(!filter.accepts(Path::new("/fixtures/app/b.log")));
        assert!(SourceFilter::regex("(").is_err());
    }

    #[test]
    fn missing_source_is_a_copy_error() {
        let out = TempDir::new().unwrap();
        let err = copy_tree(
            &out.path().join("does-not-exist"),
            &out.path().join("run"),
            &SourceFilter::all(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Copy { .. }));
    }

    #[test]
    fn populate_without_source_creates_empty_directory() {
        let out = TempDir::new().unwrap();
        let dest = out.path().join("empty-run");

        tokio_test::block_on(populate(None, dest.clone(), SourceFilter::all())).unwrap();

        assert!(dest.is_dir());
        assert_eq!(std::fs::read_dir(&dest).unwrap().count(), 0);
    }

    #[test]
    fn copy_into_existing_directory_succeeds() {
        let src = fixture_tree();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("run");

        copy_tree(src.path(), &dest, &SourceFilter::all()).unwrap();
        let copied = copy_tree(src.path(), &dest, &SourceFilter::all()).unwrap();

        assert_eq!(copied, 3);
        assert!(dest.join("nested").join("c.txt").is_file());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_populate_of_same_directory_all_succeed() {
        let out = TempDir::new().unwrap();
        let dest = out.path().join("shared");

        let handles: Vec<_> = (0..16)
            .map(|_| tokio::spawn(populate(None, dest.clone(), SourceFilter::all())))
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert!(dest.is_dir());
    }

    #[tokio::test]
    async fn populate_with_source_copies_tree() {
        let src = fixture_tree();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("run");

        populate(Some(src.path().to_path_buf()), dest.clone(), SourceFilter::all())
            .await
            .unwrap();

        assert!(dest.join("nested").join("c.txt").is_file());
    }
}
