//! Removal of files a render run owns.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Deletes the files it holds when dropped, so temporary inputs disappear
/// on success, on error, and on unwinding alike.
#[derive(Debug, Default)]
pub struct TemporaryFiles {
    paths: Vec<PathBuf>,
}

impl TemporaryFiles {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for TemporaryFiles {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::info!(path = %path.display(), "Removed temporary input"),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "Temporary input already gone");
                }
                Err(err) => tracing::warn!(
                    error = %err,
                    path = %path.display(),
                    "Failed to remove temporary input"
                ),
            }
        }
    }
}

/// Delete whatever a failed run left at `path`.
pub fn remove_partial_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::info!(path = %path.display(), "Removed partial output"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(
            error = %err,
            path = %path.display(),
            "Failed to remove partial output"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("collage_test_cleanup");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, b"data").unwrap();
        path
    }

    #[test]
    fn test_guard_removes_files_on_drop() {
        let a = scratch_file("guard_a.mp4");
        let b = scratch_file("guard_b.mp4");
        {
            let guard = TemporaryFiles::new([a.clone(), b.clone()]);
            assert_eq!(guard.paths().len(), 2);
            assert!(a.exists());
        }
        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[test]
    fn test_guard_tolerates_missing_files() {
        let missing = std::env::temp_dir().join("collage_test_cleanup_never_created.mp4");
        drop(TemporaryFiles::new([missing.clone()]));
        assert!(!missing.exists());
    }

    #[test]
    fn test_remove_partial_output() {
        let out = scratch_file("partial.mp4");
        remove_partial_output(&out);
        assert!(!out.exists());
        // Second call is a no-op.
        remove_partial_output(&out);
    }
}
