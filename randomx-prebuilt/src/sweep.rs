//! Removal of shared libraries from the staged tree.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{StageError, StageResult};

/// Remove every file under `root` whose name ends with one of `suffixes`.
///
/// The walk covers the whole tree at any depth. Symlinks are matched by their
/// own name and removed without being followed. A suffix with no matches is
/// not an error.
///
/// # Returns
///
/// The paths that were removed, in walk order.
pub fn sweep_shared_libraries<S: AsRef<str>>(
    root: &Path,
    suffixes: &[S],
) -> StageResult<Vec<PathBuf>> {
    let mut removed = Vec::new();
    sweep_dir(root, suffixes, &mut removed)?;
    Ok(removed)
}

/// Whether `name` ends with any of `suffixes`.
pub fn is_shared_library<S: AsRef<str>>(name: &str, suffixes: &[S]) -> bool {
    suffixes.iter().any(|s| name.ends_with(s.as_ref()))
}

fn sweep_dir<S: AsRef<str>>(
    dir: &Path,
    suffixes: &[S],
    removed: &mut Vec<PathBuf>,
) -> StageResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| StageError::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| StageError::ReadDir {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| StageError::ReadDir {
            path: path.clone(),
            source: e,
        })?;

        if file_type.is_dir() {
            sweep_dir(&path, suffixes, removed)?;
            continue;
        }

        let name = entry.file_name();
        if !is_shared_library(&name.to_string_lossy(), suffixes) {
            continue;
        }

        fs::remove_file(&path).map_err(|e| StageError::RemoveFile {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "Removed shared library");
        removed.push(path);
    }

    Ok(())
}
