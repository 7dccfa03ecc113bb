//! Cache key → backing file resolution

use std::path::{Path, PathBuf};

/// Resolve a key's backing file to an absolute, canonical path.
///
/// Missing files are resolved through their parent directory so that a path
/// recorded before deletion still matches the path a watcher reports after it.
pub fn resolve_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    if let Ok(canonical) = absolute.canonicalize() {
        return canonical;
    }

    let via_parent = match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => parent.canonicalize().ok().map(|p| p.join(name)),
        _ => None,
    };
    via_parent.unwrap_or(absolute)
}
