//! JSON documents under the data root.
//!
//! Requested paths are checked lexically (no `..`, no absolute paths, no
//! backslashes) and then again after canonicalization, so symlinks cannot
//! escape the root either.

use serde_json::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    #[error("Only .json files are allowed")]
    NotJson,

    #[error("File not found")]
    NotFound,

    #[error("Invalid JSON in file: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Listing failed: {0}")]
    Listing(#[from] walkdir::Error),
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// Relative paths (with `/` separators) of every `.json` file under `root`,
/// sorted. A missing root lists as empty.
///
/// Symlinked directories are not descended. A symlinked `.json` file is
/// listed exactly when [`resolve`] would serve it, i.e. when its target stays
/// inside `root`.
pub fn list_json_files(root: &Path) -> Result<Vec<String>, FilesError> {
    let mut found = Vec::new();
    if !root.is_dir() {
        return Ok(found);
    }

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if !is_json(entry.path()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let file_type = entry.file_type();
        if file_type.is_file() || (file_type.is_symlink() && resolve(root, &relative).is_ok()) {
            found.push(relative);
        }
    }
    found.sort();
    Ok(found)
}

/// Normalize a request path to its relative form, or reject it.
///
/// The extension check comes first so non-JSON requests are always reported
/// as such, traversal or not.
pub fn normalize(requested: &str) -> Result<PathBuf, FilesError> {
    let requested = requested.trim_start_matches('/');
    if !is_json(Path::new(requested)) {
        return Err(FilesError::NotJson);
    }
    if requested.contains('\\') {
        return Err(FilesError::NotFound);
    }

    let mut relative = PathBuf::new();
    for component in Path::new(requested).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(FilesError::NotFound);
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(FilesError::NotFound);
    }
    Ok(relative)
}

/// Resolve `requested` to an existing file inside `root`.
pub fn resolve(root: &Path, requested: &str) -> Result<PathBuf, FilesError> {
    let relative = normalize(requested)?;

    let root = root.canonicalize().map_err(|_| FilesError::NotFound)?;
    let resolved = root
        .join(&relative)
        .canonicalize()
        .map_err(|_| FilesError::NotFound)?;

    if !resolved.starts_with(&root) || !resolved.is_file() {
        return Err(FilesError::NotFound);
    }
    Ok(resolved)
}

/// Read and parse one document.
///
/// Unreadable or non-UTF-8 files are reported as not found; bad JSON is
/// [`FilesError::InvalidJson`].
pub fn read_json(path: &Path) -> Result<Value, FilesError> {
    let bytes = fs::read(path).map_err(|_| FilesError::NotFound)?;
    let text = String::from_utf8(bytes).map_err(|_| FilesError::NotFound)?;
    serde_json::from_str(&text).map_err(FilesError::InvalidJson)
}
