//! Utility functions for file operations and path manipulation

use crate::error::{Error, Result};
use crate::types::TaskId;
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Name used when neither the request nor the URL yields a filename
pub const PLACEHOLDER_FILENAME: &str = "unnamed";

/// Suffix of partial files while a transfer is in flight
pub const PARTIAL_SUFFIX: &str = ".part";

/// Get a free path for a file, appending ` (N)` before the extension on collision
///
/// # Examples
///
/// ```
/// use remote_dl::utils::get_unique_path;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/movie.mkv");
/// let unique = get_unique_path(path).unwrap();
/// // If /tmp/movie.mkv exists, returns /tmp/movie (1).mkv
/// // If that exists too, returns /tmp/movie (2).mkv, etc.
/// ```
pub fn get_unique_path(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Other(format!("cannot extract file stem from {}", path.display())))?;
    let extension = path.extension().and_then(|e| e.to_str());
    let parent = path.parent().ok_or_else(|| {
        Error::Other(format!(
            "cannot extract parent directory from {}",
            path.display()
        ))
    })?;

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let new_name = match extension {
            Some(ext) => format!("{} ({}).{}", stem, i, ext),
            None => format!("{} ({})", stem, i),
        };
        let new_path = parent.join(new_name);
        if !new_path.exists() {
            return Ok(new_path);
        }
    }

    Err(Error::Other(format!(
        "could not find a free name for {} after {} attempts",
        path.display(),
        MAX_RENAME_ATTEMPTS
    )))
}

/// Last non-empty path segment of `url`, percent-decoded
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let decoded = urlencoding::decode(last).ok()?;
    let name = sanitize_filename(&decoded);
    (!name.is_empty()).then_some(name)
}

/// Pick the target filename: the requested one, else the URL's, else a placeholder
pub fn resolve_filename(requested: Option<&str>, url: &str) -> String {
    requested
        .map(sanitize_filename)
        .filter(|name| !name.is_empty())
        .or_else(|| filename_from_url(url))
        .unwrap_or_else(|| PLACEHOLDER_FILENAME.to_string())
}

/// Replace path separators and control characters so the name stays inside its directory
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    trimmed.to_string()
}

/// Path of a task's in-flight partial file, `<dir>/<filename>.<task id>.part`.
///
/// Keyed by task as well as name, so two tasks resolving to the same
/// filename never write to or resume from each other's bytes.
pub fn partial_path(dir: &Path, filename: &str, id: &TaskId) -> PathBuf {
    dir.join(format!("{filename}.{id}{PARTIAL_SUFFIX}"))
}

/// Directory-safe form of a category hint, `None` if nothing usable remains
pub fn sanitize_category(hint: &str) -> Option<String> {
    let name = sanitize_filename(hint);
    (!name.is_empty()).then_some(name)
}
