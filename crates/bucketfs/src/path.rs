//! Path model and key codec.
//!
//! Callers address nodes with backslash-separated paths (`a\b\c.txt`). The
//! store addresses objects with forward-slash keys (`a/b/c.txt`). The two
//! forms differ only in the separator character, so the mapping is a plain
//! character replacement in both directions.
//!
//! Directory paths end with the separator (`a\b\`); the empty path is the
//! root. File paths never end with the separator.
//!
//! A literal `/` inside a path segment would survive encoding but come back
//! as a separator after decoding, so [`validate_file_path`] and
//! [`validate_directory_path`] reject it.

use crate::error::{Error, Result};

/// Separator used in caller-facing paths.
pub const PATH_SEPARATOR: char = '\\';

/// Separator used in store keys. Also the listing delimiter.
pub const KEY_SEPARATOR: char = '/';

/// Convert a path into its store key.
pub fn encode_key(path: &str) -> String {
    path.replace(PATH_SEPARATOR, "/")
}

/// Convert a store key back into a path.
pub fn decode_key(key: &str) -> String {
    key.replace(KEY_SEPARATOR, "\\")
}

/// Normalize a raw directory path: append the trailing separator, and
/// collapse a bare separator to the root (empty) path.
pub fn normalize_directory(raw: &str) -> String {
    let mut path = raw.to_string();
    if !path.ends_with(PATH_SEPARATOR) {
        path.push(PATH_SEPARATOR);
    }
    if path.len() == PATH_SEPARATOR.len_utf8() {
        path.clear();
    }
    path
}

/// Display name of a node.
///
/// For a directory path this is the last segment before the trailing
/// separator; for a file path the text after the final separator. The root's
/// name is empty.
pub fn name(path: &str) -> &str {
    let trimmed = path.strip_suffix(PATH_SEPARATOR).unwrap_or(path);
    match trimmed.rfind(PATH_SEPARATOR) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Extension of a node's name: the text after the final `.`.
///
/// Empty when the name has no dot or ends with one.
pub fn extension(path: &str) -> &str {
    let name = name(path);
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => &name[idx + 1..],
        _ => "",
    }
}

/// Directory path containing a file.
///
/// A file without any separator lives in the root.
pub fn parent_of_file(file_path: &str) -> String {
    match file_path.rfind(PATH_SEPARATOR) {
        Some(idx) => normalize_directory(&file_path[..idx]),
        None => String::new(),
    }
}

/// Parent of a directory path. The root is its own parent.
pub fn parent_directory_of(directory_path: &str) -> String {
    let trimmed = directory_path
        .strip_suffix(PATH_SEPARATOR)
        .unwrap_or(directory_path);
    match trimmed.rfind(PATH_SEPARATOR) {
        Some(idx) => normalize_directory(&trimmed[..idx]),
        None => String::new(),
    }
}

/// Join a directory path and a segment with exactly one separator.
pub fn join(directory_path: &str, segment: &str) -> String {
    let base = directory_path.trim_end_matches(PATH_SEPARATOR);
    let segment = segment.trim_start_matches(PATH_SEPARATOR);
    if base.is_empty() {
        return segment.to_string();
    }
    let mut joined = String::with_capacity(base.len() + 1 + segment.len());
    joined.push_str(base);
    joined.push(PATH_SEPARATOR);
    joined.push_str(segment);
    joined
}

/// Check that a raw path can identify a file.
pub fn validate_file_path(path: &str) -> Result<()> {
    if path.is_empty() || path == "\\" {
        return Err(Error::invalid_path(path, "file path is empty"));
    }
    if path.ends_with(PATH_SEPARATOR) {
        return Err(Error::invalid_path(
            path,
            "file path ends with a directory separator",
        ));
    }
    validate_segments(path, path)
}

/// Check that a normalized directory path can identify a directory.
pub fn validate_directory_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Ok(());
    }
    let body = path.strip_suffix(PATH_SEPARATOR).unwrap_or(path);
    validate_segments(path, body)
}

fn validate_segments(path: &str, body: &str) -> Result<()> {
    if body.contains(KEY_SEPARATOR) {
        return Err(Error::invalid_path(
            path,
            "segments may not contain the key separator '/'",
        ));
    }
    if body.split(PATH_SEPARATOR).any(str::is_empty) {
        return Err(Error::invalid_path(path, "path contains an empty segment"));
    }
    Ok(())
}
