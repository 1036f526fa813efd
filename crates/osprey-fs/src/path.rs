//! Filename helpers shared by the scanner and the pipeline

use std::path::Path;

/// File name without its final extension.
///
/// `img_001.tif` -> `img_001`. Returns an empty string for paths without a
/// file name.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Final path component.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lowercased extension without the leading dot, if any.
pub fn extension_lower(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// First character of `name` that appears in `disallowed`.
pub fn find_disallowed(name: &str, disallowed: &[char]) -> Option<char> {
    name.chars().find(|c| disallowed.contains(c))
}
