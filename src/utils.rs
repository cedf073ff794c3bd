/// Builds the blob path for a user's file: `{username}/{filename}`.
pub fn blob_path(username: &str, filename: &str) -> String {
    format!("{}/{}", username, filename)
}

/// Checks a blob path for traversal tricks.
/// Rejects a leading `/`, backslashes, control characters
/// and empty, `.` or `..` segments.
pub fn is_safe_blob_path(path: &str) -> bool {
    if path.starts_with('/') || path.contains('\\') || path.chars().any(char::is_control) {
        return false;
    }

    path.split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Treats empty strings the same as absent values.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
