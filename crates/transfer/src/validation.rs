use std::path::{Component, Path};

use crate::SessionError;

/// Validates a client-declared filename before it is joined onto the
/// upload directory.
///
/// Uploads land directly in the directory, so the name must be a single
/// normal path component. Rejects:
/// - Empty names
/// - Any `/` or `\` separator
/// - `.` and `..`
/// - NUL bytes
/// - Windows prefix components (`C:`)
pub fn validate_filename(filename: &str) -> Result<(), SessionError> {
    if filename.is_empty() {
        return Err(SessionError::InvalidFilename("empty filename".into()));
    }

    if filename.contains(['/', '\\']) {
        return Err(SessionError::InvalidFilename(format!(
            "path separator not allowed: {filename}"
        )));
    }

    if filename.contains('\0') {
        return Err(SessionError::InvalidFilename(format!(
            "NUL byte not allowed: {filename:?}"
        )));
    }

    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        (Some(Component::ParentDir), _) | (Some(Component::CurDir), _) => Err(
            SessionError::InvalidFilename(format!("directory reference not allowed: {filename}")),
        ),
        _ => Err(SessionError::InvalidFilename(format!(
            "not a plain file name: {filename}"
        ))),
    }
}
