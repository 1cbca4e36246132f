use std::path::{Component, Path};

use crate::TransferError;

/// Validates a file name received from the server before saving it.
///
/// The name must be a single plain path component. Rejects:
/// - Empty names and `.`
/// - Any separator (`/` or `\`), so nothing can land outside the target directory
/// - Parent directory traversal (`..`)
/// - Absolute paths and Windows prefixes (`C:`)
/// - Embedded NUL bytes
pub fn validate_save_name(name: &str) -> Result<&str, TransferError> {
    if name.is_empty() {
        return Err(TransferError::InvalidName("empty name".into()));
    }
    if name.contains('\0') {
        return Err(TransferError::InvalidName(format!(
            "NUL byte not allowed: {name:?}"
        )));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(TransferError::InvalidName(format!(
            "path separators not allowed: {name}"
        )));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        (Some(Component::ParentDir), _) => Err(TransferError::InvalidName(format!(
            "parent directory traversal not allowed: {name}"
        ))),
        (Some(Component::Prefix(_)), _) => Err(TransferError::InvalidName(format!(
            "path prefix not allowed: {name}"
        ))),
        _ => Err(TransferError::InvalidName(format!(
            "not a plain file name: {name}"
        ))),
    }
}

/// Returns the name an upload is announced under: the final path component.
pub fn upload_file_name(path: &Path) -> Result<String, TransferError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| TransferError::InvalidName(format!("no file name in {}", path.display())))
}
