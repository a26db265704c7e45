//! Upload directory resolution and preparation.

use std::path::{Path, PathBuf};

use crate::FileOpsError;

/// Resolves the configured upload directory.
///
/// Expands a leading `~`; an empty value falls back to
/// [`DEFAULT_UPLOAD_DIR`](crate::DEFAULT_UPLOAD_DIR).
pub fn resolve_upload_dir(configured: &str) -> PathBuf {
    if configured.is_empty() {
        return PathBuf::from(crate::DEFAULT_UPLOAD_DIR);
    }
    expand_home(configured)
}

/// Creates the upload directory if necessary and returns its absolute path.
///
/// Called once at startup; upload sessions themselves never create
/// directories.
pub async fn ensure_upload_dir(path: &Path) -> Result<PathBuf, FileOpsError> {
    let io_err = |source| FileOpsError::Io {
        path: path.to_path_buf(),
        source,
    };

    tokio::fs::create_dir_all(path).await.map_err(io_err)?;
    let abs = tokio::fs::canonicalize(path).await.map_err(io_err)?;

    if !tokio::fs::metadata(&abs).await.map_err(io_err)?.is_dir() {
        return Err(FileOpsError::NotADirectory(abs));
    }

    tracing::debug!(path = %abs.display(), "upload directory ready");
    Ok(abs)
}

/// Expands `~` prefix to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        crate::home_dir().join(rest)
    } else if path == "~" {
        crate::home_dir()
    } else {
        PathBuf::from(path)
    }
}
