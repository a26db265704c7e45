//! Upload folder listing.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::FileOpsError;
use crate::size::format_size;

/// One stored upload as shown by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    /// Creation time, or modification time where the platform lacks it.
    pub last_modified: DateTime<Utc>,
    /// Human-readable size (`70.5 kB`).
    pub size: String,
    pub owner: String,
    pub filename: String,
}

/// Lists every regular file directly under `dir`, sorted by name.
///
/// `owner` is attached to every entry as-is.
pub async fn file_statuses(dir: &Path, owner: &str) -> Result<Vec<FileStatus>, FileOpsError> {
    let io_err = |source| FileOpsError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let meta = tokio::fs::metadata(dir).await.map_err(io_err)?;
    if !meta.is_dir() {
        return Err(FileOpsError::NotADirectory(dir.to_path_buf()));
    }

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut result = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let metadata = match entry.metadata().await {
            Ok(m) if m.is_file() => m,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(path = %entry.path().display(), "skipping entry: {e}");
                continue;
            }
        };

        let timestamp = metadata
            .created()
            .or_else(|_| metadata.modified())
            .map_err(io_err)?;

        result.push(FileStatus {
            last_modified: DateTime::<Utc>::from(timestamp),
            size: format_size(metadata.len()),
            owner: owner.to_string(),
            filename: entry.file_name().to_string_lossy().into_owned(),
        });
    }

    result.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(result)
}
