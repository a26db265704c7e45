//! Upload folder management and listing.
//!
//! Resolves and prepares the directory uploads are written to, and
//! describes its contents for the router's listing endpoint.

mod folder;
mod listing;
mod size;

pub use folder::{ensure_upload_dir, resolve_upload_dir};
pub use listing::{FileStatus, file_statuses};
pub use size::format_size;

/// Default upload directory name, relative to the working directory.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Errors produced by folder operations.
#[derive(Debug, thiserror::Error)]
pub enum FileOpsError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a directory: {0}")]
    NotADirectory(std::path::PathBuf),
}

/// Returns the user's home directory.
fn home_dir() -> std::path::PathBuf {
    std::env::var("HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("/tmp"))
}
