use thiserror::Error;

/// Errors that can occur while packing or unpacking snapshot archives.
#[derive(Debug, Error)]
pub enum Error {
    /// The data root cannot be archived (missing, not a directory, or no
    /// final path component to anchor entry names on).
    #[error("invalid data root: {0}")]
    InvalidRoot(String),

    /// A walked path could not be expressed relative to the data root.
    #[error("invalid entry path: {0}")]
    EntryPath(String),

    /// The prefix configuration cannot produce snapshot names.
    #[error("invalid naming scheme: {0}")]
    InvalidNaming(String),

    /// Error while walking the data root.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for sync-archive operations.
pub type Result<T> = std::result::Result<T, Error>;
