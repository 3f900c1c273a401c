use sync_remote::ConnectionError;
use thiserror::Error;

/// Why a push or pull run failed.
///
/// Cleanup problems are not here: a snapshot that uploaded is a successful
/// push, and failed deletions are reported in
/// [`RetentionReport`](crate::RetentionReport).
#[derive(Debug, Error)]
pub enum AgentError {
    /// Missing or malformed parameters; nothing was attempted.
    #[error("configuration error: {0}")]
    Config(String),

    /// The WebDAV endpoint could not be used.
    #[error("connection failed: {0}")]
    Connection(#[source] ConnectionError),

    /// Packing or unpacking the local data failed.
    #[error("archive error: {0}")]
    Archive(#[from] sync_archive::Error),

    /// Upload, download or listing failed after connecting.
    #[error("transfer failed: {0}")]
    Transfer(#[source] sync_remote::Error),
}

impl AgentError {
    /// Short machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Config(_) => "config",
            AgentError::Connection(_) => "connection",
            AgentError::Archive(_) => "archive",
            AgentError::Transfer(_) => "transfer",
        }
    }
}

impl From<sync_remote::Error> for AgentError {
    fn from(err: sync_remote::Error) -> Self {
        match err {
            sync_remote::Error::Connection(e) => AgentError::Connection(e),
            sync_remote::Error::InvalidUrl(msg) => AgentError::Config(format!("base URL: {}", msg)),
            sync_remote::Error::InvalidPath(msg) => {
                AgentError::Config(format!("remote directory: {}", msg))
            }
            other => AgentError::Transfer(other),
        }
    }
}

// Local scratch space belongs to the archive side of a run.
impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        AgentError::Archive(sync_archive::Error::IoError(err))
    }
}

/// Result type for sync-agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
