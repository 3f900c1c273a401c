use thiserror::Error;

/// Why a session could not be established.
///
/// Each variant points at a different fix: credentials, the URL, or the
/// server configuration.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The endpoint could not be reached at the transport level.
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    /// The reachability probe did not complete in time.
    #[error("endpoint did not answer within the probe timeout")]
    Timeout,

    /// Credentials were rejected.
    #[error("access denied (HTTP {status})")]
    AuthRejected { status: u16 },

    /// Nothing is served at the base URL.
    #[error("endpoint not found: {url}")]
    EndpointNotFound { url: String },

    /// The endpoint answered with an HTML page instead of a WebDAV response.
    #[error("endpoint returned HTML instead of a WebDAV response ({content_type})")]
    HtmlResponse { content_type: String },

    /// The probe got a status that is neither success nor a known failure.
    #[error("unexpected probe status: HTTP {status}")]
    UnexpectedStatus { status: u16 },
}

/// Errors from remote storage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Session establishment failed.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The server answered a request with an unexpected status.
    #[error("{method} {path} failed with HTTP {status}")]
    Status {
        method: String,
        path: String,
        status: u16,
    },

    /// The remote entry does not exist.
    #[error("remote entry not found: {0}")]
    NotFound(String),

    /// The remote entry exists and overwriting was not requested.
    #[error("remote entry already exists: {0}")]
    AlreadyExists(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A multistatus body could not be parsed.
    #[error("XML parsing error: {0}")]
    Xml(String),

    /// The base URL is not usable.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The remote path is not usable.
    #[error("invalid remote path: {0}")]
    InvalidPath(String),

    /// Local I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sync-remote operations.
pub type Result<T> = std::result::Result<T, Error>;
