use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Enum for file manager errors
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The remote filesystem could not be reached at construction
    #[error("Connection to {address} failed: {reason}")]
    Connection { address: String, reason: String },
    /// The base address names a transport this crate does not speak
    #[error("Unsupported address: {0}")]
    UnsupportedScheme(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("No such file or directory: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Not a file: {0}")]
    NotAFile(String),
    #[error("Is a directory: {0}")]
    IsADirectory(String),
    #[error("Directory is not empty: {0}")]
    DirectoryNotEmpty(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// Contains an exception reported by the remote filesystem
    #[error("{exception}: {message}")]
    Remote { exception: String, message: String },
    /// Non-success HTTP status without a decodable exception body
    #[error("HTTP error: {0}")]
    Http(u16),
    /// Any errors related to I/O
    #[error("I/O: {0}")]
    IO(String),
    /// Occurs when the remote party answers outside the expected protocol
    #[error("{0}")]
    Protocol(String),
    /// The remote filesystem refused the operation without further detail
    #[error("Operation failed: {0}")]
    OperationFailed(String),
    /// Operation attempted after the connection was released
    #[error("Connection is closed")]
    Closed,
}

impl Error {
    /// Returns `true` when the error reports a missing file or directory.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::IO(error.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => Self::Http(status.as_u16()),
            None => Self::IO(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Protocol(format!("Malformed response: {error}"))
    }
}
