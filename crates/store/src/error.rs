use thiserror::Error;

/// Errors produced by record store backends.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The backend could not be reached or answered with an error.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Backend configuration is incomplete (missing URL, path, ...).
    #[error("invalid store config: {0}")]
    Config(String),
    /// Local filesystem failure.
    #[error("io error: {0}")]
    Io(String),
    /// The backend returned something that is not a collection of documents.
    #[error("malformed collection: {0}")]
    Malformed(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        StoreError::Unavailable(msg.into())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}
