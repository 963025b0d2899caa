//! Subject data error types

use thiserror::Error;

/// The main error type for subject data operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid layout specification (duplicate logical name, unknown category)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Subject or file cannot be resolved locally and cannot be fetched
    #[error("Not found: {0}")]
    NotFound(String),

    /// No usable key/secret pair when remote access was attempted
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Remote existence, listing, or copy failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed or unexpectedly shaped file content
    #[error("Decode error: {0}")]
    Decode(String),

    /// A combined-hemisphere array matches neither orientation
    #[error("Orientation error: {0}")]
    Orientation(String),

    /// Value cannot be coerced into a subject id
    #[error("Invalid subject id: {0}")]
    InvalidSubject(String),

    /// Persistent listing cache failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// I/O error on the local subject tree
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for subject data operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a credentials error
    pub fn credentials(msg: impl Into<String>) -> Self {
        Error::Credentials(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Error::Transport(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }

    /// Create an orientation error
    pub fn orientation(msg: impl Into<String>) -> Self {
        Error::Orientation(msg.into())
    }

    /// Create an invalid subject error
    pub fn invalid_subject(msg: impl Into<String>) -> Self {
        Error::InvalidSubject(msg.into())
    }

    /// Create a cache error
    pub fn cache(msg: impl Into<String>) -> Self {
        Error::Cache(msg.into())
    }

    /// True for errors that mean "nothing there", as opposed to a broken setup
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
