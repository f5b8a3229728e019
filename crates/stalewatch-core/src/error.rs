//! Error types for Stalewatch

use std::fmt;

use thiserror::Error;

/// Result type alias using Stalewatch's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Transport failure classes that are worth another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    /// Peer reset the connection
    ConnectionReset,
    /// Write to a closed connection
    BrokenPipe,
    /// Any other connect, timeout or socket level failure
    Network,
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransientKind::ConnectionReset => write!(f, "connection reset"),
            TransientKind::BrokenPipe => write!(f, "broken pipe"),
            TransientKind::Network => write!(f, "network failure"),
        }
    }
}

/// Error types for Stalewatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport level failure talking to a remote API
    #[error("Transient {kind}: {message}")]
    Transient {
        kind: TransientKind,
        message: String,
    },

    /// The remote API answered with a non-success HTTP status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Request payload could not be understood
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// A remote timestamp could not be parsed
    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),

    /// Messaging client failure
    #[error("Messaging error: {0}")]
    Messaging(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create an API error
    pub fn api(status: u16, msg: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: msg.into(),
        }
    }

    /// Create a transient error
    pub fn transient(kind: TransientKind, msg: impl Into<String>) -> Self {
        Self::Transient {
            kind,
            message: msg.into(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether another attempt of the same remote call may succeed.
    ///
    /// Only transport failures qualify. API-level error responses never do.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient { .. } | Error::Io(_))
    }

    /// The transient class, if any
    pub fn transient_kind(&self) -> Option<TransientKind> {
        match self {
            Error::Transient { kind, .. } => Some(*kind),
            Error::Io(e) => Some(io_kind(e)),
            _ => None,
        }
    }
}

fn io_kind(err: &std::io::Error) -> TransientKind {
    match err.kind() {
        std::io::ErrorKind::ConnectionReset => TransientKind::ConnectionReset,
        std::io::ErrorKind::BrokenPipe => TransientKind::BrokenPipe,
        _ => TransientKind::Network,
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Error::api(status.as_u16(), err.to_string());
        }
        if err.is_builder() {
            return Error::internal(err.to_string());
        }
        if err.is_decode() {
            return Error::internal(format!("undecodable response body: {err}"));
        }

        // reqwest buries the socket error a few levels down
        let mut source = std::error::Error::source(&err);
        let mut kind = TransientKind::Network;
        while let Some(inner) = source {
            if let Some(io) = inner.downcast_ref::<std::io::Error>() {
                kind = io_kind(io);
                break;
            }
            source = inner.source();
        }

        Error::transient(kind, err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
