//! Error types for the data-access layer.

use std::fmt;

/// Result type for data-access operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the data-access layer.
///
/// Every operation of the connection manager, the snapshot cache and the
/// entity repository returns `Result<T>`. Each variant maps to exactly one
/// outward [`ErrorSignal`], so a request layer never has to fall back to a
/// generic failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// No live connection to the document store.
    ///
    /// Raised by the connection guard before any store access is attempted.
    /// Never retried automatically: the caller (or an operator) has to
    /// reconnect explicitly.
    NotConnected,

    /// A lookup by primary key found no matching document.
    NotFound {
        /// Collection that was searched.
        collection: String,
        /// Primary key that was not present.
        key: String,
    },

    /// A create used a primary key already present in the collection.
    DuplicateKey {
        /// Collection the write targeted.
        collection: String,
        /// Primary key that is already taken.
        key: String,
    },

    /// A required field is missing or fails a type/format check.
    ///
    /// Always detected before any store round-trip.
    ValidationError(String),

    /// The underlying store operation failed.
    ///
    /// Common causes:
    /// - Store unreachable or network fault
    /// - Connect handshake rejected
    /// - Fetched document without a usable primary key (data integrity)
    ///
    /// **Recovery:** none inside this crate. Retry policy belongs to the
    /// store client or an outer layer.
    StoreError(String),

    /// Configuration error while resolving the connection target.
    ///
    /// Common causes:
    /// - Cloud target selected without a URI or password
    /// - Certificate bundle path does not exist
    /// - Non-numeric timeout
    ConfigError(String),
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Error::NotFound {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Shorthand for [`Error::DuplicateKey`].
    pub fn duplicate_key(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Error::DuplicateKey {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Outward signal a request layer should translate this error into.
    pub fn signal(&self) -> ErrorSignal {
        match self {
            Error::NotFound { .. } => ErrorSignal::NoSuchResource,
            Error::DuplicateKey { .. } => ErrorSignal::Conflict,
            Error::ValidationError(_) => ErrorSignal::BadInput,
            Error::NotConnected | Error::StoreError(_) => ErrorSignal::ServiceUnavailable,
            Error::ConfigError(_) => ErrorSignal::Internal,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotConnected => write!(f, "Not connected to the document store"),
            Error::NotFound { collection, key } => {
                write!(f, "Not found: {} '{}'", collection, key)
            }
            Error::DuplicateKey { collection, key } => {
                write!(f, "Duplicate key: {} '{}' already exists", collection, key)
            }
            Error::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Error::StoreError(msg) => write!(f, "Store error: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Stable outward signal for an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSignal {
    /// No such resource.
    NoSuchResource,
    /// The write conflicts with existing data.
    Conflict,
    /// The request payload was rejected.
    BadInput,
    /// The backing store cannot serve the request right now.
    ServiceUnavailable,
    /// Misconfiguration on the serving side.
    Internal,
}

impl ErrorSignal {
    /// HTTP status code conventionally used for this signal.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorSignal::NoSuchResource => 404,
            ErrorSignal::Conflict => 409,
            ErrorSignal::BadInput => 400,
            ErrorSignal::ServiceUnavailable => 503,
            ErrorSignal::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorSignal::NoSuchResource => "no such resource",
            ErrorSignal::Conflict => "conflict",
            ErrorSignal::BadInput => "bad input",
            ErrorSignal::ServiceUnavailable => "service unavailable",
            ErrorSignal::Internal => "internal error",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::StoreError(e.to_string())
        } else {
            Error::ValidationError(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::StoreError(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::StoreError(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::StoreError(e.to_string())
    }
}
