//! Common error types used throughout docconv.
//!
//! Resolution failures (unknown formats, missing or malformed request
//! metadata) are raised before any temporary resources exist. Execution
//! failures are retried inside the supervisor and only the final outcome
//! surfaces here as [`Error::ConversionExhausted`].

use std::fmt;
use std::time::Duration;

use crate::log::ConversionLog;

/// Which side of a conversion an unresolvable extension belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatRole {
    /// The format of the uploaded document.
    Source,
    /// The format requested by the caller.
    Destination,
}

impl fmt::Display for FormatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Destination => write!(f, "destination"),
        }
    }
}

/// Common error type for docconv.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An extension is not present in the format registry.
    #[error("Unsupported {role} format: '{extension}'")]
    UnknownFormat { role: FormatRole, extension: String },

    /// The Content-Disposition header was not supplied.
    #[error("Missing Content-Disposition header")]
    MissingMetadata,

    /// The Content-Disposition header is not `<type>; filename="<name>"`.
    #[error("Malformed Content-Disposition header: {0}")]
    MalformedMetadata(String),

    /// Every attempt failed or produced no output file.
    #[error("Conversion failed after all attempts ({} log lines)", log.len())]
    ConversionExhausted { log: ConversionLog },

    /// The caller gave up waiting for a worker.
    #[error("Conversion did not finish within {}s", waited.as_secs())]
    PoolTimeout { waited: Duration },

    /// The worker pool no longer accepts jobs.
    #[error("Worker pool is closed")]
    PoolClosed,

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an UnknownFormat error for the uploaded document.
    pub fn unknown_source<S: Into<String>>(extension: S) -> Self {
        Self::UnknownFormat {
            role: FormatRole::Source,
            extension: extension.into(),
        }
    }

    /// Create an UnknownFormat error for the requested output.
    pub fn unknown_destination<S: Into<String>>(extension: S) -> Self {
        Self::UnknownFormat {
            role: FormatRole::Destination,
            extension: extension.into(),
        }
    }

    /// Create a new MalformedMetadata error.
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::MalformedMetadata(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status code the front door should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::UnknownFormat {
                role: FormatRole::Destination,
                ..
            } => 404,
            Self::UnknownFormat { .. } | Self::MissingMetadata | Self::MalformedMetadata(_) => 400,
            Self::PoolTimeout { .. } => 504,
            Self::PoolClosed => 503,
            Self::ConversionExhausted { .. } | Self::Io(_) | Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code for error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownFormat { .. } => "unknown_format",
            Self::MissingMetadata => "missing_metadata",
            Self::MalformedMetadata(_) => "malformed_metadata",
            Self::ConversionExhausted { .. } => "conversion_failed",
            Self::PoolTimeout { .. } => "conversion_timeout",
            Self::PoolClosed => "unavailable",
            Self::Io(_) => "io_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether the error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
