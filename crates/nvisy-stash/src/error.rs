//! Error handling for file stashing.
//!
//! Every failure of a stash call is one of the variants below. None of them
//! are retried internally: [`Error::is_retryable`] only reports whether a
//! caller-owned retry (with a fresh upload target) is likely to help.

use std::time::Duration;

use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::input::InputShape;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for all stash operations in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Message returned whenever the upload length cannot be established.
pub const LENGTH_REQUIRED_MESSAGE: &str = "We could not calculate the length of your file - please \
     pass a knownLength like stash_file(file, Some(known_length), None)";

/// Categories of stash errors, used for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// No upload negotiator is available.
    Configuration,
    /// The settled input matches none of the known shapes.
    UnrecognizedInput,
    /// The upload length could not be established.
    LengthRequired,
    /// The upload exceeds the configured ceiling.
    TooLarge,
    /// The object store rejected the upload.
    UploadFailed,
    /// The upload target could not be obtained.
    Negotiation,
    /// Network-related error occurred.
    Network,
    /// Timeout occurred.
    Timeout,
    /// Serialization/deserialization error.
    Serialization,
}

/// Error type for file stashing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No upload negotiator was configured.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem
        message: String,
    },

    /// A pending input settled to a shape that cannot be stashed.
    #[error("Cannot stash a pending file of unknown type (settled to {found})")]
    UnrecognizedInput {
        /// Shape the pending value settled to
        found: InputShape,
    },

    /// The content length could not be determined, locally or by the store.
    #[error("{}", LENGTH_REQUIRED_MESSAGE)]
    LengthRequired,

    /// The known length is above the upload ceiling.
    #[error("{length} is too big, {max} is the max")]
    TooLarge {
        /// Known length of the upload in bytes
        length: u64,
        /// Configured ceiling in bytes
        max: u64,
    },

    /// The store answered with a non-success status.
    #[error("Got {status} - {body}")]
    UploadFailed {
        /// HTTP status code returned by the store
        status: u16,
        /// Decoded response body
        body: String,
    },

    /// The negotiator failed to produce an upload target.
    #[error("Negotiation failed: {message}")]
    Negotiation {
        /// Description of the failure
        message: String,
        /// Underlying error, if any
        #[source]
        source: Option<BoxedError>,
    },

    /// Transport-level failure (connection, body stream, ...).
    #[error("Network error: {message}")]
    Network {
        /// Description of the failure
        message: String,
        /// Underlying error, if any
        #[source]
        source: Option<BoxedError>,
    },

    /// The transport gave up waiting.
    #[error("Request timed out{}", timeout.as_ref().map(|t| format!(" after {t:?}")).unwrap_or_default())]
    Timeout {
        /// Configured timeout, when known
        timeout: Option<Duration>,
        /// Underlying error, if any
        #[source]
        source: Option<BoxedError>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unrecognized input error
    pub fn unrecognized_input(found: InputShape) -> Self {
        Self::UnrecognizedInput { found }
    }

    /// Create a too large error
    pub fn too_large(length: u64, max: u64) -> Self {
        Self::TooLarge { length, max }
    }

    /// Create an upload failed error
    pub fn upload_failed(status: u16, body: impl Into<String>) -> Self {
        Self::UploadFailed {
            status,
            body: body.into(),
        }
    }

    /// Create a negotiation error
    pub fn negotiation(message: impl Into<String>) -> Self {
        Self::Negotiation {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout: Option<Duration>) -> Self {
        Self::Timeout {
            timeout,
            source: None,
        }
    }

    /// Attaches an underlying error to variants that carry one.
    ///
    /// Variants without a source slot are returned unchanged.
    pub fn with_source(mut self, error: impl Into<BoxedError>) -> Self {
        match &mut self {
            Self::Negotiation { source, .. }
            | Self::Network { source, .. }
            | Self::Timeout { source, .. } => *source = Some(error.into()),
            _ => {}
        }
        self
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::UnrecognizedInput { .. } => ErrorKind::UnrecognizedInput,
            Self::LengthRequired => ErrorKind::LengthRequired,
            Self::TooLarge { .. } => ErrorKind::TooLarge,
            Self::UploadFailed { .. } => ErrorKind::UploadFailed,
            Self::Negotiation { .. } => ErrorKind::Negotiation,
            Self::Network { .. } => ErrorKind::Network,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Returns true if a fresh stash attempt may succeed.
    ///
    /// Store-side 5xx, 408 and 429 responses count as transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::UploadFailed { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::network("I/O operation failed").with_source(error)
    }
}
