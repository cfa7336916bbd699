use std::time::Duration;

use thiserror::Error;

/// Configuration-time validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A configured numeric limit must be strictly greater than zero.
    #[error("limit `{limit}` must be greater than 0")]
    InvalidLimitValue {
        /// Name of the limit.
        limit: &'static str,
    },
}

/// Parser-level multipart failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Generic parser failure with message context.
    #[error("{message}")]
    Message {
        /// Parser failure message.
        message: String,
    },
}

impl ParseError {
    /// Creates a parser error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        match self {
            Self::Message { message } => message,
        }
    }
}

/// Runtime error type used by `multiview`.
///
/// Any variant terminates the part sequence it was raised on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MultipartError {
    /// Configuration error surfaced at runtime.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Multipart parser failure.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Multipart stream ended before the close delimiter.
    #[error("Unexpected end of multipart entity")]
    IncompleteStream,
    /// A part carried more header lines than allowed.
    #[error("multipart part contains more than the configured limit of {max_header_count} headers")]
    HeaderCountLimitExceeded {
        /// Maximum allowed number of header lines per part.
        max_header_count: usize,
    },
    /// A part header block grew past the configured size without terminating.
    #[error("multipart part header block exceeded max size of {max_header_size} bytes")]
    HeaderSizeLimitExceeded {
        /// Maximum allowed header block size in bytes.
        max_header_size: usize,
    },
    /// The entity carried more parts than allowed.
    #[error("multipart entity exceeded max parts limit of {max_parts}")]
    PartsLimitExceeded {
        /// Maximum allowed number of parts.
        max_parts: usize,
    },
    /// Buffering the entity would exceed the strict size ceiling.
    #[error("multipart entity exceeded max strict size of {max_strict_size} bytes")]
    StrictSizeExceeded {
        /// Maximum number of body bytes held in memory.
        max_strict_size: u64,
    },
    /// The entity could not be fully buffered in time.
    #[error("multipart entity could not be buffered within {timeout:?}")]
    StrictTimeout {
        /// Bound that elapsed.
        timeout: Duration,
    },
}

impl MultipartError {
    /// Returns `true` when the failure was caused by malformed input rather than a resource bound.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::IncompleteStream)
    }
}
