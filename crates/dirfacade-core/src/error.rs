//! Error types for directory facade operations.
//!
//! Every failure surfaced by the facade is an [`Error`]. Errors coming back from the
//! directory are carried through without modification; errors raised by group and
//! attribute collaborators are wrapped in [`Error::Tagged`] so callers can tell them
//! apart while still reaching the original value.

use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Main error type for directory facade operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The object a mutating operation depends on could not be found.
    #[error("Object {0} does not exist.")]
    ObjectNotFound(String),

    /// The group named in a membership update could not be found.
    #[error("Group {0} does not exist.")]
    GroupNotFound(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Operation timed out
    #[error("Timeout waiting for directory: {0}")]
    Timeout(String),

    /// External service error
    #[error("External service error: {service}: {message}")]
    ExternalServiceError {
        /// Service name that failed
        service: String,
        /// Error message
        message: String,
    },

    /// Error returned by a group or attribute collaborator, re-raised by the facade.
    ///
    /// Displays exactly like the wrapped error.
    #[error("{source}")]
    Tagged {
        /// The collaborator's original error.
        source: Box<Error>,
    },
}

/// Specialized result type for directory facade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error response for serialization.
///
/// The `error` flag is always `true`; `code`, `message` and `details` come from the
/// underlying error, so tagging never hides the original fields.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    /// Always `true`.
    pub error: bool,
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl Error {
    /// Wraps a collaborator error, keeping it intact as the source.
    ///
    /// Tagging an already tagged error returns it unchanged.
    #[must_use]
    pub fn tagged(source: Self) -> Self {
        match source {
            tagged @ Self::Tagged { .. } => tagged,
            other => Self::Tagged {
                source: Box::new(other),
            },
        }
    }

    /// Returns true if this error was re-raised from a collaborator.
    #[must_use]
    pub const fn is_tagged(&self) -> bool {
        matches!(self, Self::Tagged { .. })
    }

    /// Returns the innermost error, looking through any tag.
    #[must_use]
    pub fn untagged(&self) -> &Self {
        match self {
            Self::Tagged { source } => source.untagged(),
            other => other,
        }
    }

    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ObjectNotFound(_) => "OBJECT_NOT_FOUND",
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::ExternalServiceError { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::Tagged { source } => source.error_code(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::ExternalServiceError { service, .. } => Some(json!({ "service": service })),
            Self::ObjectNotFound(name) | Self::GroupNotFound(name) => {
                Some(json!({ "name": name }))
            }
            Self::Tagged { source } => source.details(),
            _ => None,
        }
    }

    /// Converts the error into an `ErrorResponse`.
    #[must_use]
    pub fn into_error_response(self) -> ErrorResponse {
        ErrorResponse {
            error: true,
            code: self.error_code().to_string(),
            details: self.details(),
            message: self.to_string(),
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub fn should_log(&self) -> bool {
        matches!(
            self.untagged(),
            Self::ConfigError(_) | Self::ExternalServiceError { .. } | Self::Timeout(_)
        )
    }
}

// Conversions from external error types
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(format!("invalid directory URL: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
