//! Error types for Portico.
//!
//! [`HostError`] is the error every filter, handler and gate check returns.
//! Filters never build a [`ResponseStatus`] themselves: the exception
//! translator in `portico-filters` converts a `HostError` into the
//! serialisable payload attached to the response DTO.
//!
//! | Variant          | Status | Raised by                                   |
//! |------------------|--------|---------------------------------------------|
//! | `Argument`       | 400    | services rejecting a single parameter       |
//! | `Validation`     | 400    | validators producing a summary of failures  |
//! | `Unauthorized`   | 401    | disabled features, bad admin secret         |
//! | `Forbidden`      | 403    | filters denying access                      |
//! | `NotFound`       | 404    | services / routing                          |
//! | `ResponseClosed` | 500    | writes to an already finished response      |
//! | `Filter`         | custom | filters failing with an explicit status     |
//! | `Internal`       | 500    | anything else                               |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using [`HostError`].
pub type HostResult<T> = Result<T, HostError>;

/// The shape of an argument error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentErrorKind {
    /// The argument value is invalid.
    Invalid,
    /// A required argument was not supplied.
    Missing,
    /// The argument is outside its allowed range.
    OutOfRange,
}

impl ArgumentErrorKind {
    /// Machine-readable code used as `ResponseError::error_code`.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Invalid => "InvalidArgument",
            Self::Missing => "MissingArgument",
            Self::OutOfRange => "ArgumentOutOfRange",
        }
    }
}

impl fmt::Display for ArgumentErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Standard error type for the host.
///
/// # Example
///
/// ```
/// use portico_core::{HostError, HostResult};
///
/// fn check_id(id: i64) -> HostResult<()> {
///     if id <= 0 {
///         return Err(HostError::argument_out_of_range("id", "Value must be positive"));
///     }
///     Ok(())
/// }
///
/// assert!(check_id(0).is_err());
/// ```
#[derive(Error, Debug)]
pub enum HostError {
    /// A single argument was rejected.
    #[error("{message}")]
    Argument {
        /// Which kind of argument failure this is.
        kind: ArgumentErrorKind,
        /// The offending parameter, if known.
        param_name: Option<String>,
        /// Human-readable message. May carry a trailing `Parameter name:` line.
        message: String,
    },

    /// A validation summary covering one or more fields.
    #[error("Validation error: {message}")]
    Validation {
        /// Summary message.
        message: String,
        /// Per-field failures.
        errors: Vec<ResponseError>,
    },

    /// The caller is not allowed to use a capability at all.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Human-readable error message.
        message: String,
    },

    /// The caller is known but denied.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Human-readable error message.
        message: String,
    },

    /// The requested resource does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// The response was already closed when a write was attempted.
    #[error("Response is already closed")]
    ResponseClosed,

    /// A filter failed with an explicit status.
    #[error("Filter '{filter}' failed: {message}")]
    Filter {
        /// Name of the failing filter.
        filter: String,
        /// Status to report.
        status: StatusCode,
        /// Human-readable error message.
        message: String,
    },

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl HostError {
    /// Creates an invalid-argument error.
    #[must_use]
    pub fn argument(param_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Argument {
            kind: ArgumentErrorKind::Invalid,
            param_name: Some(param_name.into()),
            message: message.into(),
        }
    }

    /// Creates a missing-argument error.
    #[must_use]
    pub fn argument_missing(param_name: impl Into<String>) -> Self {
        let param_name = param_name.into();
        Self::Argument {
            kind: ArgumentErrorKind::Missing,
            message: format!("Value cannot be null.\r\nParameter name: {param_name}"),
            param_name: Some(param_name),
        }
    }

    /// Creates an out-of-range argument error.
    #[must_use]
    pub fn argument_out_of_range(
        param_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Argument {
            kind: ArgumentErrorKind::OutOfRange,
            param_name: Some(param_name.into()),
            message: message.into(),
        }
    }

    /// Creates a validation summary error.
    #[must_use]
    pub fn validation(message: impl Into<String>, errors: Vec<ResponseError>) -> Self {
        Self::Validation {
            message: message.into(),
            errors,
        }
    }

    /// Creates an unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a filter error with an explicit status.
    #[must_use]
    pub fn filter(filter: impl Into<String>, status: StatusCode, message: impl Into<String>) -> Self {
        Self::Filter {
            filter: filter.into(),
            status,
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Argument { .. } | Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Filter { status, .. } => *status,
            Self::ResponseClosed | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Argument { kind, .. } => kind.code(),
            Self::Validation { .. } => "ValidationError",
            Self::Unauthorized { .. } => "Unauthorized",
            Self::Forbidden { .. } => "Forbidden",
            Self::NotFound { .. } => "NotFound",
            Self::ResponseClosed => "ResponseClosed",
            Self::Filter { .. } => "FilterError",
            Self::Internal { .. } => "InternalError",
        }
    }

    /// Returns `true` for the validation-summary variant.
    #[must_use]
    pub const fn is_validation_summary(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// A single field-level error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseError {
    /// Machine-readable code.
    pub error_code: String,
    /// The field the error refers to.
    pub field_name: String,
    /// Human-readable message.
    pub message: String,
}

impl ResponseError {
    /// Creates a new field error.
    #[must_use]
    pub fn new(
        error_code: impl Into<String>,
        field_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            field_name: field_name.into(),
            message: message.into(),
        }
    }
}

/// Structured error payload attached to a response DTO.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseStatus {
    /// Machine-readable code.
    pub error_code: String,
    /// Human-readable message.
    pub message: String,
    /// Debug-only diagnostic detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    /// Field-level errors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResponseError>,
}

impl ResponseStatus {
    /// Creates a status with a code and message and no field errors.
    #[must_use]
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            stack_trace: None,
            errors: Vec::new(),
        }
    }

    /// Appends a field error.
    pub fn add_error(&mut self, error: ResponseError) {
        self.errors.push(error);
    }

    /// Returns `true` if any field errors were recorded.
    #[must_use]
    pub fn has_field_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
