//! Translating errors into structured response payloads.
//!
//! [`on_exception_type_filter`] is the narrow enrichment step for argument
//! errors. [`ExceptionTranslator`] builds the whole [`ResponseStatus`] and
//! runs that step plus any custom enrichers.

use portico_core::{HostError, ResponseError, ResponseStatus};
use std::error::Error as _;
use std::fmt;
use std::sync::Arc;

const PARAM_NAME_MARKER: &str = "Parameter name:";

/// Adds a field error for an argument error that names its parameter.
///
/// The trailing `Parameter name:` line is stripped from the message. Every
/// other error shape is left untouched.
///
/// ```
/// use portico_core::{HostError, ResponseStatus};
/// use portico_filters::on_exception_type_filter;
///
/// let error = HostError::argument("id", "Value must be positive\r\nParameter name: id");
/// let mut status = ResponseStatus::new(error.error_code(), error.to_string());
/// on_exception_type_filter(&error, &mut status);
///
/// assert_eq!(status.errors.len(), 1);
/// assert_eq!(status.errors[0].field_name, "id");
/// assert_eq!(status.errors[0].message, "Value must be positive");
/// ```
pub fn on_exception_type_filter(error: &HostError, status: &mut ResponseStatus) {
    let HostError::Argument {
        kind,
        param_name: Some(param_name),
        message,
    } = error
    else {
        return;
    };

    status.add_error(ResponseError::new(
        kind.code(),
        param_name.as_str(),
        strip_param_name(message),
    ));
}

/// Cuts the last `Parameter name:` suffix unless it starts the message.
fn strip_param_name(message: &str) -> &str {
    match message.rfind(PARAM_NAME_MARKER) {
        Some(index) if index > 0 => message[..index].trim_end(),
        _ => message.trim_end(),
    }
}

/// A custom enrichment step run after the built-in one.
pub type ExceptionTypeFilter = Arc<dyn Fn(&HostError, &mut ResponseStatus) + Send + Sync>;

/// Builds [`ResponseStatus`] payloads from errors.
#[derive(Clone, Default)]
pub struct ExceptionTranslator {
    debug_mode: bool,
    filters: Vec<ExceptionTypeFilter>,
}

impl ExceptionTranslator {
    /// Creates a translator. `debug_mode` adds the error chain as
    /// `stack_trace`.
    #[must_use]
    pub fn new(debug_mode: bool) -> Self {
        Self {
            debug_mode,
            filters: Vec::new(),
        }
    }

    /// Appends a custom enrichment step.
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&HostError, &mut ResponseStatus) + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Builds the payload for `error`.
    #[must_use]
    pub fn to_response_status(&self, error: &HostError) -> ResponseStatus {
        let message = match error {
            HostError::Argument { message, .. } => strip_param_name(message).to_string(),
            HostError::Internal { message, .. } => message.clone(),
            other => other.to_string(),
        };
        let mut status = ResponseStatus::new(error.error_code(), message);

        if let HostError::Validation { errors, .. } = error {
            status.errors.extend(errors.iter().cloned());
        }

        if self.debug_mode {
            status.stack_trace = Some(error_chain(error));
        }

        on_exception_type_filter(error, &mut status);
        for filter in &self.filters {
            filter(error, &mut status);
        }
        status
    }
}

impl fmt::Debug for ExceptionTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionTranslator")
            .field("debug_mode", &self.debug_mode)
            .field("filters", &self.filters.len())
            .finish()
    }
}

fn error_chain(error: &HostError) -> String {
    let mut chain = format!("{error:?}");
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str("\ncaused by: ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}
