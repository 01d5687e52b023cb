//! Error types shared across switchyard crates.
//!
//! This module provides the leaf error types using `thiserror`:
//!
//! - [`IdError`] - Malformed component identifiers
//! - [`ValidationIssue`] - One structural problem in a callback definition
//! - [`TransportError`] - Failures of the server round-trip collaborator
//! - [`ClientsideError`] - Failures (and the prevent sentinel) of clientside functions

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A boxed error type for collaborator errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while decoding a component identifier.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdError {
    /// The id was neither a string nor an object.
    #[error("IDs must be strings or wildcard-compatible objects, found {0}")]
    InvalidType(Value),

    /// A dict id value was neither a scalar nor a known wildcard marker.
    #[error("id key {key:?} has value {value}, expected a string, number, boolean or wildcard")]
    InvalidValue {
        /// Key holding the offending value.
        key: String,
        /// The offending value.
        value: Value,
    },

    /// A dict id string could not be parsed as JSON.
    #[error("malformed wildcard id {input:?}: {reason}")]
    Malformed {
        /// The raw id string.
        input: String,
        /// Parser message.
        reason: String,
    },
}

/// One structural problem found while validating callback definitions.
///
/// `message` is the short title ("Duplicate callback outputs", ...), `lines`
/// carries the human readable details, starting with the callback head.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Short title of the problem.
    pub message: String,
    /// Detail lines.
    pub lines: Vec<String>,
}

impl ValidationIssue {
    /// Create a new issue.
    pub fn new<I, S>(message: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            message: message.into(),
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// The detail lines joined with newlines.
    pub fn details(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for line in &self.lines {
            write!(f, "\n{line}")?;
        }
        Ok(())
    }
}

/// Errors from the server round-trip.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request never produced a response.
    #[error("Callback failed: the server did not respond.")]
    Unreachable,

    /// The server answered with a status other than success or prevent-update.
    #[error("Callback failed: the server returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body, shown to the host as the error html.
        body: String,
    },

    /// The success body did not follow the update-response contract.
    #[error("Callback failed: malformed server response: {0}")]
    Decode(String),

    /// A custom transport error.
    #[error(transparent)]
    Custom(BoxError),
}

/// Errors raised by clientside functions.
#[derive(Error, Debug)]
pub enum ClientsideError {
    /// Raised by a function to leave every output untouched. Not a failure.
    #[error("clientside function prevented the update")]
    PreventUpdate,

    /// No function is registered under the requested name.
    #[error("no clientside function registered as {namespace}.{function_name}")]
    NotFound {
        /// Namespace looked up.
        namespace: String,
        /// Function name looked up.
        function_name: String,
    },

    /// The return value does not mirror the output shape.
    #[error("clientside function returned {found} values for {expected} outputs")]
    Shape {
        /// Number of outputs the callback declares.
        expected: usize,
        /// Number of values returned.
        found: usize,
    },

    /// The function failed.
    #[error("clientside function failed: {0}")]
    Failed(String),

    /// A custom error from the function.
    #[error(transparent)]
    Custom(BoxError),
}

impl From<BoxError> for TransportError {
    fn from(err: BoxError) -> Self {
        TransportError::Custom(err)
    }
}

impl From<BoxError> for ClientsideError {
    fn from(err: BoxError) -> Self {
        ClientsideError::Custom(err)
    }
}
