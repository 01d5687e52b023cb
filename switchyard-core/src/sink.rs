//! Error reporting to the host.

use serde::{Deserialize, Serialize};

/// Which side an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Definition, resolution and clientside errors.
    FrontEnd,
    /// Failed server round-trips.
    BackEnd,
}

/// One error reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Origin of the error.
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Short message.
    pub message: String,
    /// Details, such as the server's error page or validation lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl ErrorEvent {
    /// A front-end error.
    pub fn front_end(message: impl Into<String>, html: Option<String>) -> Self {
        Self {
            kind: ErrorKind::FrontEnd,
            message: message.into(),
            html,
        }
    }

    /// A back-end error.
    pub fn back_end(message: impl Into<String>, html: Option<String>) -> Self {
        Self {
            kind: ErrorKind::BackEnd,
            message: message.into(),
            html,
        }
    }
}

/// The single integration point for errors.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an ErrorSink",
    note = "Error sinks must implement `on_error(&self, &ErrorEvent)`."
)]
pub trait ErrorSink: Send + Sync + 'static {
    /// Receive one error.
    fn on_error(&self, event: &ErrorEvent);
}
