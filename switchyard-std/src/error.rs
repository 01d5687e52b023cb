//! Error types of the engine.
//!
//! - [`SwitchyardError`] - Top-level error type of renderer operations
//! - [`CallbackError`] - Why one callback run failed; reported to the error
//!   sink and never returned to the caller

use switchyard_core::{ClientsideError, ErrorKind, IdError, TransportError};
use thiserror::Error;

use crate::graph::GraphError;
use crate::resolve::ResolveError;
use crate::schedule::{PayloadError, ReferenceError};

/// Top-level error type of renderer operations.
#[derive(Error, Debug)]
pub enum SwitchyardError {
    /// The callback set is invalid or circular.
    #[error("callback graph error: {0}")]
    Graph(#[from] GraphError),

    /// Wildcard resolution failed.
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// An id could not be decoded.
    #[error("id error: {0}")]
    Id(#[from] IdError),

    /// The renderer behind a handle is gone.
    #[error("renderer has been dropped")]
    Closed,
}

/// Why one callback run failed.
#[derive(Error, Debug)]
pub enum CallbackError {
    /// A required id did not resolve to exactly one component.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// Wildcard resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The server round-trip failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The clientside function failed.
    #[error(transparent)]
    Clientside(#[from] ClientsideError),

    /// Returned data named an undecodable id.
    #[error(transparent)]
    Id(#[from] IdError),
}

impl From<PayloadError> for CallbackError {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::Reference(e) => CallbackError::Reference(e),
            PayloadError::Resolve(e) => CallbackError::Resolve(e),
        }
    }
}

impl CallbackError {
    /// Which side the failure came from.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CallbackError::Transport(_) => ErrorKind::BackEnd,
            _ => ErrorKind::FrontEnd,
        }
    }

    /// Details to show next to the message, such as the server's error page.
    pub fn html(&self) -> Option<String> {
        match self {
            CallbackError::Transport(TransportError::Status { body, .. }) if !body.is_empty() => {
                Some(body.clone())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_back_end() {
        let err = CallbackError::from(TransportError::Status {
            status: 500,
            body: "<pre>Traceback</pre>".into(),
        });
        assert_eq!(err.kind(), ErrorKind::BackEnd);
        assert_eq!(err.html().as_deref(), Some("<pre>Traceback</pre>"));
    }

    #[test]
    fn test_reference_errors_are_front_end() {
        let err = CallbackError::from(ReferenceError {
            message: "missing".into(),
        });
        assert_eq!(err.kind(), ErrorKind::FrontEnd);
        assert_eq!(err.html(), None);
    }
}
