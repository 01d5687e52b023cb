//! The server round-trip collaborator.
//!
//! The engine never opens connections itself. It hands an [`UpdateRequest`]
//! to an injected [`Transport`] and interprets the [`HttpResponse`].

use serde_json::Value;
use std::{future::Future, pin::Pin};

use crate::error::TransportError;

/// One POST to the update endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    /// Endpoint URL.
    pub url: String,
    /// JSON body.
    pub body: Value,
}

/// Status and raw body of an answered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw body.
    pub body: String,
}

impl HttpResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A `200` response carrying JSON.
    pub fn json(body: &Value) -> Self {
        Self::new(200, body.to_string())
    }

    /// Whether the status is `200`.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Performs the update-request round-trip.
///
/// Uses native `async fn` in traits. For dynamic dispatch the scheduler
/// stores a [`DynTransport`].
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a Transport",
    label = "this type does not implement `Transport`",
    note = "Transports must implement `update(&self, &UpdateRequest)`."
)]
pub trait Transport: Send + Sync + 'static {
    /// Send one update request and wait for the answer.
    fn update(
        &self,
        request: &UpdateRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// Object-safe version of [`Transport`].
pub trait DynTransport: Send + Sync + 'static {
    /// Send one update request, returning a boxed future.
    fn update_dyn<'a>(
        &'a self,
        request: &'a UpdateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + 'a>>;
}

impl<T: Transport> DynTransport for T {
    fn update_dyn<'a>(
        &'a self,
        request: &'a UpdateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + 'a>> {
        Box::pin(self.update(request))
    }
}

/// A transport for clientside-only apps; every request fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransport;

impl Transport for NoTransport {
    async fn update(&self, _request: &UpdateRequest) -> Result<HttpResponse, TransportError> {
        Err(TransportError::Unreachable)
    }
}
