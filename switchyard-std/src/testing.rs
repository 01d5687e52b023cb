//! Testing utilities for switchyard.
//!
//! Test doubles for every collaborator of a
//! [`Renderer`](crate::schedule::Renderer):
//!
//! - [`MockTransport`]: answers requests from a closure and records them
//! - [`ManualTransport`]: hands every request to the test, which answers
//!   when it chooses
//! - [`RecordingErrorSink`]: collects reported errors
//! - [`RecordingObserver`]: collects request payloads and response data
//! - [`RecordingReadiness`]: collects readiness batches

use futures::channel::{mpsc, oneshot};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use switchyard_core::{
    ErrorEvent, ErrorSink, HttpResponse, ReadinessProbe, ReadyTarget, Transport, TransportError,
    UpdateRequest,
};

use crate::hooks::RequestObserver;
use crate::schedule::{CallbackData, CallbackPayload};

type Responder = dyn Fn(&UpdateRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

// ============================================================================
// Mock Transport
// ============================================================================

/// A transport answering from a closure.
///
/// # Example
///
/// ```rust,ignore
/// let transport = MockTransport::new(|request| {
///     Ok(HttpResponse::json(&json!({"response": {"props": {"children": "done"}}})))
/// });
/// let renderer = RendererBuilder::new(layout).transport(transport.clone()).build()?;
///
/// // ...
/// assert_eq!(transport.count(), 1);
/// ```
#[derive(Clone)]
pub struct MockTransport {
    respond: Arc<Responder>,
    requests: Arc<Mutex<Vec<UpdateRequest>>>,
}

impl MockTransport {
    /// Create a transport answering with `respond`.
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&UpdateRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            respond: Arc::new(respond),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A transport answering every request with the same status and body.
    pub fn always(status: u16, body: impl Into<String>) -> Self {
        let response = HttpResponse::new(status, body);
        Self::new(move |_| Ok(response.clone()))
    }

    /// Get a clone of the recorded requests.
    pub fn requests(&self) -> Vec<UpdateRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Bodies of the recorded requests.
    pub fn bodies(&self) -> Vec<Value> {
        self.requests().into_iter().map(|r| r.body).collect()
    }

    /// Get the number of recorded requests.
    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    async fn update(&self, request: &UpdateRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.respond)(request)
    }
}

// ============================================================================
// Manual Transport
// ============================================================================

/// A request waiting for the test to answer it.
pub struct PendingRequest {
    /// The request.
    pub request: UpdateRequest,
    responder: oneshot::Sender<Result<HttpResponse, TransportError>>,
}

impl PendingRequest {
    /// Answer with a response.
    pub fn respond(self, response: HttpResponse) {
        let _ = self.responder.send(Ok(response));
    }

    /// Answer `200` with a JSON body.
    pub fn respond_json(self, body: &Value) {
        self.respond(HttpResponse::json(body));
    }

    /// Fail the request.
    pub fn fail(self, error: TransportError) {
        let _ = self.responder.send(Err(error));
    }
}

/// A transport whose requests are answered by the test.
///
/// # Example
///
/// ```rust,ignore
/// let (transport, mut requests) = ManualTransport::new();
/// // ... build a renderer with `transport` and start running it ...
/// let pending = requests.next().await.unwrap();
/// pending.respond_json(&json!({"response": {"props": {"children": "late"}}}));
/// ```
#[derive(Clone)]
pub struct ManualTransport {
    tx: mpsc::UnboundedSender<PendingRequest>,
}

impl ManualTransport {
    /// Create a transport and the stream of its requests.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingRequest>) {
        let (tx, rx) = mpsc::unbounded();
        (Self { tx }, rx)
    }
}

impl Transport for ManualTransport {
    async fn update(&self, request: &UpdateRequest) -> Result<HttpResponse, TransportError> {
        let (responder, answer) = oneshot::channel();
        self.tx
            .unbounded_send(PendingRequest {
                request: request.clone(),
                responder,
            })
            .map_err(|_| TransportError::Unreachable)?;
        answer.await.unwrap_or(Err(TransportError::Unreachable))
    }
}

// ============================================================================
// Recording Error Sink
// ============================================================================

/// An error sink that records every event.
#[derive(Clone, Default)]
pub struct RecordingErrorSink {
    events: Arc<Mutex<Vec<ErrorEvent>>>,
}

impl RecordingErrorSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the recorded events.
    pub fn events(&self) -> Vec<ErrorEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Get the number of recorded events.
    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl ErrorSink for RecordingErrorSink {
    fn on_error(&self, event: &ErrorEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// Recording Observer
// ============================================================================

/// An observer that records payloads and response data.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    requests: Arc<Mutex<Vec<CallbackPayload>>>,
    responses: Arc<Mutex<Vec<CallbackData>>>,
}

impl RecordingObserver {
    /// Create an empty observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads in dispatch order.
    pub fn requests(&self) -> Vec<CallbackPayload> {
        self.requests.lock().unwrap().clone()
    }

    /// Output signatures in dispatch order.
    pub fn outputs(&self) -> Vec<String> {
        self.requests().into_iter().map(|p| p.output).collect()
    }

    /// Applied data in order.
    pub fn responses(&self) -> Vec<CallbackData> {
        self.responses.lock().unwrap().clone()
    }
}

impl RequestObserver for RecordingObserver {
    fn on_request(&self, payload: &CallbackPayload) {
        self.requests.lock().unwrap().push(payload.clone());
    }

    fn on_response(&self, _payload: &CallbackPayload, data: &CallbackData) {
        self.responses.lock().unwrap().push(data.clone());
    }
}

// ============================================================================
// Recording Readiness
// ============================================================================

/// A readiness probe that is always ready and records what it was asked.
#[derive(Clone, Default)]
pub struct RecordingReadiness {
    batches: Arc<Mutex<Vec<Vec<ReadyTarget>>>>,
}

impl RecordingReadiness {
    /// Create an empty probe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the recorded batches.
    pub fn batches(&self) -> Vec<Vec<ReadyTarget>> {
        self.batches.lock().unwrap().clone()
    }
}

impl ReadinessProbe for RecordingReadiness {
    async fn wait_ready(&self, targets: &[ReadyTarget]) {
        self.batches.lock().unwrap().push(targets.to_vec());
    }
}
