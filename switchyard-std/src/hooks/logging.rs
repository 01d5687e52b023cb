//! `tracing`-backed observer and error sink.

use switchyard_core::{ErrorEvent, ErrorKind, ErrorSink};
use tracing::{error, info};

use super::RequestObserver;
use crate::schedule::{CallbackData, CallbackPayload};

/// Logs every request and response at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl RequestObserver for LoggingObserver {
    fn on_request(&self, payload: &CallbackPayload) {
        info!(
            output = %payload.output,
            changed = ?payload.changed_prop_ids,
            "dispatching callback"
        );
    }

    fn on_response(&self, payload: &CallbackPayload, data: &CallbackData) {
        let ids: Vec<&str> = data.keys().map(String::as_str).collect();
        info!(output = %payload.output, updated = ?ids, "applying callback result");
    }
}

/// Reports errors as `tracing` events. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn on_error(&self, event: &ErrorEvent) {
        let side = match event.kind {
            ErrorKind::FrontEnd => "front-end",
            ErrorKind::BackEnd => "back-end",
        };
        match &event.html {
            Some(html) => error!(side, message = %event.message, details = %html, "callback error"),
            None => error!(side, message = %event.message, "callback error"),
        }
    }
}
