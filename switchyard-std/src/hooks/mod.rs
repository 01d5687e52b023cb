//! Observers around the update-request round-trip.
//!
//! Observers see every payload right before it is dispatched and the
//! decoded data right before it is applied. They cannot alter either.

mod logging;

pub use logging::{LoggingObserver, TracingErrorSink};

use crate::schedule::{CallbackData, CallbackPayload};

/// Watches request traffic.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a RequestObserver",
    note = "Observers implement `on_request` and/or `on_response`."
)]
pub trait RequestObserver: Send + Sync + 'static {
    /// A payload is about to be dispatched.
    fn on_request(&self, payload: &CallbackPayload) {
        let _ = payload;
    }

    /// Data for a payload is about to be applied.
    fn on_response(&self, payload: &CallbackPayload, data: &CallbackData) {
        let _ = (payload, data);
    }
}
