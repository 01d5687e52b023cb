//! # switchyard-core
//!
//! Core types of the switchyard callback engine.
//!
//! This crate holds the vocabulary shared by the engine and by hosts that
//! only need to describe callbacks or implement collaborators:
//!
//! ## Identifiers ([`ComponentId`])
//!
//! Plain string ids and dict ids with [`Wildcard`] markers, plus the
//! canonical string codec every lookup is keyed on.
//!
//! ## Callbacks ([`CallbackDefinition`])
//!
//! Ordered outputs, inputs and state, optionally bound to a clientside
//! function. [`CallbackSpec`] is the serde wire form supplied by hosts.
//!
//! ## Collaborators
//!
//! The engine talks to the outside world through injected services:
//!
//! - [`Transport`] - the server round-trip
//! - [`ClientsideFn`] - in-process callback functions
//! - [`ReadinessProbe`] - lazily loaded components
//! - [`ErrorSink`] - the single error integration point
//!
//! # Error Types
//!
//! - [`IdError`] - Malformed identifiers
//! - [`ValidationIssue`] - Structural problems in callback definitions
//! - [`TransportError`] - Failed round-trips
//! - [`ClientsideError`] - Failed (or prevented) clientside calls

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod callback;
mod clientside;
mod error;
mod id;
mod readiness;
mod sink;
mod transport;

// Re-exports
pub use callback::{CallbackDefinition, CallbackProperty, CallbackSpec, ClientsideFunction, DepRole, PropSpec};
pub use clientside::{ClientsideFn, Update};
pub use error::{BoxError, ClientsideError, IdError, TransportError, ValidationIssue};
pub use id::{
    ALL, ALLSMALLER, ComponentId, DictId, IdValue, MATCH, PatternValue, Wildcard,
    combine_id_and_prop, id_val_sort, is_multi_output_prop, output_signature,
    parse_multiple_outputs, split_id_and_prop,
};
pub use readiness::{AlwaysReady, DynReadinessProbe, ReadinessProbe, ReadyTarget};
pub use sink::{ErrorEvent, ErrorKind, ErrorSink};
pub use transport::{DynTransport, HttpResponse, NoTransport, Transport, UpdateRequest};
