//! # switchyard - Callback Dependency Engine
//!
//! `switchyard` keeps a tree of components in sync with the callbacks that
//! read and write their props. Callbacks declare outputs, inputs and state
//! over component ids, including dict ids with `MATCH`, `ALL` and
//! `ALLSMALLER` wildcards. When a prop changes, the engine works out every
//! callback instance affected, orders them so producers run before
//! consumers, runs them on the server or in-process, and writes the
//! results back into the tree.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchyard::prelude::*;
//!
//! let mut renderer = RendererBuilder::new(layout)
//!     .callback(CallbackDefinition::new(
//!         vec![CallbackProperty::new("greeting", "children")],
//!         vec![CallbackProperty::new("name", "value")],
//!     ))
//!     .transport(my_transport)
//!     .build()?;
//!
//! renderer.hydrate().await?;
//! renderer.update_props("name", props).await?;
//! ```
//!
//! ## Clientside functions
//!
//! With the `macros` feature, functions annotated with
//! `#[switchyard::clientside]` are collected into
//! [`ClientsideRegistry::collected`].

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use switchyard_core::{
    // Identifiers
    ALL,
    ALLSMALLER,
    // Readiness
    AlwaysReady,
    // Error types
    BoxError,
    // Callbacks
    CallbackDefinition,
    CallbackProperty,
    CallbackSpec,
    // Clientside
    ClientsideError,
    ClientsideFn,
    ClientsideFunction,
    ComponentId,
    DepRole,
    DictId,
    DynReadinessProbe,
    // Transport
    DynTransport,
    // Errors reported to the host
    ErrorEvent,
    ErrorKind,
    ErrorSink,
    HttpResponse,
    IdError,
    IdValue,
    MATCH,
    NoTransport,
    PatternValue,
    PropSpec,
    ReadinessProbe,
    ReadyTarget,
    Transport,
    TransportError,
    Update,
    UpdateRequest,
    ValidationIssue,
    Wildcard,
    combine_id_and_prop,
    split_id_and_prop,
};

pub use switchyard_std::{
    config::RendererConfig,
    error::{CallbackError, SwitchyardError},
    graph::{CycleError, DependencyGraphs, GraphError},
    layout::{Layout, PathSegment, Paths},
    resolve::{ChangeType, PendingCallbacks, ResolveError, ResolvedCallback},
    schedule::{
        CallbackData, CallbackPayload, ClientsideRegistration, ClientsideRegistry, ReferenceError,
        Renderer, RendererBuilder, RendererHandle, RunStats,
    },
};

/// Dependency graphs and validation.
pub mod graph {
    #![allow(clippy::wildcard_imports)]
    pub use switchyard_std::graph::*;
}

/// Callback resolution and the pending set.
pub mod resolve {
    #![allow(clippy::wildcard_imports)]
    pub use switchyard_std::resolve::*;
}

/// Request observers and logging.
pub mod hooks {
    #![allow(clippy::wildcard_imports)]
    pub use switchyard_std::hooks::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use switchyard_std::testing::*;
}

/// Prelude module - common imports for switchyard.
///
/// # Usage
///
/// ```rust,ignore
/// use switchyard::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ALL, ALLSMALLER, CallbackDefinition, CallbackProperty, CallbackSpec, ClientsideError,
        ClientsideRegistry, ComponentId, DictId, ErrorEvent, ErrorSink, MATCH, Renderer,
        RendererBuilder, RendererConfig, SwitchyardError, Transport, Update,
    };
}

pub use serde_json;

#[cfg(feature = "macros")]
pub use switchyard_macros::clientside;

#[cfg(feature = "inventory")]
pub use inventory;
