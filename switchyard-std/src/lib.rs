//! # switchyard-std
//!
//! The callback engine built on the types of `switchyard-core`.
//!
//! This crate provides:
//! - **Layout**: the live tree and its id index ([`layout::Paths`])
//! - **Graphs**: validation, lookup maps and cycle detection
//!   ([`graph::DependencyGraphs`])
//! - **Resolution**: which callback instances a change affects and the
//!   pending set ([`resolve::PendingCallbacks`])
//! - **Scheduling**: the driving loop ([`schedule::Renderer`]), the server
//!   contract and clientside invocation
//! - **Hooks**: request observers and the `tracing` error sink
//! - **Testing**: test doubles for every collaborator

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core types
pub use switchyard_core;

// Modules
pub mod config;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod layout;
pub mod resolve;
pub mod schedule;
pub mod testing;

#[cfg(feature = "inventory")]
pub use inventory;
