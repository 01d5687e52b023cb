//! Readiness of lazily loaded components.

use std::{future::Future, pin::Pin};

use crate::id::ComponentId;

/// A component a callback batch is about to read or write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyTarget {
    /// Component id.
    pub id: ComponentId,
    /// `type` of the component in the layout, if present.
    pub component_type: Option<String>,
    /// `namespace` of the component in the layout, if present.
    pub namespace: Option<String>,
}

/// Waits until components are ready to be read and written.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a ReadinessProbe",
    note = "Readiness probes must implement `wait_ready(&self, &[ReadyTarget])`."
)]
pub trait ReadinessProbe: Send + Sync + 'static {
    /// Resolve once every target is ready.
    fn wait_ready(&self, targets: &[ReadyTarget]) -> impl Future<Output = ()> + Send;
}

/// Object-safe version of [`ReadinessProbe`].
pub trait DynReadinessProbe: Send + Sync + 'static {
    /// Resolve once every target is ready, returning a boxed future.
    fn wait_ready_dyn<'a>(
        &'a self,
        targets: &'a [ReadyTarget],
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

impl<T: ReadinessProbe> DynReadinessProbe for T {
    fn wait_ready_dyn<'a>(
        &'a self,
        targets: &'a [ReadyTarget],
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(self.wait_ready(targets))
    }
}

/// Every component is always ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

impl ReadinessProbe for AlwaysReady {
    async fn wait_ready(&self, _targets: &[ReadyTarget]) {}
}
