//! The execution scheduler.
//!
//! A [`Renderer`] owns the live tree, the dependency graphs and the pending
//! set, and drives callbacks to completion:
//!
//! 1. Ready instances (nothing blocking them, not dispatched) are fired,
//!    most blocking first, once the [`ReadinessProbe`] clears their
//!    components.
//! 2. Clientside callbacks run inline. Server callbacks go out through the
//!    [`Transport`] and are awaited together.
//! 3. Each result is applied to the tree, which may queue more callbacks,
//!    and the instance leaves the pending set.
//!
//! Responses are matched to their dispatch by request id; a response for
//! an instance that was retriggered in the meantime is dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut renderer = RendererBuilder::new(layout)
//!     .specs(specs)
//!     .transport(my_transport)
//!     .build()?;
//! renderer.hydrate().await?;
//! renderer.update_props("input", props).await?;
//! ```
//!
//! [`ReadinessProbe`]: switchyard_core::ReadinessProbe
//! [`Transport`]: switchyard_core::Transport

mod clientside;
mod payload;
mod server;

pub use clientside::{ClientsideRegistration, ClientsideRegistry, invoke};
pub use payload::{
    ArgValue, CallbackPayload, OutputRef, OutputSlot, PayloadError, Prepared, PropValue,
    ReferenceError, prepare_payload,
};
pub use server::{CallbackData, decode_response, update_request};

use futures::{
    FutureExt, StreamExt,
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    future::BoxFuture,
    select,
    stream::FuturesUnordered,
};
use serde_json::{Map, Value};
use std::{collections::HashSet, sync::Arc};
use switchyard_core::{
    AlwaysReady, CallbackDefinition, CallbackSpec, ComponentId, DynReadinessProbe, DynTransport,
    ErrorEvent, ErrorKind, ErrorSink, HttpResponse, NoTransport, ReadyTarget, TransportError,
    ValidationIssue, combine_id_and_prop,
};
use tracing::{debug, warn};

use crate::config::RendererConfig;
use crate::error::{CallbackError, SwitchyardError};
use crate::graph::{DependencyGraphs, GraphError, validate};
use crate::hooks::{RequestObserver, TracingErrorSink};
use crate::layout::{Layout, PathSegment, Paths, children_path};
use crate::resolve::{
    ChangeType, LayoutCallbackOptions, PendingCallbacks, ResolveError, ResolvedCallback,
    ResolvedProp, follow_forward, get_callbacks_by_input, get_layout_callbacks,
};

/// Counters of one [`Renderer::run_until_idle`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Scheduling rounds.
    pub rounds: usize,
    /// Payloads handed to a transport or clientside function.
    pub dispatched: usize,
    /// Instances that failed and were reported.
    pub errors: usize,
    /// Responses dropped because their instance was retriggered.
    pub stale: usize,
}

#[derive(Debug)]
enum Command {
    UpdateProps {
        id: ComponentId,
        props: Map<String, Value>,
    },
}

/// Injects prop changes into a [`Renderer`] from other tasks.
///
/// Changes sent while the renderer waits on server responses are applied
/// right away; otherwise they are applied when the next run starts.
#[derive(Debug, Clone)]
pub struct RendererHandle {
    tx: UnboundedSender<Command>,
}

impl RendererHandle {
    /// Queue a user-driven prop change.
    pub fn update_props(
        &self,
        id: impl Into<ComponentId>,
        props: Map<String, Value>,
    ) -> Result<(), SwitchyardError> {
        self.tx
            .unbounded_send(Command::UpdateProps {
                id: id.into(),
                props,
            })
            .map_err(|_| SwitchyardError::Closed)
    }
}

struct Services {
    transport: Arc<dyn DynTransport>,
    clientside: ClientsideRegistry,
    readiness: Arc<dyn DynReadinessProbe>,
    errors: Arc<dyn ErrorSink>,
    observers: Vec<Arc<dyn RequestObserver>>,
}

/// A server response on its way back.
struct Settled {
    resolved_id: String,
    request_id: u64,
    payload: CallbackPayload,
    response: Result<HttpResponse, TransportError>,
}

enum Wake {
    Settled(Settled),
    Command(Command),
}

/// Builder for a [`Renderer`].
pub struct RendererBuilder {
    layout: Value,
    definitions: Vec<CallbackDefinition>,
    spec_issues: Vec<ValidationIssue>,
    config: RendererConfig,
    transport: Arc<dyn DynTransport>,
    clientside: ClientsideRegistry,
    readiness: Arc<dyn DynReadinessProbe>,
    errors: Arc<dyn ErrorSink>,
    observers: Vec<Arc<dyn RequestObserver>>,
}

impl RendererBuilder {
    /// Start from the initial tree.
    pub fn new(layout: Value) -> Self {
        Self {
            layout,
            definitions: Vec::new(),
            spec_issues: Vec::new(),
            config: RendererConfig::default(),
            transport: Arc::new(NoTransport),
            clientside: ClientsideRegistry::new(),
            readiness: Arc::new(AlwaysReady),
            errors: Arc::new(TracingErrorSink),
            observers: Vec::new(),
        }
    }

    /// Register a callback.
    pub fn callback(mut self, definition: CallbackDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Register several callbacks.
    pub fn callbacks(mut self, definitions: impl IntoIterator<Item = CallbackDefinition>) -> Self {
        self.definitions.extend(definitions);
        self
    }

    /// Register callbacks in wire form. Malformed ones fail [`build`](Self::build).
    pub fn specs<'a>(mut self, specs: impl IntoIterator<Item = &'a CallbackSpec>) -> Self {
        for spec in specs {
            match CallbackDefinition::from_spec(spec) {
                Ok(definition) => self.definitions.push(definition),
                Err(mut issues) => self.spec_issues.append(&mut issues),
            }
        }
        self
    }

    /// Use a configuration.
    pub fn config(mut self, config: RendererConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a transport for server callbacks.
    pub fn transport<T: DynTransport>(mut self, transport: T) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Use a registry of clientside functions.
    pub fn clientside(mut self, registry: ClientsideRegistry) -> Self {
        self.clientside = registry;
        self
    }

    /// Use a readiness probe.
    pub fn readiness<R: DynReadinessProbe>(mut self, readiness: R) -> Self {
        self.readiness = Arc::new(readiness);
        self
    }

    /// Send errors to `sink` instead of `tracing`.
    pub fn error_sink<S: ErrorSink>(mut self, sink: S) -> Self {
        self.errors = Arc::new(sink);
        self
    }

    /// Add a request observer.
    pub fn observer<O: RequestObserver>(mut self, observer: O) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Validate the callbacks and build the renderer.
    ///
    /// Invalid or circular callback sets are reported to the error sink and
    /// returned as [`SwitchyardError::Graph`].
    pub fn build(self) -> Result<Renderer, SwitchyardError> {
        let graphs = if self.spec_issues.is_empty() {
            DependencyGraphs::build(self.definitions)
        } else {
            let mut issues = self.spec_issues;
            issues.extend(validate(&self.definitions));
            Err(GraphError::Invalid(issues))
        };
        let graphs = graphs.inspect_err(|err| report_graph_error(self.errors.as_ref(), err))?;

        let layout = Layout::new(self.layout);
        let paths = Paths::compute(layout.root());
        let (tx, commands) = mpsc::unbounded();
        debug!(callbacks = graphs.callbacks().len(), "renderer built");
        Ok(Renderer {
            graphs: Arc::new(graphs),
            layout,
            paths,
            pending: PendingCallbacks::new(),
            next_request_id: 0,
            config: self.config,
            services: Services {
                transport: self.transport,
                clientside: self.clientside,
                readiness: self.readiness,
                errors: self.errors,
                observers: self.observers,
            },
            commands,
            tx,
        })
    }
}

fn report_graph_error(sink: &dyn ErrorSink, err: &GraphError) {
    match err {
        GraphError::Invalid(issues) => {
            for issue in issues {
                sink.on_error(&ErrorEvent::front_end(issue.message.clone(), Some(issue.details())));
            }
        }
        GraphError::Circular(cycle) => {
            sink.on_error(&ErrorEvent::front_end("Circular Dependencies", Some(cycle.to_string())));
        }
    }
}

/// The scheduler of one component tree.
pub struct Renderer {
    graphs: Arc<DependencyGraphs>,
    layout: Layout,
    paths: Paths,
    pending: PendingCallbacks,
    next_request_id: u64,
    config: RendererConfig,
    services: Services,
    commands: UnboundedReceiver<Command>,
    tx: UnboundedSender<Command>,
}

impl Renderer {
    /// The live tree.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The id index of the live tree.
    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Pending and in-flight callback instances.
    pub fn pending(&self) -> &PendingCallbacks {
        &self.pending
    }

    /// The dependency graphs.
    pub fn graphs(&self) -> &DependencyGraphs {
        &self.graphs
    }

    /// The configuration.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// A handle for injecting prop changes from other tasks.
    pub fn handle(&self) -> RendererHandle {
        RendererHandle {
            tx: self.tx.clone(),
        }
    }

    /// Fire the initial call of every callback writing a component of the
    /// tree, then run until idle.
    pub async fn hydrate(&mut self) -> Result<RunStats, SwitchyardError> {
        let options = LayoutCallbackOptions {
            outputs_only: true,
            ..Default::default()
        };
        let initial = get_layout_callbacks(&self.graphs, &self.paths, self.layout.root(), options)?;
        debug!(callbacks = initial.len(), "hydrating layout");
        let all = follow_forward(&self.graphs, &self.paths, initial)?;
        self.merge(all)?;
        Ok(self.run_until_idle().await)
    }

    /// Apply a user-driven prop change and run until idle.
    pub async fn update_props(
        &mut self,
        id: impl Into<ComponentId>,
        props: Map<String, Value>,
    ) -> Result<RunStats, SwitchyardError> {
        self.notify(id, props)?;
        Ok(self.run_until_idle().await)
    }

    /// Apply a user-driven prop change and queue its callbacks without
    /// running them.
    pub fn notify(
        &mut self,
        id: impl Into<ComponentId>,
        props: Map<String, Value>,
    ) -> Result<(), SwitchyardError> {
        let id = id.into();
        self.apply_props(&id, &props, ChangeType::Direct)?;
        Ok(())
    }

    /// Swap in a new callback set.
    ///
    /// The pending set belongs to the old graphs and is dropped.
    pub fn replace_callbacks(
        &mut self,
        definitions: Vec<CallbackDefinition>,
    ) -> Result<(), SwitchyardError> {
        let graphs = DependencyGraphs::build(definitions)
            .inspect_err(|err| report_graph_error(self.services.errors.as_ref(), err))?;
        if !self.pending.is_empty() {
            warn!(pending = self.pending.len(), "dropping pending callbacks of the old callback set");
        }
        self.graphs = Arc::new(graphs);
        self.pending = PendingCallbacks::new();
        Ok(())
    }

    /// Fire callbacks and apply their results until nothing is pending.
    pub async fn run_until_idle(&mut self) -> RunStats {
        let mut in_flight: FuturesUnordered<BoxFuture<'static, Settled>> = FuturesUnordered::new();
        let mut stats = RunStats::default();

        loop {
            stats.rounds += 1;
            if stats.rounds > self.config.max_rounds {
                warn!(
                    max_rounds = self.config.max_rounds,
                    pending = self.pending.len(),
                    "round limit reached, dropping pending callbacks"
                );
                self.pending = PendingCallbacks::new();
                break;
            }

            self.drain_commands();
            self.fire_ready(&mut in_flight, &mut stats).await;

            if in_flight.is_empty() {
                if self.pending.is_empty() {
                    break;
                }
                if !self.pending.ready().is_empty() {
                    continue;
                }
                warn!(pending = self.pending.len(), "no pending callback can make progress");
                self.pending = PendingCallbacks::new();
                break;
            }

            let wake = {
                select! {
                    settled = in_flight.select_next_some() => Wake::Settled(settled),
                    command = self.commands.select_next_some() => Wake::Command(command),
                }
            };
            match wake {
                Wake::Settled(settled) => self.on_settled(settled, &mut stats),
                Wake::Command(command) => self.on_command(command),
            }
        }

        debug!(?stats, "renderer idle");
        stats
    }

    fn drain_commands(&mut self) {
        while let Some(Some(command)) = self.commands.next().now_or_never() {
            self.on_command(command);
        }
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::UpdateProps { id, props } => {
                if let Err(err) = self.apply_props(&id, &props, ChangeType::Direct) {
                    warn!(%id, %err, "failed to apply queued prop change");
                    self.services
                        .errors
                        .on_error(&ErrorEvent::front_end(err.to_string(), None));
                }
            }
        }
    }

    async fn fire_ready(
        &mut self,
        in_flight: &mut FuturesUnordered<BoxFuture<'static, Settled>>,
        stats: &mut RunStats,
    ) {
        let ready: Vec<String> = self
            .pending
            .ready()
            .iter()
            .map(|cb| cb.resolved_id.clone())
            .collect();
        if ready.is_empty() {
            return;
        }

        let targets = self.ready_targets(&ready);
        if !targets.is_empty() {
            self.services.readiness.wait_ready_dyn(&targets).await;
        }

        for resolved_id in ready {
            // Clientside results applied earlier in this batch can change the set.
            let cb = match self.pending.get(&resolved_id) {
                Some(cb) if cb.is_ready() => cb.clone(),
                _ => continue,
            };
            self.next_request_id += 1;
            let request_id = self.next_request_id;
            self.pending.assign_request(&resolved_id, request_id);

            let payload = match prepare_payload(&cb, &self.layout, &self.paths) {
                Ok(Prepared::Ready(payload)) => payload,
                Ok(Prepared::Prevented) => {
                    debug!(%resolved_id, "inputs or outputs missing, update prevented");
                    self.drop_skipping_outputs(&cb);
                    continue;
                }
                Err(err) => {
                    self.fail(&cb, err.into(), stats);
                    continue;
                }
            };

            for observer in &self.services.observers {
                observer.on_request(&payload);
            }
            stats.dispatched += 1;

            match cb.callback.clientside_function() {
                Some(function) => {
                    debug!(%resolved_id, request_id, "running clientside callback");
                    let result = invoke(&self.services.clientside, function, &payload)
                        .map_err(CallbackError::from);
                    self.settle(&cb, &payload, result, stats);
                }
                None => {
                    debug!(%resolved_id, request_id, "dispatching server callback");
                    let transport = Arc::clone(&self.services.transport);
                    let request = update_request(self.config.update_url(), &payload);
                    in_flight.push(Box::pin(async move {
                        let response = transport.update_dyn(&request).await;
                        Settled {
                            resolved_id,
                            request_id,
                            payload,
                            response,
                        }
                    }));
                }
            }
        }
    }

    fn ready_targets(&self, ready: &[String]) -> Vec<ReadyTarget> {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for cb in ready.iter().filter_map(|id| self.pending.get(id)) {
            let props: Vec<ResolvedProp> = [cb.outputs(&self.paths), cb.inputs(&self.paths), cb.state(&self.paths)]
                .into_iter()
                .filter_map(Result::ok)
                .flatten()
                .flatten()
                .collect();
            for prop in props {
                if !seen.insert(prop.id.stringify()) {
                    continue;
                }
                let node = self.layout.get(&prop.path);
                let field = |name: &str| {
                    node.and_then(|n| n.get(name))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                };
                targets.push(ReadyTarget {
                    component_type: field("type"),
                    namespace: field("namespace"),
                    id: prop.id,
                });
            }
        }
        targets
    }

    fn on_settled(&mut self, settled: Settled, stats: &mut RunStats) {
        let Settled {
            resolved_id,
            request_id,
            payload,
            response,
        } = settled;
        if !self.pending.is_request_active(&resolved_id, request_id) {
            warn!(%resolved_id, request_id, "dropping stale response");
            stats.stale += 1;
            return;
        }
        let Some(cb) = self.pending.get(&resolved_id).cloned() else {
            return;
        };
        let prevent_status = self.config.prevent_update_status;
        let result = response
            .and_then(|response| decode_response(&payload, response, prevent_status))
            .map_err(CallbackError::from);
        self.settle(&cb, &payload, result, stats);
    }

    fn settle(
        &mut self,
        cb: &ResolvedCallback,
        payload: &CallbackPayload,
        result: Result<CallbackData, CallbackError>,
        stats: &mut RunStats,
    ) {
        let outcome = result.and_then(|data| self.finish(cb, payload, data));
        if let Err(err) = outcome {
            self.fail(cb, err, stats);
        }
    }

    /// Apply the data of a settled instance and remove it, skipping the
    /// outputs it did not write.
    fn finish(
        &mut self,
        cb: &ResolvedCallback,
        payload: &CallbackPayload,
        data: CallbackData,
    ) -> Result<(), CallbackError> {
        for observer in &self.services.observers {
            observer.on_response(payload, &data);
        }
        let mut updated = HashSet::new();
        for (id, props) in &data {
            let id = ComponentId::parse(id)?;
            updated.extend(self.apply_props(&id, props, ChangeType::Indirect)?);
        }
        let skipped: Vec<String> = payload
            .output_ids()
            .into_iter()
            .filter(|output| !updated.contains(output))
            .collect();
        debug!(
            resolved_id = %cb.resolved_id,
            updated = updated.len(),
            skipped = skipped.len(),
            "callback settled"
        );
        self.pending = self
            .pending
            .clone()
            .remove(&self.paths, &cb.resolved_id, &skipped)?;
        Ok(())
    }

    fn fail(&mut self, cb: &ResolvedCallback, err: CallbackError, stats: &mut RunStats) {
        stats.errors += 1;
        let event = match err.kind() {
            ErrorKind::BackEnd => ErrorEvent::back_end(
                format!("Callback error updating {}", cb.callback.outputs_label()),
                err.html().or_else(|| Some(err.to_string())),
            ),
            ErrorKind::FrontEnd => ErrorEvent::front_end(err.to_string(), Some(cb.callback.head())),
        };
        warn!(resolved_id = %cb.resolved_id, %err, "callback failed");
        self.services.errors.on_error(&event);
        self.drop_skipping_outputs(cb);
    }

    /// Remove an instance as if it wrote none of its outputs.
    fn drop_skipping_outputs(&mut self, cb: &ResolvedCallback) {
        let pending = self.pending.clone();
        self.pending = cb
            .flat_outputs(&self.paths)
            .and_then(|outputs| {
                let skipped: Vec<String> = outputs.iter().map(ResolvedProp::combined).collect();
                pending.clone().remove(&self.paths, &cb.resolved_id, &skipped)
            })
            .unwrap_or_else(|err| {
                warn!(resolved_id = %cb.resolved_id, %err, "discarding callback");
                pending.discard(&cb.resolved_id)
            });
    }

    /// Merge props into a component, reindex changed children and queue
    /// the callbacks the change triggers. Returns the flattened ids of the
    /// updated props.
    fn apply_props(
        &mut self,
        id: &ComponentId,
        props: &Map<String, Value>,
        change: ChangeType,
    ) -> Result<Vec<String>, ResolveError> {
        let Some(path) = self.paths.get(id).cloned() else {
            warn!(%id, "update for a component that is not in the layout");
            return Ok(Vec::new());
        };
        let old_children = props
            .get("children")
            .and_then(|_| self.layout.get(&children_path(&path)).cloned());
        self.layout.merge_props(&path, props);
        if let Some(children) = props.get("children") {
            self.update_child_paths(&path, children, old_children.as_ref())?;
        }

        let mut triggered = Vec::new();
        let mut updated = Vec::with_capacity(props.len());
        for property in props.keys() {
            triggered.extend(get_callbacks_by_input(&self.graphs, &self.paths, id, property, change)?);
            updated.push(combine_id_and_prop(id, property));
        }
        if !triggered.is_empty() {
            let all = follow_forward(&self.graphs, &self.paths, triggered)?;
            self.merge(all)?;
        }
        Ok(updated)
    }

    fn update_child_paths(
        &mut self,
        path: &[PathSegment],
        children: &Value,
        old_children: Option<&Value>,
    ) -> Result<(), ResolveError> {
        let chunk_path = children_path(path);
        let new_paths = Paths::compute_subtree(children, &chunk_path, Some(&self.paths));
        let old_paths = std::mem::replace(&mut self.paths, new_paths);
        self.pending = self.pending.clone().prune_removed(&self.paths)?;

        let added = LayoutCallbackOptions {
            chunk_path: Some(chunk_path.as_slice()),
            ..Default::default()
        };
        let mut found = get_layout_callbacks(&self.graphs, &self.paths, children, added)?;
        if let Some(old) = old_children {
            let removed = LayoutCallbackOptions {
                removed_array_inputs_only: true,
                chunk_path: Some(chunk_path.as_slice()),
                new_paths: Some(&self.paths),
                ..Default::default()
            };
            found.extend(get_layout_callbacks(&self.graphs, &old_paths, old, removed)?);
        }
        debug!(found = found.len(), "children changed");
        if found.is_empty() {
            return Ok(());
        }
        let all = follow_forward(&self.graphs, &self.paths, found)?;
        self.merge(all)
    }

    fn merge(&mut self, incoming: Vec<ResolvedCallback>) -> Result<(), ResolveError> {
        self.pending = self.pending.clone().merge(incoming, &self.paths)?;
        Ok(())
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("callbacks", &self.graphs.callbacks().len())
            .field("pending", &self.pending.len())
            .field("next_request_id", &self.next_request_id)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingErrorSink;
    use serde_json::json;
    use switchyard_core::{CallbackProperty, ClientsideError, Update};

    fn node(id: &str, props: Value) -> Value {
        let mut props = props;
        props["id"] = json!(id);
        json!({"type": "Div", "props": props})
    }

    fn link(out: &str, input: &str) -> CallbackDefinition {
        CallbackDefinition::new(
            vec![CallbackProperty::new(out, "value")],
            vec![CallbackProperty::new(input, "value")],
        )
    }

    #[test]
    fn test_build_reports_cycle() {
        let sink = RecordingErrorSink::new();
        let err = RendererBuilder::new(json!([]))
            .callbacks([link("a", "b"), link("b", "a")])
            .error_sink(sink.clone())
            .build()
            .unwrap_err();
        assert!(matches!(err, SwitchyardError::Graph(GraphError::Circular(_))));
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "Circular Dependencies");
    }

    #[tokio::test]
    async fn test_clientside_chain() {
        let increment = |args: &[Value]| -> Result<Update, ClientsideError> {
            Ok(Update::Value(json!(args[0].as_i64().unwrap_or(0) + 1)))
        };
        let layout = json!([
            node("a", json!({"value": 1})),
            node("b", json!({})),
            node("c", json!({})),
        ]);
        let mut renderer = RendererBuilder::new(layout)
            .callbacks([
                link("b", "a").clientside("inc", "one"),
                link("c", "b").clientside("inc", "one"),
            ])
            .clientside(ClientsideRegistry::new().register("inc", "one", increment))
            .build()
            .unwrap();

        let stats = renderer.hydrate().await.unwrap();
        assert_eq!(stats.dispatched, 2);
        assert!(renderer.pending().is_empty());
        let value = |id: &str| {
            let path = renderer.paths().get(&ComponentId::from(id)).unwrap();
            renderer.layout().prop(path, "value").cloned()
        };
        assert_eq!(value("c"), Some(json!(3)));

        let mut props = Map::new();
        props.insert("value".into(), json!(10));
        renderer.update_props("a", props).await.unwrap();
        let path = renderer.paths().get(&ComponentId::from("c")).unwrap();
        assert_eq!(renderer.layout().prop(path, "value"), Some(&json!(12)));
    }
}
