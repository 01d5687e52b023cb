//! Dependency graphs over a callback set.
//!
//! [`DependencyGraphs::build`] validates the definitions, fills the lookup
//! maps, computes the wildcard value universes and proves the set acyclic.
//! The result is read-only and shared behind an `Arc` while scheduling.
//!
//! # Example
//!
//! ```rust,ignore
//! use switchyard_core::{CallbackDefinition, CallbackProperty};
//! use switchyard_std::graph::DependencyGraphs;
//!
//! let graphs = DependencyGraphs::build(vec![CallbackDefinition::new(
//!     vec![CallbackProperty::new("out", "children")],
//!     vec![CallbackProperty::new("in", "value")],
//! )])?;
//! assert_eq!(graphs.callbacks().len(), 1);
//! ```

mod multigraph;
mod placeholders;
mod registrar;
mod validate;

pub use multigraph::{CycleError, DepGraph};
pub use placeholders::WildcardPlaceholders;
pub use registrar::{PatternEntry, PatternMap, PropMap, Registrar};
pub use validate::validate;

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};
use switchyard_core::{
    CallbackDefinition, CallbackProperty, CallbackSpec, ComponentId, DictId, ValidationIssue,
    combine_id_and_prop,
};
use thiserror::Error;

/// Why a callback set cannot be scheduled.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Structural problems in the definitions.
    #[error("{} invalid callback definition(s)", .0.len())]
    Invalid(Vec<ValidationIssue>),

    /// The callbacks depend on each other in a circle.
    #[error("Circular Dependencies: {0}")]
    Circular(#[from] CycleError),
}

/// Lookup maps, value universes and graphs of one callback set.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraphs {
    callbacks: Vec<Arc<CallbackDefinition>>,
    registrar: Registrar,
    placeholders: WildcardPlaceholders,
    multi_graph: DepGraph,
    callback_dag: DepGraph,
}

impl DependencyGraphs {
    /// Graphs of an empty callback set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse, validate and build from the wire form.
    pub fn from_specs(specs: &[CallbackSpec]) -> Result<Self, GraphError> {
        let mut issues = Vec::new();
        let mut definitions = Vec::with_capacity(specs.len());
        for spec in specs {
            match CallbackDefinition::from_spec(spec) {
                Ok(def) => definitions.push(def),
                Err(mut errs) => issues.append(&mut errs),
            }
        }
        if !issues.is_empty() {
            issues.extend(validate(&definitions));
            return Err(GraphError::Invalid(issues));
        }
        Self::build(definitions)
    }

    /// Validate and build.
    pub fn build(definitions: Vec<CallbackDefinition>) -> Result<Self, GraphError> {
        let issues = validate(&definitions);
        if !issues.is_empty() {
            return Err(GraphError::Invalid(issues));
        }
        let graphs = Self::assemble(definitions);
        graphs.multi_graph.overall_order()?;
        Ok(graphs)
    }

    fn assemble(definitions: Vec<CallbackDefinition>) -> Self {
        let callbacks: Vec<Arc<CallbackDefinition>> =
            definitions.into_iter().map(Arc::new).collect();
        let placeholders = WildcardPlaceholders::collect(callbacks.iter().map(Arc::as_ref));

        let mut registrar = Registrar::default();
        let mut multi_graph = DepGraph::new();
        let mut produced_by: HashMap<String, BTreeSet<usize>> = HashMap::new();
        let mut consumed: Vec<BTreeSet<String>> = Vec::with_capacity(callbacks.len());

        for (index, callback) in callbacks.iter().enumerate() {
            if !callback.has_outputs() {
                consumed.push(BTreeSet::new());
                continue;
            }
            registrar.register(callback);

            let mut inputs_seen = BTreeSet::new();
            for out in callback.outputs() {
                for out_id in expand(&placeholders, &out.id, &DictId::new()) {
                    let out_node = combine_id_and_prop(&out_id, &out.property);
                    multi_graph.add_node(&out_node);
                    produced_by.entry(out_node.clone()).or_default().insert(index);

                    let bound = out_id.as_dict().cloned().unwrap_or_default();
                    for input in callback.inputs() {
                        for in_node in expanded_nodes(&placeholders, input, &bound) {
                            multi_graph.add_dependency(&in_node, &out_node);
                            inputs_seen.insert(in_node);
                        }
                    }
                }
            }
            consumed.push(inputs_seen);
        }

        let mut callback_dag = DepGraph::new();
        for callback in &callbacks {
            callback_dag.add_node(callback.output());
        }
        for (consumer, inputs) in consumed.iter().enumerate() {
            for node in inputs {
                for &producer in produced_by.get(node).into_iter().flatten() {
                    if producer != consumer {
                        callback_dag.add_dependency(
                            callbacks[producer].output(),
                            callbacks[consumer].output(),
                        );
                    }
                }
            }
        }

        Self {
            callbacks,
            registrar,
            placeholders,
            multi_graph,
            callback_dag,
        }
    }

    /// Every registered callback, in registration order.
    pub fn callbacks(&self) -> &[Arc<CallbackDefinition>] {
        &self.callbacks
    }

    /// The lookup maps.
    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }

    /// The wildcard value universes.
    pub fn placeholders(&self) -> &WildcardPlaceholders {
        &self.placeholders
    }

    /// The `(id, prop)` identity graph used for cycle detection.
    pub fn multi_graph(&self) -> &DepGraph {
        &self.multi_graph
    }

    /// Output signatures ordered so that producers come before consumers.
    pub fn callback_order(&self) -> Result<Vec<&str>, CycleError> {
        self.callback_dag.overall_order()
    }

    /// Output signatures of callbacks reading what `output` writes.
    pub fn dependents_of(&self, output: &str) -> Vec<&str> {
        self.callback_dag.dependants_of(output)
    }
}

fn expand(placeholders: &WildcardPlaceholders, id: &ComponentId, bound: &DictId) -> Vec<ComponentId> {
    match id {
        ComponentId::Plain(_) => vec![id.clone()],
        ComponentId::Dict(pattern) => placeholders
            .make_all_ids(pattern, bound)
            .into_iter()
            .map(ComponentId::Dict)
            .collect(),
    }
}

fn expanded_nodes(
    placeholders: &WildcardPlaceholders,
    prop: &CallbackProperty,
    bound: &DictId,
) -> Vec<String> {
    expand(placeholders, &prop.id, bound)
        .iter()
        .map(|id| combine_id_and_prop(id, &prop.property))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::{ALL, ALLSMALLER, MATCH};

    fn cb(out: (&str, &str), input: (&str, &str)) -> CallbackDefinition {
        CallbackDefinition::new(
            vec![CallbackProperty::new(out.0, out.1)],
            vec![CallbackProperty::new(input.0, input.1)],
        )
    }

    #[test]
    fn test_direct_cycle_is_rejected() {
        let err = DependencyGraphs::build(vec![
            cb(("a", "value"), ("b", "value")),
            cb(("b", "value"), ("a", "value")),
        ])
        .unwrap_err();
        let GraphError::Circular(cycle) = err else {
            panic!("expected a cycle, got {err:?}");
        };
        assert_eq!(cycle.path.first(), cycle.path.last());
        assert_eq!(cycle.path.len(), 3);
    }

    #[test]
    fn test_chain_builds_dag() {
        let graphs = DependencyGraphs::build(vec![
            cb(("c", "children"), ("b", "children")),
            cb(("b", "children"), ("a", "value")),
        ])
        .unwrap();
        assert_eq!(graphs.callback_order().unwrap(), vec!["b.children", "c.children"]);
        assert_eq!(graphs.dependents_of("b.children"), vec!["c.children"]);
    }

    #[test]
    fn test_allsmaller_chain_is_acyclic() {
        // Each item sums the items before it.
        let item = |v| DictId::new().with("type", "item").with("index", v);
        let graphs = DependencyGraphs::build(vec![CallbackDefinition::new(
            vec![CallbackProperty::new(item(MATCH), "total")],
            vec![
                CallbackProperty::new(item(MATCH), "value"),
                CallbackProperty::new(item(ALLSMALLER), "total"),
            ],
        )]);
        assert!(graphs.is_ok());
    }

    #[test]
    fn test_wildcard_cycle_is_rejected() {
        let item = |v| DictId::new().with("index", v);
        let err = DependencyGraphs::build(vec![
            CallbackDefinition::new(
                vec![CallbackProperty::new("total", "children")],
                vec![CallbackProperty::new(item(ALL), "value")],
            ),
            CallbackDefinition::new(
                vec![CallbackProperty::new(item(MATCH), "value")],
                vec![CallbackProperty::new("total", "children")],
            ),
        ])
        .unwrap_err();
        assert!(matches!(err, GraphError::Circular(_)));
    }

    #[test]
    fn test_invalid_set_is_not_built() {
        let err = DependencyGraphs::build(vec![
            cb(("out", "children"), ("a", "value")),
            cb(("out", "children"), ("b", "value")),
        ])
        .unwrap_err();
        let GraphError::Invalid(issues) = err else {
            panic!("expected validation issues");
        };
        assert_eq!(issues[0].message, "Duplicate callback outputs");
    }
}
