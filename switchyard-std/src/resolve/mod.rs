//! Resolving which callback instances a change affects.
//!
//! A callback with `MATCH` outputs runs once per distinct binding of its
//! `MATCH` keys; every instance is a [`ResolvedCallback`] identified by its
//! `resolved_id`. Instances materialize their concrete outputs, inputs and
//! state against the current [`Paths`] on demand, so they stay valid while
//! the tree changes underneath them.

mod layout_callbacks;
mod pending;

pub use layout_callbacks::{LayoutCallbackOptions, get_layout_callbacks};
pub use pending::PendingCallbacks;

use serde_json::Value;
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    sync::Arc,
};
use switchyard_core::{
    CallbackDefinition, CallbackProperty, ComponentId, DepRole, DictId, IdValue, PatternValue,
    Wildcard, combine_id_and_prop, id_val_sort,
};
use thiserror::Error;
use tracing::debug;

use crate::graph::DependencyGraphs;
use crate::layout::{ComponentPath, Paths};

/// Errors raised while resolving wildcard ids.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Both a pattern and its reference use `ALLSMALLER` on the same key.
    #[error("invalid wildcard id match: ALLSMALLER on key {key:?} of both {pattern} and its reference")]
    AllSmallerPair {
        /// The key in question.
        key: String,
        /// The pattern being matched.
        pattern: String,
    },
}

/// How a prop change reached a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeType {
    /// Discovered by following the chain or by layout changes.
    Indirect = 1,
    /// Changed by the user.
    Direct = 2,
}

/// A concrete prop a callback instance reads or writes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProp {
    /// Concrete component id.
    pub id: ComponentId,
    /// Property name.
    pub property: String,
    /// Location of the component.
    pub path: ComponentPath,
}

impl ResolvedProp {
    /// Flattened identity `stringify(id).property`.
    pub fn combined(&self) -> String {
        combine_id_and_prop(&self.id, &self.property)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Binding {
    keys: Vec<String>,
    values: Vec<IdValue>,
    pattern: Vec<PatternValue>,
}

/// Binding of a callback instance's wildcard keys, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolver {
    binding: Option<Binding>,
}

impl Resolver {
    /// A resolver with no binding: wildcards match freely.
    pub fn unbound() -> Self {
        Self::default()
    }

    /// A resolver bound to one concrete id matched by `pattern`.
    pub fn bound(keys: Vec<String>, values: Vec<IdValue>, pattern: Vec<PatternValue>) -> Self {
        Self {
            binding: Some(Binding {
                keys,
                values,
                pattern,
            }),
        }
    }

    /// Every live component the property resolves to.
    pub fn resolve(
        &self,
        paths: &Paths,
        prop: &CallbackProperty,
    ) -> Result<Vec<ResolvedProp>, ResolveError> {
        match &prop.id {
            ComponentId::Plain(_) => Ok(paths
                .get(&prop.id)
                .map(|path| ResolvedProp {
                    id: prop.id.clone(),
                    property: prop.property.clone(),
                    path: path.clone(),
                })
                .into_iter()
                .collect()),
            ComponentId::Dict(pattern) => {
                let keys = pattern.keys();
                let pattern_values = pattern.values();
                let mut out = Vec::new();
                for entry in paths.keyed(&pattern.key_string()) {
                    if id_match(&keys, &entry.values, &pattern_values, self.binding.as_ref())? {
                        out.push(ResolvedProp {
                            id: ComponentId::Dict(DictId::from_parts(&keys, &entry.values)),
                            property: prop.property.clone(),
                            path: entry.path.clone(),
                        });
                    }
                }
                Ok(out)
            }
        }
    }
}

/// Whether concrete `values` match `pattern`, relative to an optional binding.
fn id_match(
    keys: &[String],
    values: &[IdValue],
    pattern: &[PatternValue],
    binding: Option<&Binding>,
) -> Result<bool, ResolveError> {
    for ((key, value), pattern_value) in keys.iter().zip(values).zip(pattern) {
        let wildcard = match pattern_value {
            PatternValue::Exact(expected) => {
                if value != expected {
                    return Ok(false);
                }
                continue;
            }
            PatternValue::Wild(w) => *w,
        };
        let Some(binding) = binding else {
            continue;
        };
        if wildcard == Wildcard::All {
            continue;
        }
        // A key the binding does not carry places no constraint.
        let Some(ri) = binding.keys.iter().position(|k| k == key) else {
            continue;
        };
        let ref_wildcard = binding.pattern[ri].wildcard();
        if wildcard == Wildcard::AllSmaller && ref_wildcard == Some(Wildcard::AllSmaller) {
            let pattern = DictId::from_parts(keys, values);
            return Err(ResolveError::AllSmallerPair {
                key: key.clone(),
                pattern: ComponentId::Dict(pattern).stringify(),
            });
        }
        let expected = if wildcard == Wildcard::AllSmaller {
            Ordering::Less
        } else if ref_wildcard == Some(Wildcard::AllSmaller) {
            Ordering::Greater
        } else {
            Ordering::Equal
        };
        if id_val_sort(value, &binding.values[ri]) != expected {
            return Ok(false);
        }
    }
    Ok(true)
}

/// JSON list of the values bound to `MATCH` keys, or empty for none.
fn any_vals(pattern: &[PatternValue], values: &[IdValue]) -> String {
    let matched: Vec<Value> = pattern
        .iter()
        .zip(values)
        .filter(|(p, _)| p.is(Wildcard::Match))
        .map(|(_, v)| v.to_json())
        .collect();
    if matched.is_empty() {
        String::new()
    } else {
        Value::Array(matched).to_string()
    }
}

/// One pending or in-flight callback instance.
#[derive(Debug, Clone)]
pub struct ResolvedCallback {
    /// The definition.
    pub callback: Arc<CallbackDefinition>,
    resolver: Resolver,
    /// JSON list of the `MATCH` values, empty without a binding.
    pub any_vals: String,
    /// Identity of the instance: output signature followed by `any_vals`.
    pub resolved_id: String,
    /// Props whose change (re)triggered the instance.
    pub changed_prop_ids: BTreeMap<String, ChangeType>,
    /// Instances that must settle first.
    pub blocked_by: BTreeSet<String>,
    /// Instances waiting on this one.
    pub blocking: BTreeSet<String>,
    /// Fire even without changed props.
    pub initial_call: bool,
    /// Request id of the current dispatch, `0` when not dispatched.
    pub request_id: u64,
}

impl ResolvedCallback {
    /// Create an instance with no changes recorded.
    pub fn new(callback: Arc<CallbackDefinition>, resolver: Resolver, any_vals: String) -> Self {
        let resolved_id = format!("{}{}", callback.output(), any_vals);
        Self {
            callback,
            resolver,
            any_vals,
            resolved_id,
            changed_prop_ids: BTreeMap::new(),
            blocked_by: BTreeSet::new(),
            blocking: BTreeSet::new(),
            initial_call: false,
            request_id: 0,
        }
    }

    /// The binding of this instance.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Concrete props of each argument of a role, against current paths.
    pub fn resolve_role(
        &self,
        paths: &Paths,
        role: DepRole,
    ) -> Result<Vec<Vec<ResolvedProp>>, ResolveError> {
        self.callback
            .args(role)
            .iter()
            .map(|prop| self.resolver.resolve(paths, prop))
            .collect()
    }

    /// Concrete outputs.
    pub fn outputs(&self, paths: &Paths) -> Result<Vec<Vec<ResolvedProp>>, ResolveError> {
        self.resolve_role(paths, DepRole::Output)
    }

    /// Concrete inputs.
    pub fn inputs(&self, paths: &Paths) -> Result<Vec<Vec<ResolvedProp>>, ResolveError> {
        self.resolve_role(paths, DepRole::Input)
    }

    /// Concrete state.
    pub fn state(&self, paths: &Paths) -> Result<Vec<Vec<ResolvedProp>>, ResolveError> {
        self.resolve_role(paths, DepRole::State)
    }

    /// Concrete outputs, flattened.
    pub fn flat_outputs(&self, paths: &Paths) -> Result<Vec<ResolvedProp>, ResolveError> {
        Ok(self.outputs(paths)?.into_iter().flatten().collect())
    }

    /// Concrete inputs, flattened.
    pub fn flat_inputs(&self, paths: &Paths) -> Result<Vec<ResolvedProp>, ResolveError> {
        Ok(self.inputs(paths)?.into_iter().flatten().collect())
    }

    /// Record a change, keeping the strongest change type per prop.
    pub fn mark_changed(&mut self, prop_id: impl Into<String>, change: ChangeType) {
        let entry = self.changed_prop_ids.entry(prop_id.into()).or_insert(change);
        *entry = (*entry).max(change);
    }

    /// Merge another set of changes into this one.
    pub fn merge_changes(&mut self, changes: &BTreeMap<String, ChangeType>) {
        for (prop_id, change) in changes {
            self.mark_changed(prop_id.clone(), *change);
        }
    }

    /// Not blocked and not dispatched.
    pub fn is_ready(&self) -> bool {
        self.blocked_by.is_empty() && self.request_id == 0
    }
}

/// Union of callback instances by `resolved_id`, merging their changes.
pub fn merge_by_resolved_id(callbacks: Vec<ResolvedCallback>) -> Vec<ResolvedCallback> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<ResolvedCallback> = Vec::with_capacity(callbacks.len());
    for cb in callbacks {
        match index.get(&cb.resolved_id) {
            Some(&i) => {
                merged[i].merge_changes(&cb.changed_prop_ids);
                merged[i].initial_call |= cb.initial_call;
            }
            None => {
                index.insert(cb.resolved_id.clone(), merged.len());
                merged.push(cb);
            }
        }
    }
    merged
}

fn add_resolved_from_outputs(
    callback: &Arc<CallbackDefinition>,
    out_pattern: &CallbackProperty,
    outs: &[ResolvedProp],
    matches: &mut Vec<ResolvedCallback>,
) {
    let ComponentId::Dict(pattern) = &out_pattern.id else {
        matches.push(ResolvedCallback::new(Arc::clone(callback), Resolver::unbound(), String::new()));
        return;
    };
    let keys = pattern.keys();
    let pattern_values = pattern.values();
    let mut found = HashSet::new();
    for out in outs {
        let Some(values) = out.id.as_dict().and_then(DictId::concrete_values) else {
            continue;
        };
        let resolved = ResolvedCallback::new(
            Arc::clone(callback),
            Resolver::bound(keys.clone(), values.clone(), pattern_values.clone()),
            any_vals(&pattern_values, &values),
        );
        if found.insert(resolved.resolved_id.clone()) {
            matches.push(resolved);
        }
    }
}

fn add_all_resolved_from_outputs(
    resolver: &Resolver,
    paths: &Paths,
    callback: &Arc<CallbackDefinition>,
    matches: &mut Vec<ResolvedCallback>,
) -> Result<(), ResolveError> {
    if callback.match_keys().is_empty() {
        let resolved = ResolvedCallback::new(Arc::clone(callback), resolver.clone(), String::new());
        if !resolved.flat_outputs(paths)?.is_empty() {
            matches.push(resolved);
        }
        return Ok(());
    }

    match callback.first_single_output() {
        Some(i) => {
            let out_pattern = &callback.outputs()[i];
            let outs = resolver.resolve(paths, out_pattern)?;
            add_resolved_from_outputs(callback, out_pattern, &outs, matches);
        }
        None => {
            // Every output is multi-valued: one instance per MATCH binding.
            let mut seen = HashSet::new();
            for out_pattern in callback.outputs() {
                let outs: Vec<ResolvedProp> = resolver
                    .resolve(paths, out_pattern)?
                    .into_iter()
                    .filter(|out| seen.insert(match_values(out, callback.match_keys())))
                    .collect();
                add_resolved_from_outputs(callback, out_pattern, &outs, matches);
            }
        }
    }
    Ok(())
}

fn match_values(out: &ResolvedProp, match_keys: &[String]) -> String {
    let values: Vec<Value> = match_keys
        .iter()
        .filter_map(|k| out.id.as_dict()?.get(k)?.exact().map(IdValue::to_json))
        .collect();
    Value::Array(values).to_string()
}

/// Callback instances triggered by a change of `(id, property)`.
///
/// Every instance has the change stamped into its `changed_prop_ids`.
pub fn get_callbacks_by_input(
    graphs: &DependencyGraphs,
    paths: &Paths,
    id: &ComponentId,
    property: &str,
    change: ChangeType,
) -> Result<Vec<ResolvedCallback>, ResolveError> {
    let mut matches = Vec::new();
    let prop_id = combine_id_and_prop(id, property);

    match id {
        ComponentId::Plain(plain) => {
            let callbacks = graphs
                .registrar()
                .inputs_of(plain)
                .and_then(|props| props.get(property));
            for callback in callbacks.into_iter().flatten() {
                add_all_resolved_from_outputs(&Resolver::unbound(), paths, callback, &mut matches)?;
            }
        }
        ComponentId::Dict(dict) => {
            let Some(values) = dict.concrete_values() else {
                return Ok(matches);
            };
            let keys = dict.keys();
            let patterns = graphs
                .registrar()
                .input_patterns(&dict.key_string())
                .and_then(|props| props.get(property));
            for entry in patterns.into_iter().flatten() {
                if !id_match(&keys, &values, &entry.values, None)? {
                    continue;
                }
                let resolver = Resolver::bound(keys.clone(), values.clone(), entry.values.clone());
                for callback in &entry.callbacks {
                    add_all_resolved_from_outputs(&resolver, paths, callback, &mut matches)?;
                }
            }
        }
    }

    for cb in &mut matches {
        cb.mark_changed(prop_id.clone(), change);
    }
    Ok(merge_by_resolved_id(matches))
}

/// The callback instance writing `(id, property)`, if any.
pub fn get_callback_by_output(
    graphs: &DependencyGraphs,
    id: &ComponentId,
    property: &str,
) -> Result<Option<ResolvedCallback>, ResolveError> {
    match id {
        ComponentId::Plain(plain) => Ok(graphs
            .registrar()
            .outputs_of(plain)
            .and_then(|props| props.get(property))
            .and_then(|callbacks| callbacks.first())
            .map(|callback| {
                ResolvedCallback::new(Arc::clone(callback), Resolver::unbound(), String::new())
            })),
        ComponentId::Dict(dict) => {
            let Some(values) = dict.concrete_values() else {
                return Ok(None);
            };
            let keys = dict.keys();
            let patterns = graphs
                .registrar()
                .output_patterns(&dict.key_string())
                .and_then(|props| props.get(property));
            for entry in patterns.into_iter().flatten() {
                if !id_match(&keys, &values, &entry.values, None)? {
                    continue;
                }
                let Some(callback) = entry.callbacks.first() else {
                    continue;
                };
                return Ok(Some(ResolvedCallback::new(
                    Arc::clone(callback),
                    Resolver::bound(keys.clone(), values.clone(), entry.values.clone()),
                    any_vals(&entry.values, &values),
                )));
            }
            Ok(None)
        }
    }
}

/// Extend a set of callbacks with everything their outputs feed, then link
/// the blocking edges of the result.
pub fn follow_forward(
    graphs: &DependencyGraphs,
    paths: &Paths,
    callbacks: Vec<ResolvedCallback>,
) -> Result<Vec<ResolvedCallback>, ResolveError> {
    let mut callbacks = merge_by_resolved_id(callbacks);
    let mut index: HashMap<String, usize> = callbacks
        .iter()
        .enumerate()
        .map(|(i, cb)| (cb.resolved_id.clone(), i))
        .collect();

    let mut i = 0;
    while i < callbacks.len() {
        for out in callbacks[i].flat_outputs(paths)? {
            for next in get_callbacks_by_input(graphs, paths, &out.id, &out.property, ChangeType::Indirect)? {
                match index.get(&next.resolved_id) {
                    Some(&j) => callbacks[j].merge_changes(&next.changed_prop_ids),
                    None => {
                        debug!(resolved_id = %next.resolved_id, "following callback chain");
                        index.insert(next.resolved_id.clone(), callbacks.len());
                        callbacks.push(next);
                    }
                }
            }
        }
        i += 1;
    }

    link_blocking(&mut callbacks, paths)?;
    Ok(callbacks)
}

/// Recompute `blocked_by` and `blocking` for a set of callbacks.
///
/// `A` blocks `B` when an output of `A` is an input of `B`, directly or
/// through other members of the set.
pub fn link_blocking(callbacks: &mut [ResolvedCallback], paths: &Paths) -> Result<(), ResolveError> {
    let mut consumers: HashMap<String, Vec<usize>> = HashMap::new();
    for (j, cb) in callbacks.iter().enumerate() {
        for input in cb.flat_inputs(paths)? {
            consumers.entry(input.combined()).or_default().push(j);
        }
    }

    let mut direct: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); callbacks.len()];
    for (i, cb) in callbacks.iter().enumerate() {
        for out in cb.flat_outputs(paths)? {
            for &j in consumers.get(&out.combined()).into_iter().flatten() {
                if j != i {
                    direct[i].insert(j);
                }
            }
        }
    }

    let reach: Vec<BTreeSet<usize>> = (0..callbacks.len())
        .map(|start| {
            let mut seen = BTreeSet::new();
            let mut stack: Vec<usize> = direct[start].iter().copied().collect();
            while let Some(n) = stack.pop() {
                if n != start && seen.insert(n) {
                    stack.extend(direct[n].iter().copied());
                }
            }
            seen
        })
        .collect();

    let ids: Vec<String> = callbacks.iter().map(|cb| cb.resolved_id.clone()).collect();
    for cb in callbacks.iter_mut() {
        cb.blocked_by.clear();
        cb.blocking.clear();
    }
    for (i, targets) in reach.iter().enumerate() {
        for &j in targets {
            callbacks[i].blocking.insert(ids[j].clone());
            callbacks[j].blocked_by.insert(ids[i].clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use switchyard_core::{ALL, ALLSMALLER, MATCH};

    fn item(index: impl Into<PatternValue>) -> DictId {
        DictId::new().with("type", "a").with("index", index)
    }

    fn node(id: Value) -> Value {
        json!({"type": "Input", "props": {"id": id}})
    }

    #[test]
    fn test_id_match_relative_to_binding() {
        let keys = vec!["index".to_string()];
        let binding = Binding {
            keys: keys.clone(),
            values: vec![IdValue::from(3)],
            pattern: vec![MATCH],
        };
        let smaller = [ALLSMALLER];
        assert!(id_match(&keys, &[IdValue::from(1)], &smaller, Some(&binding)).unwrap());
        assert!(!id_match(&keys, &[IdValue::from(3)], &smaller, Some(&binding)).unwrap());
        assert!(id_match(&keys, &[IdValue::from(3)], &[MATCH], Some(&binding)).unwrap());
        assert!(!id_match(&keys, &[IdValue::from(4)], &[MATCH], Some(&binding)).unwrap());
        assert!(id_match(&keys, &[IdValue::from(9)], &[ALL], Some(&binding)).unwrap());
        assert!(id_match(&keys, &[IdValue::from(9)], &[MATCH], None).unwrap());
    }

    #[test]
    fn test_id_match_rejects_allsmaller_pair() {
        let keys = vec!["index".to_string()];
        let binding = Binding {
            keys: keys.clone(),
            values: vec![IdValue::from(3)],
            pattern: vec![ALLSMALLER],
        };
        let err = id_match(&keys, &[IdValue::from(1)], &[ALLSMALLER], Some(&binding)).unwrap_err();
        assert!(matches!(err, ResolveError::AllSmallerPair { ref key, .. } if key == "index"));
    }

    #[test]
    fn test_plain_input_resolves_one_callback() {
        let graphs = DependencyGraphs::build(vec![CallbackDefinition::new(
            vec![CallbackProperty::new("foo", "children")],
            vec![CallbackProperty::new("bar", "value")],
        )])
        .unwrap();
        let paths = Paths::compute(&json!([node(json!("foo")), node(json!("bar"))]));
        let cbs = get_callbacks_by_input(
            &graphs,
            &paths,
            &ComponentId::from("bar"),
            "value",
            ChangeType::Direct,
        )
        .unwrap();
        assert_eq!(cbs.len(), 1);
        assert_eq!(cbs[0].resolved_id, "foo.children");
        assert_eq!(cbs[0].any_vals, "");
        assert_eq!(cbs[0].changed_prop_ids.get("bar.value"), Some(&ChangeType::Direct));
    }

    #[test]
    fn test_plain_output_missing_from_layout_is_not_queued() {
        let graphs = DependencyGraphs::build(vec![CallbackDefinition::new(
            vec![CallbackProperty::new("foo", "children")],
            vec![CallbackProperty::new("bar", "value")],
        )])
        .unwrap();
        let paths = Paths::compute(&json!([node(json!("bar"))]));
        let cbs = get_callbacks_by_input(
            &graphs,
            &paths,
            &ComponentId::from("bar"),
            "value",
            ChangeType::Direct,
        )
        .unwrap();
        assert!(cbs.is_empty());
    }

    #[test]
    fn test_output_less_callback_is_never_queued() {
        let graphs = DependencyGraphs::build(vec![CallbackDefinition::new(
            vec![],
            vec![CallbackProperty::new("bar", "value")],
        )])
        .unwrap();
        let paths = Paths::compute(&json!([node(json!("bar"))]));
        let cbs = get_callbacks_by_input(
            &graphs,
            &paths,
            &ComponentId::from("bar"),
            "value",
            ChangeType::Direct,
        )
        .unwrap();
        assert!(cbs.is_empty());
    }

    #[test]
    fn test_match_resolves_only_changed_instance() {
        let graphs = DependencyGraphs::build(vec![CallbackDefinition::new(
            vec![CallbackProperty::new(
                DictId::new().with("type", MATCH).with("index", MATCH),
                "children",
            )],
            vec![CallbackProperty::new(
                DictId::new().with("type", MATCH).with("index", MATCH),
                "value",
            )],
        )])
        .unwrap();
        let paths = Paths::compute(&json!([
            node(json!({"type": "a", "index": 1})),
            node(json!({"type": "a", "index": 2})),
        ]));
        let changed = ComponentId::from(item(1));
        let cbs = get_callbacks_by_input(&graphs, &paths, &changed, "value", ChangeType::Direct)
            .unwrap();
        assert_eq!(cbs.len(), 1);
        assert_eq!(cbs[0].any_vals, r#"[1,"a"]"#);
        let outs = cbs[0].flat_outputs(&paths).unwrap();
        assert_eq!(outs.len(), 1);
        assert_eq!(outs[0].id, changed);
    }

    #[test]
    fn test_all_input_runs_plain_output_once() {
        let graphs = DependencyGraphs::build(vec![CallbackDefinition::new(
            vec![CallbackProperty::new("total", "children")],
            vec![CallbackProperty::new(item(ALL), "value")],
        )])
        .unwrap();
        let paths = Paths::compute(&json!([
            node(json!("total")),
            node(json!({"type": "a", "index": 1})),
            node(json!({"type": "a", "index": 2})),
        ]));
        let cbs = get_callbacks_by_input(
            &graphs,
            &paths,
            &ComponentId::from(item(2)),
            "value",
            ChangeType::Direct,
        )
        .unwrap();
        assert_eq!(cbs.len(), 1);
        assert_eq!(cbs[0].inputs(&paths).unwrap()[0].len(), 2);
    }

    #[test]
    fn test_follow_forward_links_chain() {
        let graphs = DependencyGraphs::build(vec![
            CallbackDefinition::new(
                vec![CallbackProperty::new("b", "value")],
                vec![CallbackProperty::new("a", "value")],
            ),
            CallbackDefinition::new(
                vec![CallbackProperty::new("c", "value")],
                vec![CallbackProperty::new("b", "value")],
            ),
            CallbackDefinition::new(
                vec![CallbackProperty::new("d", "value")],
                vec![CallbackProperty::new("c", "value")],
            ),
        ])
        .unwrap();
        let paths = Paths::compute(&json!(["a", "b", "c", "d"].map(|id| node(json!(id)))));
        let first = get_callbacks_by_input(
            &graphs,
            &paths,
            &ComponentId::from("a"),
            "value",
            ChangeType::Direct,
        )
        .unwrap();
        let all = follow_forward(&graphs, &paths, first).unwrap();
        let ids: Vec<&str> = all.iter().map(|cb| cb.resolved_id.as_str()).collect();
        assert_eq!(ids, ["b.value", "c.value", "d.value"]);
        assert_eq!(all[0].blocking.len(), 2);
        assert_eq!(all[2].blocked_by.len(), 2);
        assert_eq!(all[1].changed_prop_ids.get("b.value"), Some(&ChangeType::Indirect));
    }

    #[test]
    fn test_callback_by_output_binds_match() {
        let graphs = DependencyGraphs::build(vec![CallbackDefinition::new(
            vec![CallbackProperty::new(item(MATCH), "children")],
            vec![CallbackProperty::new(item(MATCH), "value")],
        )])
        .unwrap();
        let paths = Paths::compute(&json!([node(json!({"type": "a", "index": 4}))]));
        let cb = get_callback_by_output(&graphs, &ComponentId::from(item(4)), "children")
            .unwrap()
            .unwrap();
        assert_eq!(cb.any_vals, "[4]");
        assert_eq!(cb.flat_inputs(&paths).unwrap().len(), 1);
    }
}
