//! Building the request payload of a callback instance.

use serde::Serialize;
use serde_json::{Map, Value, json};
use switchyard_core::{CallbackProperty, ComponentId, DepRole, combine_id_and_prop};
use thiserror::Error;

use crate::layout::{Layout, Paths};
use crate::resolve::{ResolveError, ResolvedCallback, ResolvedProp};

/// A required id did not resolve to exactly one live component.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ReferenceError {
    /// Explanation naming the dangling or ambiguous id.
    pub message: String,
}

/// Payload construction failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Dangling or ambiguous id.
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    /// Wildcard resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// The value of one concrete prop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropValue {
    /// Component id.
    pub id: ComponentId,
    /// Property name.
    pub property: String,
    /// Current value; absent when the prop is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// One input or state argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    /// A single component.
    Single(PropValue),
    /// Every component a multi-valued id resolved to.
    Multi(Vec<PropValue>),
}

impl ArgValue {
    /// Positional argument of a clientside function.
    pub fn flat_value(&self) -> Value {
        match self {
            ArgValue::Single(p) => p.value.clone().unwrap_or(Value::Null),
            ArgValue::Multi(items) => Value::Array(
                items
                    .iter()
                    .map(|p| p.value.clone().unwrap_or(Value::Null))
                    .collect(),
            ),
        }
    }
}

/// A concrete output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRef {
    /// Component id.
    pub id: ComponentId,
    /// Property name.
    pub property: String,
}

/// One declared output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutputSlot {
    /// A single component.
    Single(OutputRef),
    /// Every component a multi-valued id resolved to.
    Multi(Vec<OutputRef>),
}

/// Everything sent to the server or passed to a clientside function.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackPayload {
    /// Output signature.
    pub output: String,
    /// Whether the callback declares several outputs.
    pub multi: bool,
    /// Concrete outputs per declared output.
    pub outputs: Vec<OutputSlot>,
    /// Input values.
    pub inputs: Vec<ArgValue>,
    /// State values; `None` when the callback declares no state.
    pub state: Option<Vec<ArgValue>>,
    /// Props whose change triggered the call.
    pub changed_prop_ids: Vec<String>,
}

impl CallbackPayload {
    /// Request body of the update endpoint.
    pub fn to_json(&self) -> Value {
        let outputs = if self.multi {
            json!(self.outputs)
        } else {
            self.outputs.first().map(|o| json!(o)).unwrap_or(Value::Null)
        };
        let mut body = Map::new();
        body.insert("output".to_string(), Value::String(self.output.clone()));
        body.insert("outputs".to_string(), outputs);
        body.insert("inputs".to_string(), json!(self.inputs));
        body.insert("changedPropIds".to_string(), json!(self.changed_prop_ids));
        if let Some(state) = &self.state {
            body.insert("state".to_string(), json!(state));
        }
        Value::Object(body)
    }

    /// Flattened `id.prop` of every concrete output.
    pub fn output_ids(&self) -> Vec<String> {
        self.outputs
            .iter()
            .flat_map(|slot| match slot {
                OutputSlot::Single(output) => std::slice::from_ref(output),
                OutputSlot::Multi(outputs) => outputs.as_slice(),
            })
            .map(|output| combine_id_and_prop(&output.id, &output.property))
            .collect()
    }
}

/// Outcome of payload construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    /// Ready to dispatch.
    Ready(CallbackPayload),
    /// Nothing to do: the inputs or outputs are simply not in the tree.
    Prevented,
}

/// Resolve a callback instance against the tree and collect its values.
///
/// Missing components are not always errors: when every input is missing,
/// or every output is, the call is silently prevented. Anything in between
/// is a [`ReferenceError`].
pub fn prepare_payload(
    cb: &ResolvedCallback,
    layout: &Layout,
    paths: &Paths,
) -> Result<Prepared, PayloadError> {
    let def = &cb.callback;

    let resolved_outputs = cb.outputs(paths)?;
    let mut outputs = Vec::with_capacity(resolved_outputs.len());
    let mut output_errors = Vec::new();
    for (spec, resolved) in def.outputs().iter().zip(&resolved_outputs) {
        let refs: Vec<OutputRef> = resolved
            .iter()
            .map(|p| OutputRef {
                id: p.id.clone(),
                property: p.property.clone(),
            })
            .collect();
        if spec.is_multi_valued() {
            outputs.push(OutputSlot::Multi(refs));
            continue;
        }
        match <[OutputRef; 1]>::try_from(refs) {
            Ok([only]) => outputs.push(OutputSlot::Single(only)),
            Err(refs) => output_errors.push(reference_message(spec, &cb.any_vals, refs.len(), DepRole::Output, paths)),
        }
    }
    if let Some(message) = output_errors.into_iter().next() {
        if resolved_outputs.iter().all(Vec::is_empty) {
            return Ok(Prepared::Prevented);
        }
        return Err(ReferenceError { message }.into());
    }

    let Some(inputs) = fill_vals(cb, layout, paths, DepRole::Input, true)? else {
        return Ok(Prepared::Prevented);
    };
    let state = if def.state().is_empty() {
        None
    } else {
        fill_vals(cb, layout, paths, DepRole::State, false)?
    };

    Ok(Prepared::Ready(CallbackPayload {
        output: def.output().to_string(),
        multi: def.is_multi_output(),
        outputs,
        inputs,
        state,
        changed_prop_ids: cb.changed_prop_ids.keys().cloned().collect(),
    }))
}

fn fill_vals(
    cb: &ResolvedCallback,
    layout: &Layout,
    paths: &Paths,
    role: DepRole,
    allow_all_missing: bool,
) -> Result<Option<Vec<ArgValue>>, PayloadError> {
    let specs = cb.callback.args(role);
    let resolved = cb.resolve_role(paths, role)?;

    let mut args = Vec::with_capacity(specs.len());
    let mut errors = Vec::new();
    let mut empty_multi = 0;
    for (spec, props) in specs.iter().zip(resolved) {
        let values: Vec<PropValue> = props.iter().map(|p| prop_value(layout, p)).collect();
        if spec.is_multi_valued() {
            if values.is_empty() {
                empty_multi += 1;
            }
            args.push(ArgValue::Multi(values));
            continue;
        }
        match <[PropValue; 1]>::try_from(values) {
            Ok([only]) => args.push(ArgValue::Single(only)),
            Err(values) => errors.push(reference_message(spec, &cb.any_vals, values.len(), role, paths)),
        }
    }

    if let Some(message) = errors.first() {
        if allow_all_missing && errors.len() + empty_multi == specs.len() {
            return Ok(None);
        }
        return Err(ReferenceError {
            message: message.clone(),
        }
        .into());
    }
    Ok(Some(args))
}

fn prop_value(layout: &Layout, prop: &ResolvedProp) -> PropValue {
    PropValue {
        id: prop.id.clone(),
        property: prop.property.clone(),
        value: layout.prop(&prop.path, &prop.property).cloned(),
    }
}

fn reference_message(
    spec: &CallbackProperty,
    any_vals: &str,
    found: usize,
    role: DepRole,
    paths: &Paths,
) -> String {
    let id = spec.id.stringify();
    let id = if any_vals.is_empty() { id } else { format!("{id}@{any_vals}") };
    if found == 0 {
        let known = paths.plain_ids().join(", ");
        format!(
            "A nonexistent object was used in an `{role}` of a callback. \
             The id of this object is `{id}` and the property is `{}`. \
             The string ids in the current layout are: [{known}]",
            spec.property
        )
    } else {
        format!(
            "Multiple objects were found for an `{role}` of a callback that only takes one value. \
             The id spec is `{id}` and the property is `{}`. \
             The objects we found are: {found}",
            spec.property
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DependencyGraphs;
    use crate::resolve::{ChangeType, get_callbacks_by_input};
    use switchyard_core::{CallbackDefinition, CallbackProperty};

    fn setup(root: Value) -> (DependencyGraphs, Layout, Paths) {
        let graphs = DependencyGraphs::build(vec![CallbackDefinition::new(
            vec![CallbackProperty::new("out", "children")],
            vec![CallbackProperty::new("a", "value"), CallbackProperty::new("b", "value")],
        )
        .with_state(vec![CallbackProperty::new("s", "data")])])
        .unwrap();
        let paths = Paths::compute(&root);
        (graphs, Layout::new(root), paths)
    }

    fn node(id: &str, props: Value) -> Value {
        let mut props = props;
        props["id"] = json!(id);
        json!({"type": "X", "props": props})
    }

    fn prepare(root: Value) -> Result<Prepared, PayloadError> {
        let (graphs, layout, paths) = setup(root);
        let cb = get_callbacks_by_input(&graphs, &paths, &ComponentId::from("a"), "value", ChangeType::Direct)
            .unwrap()
            .remove(0);
        prepare_payload(&cb, &layout, &paths)
    }

    #[test]
    fn test_payload_body() {
        let root = json!([
            node("out", json!({})),
            node("a", json!({"value": 1})),
            node("b", json!({})),
            node("s", json!({"data": [1, 2]})),
        ]);
        let Prepared::Ready(payload) = prepare(root).unwrap() else {
            panic!("expected a payload");
        };
        assert_eq!(
            payload.to_json(),
            json!({
                "output": "out.children",
                "outputs": {"id": "out", "property": "children"},
                "inputs": [
                    {"id": "a", "property": "value", "value": 1},
                    {"id": "b", "property": "value"}
                ],
                "changedPropIds": ["a.value"],
                "state": [{"id": "s", "property": "data", "value": [1, 2]}]
            })
        );
    }

    #[test]
    fn test_all_inputs_missing_is_prevented() {
        let root = json!([node("out", json!({})), node("s", json!({}))]);
        assert_eq!(prepare(root).unwrap(), Prepared::Prevented);
    }

    #[test]
    fn test_missing_output_is_prevented() {
        let root = json!([node("a", json!({})), node("b", json!({})), node("s", json!({}))]);
        assert_eq!(prepare(root).unwrap(), Prepared::Prevented);
    }

    #[test]
    fn test_partially_missing_inputs_is_reference_error() {
        let root = json!([node("out", json!({})), node("a", json!({})), node("s", json!({}))]);
        let err = prepare(root).unwrap_err();
        let PayloadError::Reference(err) = err else {
            panic!("expected a reference error");
        };
        assert!(err.message.contains("The id of this object is `b`"));
        assert!(err.message.contains("[a, out, s]"));
    }
}
