#![allow(dead_code)]

use serde_json::{Map, Value, json};
use switchyard::{ComponentId, DictId, HttpResponse, Renderer};

// ============================================================================
// Layout Builders
// ============================================================================

/// A component with a plain id.
pub fn node(id: &str, props: Value) -> Value {
    component("Div", json!(id), props)
}

/// A component with an `{"type": kind, "index": index}` dict id.
pub fn item(kind: &str, index: i64, props: Value) -> Value {
    component("Item", json!({"type": kind, "index": index}), props)
}

fn component(type_name: &str, id: Value, props: Value) -> Value {
    let mut props = props;
    props["id"] = id;
    json!({"type": type_name, "namespace": "test_components", "props": props})
}

/// The dict id of an [`item`].
pub fn item_id(kind: &str, index: i64) -> ComponentId {
    ComponentId::from(DictId::new().with("type", kind).with("index", index))
}

/// Turn a JSON object into a props map.
pub fn props(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("props must be an object, got {other}"),
    }
}

// ============================================================================
// Inspection
// ============================================================================

/// Current value of a prop in the renderer's tree.
pub fn prop(renderer: &Renderer, id: impl Into<ComponentId>, property: &str) -> Option<Value> {
    let path = renderer.paths().get(&id.into())?;
    renderer.layout().prop(path, property).cloned()
}

// ============================================================================
// Server Responses
// ============================================================================

/// A single-output response body.
pub fn single(props: Value) -> HttpResponse {
    HttpResponse::json(&json!({"response": {"props": props}}))
}

/// A multi-output response body.
pub fn multi(response: Value) -> HttpResponse {
    HttpResponse::json(&json!({"multi": true, "response": response}))
}
