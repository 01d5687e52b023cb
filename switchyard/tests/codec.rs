//! Wire forms: ids, output signatures, callback specs and payloads.

mod common;

use common::{item_id, node};
use serde_json::json;
use switchyard::{
    ALL, CallbackDefinition, CallbackProperty, CallbackSpec, ComponentId, DictId, MATCH,
    combine_id_and_prop, split_id_and_prop,
};
use switchyard::testing::{MockTransport, RecordingObserver};
use switchyard::{HttpResponse, RendererBuilder};

#[test]
fn test_dict_id_stringify_sorts_keys() {
    let id = item_id("row", 3);
    assert_eq!(id.stringify(), r#"{"index":3,"type":"row"}"#);
    assert_eq!(ComponentId::parse(&id.stringify()).unwrap(), id);
}

#[test]
fn test_wildcards_stringify_bare() {
    let id = ComponentId::from(DictId::new().with("type", "row").with("index", MATCH));
    assert_eq!(id.stringify(), r#"{"index":MATCH,"type":"row"}"#);
    assert_eq!(id.to_json(), json!({"index": ["MATCH"], "type": "row"}));
}

#[test]
fn test_split_on_last_dot() {
    let combined = combine_id_and_prop(&item_id("row", 1), "value");
    let (id, prop) = split_id_and_prop(&combined).unwrap();
    assert_eq!(id, item_id("row", 1));
    assert_eq!(prop, "value");

    let (id, prop) = split_id_and_prop("a.b.children").unwrap();
    assert_eq!(id, ComponentId::from("a.b"));
    assert_eq!(prop, "children");
}

#[test]
fn test_output_signature() {
    let single = CallbackDefinition::new(
        vec![CallbackProperty::new("out", "children")],
        vec![CallbackProperty::new("in", "value")],
    );
    assert_eq!(single.output(), "out.children");
    assert!(!single.is_multi_output());

    let many = CallbackDefinition::new(
        vec![
            CallbackProperty::new("a", "children"),
            CallbackProperty::new(DictId::new().with("type", "row").with("index", ALL), "value"),
        ],
        vec![CallbackProperty::new("in", "value")],
    );
    assert_eq!(
        many.output(),
        r#"..a.children...{"index":["ALL"],"type":"row"}.value.."#
    );
    assert_eq!(many.outputs_label(), r#"a.children, {"index":["ALL"],"type":"row"}.value"#);
}

#[test]
fn test_spec_from_json() {
    let spec: CallbackSpec = serde_json::from_value(json!({
        "output": "..total.children...count.children..",
        "inputs": [{"id": {"type": "row", "index": ["ALL"]}, "property": "value"}],
        "state": [{"id": "unit", "property": "value"}],
        "clientside_function": {"namespace": "sums", "function_name": "total"},
        "prevent_initial_call": true
    }))
    .unwrap();
    let def = CallbackDefinition::from_spec(&spec).unwrap();
    assert_eq!(def.outputs().len(), 2);
    assert_eq!(def.outputs()[1].combined(), "count.children");
    assert!(def.inputs()[0].is_multi_valued());
    assert_eq!(def.state()[0].combined(), "unit.value");
    assert_eq!(def.clientside_function().unwrap().function_name, "total");
    assert!(def.prevents_initial_call());
}

#[test]
fn test_spec_with_bad_id_is_reported() {
    let spec: CallbackSpec = serde_json::from_value(json!({
        "output": "out.children",
        "inputs": [{"id": {"type": "row", "index": ["EVERY"]}, "property": "value"}]
    }))
    .unwrap();
    let issues = CallbackDefinition::from_spec(&spec).unwrap_err();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].message, "Callback wildcard ID error");
}

#[tokio::test]
async fn test_request_body_of_multi_output() {
    let transport = MockTransport::always(
        200,
        json!({"multi": true, "response": {"a": {"children": 1}, "b": {"children": 2}}}).to_string(),
    );
    let observer = RecordingObserver::new();
    let layout = json!([
        node("in", json!({"value": "x"})),
        node("keep", json!({"value": "k"})),
        node("a", json!({})),
        node("b", json!({})),
    ]);
    let mut renderer = RendererBuilder::new(layout)
        .callback(
            CallbackDefinition::new(
                vec![CallbackProperty::new("a", "children"), CallbackProperty::new("b", "children")],
                vec![CallbackProperty::new("in", "value")],
            )
            .with_state(vec![CallbackProperty::new("keep", "value")]),
        )
        .transport(transport.clone())
        .observer(observer.clone())
        .build()
        .unwrap();

    renderer.hydrate().await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "/_dash-update-component");
    assert_eq!(
        requests[0].body,
        json!({
            "output": "..a.children...b.children..",
            "outputs": [
                {"id": "a", "property": "children"},
                {"id": "b", "property": "children"}
            ],
            "inputs": [{"id": "in", "property": "value", "value": "x"}],
            "changedPropIds": [],
            "state": [{"id": "keep", "property": "value", "value": "k"}]
        })
    );
    assert_eq!(observer.responses().len(), 1);
    assert_eq!(common::prop(&renderer, "b", "children"), Some(json!(2)));
}

#[test]
fn test_http_response_json() {
    let response = HttpResponse::json(&json!({"response": {"props": {}}}));
    assert_eq!(response.status, 200);
    assert!(response.is_success());
}
