//! Clientside functions registered with `#[switchyard::clientside]`.

#![cfg(feature = "macros")]

mod common;

use common::{node, prop, props};
use serde_json::{Value, json};
use switchyard::{
    CallbackDefinition, CallbackProperty, ClientsideError, ClientsideFunction, ClientsideRegistry,
    RendererBuilder, Update,
};

#[switchyard::clientside(namespace = "text")]
fn shout(args: &[Value]) -> Result<Update, ClientsideError> {
    let text = args[0].as_str().unwrap_or_default();
    Ok(Update::Value(json!(text.to_uppercase())))
}

#[switchyard::clientside(namespace = "text", name = "length")]
fn count_chars(args: &[Value]) -> Result<Update, ClientsideError> {
    let text = args[0].as_str().unwrap_or_default();
    if text.is_empty() {
        return Err(ClientsideError::PreventUpdate);
    }
    Ok(Update::Value(json!(text.chars().count())))
}

#[test]
fn test_functions_are_collected() {
    let registry = ClientsideRegistry::collected();
    assert!(registry.get(&ClientsideFunction::new("text", "shout")).is_some());
    assert!(registry.get(&ClientsideFunction::new("text", "length")).is_some());
    assert!(registry.get(&ClientsideFunction::new("text", "count_chars")).is_none());
}

#[test]
fn test_annotated_function_is_still_callable() {
    assert_eq!(shout(&[json!("hi")]).unwrap(), Update::Value(json!("HI")));
}

#[tokio::test]
async fn test_collected_functions_run_in_renderer() {
    let layout = json!([
        node("in", json!({"value": "quiet"})),
        node("loud", json!({})),
        node("size", json!({})),
    ]);
    let link = |out: &str, function: &str| {
        CallbackDefinition::new(
            vec![CallbackProperty::new(out, "children")],
            vec![CallbackProperty::new("in", "value")],
        )
        .clientside("text", function)
    };
    let mut renderer = RendererBuilder::new(layout)
        .callbacks([link("loud", "shout"), link("size", "length")])
        .clientside(ClientsideRegistry::collected())
        .build()
        .unwrap();

    renderer.hydrate().await.unwrap();
    assert_eq!(prop(&renderer, "loud", "children"), Some(json!("QUIET")));
    assert_eq!(prop(&renderer, "size", "children"), Some(json!(5)));

    renderer.update_props("in", props(json!({"value": ""}))).await.unwrap();
    assert_eq!(prop(&renderer, "loud", "children"), Some(json!("")));
    assert_eq!(prop(&renderer, "size", "children"), Some(json!(5)));
}
