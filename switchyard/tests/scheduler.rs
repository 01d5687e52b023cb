//! End-to-end scheduling: dispatch, ordering, failures and staleness.

mod common;

use common::{item, item_id, node, prop, props, single};
use futures::StreamExt;
use serde_json::{Value, json};
use switchyard::testing::{
    ManualTransport, MockTransport, RecordingErrorSink, RecordingObserver, RecordingReadiness,
};
use switchyard::{
    CallbackDefinition, CallbackProperty, ClientsideError, ClientsideRegistry, ComponentId,
    DictId, ErrorKind, HttpResponse, MATCH, RendererBuilder, RendererConfig, SwitchyardError,
    Update,
};

fn link(out: &str, input: &str) -> CallbackDefinition {
    CallbackDefinition::new(
        vec![CallbackProperty::new(out, "value")],
        vec![CallbackProperty::new(input, "value")],
    )
}

/// Answers every request by copying the first input value to the output.
fn echo() -> MockTransport {
    MockTransport::new(|request| Ok(single(json!({"value": request.body["inputs"][0]["value"]}))))
}

fn increments() -> ClientsideRegistry {
    ClientsideRegistry::new().register(
        "inc",
        "one",
        |args: &[Value]| -> Result<Update, ClientsideError> {
            Ok(Update::Value(json!(args[0].as_i64().unwrap_or(0) + 1)))
        },
    )
}

#[tokio::test]
async fn test_server_round_trip() {
    let transport = echo();
    let layout = json!([node("in", json!({"value": "x"})), node("out", json!({}))]);
    let mut renderer = RendererBuilder::new(layout)
        .callback(link("out", "in"))
        .transport(transport.clone())
        .build()
        .unwrap();

    let stats = renderer.hydrate().await.unwrap();
    assert_eq!(stats.dispatched, 1);
    assert_eq!(prop(&renderer, "out", "value"), Some(json!("x")));

    renderer
        .update_props("in", props(json!({"value": "y"})))
        .await
        .unwrap();
    assert_eq!(prop(&renderer, "out", "value"), Some(json!("y")));

    let bodies = transport.bodies();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["changedPropIds"], json!([]));
    assert_eq!(bodies[1]["changedPropIds"], json!(["in.value"]));
}

#[tokio::test]
async fn test_request_path_prefix() {
    let transport = echo();
    let layout = json!([node("in", json!({"value": 1})), node("out", json!({}))]);
    let mut renderer = RendererBuilder::new(layout)
        .callback(link("out", "in"))
        .config(RendererConfig::default().requests_pathname_prefix("/app/"))
        .transport(transport.clone())
        .build()
        .unwrap();

    renderer.hydrate().await.unwrap();
    assert_eq!(transport.requests()[0].url, "/app/_dash-update-component");
}

#[tokio::test]
async fn test_idle_run_is_a_no_op() {
    let transport = echo();
    let layout = json!([node("in", json!({"value": 1})), node("out", json!({"value": 0}))]);
    let mut renderer = RendererBuilder::new(layout.clone())
        .callback(link("out", "in"))
        .transport(transport.clone())
        .build()
        .unwrap();

    let stats = renderer.run_until_idle().await;
    assert_eq!(stats.dispatched, 0);
    assert_eq!(transport.count(), 0);
    assert_eq!(renderer.layout().root(), &layout);

    renderer.update_props("in", props(json!({}))).await.unwrap();
    assert_eq!(transport.count(), 0);
    assert_eq!(renderer.layout().root(), &layout);
}

#[tokio::test]
async fn test_blocked_callback_waits_for_its_producer() {
    let transport = echo();
    let observer = RecordingObserver::new();
    let layout = json!([
        node("a", json!({"value": 1})),
        node("b", json!({})),
        node("c", json!({})),
        node("d", json!({})),
    ]);
    let mut renderer = RendererBuilder::new(layout)
        .callbacks([link("b", "a"), link("c", "b"), link("d", "a")])
        .transport(transport)
        .observer(observer.clone())
        .build()
        .unwrap();

    let stats = renderer.hydrate().await.unwrap();
    assert_eq!(stats.dispatched, 3);
    let outputs = observer.outputs();
    assert_eq!(outputs.len(), 3);
    assert_eq!(outputs[2], "c.value");
    assert_eq!(prop(&renderer, "c", "value"), Some(json!(1)));
    assert_eq!(prop(&renderer, "d", "value"), Some(json!(1)));
}

#[tokio::test]
async fn test_prevent_update_prunes_downstream() {
    let transport = MockTransport::always(204, "");
    let layout = json!([
        node("a", json!({"value": 1})),
        node("b", json!({"value": 5})),
        node("c", json!({})),
    ]);
    let mut renderer = RendererBuilder::new(layout)
        .callbacks([link("b", "a"), link("c", "b").clientside("inc", "one")])
        .transport(transport.clone())
        .clientside(increments())
        .build()
        .unwrap();

    let stats = renderer.hydrate().await.unwrap();
    assert_eq!(stats.dispatched, 1);
    assert_eq!(stats.errors, 0);
    assert_eq!(transport.count(), 1);
    assert_eq!(prop(&renderer, "b", "value"), Some(json!(5)));
    assert_eq!(prop(&renderer, "c", "value"), None);
    assert!(renderer.pending().is_empty());
}

#[tokio::test]
async fn test_prevent_update_prunes_branches() {
    let transport = MockTransport::always(204, "");
    let layout = json!([
        node("a", json!({"value": 1})),
        node("b", json!({"value": 5})),
        node("d", json!({})),
    ]);
    let mut renderer = RendererBuilder::new(layout)
        .callbacks([link("b", "a"), link("c", "b"), link("d", "b")].map(|cb| cb.prevent_initial_call(true)))
        .transport(transport.clone())
        .build()
        .unwrap();

    let stats = renderer.hydrate().await.unwrap();
    assert_eq!(stats.dispatched, 0);

    renderer
        .update_props("a", props(json!({"value": 2})))
        .await
        .unwrap();
    assert_eq!(transport.count(), 1);
    assert_eq!(transport.bodies()[0]["output"], json!("b.value"));
    assert_eq!(prop(&renderer, "b", "value"), Some(json!(5)));
    assert_eq!(prop(&renderer, "d", "value"), None);
    assert!(renderer.pending().is_empty());
}

#[tokio::test]
async fn test_prevent_update_prunes_sibling_orphans() {
    let transport = MockTransport::always(204, "");
    let layout = json!([
        node("a", json!({"value": 1})),
        node("b", json!({"value": 5})),
        node("c", json!({})),
        node("d", json!({})),
        node("e", json!({})),
    ]);
    let mut renderer = RendererBuilder::new(layout)
        .callbacks(
            [link("b", "a"), link("c", "b"), link("d", "b"), link("e", "d")]
                .map(|cb| cb.prevent_initial_call(true)),
        )
        .transport(transport.clone())
        .build()
        .unwrap();

    renderer.hydrate().await.unwrap();
    renderer
        .update_props("a", props(json!({"value": 2})))
        .await
        .unwrap();
    assert_eq!(transport.count(), 1);
    for id in ["c", "d", "e"] {
        assert_eq!(prop(&renderer, id, "value"), None, "{id}");
    }
    assert!(renderer.pending().is_empty());
}

#[tokio::test]
async fn test_output_less_callback_never_dispatches() {
    let transport = echo();
    let layout = json!([node("in", json!({"value": 1})), node("out", json!({}))]);
    let mut renderer = RendererBuilder::new(layout)
        .callbacks([
            CallbackDefinition::new(Vec::new(), vec![CallbackProperty::new("in", "value")]),
            link("out", "in"),
        ])
        .transport(transport.clone())
        .build()
        .unwrap();

    renderer.hydrate().await.unwrap();
    renderer
        .update_props("in", props(json!({"value": 2})))
        .await
        .unwrap();
    let outputs: Vec<Value> = transport.bodies().into_iter().map(|b| b["output"].clone()).collect();
    assert_eq!(outputs, [json!("out.value"), json!("out.value")]);
    assert_eq!(prop(&renderer, "out", "value"), Some(json!(2)));
    assert!(renderer.pending().is_empty());
}

#[tokio::test]
async fn test_no_update_slot_is_skipped() {
    let registry = ClientsideRegistry::new()
        .register(
            "split",
            "first",
            |args: &[Value]| -> Result<Update, ClientsideError> {
                Ok(Update::Many(vec![Update::Value(args[0].clone()), Update::NoUpdate]))
            },
        )
        .register(
            "inc",
            "one",
            |args: &[Value]| -> Result<Update, ClientsideError> {
                Ok(Update::Value(json!(args[0].as_i64().unwrap_or(0) + 1)))
            },
        );
    let layout = json!([
        node("in", json!({"value": 3})),
        node("x", json!({})),
        node("y", json!({"value": "kept"})),
        node("z", json!({})),
    ]);
    let mut renderer = RendererBuilder::new(layout)
        .callbacks([
            CallbackDefinition::new(
                vec![CallbackProperty::new("x", "value"), CallbackProperty::new("y", "value")],
                vec![CallbackProperty::new("in", "value")],
            )
            .clientside("split", "first"),
            link("z", "y").clientside("inc", "one"),
        ])
        .clientside(registry)
        .build()
        .unwrap();

    renderer.hydrate().await.unwrap();
    assert_eq!(prop(&renderer, "x", "value"), Some(json!(3)));
    assert_eq!(prop(&renderer, "y", "value"), Some(json!("kept")));
    assert_eq!(prop(&renderer, "z", "value"), None);
}

#[tokio::test]
async fn test_stale_response_is_dropped() {
    let (transport, mut requests) = ManualTransport::new();
    let layout = json!([node("a", json!({"value": 1})), node("b", json!({}))]);
    let mut renderer = RendererBuilder::new(layout)
        .callback(link("b", "a"))
        .transport(transport)
        .build()
        .unwrap();
    let handle = renderer.handle();

    let server = async move {
        let first = requests.next().await.unwrap();
        handle
            .update_props("a", props(json!({"value": 2})))
            .unwrap();
        let second = requests.next().await.unwrap();
        assert_eq!(second.request.body["inputs"][0]["value"], json!(2));
        first.respond(single(json!({"value": "stale"})));
        second.respond(single(json!({"value": "fresh"})));
    };
    let (stats, ()) = futures::join!(renderer.hydrate(), server);

    let stats = stats.unwrap();
    assert_eq!(stats.stale, 1);
    assert_eq!(stats.dispatched, 2);
    assert_eq!(prop(&renderer, "b", "value"), Some(json!("fresh")));
    assert!(renderer.pending().is_empty());
}

#[tokio::test]
async fn test_reference_error_is_reported() {
    let sink = RecordingErrorSink::new();
    let transport = echo();
    let layout = json!([node("out", json!({})), node("a", json!({"value": 1}))]);
    let definition = CallbackDefinition::new(
        vec![CallbackProperty::new("out", "value")],
        vec![CallbackProperty::new("a", "value"), CallbackProperty::new("b", "value")],
    );
    let mut renderer = RendererBuilder::new(layout)
        .callback(definition)
        .transport(transport.clone())
        .error_sink(sink.clone())
        .build()
        .unwrap();

    let stats = renderer.hydrate().await.unwrap();
    assert_eq!(stats.errors, 1);
    assert_eq!(transport.count(), 0);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ErrorKind::FrontEnd);
    assert!(events[0].message.starts_with("A nonexistent object was used in an `Input`"));
    assert_eq!(
        events[0].html.as_deref(),
        Some("In the callback for output(s):\n  out.value")
    );
    assert!(renderer.pending().is_empty());
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let sink = RecordingErrorSink::new();
    let layout = json!([node("in", json!({"value": 1})), node("out", json!({}))]);
    let mut renderer = RendererBuilder::new(layout)
        .callback(link("out", "in"))
        .transport(MockTransport::always(500, "<pre>boom</pre>"))
        .error_sink(sink.clone())
        .build()
        .unwrap();

    let stats = renderer.hydrate().await.unwrap();
    assert_eq!(stats.errors, 1);
    let events = sink.events();
    assert_eq!(events[0].kind, ErrorKind::BackEnd);
    assert_eq!(events[0].message, "Callback error updating out.value");
    assert_eq!(events[0].html.as_deref(), Some("<pre>boom</pre>"));
    assert_eq!(prop(&renderer, "out", "value"), None);
}

#[tokio::test]
async fn test_missing_clientside_function_is_reported() {
    let sink = RecordingErrorSink::new();
    let layout = json!([node("in", json!({"value": 1})), node("out", json!({}))]);
    let mut renderer = RendererBuilder::new(layout)
        .callback(link("out", "in").clientside("nowhere", "nothing"))
        .error_sink(sink.clone())
        .build()
        .unwrap();

    let stats = renderer.hydrate().await.unwrap();
    assert_eq!(stats.errors, 1);
    assert_eq!(sink.events()[0].kind, ErrorKind::FrontEnd);
    assert!(renderer.pending().is_empty());
}

#[tokio::test]
async fn test_prevent_initial_call() {
    let transport = echo();
    let layout = json!([node("in", json!({"value": 1})), node("out", json!({}))]);
    let mut renderer = RendererBuilder::new(layout)
        .callback(link("out", "in").prevent_initial_call(true))
        .transport(transport.clone())
        .build()
        .unwrap();

    let stats = renderer.hydrate().await.unwrap();
    assert_eq!(stats.dispatched, 0);
    assert_eq!(prop(&renderer, "out", "value"), None);

    renderer.update_props("in", props(json!({"value": 2}))).await.unwrap();
    assert_eq!(transport.count(), 1);
    assert_eq!(prop(&renderer, "out", "value"), Some(json!(2)));
}

#[tokio::test]
async fn test_new_children_bring_their_callbacks() {
    let registry = ClientsideRegistry::new().register(
        "math",
        "double",
        |args: &[Value]| -> Result<Update, ClientsideError> {
            Ok(Update::Value(json!(args[0].as_i64().unwrap_or(0) * 2)))
        },
    );
    let pattern = |kind: &str| ComponentId::from(DictId::new().with("type", kind).with("index", MATCH));
    let layout = json!([node("container", json!({"children": []}))]);
    let mut renderer = RendererBuilder::new(layout)
        .callback(
            CallbackDefinition::new(
                vec![CallbackProperty::new(pattern("label"), "children")],
                vec![CallbackProperty::new(pattern("row"), "value")],
            )
            .clientside("math", "double"),
        )
        .clientside(registry)
        .build()
        .unwrap();

    assert_eq!(renderer.hydrate().await.unwrap().dispatched, 0);

    let children = json!([item("row", 0, json!({"value": 4})), item("label", 0, json!({}))]);
    renderer
        .update_props("container", props(json!({ "children": children })))
        .await
        .unwrap();
    assert!(renderer.paths().contains(&item_id("row", 0)));
    assert_eq!(prop(&renderer, item_id("label", 0), "children"), Some(json!(8)));
}

#[tokio::test]
async fn test_readiness_sees_every_component() {
    let readiness = RecordingReadiness::new();
    let layout = json!([node("in", json!({"value": 1})), node("out", json!({}))]);
    let mut renderer = RendererBuilder::new(layout)
        .callback(link("out", "in"))
        .transport(echo())
        .readiness(readiness.clone())
        .build()
        .unwrap();

    renderer.hydrate().await.unwrap();
    let batches = readiness.batches();
    assert_eq!(batches.len(), 1);
    let ids: Vec<String> = batches[0].iter().map(|t| t.id.stringify()).collect();
    assert_eq!(ids, ["out", "in"]);
    assert_eq!(batches[0][0].component_type.as_deref(), Some("Div"));
    assert_eq!(batches[0][0].namespace.as_deref(), Some("test_components"));
}

#[tokio::test]
async fn test_round_limit_drops_pending() {
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
        .clientside(increments())
        .config(RendererConfig::default().max_rounds(1))
        .build()
        .unwrap();

    let stats = renderer.hydrate().await.unwrap();
    assert_eq!(stats.dispatched, 1);
    assert_eq!(prop(&renderer, "b", "value"), Some(json!(2)));
    assert_eq!(prop(&renderer, "c", "value"), None);
    assert!(renderer.pending().is_empty());
}

#[tokio::test]
async fn test_replace_callbacks() {
    let transport = echo();
    let layout = json!([node("in", json!({"value": 1})), node("out", json!({}))]);
    let mut renderer = RendererBuilder::new(layout)
        .transport(transport.clone())
        .build()
        .unwrap();

    renderer.update_props("in", props(json!({"value": 2}))).await.unwrap();
    assert_eq!(transport.count(), 0);

    renderer.replace_callbacks(vec![link("out", "in")]).unwrap();
    renderer.update_props("in", props(json!({"value": 3}))).await.unwrap();
    assert_eq!(prop(&renderer, "out", "value"), Some(json!(3)));

    let err = renderer
        .replace_callbacks(vec![link("in", "out"), link("out", "in")])
        .unwrap_err();
    assert!(matches!(err, SwitchyardError::Graph(_)));
    assert_eq!(renderer.graphs().callbacks().len(), 1);
}

#[tokio::test]
async fn test_handle_outlives_renderer() {
    let renderer = RendererBuilder::new(json!([])).build().unwrap();
    let handle = renderer.handle();
    drop(renderer);
    let err = handle.update_props("a", props(json!({"value": 1}))).unwrap_err();
    assert!(matches!(err, SwitchyardError::Closed));
}

#[test]
fn test_http_status_helpers() {
    assert!(!HttpResponse::new(204, "").is_success());
}
