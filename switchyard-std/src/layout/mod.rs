//! The live component tree and its id index.
//!
//! The tree is plain JSON: a component is an object
//! `{"type", "namespace", "props": {"id"?, "children"?, ...}}` and `children`
//! holds a component, an array of components, or a scalar.

mod paths;

pub use paths::{KeyedPath, Paths};

use serde_json::{Map, Value};
use std::fmt;
use switchyard_core::ComponentId;

/// One step into the tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object key.
    Key(String),
    /// Array index.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(k),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Location of a component in the tree.
pub type ComponentPath = Vec<PathSegment>;

/// Path of the `children` prop of the component at `path`.
pub fn children_path(path: &[PathSegment]) -> ComponentPath {
    let mut out = path.to_vec();
    out.push(PathSegment::Key("props".to_string()));
    out.push(PathSegment::Key("children".to_string()));
    out
}

/// Visit every component of a subtree with its path.
///
/// `path` is the location of `node` and is restored before returning.
pub fn crawl_layout<F>(node: &Value, path: &mut ComponentPath, visit: &mut F)
where
    F: FnMut(&Value, &[PathSegment]),
{
    match node {
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                path.push(PathSegment::Index(i));
                crawl_layout(child, path, visit);
                path.pop();
            }
        }
        Value::Object(map) => {
            visit(node, path);
            if let Some(children) = map.get("props").and_then(|p| p.get("children")) {
                path.push(PathSegment::Key("props".to_string()));
                path.push(PathSegment::Key("children".to_string()));
                crawl_layout(children, path, visit);
                path.pop();
                path.pop();
            }
        }
        _ => {}
    }
}

/// The concrete id of a component node, if it has one.
///
/// Dict ids carrying wildcard markers are not valid component ids and are
/// ignored.
pub fn component_id(node: &Value) -> Option<ComponentId> {
    let raw = node.get("props")?.get("id")?;
    match ComponentId::from_json(raw).ok()? {
        ComponentId::Dict(d) if d.concrete_values().is_none() => None,
        id => Some(id),
    }
}

/// The live component tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    root: Value,
}

impl Layout {
    /// Wrap a tree.
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// The whole tree.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Consume into the raw tree.
    pub fn into_inner(self) -> Value {
        self.root
    }

    /// The node at `path`.
    pub fn get(&self, path: &[PathSegment]) -> Option<&Value> {
        path.iter().try_fold(&self.root, |node, segment| match segment {
            PathSegment::Key(k) => node.get(k.as_str()),
            PathSegment::Index(i) => node.get(*i),
        })
    }

    fn get_mut(&mut self, path: &[PathSegment]) -> Option<&mut Value> {
        path.iter().try_fold(&mut self.root, |node, segment| match segment {
            PathSegment::Key(k) => node.get_mut(k.as_str()),
            PathSegment::Index(i) => node.get_mut(*i),
        })
    }

    /// A prop of the component at `path`.
    pub fn prop(&self, path: &[PathSegment], property: &str) -> Option<&Value> {
        self.get(path)?.get("props")?.get(property)
    }

    /// Merge props into the component at `path`.
    ///
    /// Returns `false` when there is no component at `path`.
    pub fn merge_props(&mut self, path: &[PathSegment], props: &Map<String, Value>) -> bool {
        let Some(Value::Object(component)) = self.get_mut(path) else {
            return false;
        };
        let target = component
            .entry("props")
            .or_insert_with(|| Value::Object(Map::new()));
        if !target.is_object() {
            *target = Value::Object(Map::new());
        }
        if let Value::Object(existing) = target {
            for (key, value) in props {
                existing.insert(key.clone(), value.clone());
            }
        }
        true
    }
}

impl From<Value> for Layout {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> Value {
        json!({
            "type": "Div", "namespace": "html",
            "props": {"id": "root", "children": [
                {"type": "Input", "namespace": "core", "props": {"id": "a", "value": 1}},
                "text",
                {"type": "Div", "namespace": "html", "props": {"children":
                    {"type": "Input", "namespace": "core", "props": {"id": {"index": 2}}}
                }}
            ]}
        })
    }

    #[test]
    fn test_crawl_visits_components() {
        let root = tree();
        let mut seen = Vec::new();
        crawl_layout(&root, &mut Vec::new(), &mut |node, path| {
            seen.push((component_id(node).map(|id| id.stringify()), path.len()));
        });
        assert_eq!(
            seen,
            vec![
                (Some("root".to_string()), 0),
                (Some("a".to_string()), 3),
                (None, 3),
                (Some(r#"{"index":2}"#.to_string()), 5),
            ]
        );
    }

    #[test]
    fn test_merge_props() {
        let mut layout = Layout::new(tree());
        let path = vec![
            PathSegment::Key("props".into()),
            PathSegment::Key("children".into()),
            PathSegment::Index(0),
        ];
        let mut props = Map::new();
        props.insert("value".into(), json!(5));
        assert!(layout.merge_props(&path, &props));
        assert_eq!(layout.prop(&path, "value"), Some(&json!(5)));
        assert!(!layout.merge_props(&[PathSegment::Key("nope".into())], &props));
    }
}
