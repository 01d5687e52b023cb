use serde_json::Value;
use std::collections::HashMap;
use switchyard_core::{ComponentId, IdValue};

use super::{ComponentPath, PathSegment, component_id, crawl_layout};

/// A dict-id component: its values in key order and its location.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedPath {
    /// Values in sorted-key order.
    pub values: Vec<IdValue>,
    /// Location in the tree.
    pub path: ComponentPath,
}

/// Index from live component ids to their locations.
///
/// Plain ids map directly; dict ids are grouped by their key string so that
/// wildcard patterns only scan components with the same key set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paths {
    strs: HashMap<String, ComponentPath>,
    objs: HashMap<String, Vec<KeyedPath>>,
}

impl Paths {
    /// Index a whole tree.
    pub fn compute(root: &Value) -> Self {
        Self::compute_subtree(root, &[], None)
    }

    /// Index the subtree at `starting_path`, keeping entries of `old` that
    /// lie outside it.
    pub fn compute_subtree(
        sub_tree: &Value,
        starting_path: &[PathSegment],
        old: Option<&Paths>,
    ) -> Self {
        let mut paths = match old {
            Some(old) => old.without_prefix(starting_path),
            None => Paths::default(),
        };

        let mut start = starting_path.to_vec();
        crawl_layout(sub_tree, &mut start, &mut |node, path| {
            let Some(id) = component_id(node) else {
                return;
            };
            match id {
                ComponentId::Plain(s) => {
                    paths.strs.insert(s, path.to_vec());
                }
                ComponentId::Dict(d) => {
                    let Some(values) = d.concrete_values() else {
                        return;
                    };
                    paths.objs.entry(d.key_string()).or_default().push(KeyedPath {
                        values,
                        path: path.to_vec(),
                    });
                }
            }
        });
        paths
    }

    fn without_prefix(&self, prefix: &[PathSegment]) -> Self {
        let outside = |path: &ComponentPath| !path.starts_with(prefix);
        Self {
            strs: self
                .strs
                .iter()
                .filter(|(_, p)| outside(p))
                .map(|(k, p)| (k.clone(), p.clone()))
                .collect(),
            objs: self
                .objs
                .iter()
                .map(|(k, entries)| {
                    let kept = entries.iter().filter(|e| outside(&e.path)).cloned().collect();
                    (k.clone(), kept)
                })
                .collect(),
        }
    }

    /// Location of a concrete id.
    pub fn get(&self, id: &ComponentId) -> Option<&ComponentPath> {
        match id {
            ComponentId::Plain(s) => self.strs.get(s),
            ComponentId::Dict(d) => {
                let values = d.concrete_values()?;
                self.objs
                    .get(&d.key_string())?
                    .iter()
                    .find(|e| e.values == values)
                    .map(|e| &e.path)
            }
        }
    }

    /// Whether a concrete id is in the tree.
    pub fn contains(&self, id: &ComponentId) -> bool {
        self.get(id).is_some()
    }

    /// Dict-id components with the given key string.
    pub fn keyed(&self, key_string: &str) -> &[KeyedPath] {
        self.objs.get(key_string).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sorted plain ids, for error messages.
    pub fn plain_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.strs.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
