//! Value universes of wildcard keys.
//!
//! Wildcard outputs are expanded into concrete ids for cycle detection
//! before any component exists. The universe of a key is every concrete
//! value seen for it across all callbacks, bracketed by synthetic values for
//! each `ALLSMALLER` usage so that "strictly smaller" always has something
//! to bind to.

use std::collections::BTreeMap;
use switchyard_core::{CallbackDefinition, DictId, IdValue, PatternValue, Wildcard, id_val_sort};

#[derive(Debug, Clone, Default)]
struct KeyUniverse {
    exact: Vec<IdValue>,
    expand: usize,
    vals: Vec<IdValue>,
}

/// Per-key value universes.
#[derive(Debug, Clone, Default)]
pub struct WildcardPlaceholders {
    keys: BTreeMap<String, KeyUniverse>,
}

impl WildcardPlaceholders {
    /// Collect the universes of every dict id in outputs, inputs and state.
    pub fn collect<'a, I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = &'a CallbackDefinition>,
    {
        let mut placeholders = Self::default();
        for def in definitions {
            let args = def.outputs().iter().chain(def.inputs()).chain(def.state());
            for prop in args {
                if let Some(dict) = prop.id.as_dict() {
                    placeholders.observe(dict);
                }
            }
        }
        placeholders.finalize();
        placeholders
    }

    fn observe(&mut self, id: &DictId) {
        for (key, value) in id.iter() {
            let universe = self.keys.entry(key.to_string()).or_default();
            match value {
                PatternValue::Exact(v) => {
                    if !universe.exact.contains(v) {
                        universe.exact.push(v.clone());
                    }
                }
                PatternValue::Wild(Wildcard::AllSmaller) => universe.expand += 1,
                PatternValue::Wild(_) => {}
            }
        }
    }

    fn finalize(&mut self) {
        for universe in self.keys.values_mut() {
            let mut vals = universe.exact.clone();
            vals.sort_by(id_val_sort);
            for i in 0..universe.expand {
                match (vals.first(), vals.last()) {
                    (Some(first), Some(last)) if !universe.exact.is_empty() => {
                        let (before, after) = (first.before(), last.after());
                        vals.insert(0, before);
                        vals.push(after);
                    }
                    _ => vals.push(IdValue::from(i)),
                }
            }
            if universe.expand == 0 && universe.exact.is_empty() {
                vals.push(IdValue::from(0));
            }
            universe.vals = vals;
        }
    }

    /// The sorted universe of a key.
    pub fn values(&self, key: &str) -> &[IdValue] {
        self.keys.get(key).map(|u| u.vals.as_slice()).unwrap_or(&[])
    }

    /// Expand a pattern into every concrete id it can reach.
    ///
    /// `bound` supplies the values other wildcards are relative to: `MATCH`
    /// keeps the bound value, `ALLSMALLER` takes every value before it.
    pub fn make_all_ids(&self, pattern: &DictId, bound: &DictId) -> Vec<DictId> {
        let mut ids = vec![DictId::new()];
        for (key, value) in pattern.iter() {
            let universe = self.values(key);
            let bound_value = bound.get(key).and_then(PatternValue::exact);
            let bound_index = bound_value.and_then(|b| universe.iter().position(|v| v == b));

            let choices: Vec<IdValue> = match value {
                PatternValue::Exact(v) => vec![v.clone()],
                PatternValue::Wild(Wildcard::AllSmaller) => match bound_index {
                    Some(i) => universe[..i].to_vec(),
                    None => Vec::new(),
                },
                PatternValue::Wild(Wildcard::Match) => match (bound_value, bound_index) {
                    (Some(b), Some(_)) => vec![b.clone()],
                    _ => universe.to_vec(),
                },
                PatternValue::Wild(Wildcard::All) => universe.to_vec(),
            };

            ids = ids
                .iter()
                .flat_map(|id| {
                    choices
                        .iter()
                        .map(move |v| id.clone().with(key, v.clone()))
                })
                .collect();
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::{ALL, ALLSMALLER, CallbackProperty, MATCH};

    fn def(out: DictId, input: DictId) -> CallbackDefinition {
        CallbackDefinition::new(
            vec![CallbackProperty::new(out, "children")],
            vec![CallbackProperty::new(input, "value")],
        )
    }

    #[test]
    fn test_wildcards_only_get_zero() {
        let defs = [def(DictId::new().with("i", MATCH), DictId::new().with("i", MATCH))];
        let p = WildcardPlaceholders::collect(&defs);
        assert_eq!(p.values("i"), [IdValue::from(0)]);
    }

    #[test]
    fn test_allsmaller_brackets_exact_values() {
        let defs = [
            def(DictId::new().with("i", MATCH), DictId::new().with("i", ALLSMALLER)),
            def(DictId::new().with("i", 5), DictId::new().with("i", 3)),
        ];
        let p = WildcardPlaceholders::collect(&defs);
        assert_eq!(
            p.values("i"),
            [IdValue::from(2), IdValue::from(3), IdValue::from(5), IdValue::from("z")]
        );
    }

    #[test]
    fn test_allsmaller_without_exact_counts_up() {
        let defs = [
            def(DictId::new().with("i", MATCH), DictId::new().with("i", ALLSMALLER)),
            def(DictId::new().with("i", ALL), DictId::new().with("i", ALLSMALLER)),
        ];
        let p = WildcardPlaceholders::collect(&defs);
        assert_eq!(p.values("i"), [IdValue::from(0), IdValue::from(1)]);
    }

    #[test]
    fn test_make_all_ids() {
        let defs = [def(
            DictId::new().with("i", MATCH).with("t", "a"),
            DictId::new().with("i", ALLSMALLER).with("t", "b"),
        )];
        let p = WildcardPlaceholders::collect(&defs);
        let outs = p.make_all_ids(&DictId::new().with("i", MATCH).with("t", "a"), &DictId::new());
        assert_eq!(outs, vec![DictId::new().with("i", 0).with("t", "a")]);

        let bound = DictId::new().with("i", 1).with("t", "a");
        let smaller = p.make_all_ids(&DictId::new().with("i", ALLSMALLER).with("t", "b"), &bound);
        assert!(smaller.is_empty());
    }

    #[test]
    fn test_make_all_ids_cartesian() {
        let defs = [
            def(DictId::new().with("x", 1).with("y", "a"), DictId::new().with("x", 2).with("y", "b")),
            def(DictId::new().with("x", ALL).with("y", ALL), DictId::new().with("x", 3).with("y", "c")),
        ];
        let p = WildcardPlaceholders::collect(&defs);
        let ids = p.make_all_ids(&DictId::new().with("x", ALL).with("y", ALL), &DictId::new());
        assert_eq!(ids.len(), 9);
    }
}
