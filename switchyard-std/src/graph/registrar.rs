//! Lookup maps from `(id, property)` to callbacks.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use switchyard_core::{CallbackDefinition, CallbackProperty, ComponentId, DictId, PatternValue};

/// Property name to the callbacks referencing it.
pub type PropMap = BTreeMap<String, Vec<Arc<CallbackDefinition>>>;

/// Property name to the distinct patterns referencing it.
pub type PatternMap = BTreeMap<String, Vec<PatternEntry>>;

/// One distinct wildcard pattern and the callbacks sharing it.
#[derive(Debug, Clone)]
pub struct PatternEntry {
    /// Sorted keys of the pattern.
    pub keys: Vec<String>,
    /// Values in key order.
    pub values: Vec<PatternValue>,
    /// Callbacks whose id carries exactly these values.
    pub callbacks: Vec<Arc<CallbackDefinition>>,
}

/// The output and input lookup maps.
#[derive(Debug, Clone, Default)]
pub struct Registrar {
    output_map: HashMap<String, PropMap>,
    input_map: HashMap<String, PropMap>,
    output_patterns: HashMap<String, PatternMap>,
    input_patterns: HashMap<String, PatternMap>,
}

impl Registrar {
    /// Register every output and input of a callback.
    ///
    /// State is not registered: it never triggers a callback.
    pub fn register(&mut self, callback: &Arc<CallbackDefinition>) {
        for out in callback.outputs() {
            Self::add(&mut self.output_map, &mut self.output_patterns, out, callback);
        }
        for input in callback.inputs() {
            Self::add(&mut self.input_map, &mut self.input_patterns, input, callback);
        }
    }

    fn add(
        map: &mut HashMap<String, PropMap>,
        patterns: &mut HashMap<String, PatternMap>,
        prop: &CallbackProperty,
        callback: &Arc<CallbackDefinition>,
    ) {
        match &prop.id {
            ComponentId::Plain(id) => map
                .entry(id.clone())
                .or_default()
                .entry(prop.property.clone())
                .or_default()
                .push(Arc::clone(callback)),
            ComponentId::Dict(dict) => Self::add_pattern(patterns, dict, &prop.property, callback),
        }
    }

    fn add_pattern(
        patterns: &mut HashMap<String, PatternMap>,
        id: &DictId,
        property: &str,
        callback: &Arc<CallbackDefinition>,
    ) {
        let values = id.values();
        let bucket = patterns
            .entry(id.key_string())
            .or_default()
            .entry(property.to_string())
            .or_default();
        match bucket.iter_mut().find(|entry| entry.values == values) {
            Some(entry) => entry.callbacks.push(Arc::clone(callback)),
            None => bucket.push(PatternEntry {
                keys: id.keys(),
                values,
                callbacks: vec![Arc::clone(callback)],
            }),
        }
    }

    /// Callbacks writing props of a plain id.
    pub fn outputs_of(&self, id: &str) -> Option<&PropMap> {
        self.output_map.get(id)
    }

    /// Callbacks triggered by props of a plain id.
    pub fn inputs_of(&self, id: &str) -> Option<&PropMap> {
        self.input_map.get(id)
    }

    /// Output patterns with the given key string.
    pub fn output_patterns(&self, key_string: &str) -> Option<&PatternMap> {
        self.output_patterns.get(key_string)
    }

    /// Input patterns with the given key string.
    pub fn input_patterns(&self, key_string: &str) -> Option<&PatternMap> {
        self.input_patterns.get(key_string)
    }
}
