//! Clientside functions: registry and invocation.
//!
//! A callback bound to a clientside function never leaves the process. The
//! function receives the input values followed by the state values and
//! returns one [`Update`] per output.
//!
//! # Registration
//!
//! ```rust,ignore
//! let registry = ClientsideRegistry::new()
//!     .register("ui", "double", |args: &[Value]| -> Result<Update, ClientsideError> {
//!         let n = args[0].as_i64().unwrap_or(0);
//!         Ok(Update::Value(json!(n * 2)))
//!     });
//! ```
//!
//! With the `inventory` feature, functions annotated with `#[clientside]`
//! are gathered by [`ClientsideRegistry::collected`].

use serde_json::Value;
use std::{collections::HashMap, fmt, sync::Arc};
use switchyard_core::{ClientsideError, ClientsideFn, ClientsideFunction, Update};
use tracing::debug;

use super::payload::{CallbackPayload, OutputRef, OutputSlot};
use super::server::CallbackData;

/// Clientside functions by namespace and name.
#[derive(Clone, Default)]
pub struct ClientsideRegistry {
    functions: HashMap<String, HashMap<String, Arc<dyn ClientsideFn>>>,
}

impl ClientsideRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function, builder style.
    pub fn register<F: ClientsideFn>(
        mut self,
        namespace: impl Into<String>,
        function_name: impl Into<String>,
        function: F,
    ) -> Self {
        self.insert(namespace, function_name, function);
        self
    }

    /// Register a function, replacing any previous one of the same name.
    pub fn insert<F: ClientsideFn>(
        &mut self,
        namespace: impl Into<String>,
        function_name: impl Into<String>,
        function: F,
    ) {
        self.functions
            .entry(namespace.into())
            .or_default()
            .insert(function_name.into(), Arc::new(function));
    }

    /// Look up a function.
    pub fn get(&self, function: &ClientsideFunction) -> Option<&Arc<dyn ClientsideFn>> {
        self.functions
            .get(&function.namespace)?
            .get(&function.function_name)
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.values().map(HashMap::len).sum()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every function submitted through `inventory`.
    #[cfg(feature = "inventory")]
    pub fn collected() -> Self {
        let mut registry = Self::new();
        for entry in inventory::iter::<ClientsideRegistration> {
            debug!(
                namespace = entry.namespace,
                function_name = entry.function_name,
                "collected clientside function"
            );
            registry.insert(entry.namespace, entry.function_name, entry.function);
        }
        registry
    }
}

impl fmt::Debug for ClientsideRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .functions
            .iter()
            .flat_map(|(ns, fns)| fns.keys().map(move |name| format!("{ns}.{name}")))
            .collect();
        names.sort();
        f.debug_struct("ClientsideRegistry")
            .field("functions", &names)
            .finish()
    }
}

/// A clientside function submitted for collection.
pub struct ClientsideRegistration {
    /// Namespace the function is registered under.
    pub namespace: &'static str,
    /// Function name.
    pub function_name: &'static str,
    /// The function.
    pub function: fn(&[Value]) -> Result<Update, ClientsideError>,
}

#[cfg(feature = "inventory")]
inventory::collect!(ClientsideRegistration);

/// Run a clientside function for a payload and map its result onto the
/// payload's outputs.
pub fn invoke(
    registry: &ClientsideRegistry,
    function: &ClientsideFunction,
    payload: &CallbackPayload,
) -> Result<CallbackData, ClientsideError> {
    let Some(callable) = registry.get(function) else {
        return Err(ClientsideError::NotFound {
            namespace: function.namespace.clone(),
            function_name: function.function_name.clone(),
        });
    };

    let args: Vec<Value> = payload
        .inputs
        .iter()
        .chain(payload.state.iter().flatten())
        .map(|arg| arg.flat_value())
        .collect();

    let update = match callable.call(&args) {
        Ok(update) => update,
        Err(ClientsideError::PreventUpdate) => {
            debug!(output = %payload.output, "clientside function prevented the update");
            return Ok(CallbackData::new());
        }
        Err(e) => return Err(e),
    };

    if matches!(update, Update::NoUpdate) {
        return Ok(CallbackData::new());
    }
    let per_slot = if payload.multi {
        split(update, payload.outputs.len())?
    } else {
        vec![update]
    };

    let mut data = CallbackData::new();
    for (slot, update) in payload.outputs.iter().zip(per_slot) {
        match slot {
            OutputSlot::Single(output) => set(&mut data, output, update),
            OutputSlot::Multi(outputs) => {
                for (output, update) in outputs.iter().zip(split(update, outputs.len())?) {
                    set(&mut data, output, update);
                }
            }
        }
    }
    Ok(data)
}

fn split(update: Update, expected: usize) -> Result<Vec<Update>, ClientsideError> {
    let parts = match update {
        Update::Many(parts) => parts,
        Update::Value(Value::Array(values)) => values.into_iter().map(Update::Value).collect(),
        Update::NoUpdate => return Ok(vec![Update::NoUpdate; expected]),
        Update::Value(_) => return Err(ClientsideError::Shape { expected, found: 1 }),
    };
    if parts.len() != expected {
        return Err(ClientsideError::Shape {
            expected,
            found: parts.len(),
        });
    }
    Ok(parts)
}

fn set(data: &mut CallbackData, output: &OutputRef, update: Update) {
    let value = match update {
        Update::Value(value) => value,
        Update::Many(parts) => Value::Array(
            parts
                .into_iter()
                .filter_map(|p| match p {
                    Update::Value(v) => Some(v),
                    _ => None,
                })
                .collect(),
        ),
        Update::NoUpdate => return,
    };
    data.entry(output.id.stringify())
        .or_default()
        .insert(output.property.clone(), value);
}
