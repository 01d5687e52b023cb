//! Callback definitions.
//!
//! A [`CallbackDefinition`] ties ordered outputs to inputs and state. Hosts
//! either build definitions directly or hand over the serde wire form,
//! [`CallbackSpec`], which is parsed with [`CallbackDefinition::from_spec`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{IdError, ValidationIssue};
use crate::id::{
    ComponentId, Wildcard, combine_id_and_prop, is_multi_output_prop, output_signature,
    parse_multiple_outputs, split_id_and_prop,
};

/// A `(component id, property)` pair referenced by a callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackProperty {
    /// Component id, possibly a wildcard pattern.
    pub id: ComponentId,
    /// Property name.
    pub property: String,
}

impl CallbackProperty {
    /// Create a new callback property.
    pub fn new(id: impl Into<ComponentId>, property: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            property: property.into(),
        }
    }

    /// Flattened identity `stringify(id).property`.
    pub fn combined(&self) -> String {
        combine_id_and_prop(&self.id, &self.property)
    }

    /// Whether the id can bind more than one component.
    pub fn is_multi_valued(&self) -> bool {
        self.id.is_multi_valued()
    }
}

impl fmt::Display for CallbackProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.combined())
    }
}

/// The role a property plays in a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepRole {
    /// Written by the callback.
    Output,
    /// Triggers the callback.
    Input,
    /// Read by the callback without triggering it.
    State,
}

impl DepRole {
    /// Wildcards permitted for this role.
    pub const fn allowed_wildcards(self) -> &'static [Wildcard] {
        match self {
            DepRole::Output => &[Wildcard::Match, Wildcard::All],
            DepRole::Input | DepRole::State => {
                &[Wildcard::Match, Wildcard::All, Wildcard::AllSmaller]
            }
        }
    }

    /// Whether a wildcard is permitted for this role.
    pub fn allows(self, wildcard: Wildcard) -> bool {
        self.allowed_wildcards().contains(&wildcard)
    }
}

impl fmt::Display for DepRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DepRole::Output => "Output",
            DepRole::Input => "Input",
            DepRole::State => "State",
        })
    }
}

/// Reference to an in-process function run instead of a server round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientsideFunction {
    /// Registry namespace.
    pub namespace: String,
    /// Function name within the namespace.
    pub function_name: String,
}

impl ClientsideFunction {
    /// Create a new reference.
    pub fn new(namespace: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            function_name: function_name.into(),
        }
    }
}

/// One registered callback.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackDefinition {
    output: String,
    outputs: Vec<CallbackProperty>,
    inputs: Vec<CallbackProperty>,
    state: Vec<CallbackProperty>,
    clientside_function: Option<ClientsideFunction>,
    prevent_initial_call: bool,
    match_keys: Vec<String>,
    first_single_output: Option<usize>,
}

impl CallbackDefinition {
    /// Create a server-side callback from ordered outputs and inputs.
    pub fn new(outputs: Vec<CallbackProperty>, inputs: Vec<CallbackProperty>) -> Self {
        let output = output_signature(outputs.iter().map(|o| (&o.id, o.property.as_str())));
        Self::assemble(output, outputs, inputs)
    }

    fn assemble(
        output: String,
        outputs: Vec<CallbackProperty>,
        inputs: Vec<CallbackProperty>,
    ) -> Self {
        let match_keys = outputs
            .first()
            .and_then(|o| o.id.as_dict())
            .map(|d| d.wildcard_keys(Wildcard::Match))
            .unwrap_or_default();
        let first_single_output = outputs.iter().position(|o| !o.is_multi_valued());
        Self {
            output,
            outputs,
            inputs,
            state: Vec::new(),
            clientside_function: None,
            prevent_initial_call: false,
            match_keys,
            first_single_output,
        }
    }

    /// Attach state properties.
    pub fn with_state(mut self, state: Vec<CallbackProperty>) -> Self {
        self.state = state;
        self
    }

    /// Run the callback through a registered clientside function.
    pub fn clientside(
        mut self,
        namespace: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        self.clientside_function = Some(ClientsideFunction::new(namespace, function_name));
        self
    }

    /// Skip the initial call when discovered on first paint or on insertion.
    pub fn prevent_initial_call(mut self, prevent: bool) -> Self {
        self.prevent_initial_call = prevent;
        self
    }

    /// Parse the wire form.
    ///
    /// Ids that fail to decode are reported as validation issues; the rest
    /// of the structural checks run later, over the whole callback set.
    pub fn from_spec(spec: &CallbackSpec) -> Result<Self, Vec<ValidationIssue>> {
        let raw_outputs: Vec<&str> = if is_multi_output_prop(&spec.output) {
            parse_multiple_outputs(&spec.output)
        } else {
            vec![spec.output.as_str()]
        };
        let head = format!("In the callback for output(s):\n  {}", raw_outputs.join("\n  "));
        let mut issues = Vec::new();

        let mut outputs = Vec::with_capacity(raw_outputs.len());
        for (i, raw) in raw_outputs.iter().enumerate() {
            match split_id_and_prop(raw) {
                Ok((id, property)) => outputs.push(CallbackProperty { id, property }),
                Err(err) => issues.push(id_issue(&head, DepRole::Output, i, &err)),
            }
        }

        let mut parse_args = |specs: &[PropSpec], role: DepRole| {
            let mut props = Vec::with_capacity(specs.len());
            for (i, item) in specs.iter().enumerate() {
                match ComponentId::from_json(&item.id) {
                    Ok(id) => props.push(CallbackProperty::new(id, item.property.clone())),
                    Err(err) => issues.push(id_issue(&head, role, i, &err)),
                }
            }
            props
        };
        let inputs = parse_args(&spec.inputs, DepRole::Input);
        let state = parse_args(&spec.state, DepRole::State);

        if !issues.is_empty() {
            return Err(issues);
        }

        let mut def = Self::assemble(spec.output.clone(), outputs, inputs).with_state(state);
        def.clientside_function = spec.clientside_function.clone();
        def.prevent_initial_call = spec.prevent_initial_call;
        Ok(def)
    }

    /// Output signature; the combined token for multi-output callbacks.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Ordered outputs.
    pub fn outputs(&self) -> &[CallbackProperty] {
        &self.outputs
    }

    /// Inputs.
    pub fn inputs(&self) -> &[CallbackProperty] {
        &self.inputs
    }

    /// State.
    pub fn state(&self) -> &[CallbackProperty] {
        &self.state
    }

    /// Properties of the given role.
    pub fn args(&self, role: DepRole) -> &[CallbackProperty] {
        match role {
            DepRole::Output => &self.outputs,
            DepRole::Input => &self.inputs,
            DepRole::State => &self.state,
        }
    }

    /// The clientside function, if this is a clientside callback.
    pub fn clientside_function(&self) -> Option<&ClientsideFunction> {
        self.clientside_function.as_ref()
    }

    /// Whether the initial call is suppressed.
    pub fn prevents_initial_call(&self) -> bool {
        self.prevent_initial_call
    }

    /// Sorted `MATCH` keys of the first output.
    pub fn match_keys(&self) -> &[String] {
        &self.match_keys
    }

    /// Index of the first output that binds a single component.
    pub fn first_single_output(&self) -> Option<usize> {
        self.first_single_output
    }

    /// Whether the output signature is the multi-output token.
    pub fn is_multi_output(&self) -> bool {
        is_multi_output_prop(&self.output)
    }

    /// False for the placeholder callback with a single blank output.
    pub fn has_outputs(&self) -> bool {
        match self.outputs.as_slice() {
            [] => false,
            [only] => !(only.property.is_empty() && only.id == ComponentId::Plain(String::new())),
            _ => true,
        }
    }

    /// The head line of every validation issue about this callback.
    pub fn head(&self) -> String {
        let outputs: Vec<String> = self.outputs.iter().map(CallbackProperty::combined).collect();
        format!("In the callback for output(s):\n  {}", outputs.join("\n  "))
    }

    /// Outputs formatted for error messages.
    pub fn outputs_label(&self) -> String {
        if self.is_multi_output() {
            parse_multiple_outputs(&self.output).join(", ")
        } else {
            self.output.clone()
        }
    }
}

fn id_issue(head: &str, role: DepRole, index: usize, err: &IdError) -> ValidationIssue {
    match err {
        IdError::InvalidValue { key, value } => ValidationIssue::new(
            "Callback wildcard ID error",
            [
                head.to_string(),
                format!("{role}[{index}].id[\"{key}\"] = {value}"),
                "Wildcard callback ID values must be either wildcards".to_string(),
                "or constants of one of these types:".to_string(),
                "string, number, boolean".to_string(),
            ],
        ),
        IdError::InvalidType(value) => ValidationIssue::new(
            "Callback ID type error",
            [
                head.to_string(),
                format!("{role}[{index}].id = {value}"),
                "IDs must be strings or wildcard-compatible objects.".to_string(),
            ],
        ),
        IdError::Malformed { input, reason } => ValidationIssue::new(
            "Callback ID type error",
            [
                head.to_string(),
                format!("{role}[{index}].id = '{input}'"),
                reason.clone(),
            ],
        ),
    }
}

/// Wire form of one callback, as supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackSpec {
    /// Output signature (single `id.prop` or multi-output token).
    pub output: String,
    /// Inputs.
    #[serde(default)]
    pub inputs: Vec<PropSpec>,
    /// State.
    #[serde(default)]
    pub state: Vec<PropSpec>,
    /// Clientside function reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clientside_function: Option<ClientsideFunction>,
    /// Suppress the initial call.
    #[serde(default)]
    pub prevent_initial_call: bool,
}

/// Wire form of an input or state entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropSpec {
    /// Id in wire form: a string or an object with one-element wildcard arrays.
    pub id: Value,
    /// Property name.
    #[serde(default)]
    pub property: String,
}
