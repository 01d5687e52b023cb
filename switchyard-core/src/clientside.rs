//! In-process callback functions.

use serde_json::Value;

use crate::error::ClientsideError;

/// What a clientside function returns for an output slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Set the output to this value.
    Value(Value),
    /// Leave the output alone.
    NoUpdate,
    /// One entry per output (or per matched component of a multi-valued
    /// output).
    Many(Vec<Update>),
}

impl Update {
    /// Build a [`Update::Many`] from plain values.
    pub fn many<I: IntoIterator<Item = Value>>(values: I) -> Self {
        Update::Many(values.into_iter().map(Update::Value).collect())
    }
}

impl From<Value> for Update {
    fn from(value: Value) -> Self {
        Update::Value(value)
    }
}

/// A function callable from the scheduler.
///
/// Arguments are the input values followed by the state values; a
/// multi-valued input contributes one JSON array.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a clientside function",
    label = "expected `Fn(&[Value]) -> Result<Update, ClientsideError>`"
)]
pub trait ClientsideFn: Send + Sync + 'static {
    /// Run the function.
    fn call(&self, args: &[Value]) -> Result<Update, ClientsideError>;
}

impl<F> ClientsideFn for F
where
    F: Fn(&[Value]) -> Result<Update, ClientsideError> + Send + Sync + 'static,
{
    fn call(&self, args: &[Value]) -> Result<Update, ClientsideError> {
        self(args)
    }
}
