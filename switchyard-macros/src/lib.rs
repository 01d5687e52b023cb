//! Procedural macros for switchyard.
//!
//! - `#[clientside]` - Register a function as a clientside callback

use proc_macro::TokenStream;
use syn::{ItemFn, parse_macro_input};

mod clientside;

/// Register a function as a clientside callback.
///
/// The function keeps its signature and is submitted to the registry
/// returned by `ClientsideRegistry::collected()`. The name defaults to the
/// function's name.
///
/// ```rust,ignore
/// #[switchyard::clientside(namespace = "ui", name = "double")]
/// fn double(args: &[Value]) -> Result<Update, ClientsideError> {
///     Ok(Update::Value(json!(args[0].as_i64().unwrap_or(0) * 2)))
/// }
/// ```
#[proc_macro_attribute]
pub fn clientside(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as clientside::ClientsideArgs);
    let input = parse_macro_input!(item as ItemFn);

    clientside::expand(args, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
