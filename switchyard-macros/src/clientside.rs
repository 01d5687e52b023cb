//! The `#[clientside]` attribute.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Ident, ItemFn, LitStr, Token,
    parse::{Parse, ParseStream},
};

/// Arguments of `#[clientside(namespace = "..", name = "..")]`.
pub(crate) struct ClientsideArgs {
    namespace: Option<LitStr>,
    name: Option<LitStr>,
}

impl Parse for ClientsideArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut namespace = None;
        let mut name = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "namespace" => namespace = Some(input.parse()?),
                "name" => name = Some(input.parse()?),
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(ClientsideArgs { namespace, name })
    }
}

pub(crate) fn expand(args: ClientsideArgs, input: ItemFn) -> syn::Result<TokenStream> {
    let sig = &input.sig;
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "clientside functions run synchronously and cannot be async",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "clientside functions cannot be generic",
        ));
    }
    if sig.inputs.len() != 1 {
        return Err(syn::Error::new_spanned(
            &sig.inputs,
            "clientside functions take one argument: fn(args: &[Value])",
        ));
    }
    let Some(namespace) = args.namespace else {
        return Err(syn::Error::new_spanned(
            &sig.ident,
            "missing `namespace = \"..\"` in #[clientside(..)]",
        ));
    };

    let fn_name = &sig.ident;
    let function_name = args
        .name
        .unwrap_or_else(|| LitStr::new(&fn_name.to_string(), fn_name.span()));

    Ok(quote! {
        #input

        ::switchyard::inventory::submit! {
            ::switchyard::ClientsideRegistration {
                namespace: #namespace,
                function_name: #function_name,
                function: #fn_name,
            }
        }
    })
}
