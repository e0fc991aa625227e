//! Implementation of the `#[derive(MapValue)]` macro.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, LitStr, parse_macro_input};

/// The write strategy named by a `map_value` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Write {
    Assign,
    Reconstruct,
    ReadOnly,
}

/// How reads hand the value to Lua.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Value,
    Reference,
}

impl Access {
    fn parse(literal: &LitStr) -> syn::Result<Self> {
        match literal.value().as_str() {
            "value" => Ok(Self::Value),
            "reference" => Ok(Self::Reference),
            other => Err(syn::Error::new_spanned(
                literal,
                format!("unknown access mode `{other}`, expected \"value\" or \"reference\""),
            )),
        }
    }

    fn access_path(self) -> TokenStream2 {
        match self {
            Self::Value => quote!(::mapbind::ByValue),
            Self::Reference => quote!(::mapbind::ByReference),
        }
    }
}

/// Everything the `map_value` attributes select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Options {
    write: Write,
    access: Access,
}

impl Write {
    fn parse(literal: &LitStr) -> syn::Result<Self> {
        match literal.value().as_str() {
            "assign" => Ok(Self::Assign),
            "reconstruct" => Ok(Self::Reconstruct),
            "read_only" => Ok(Self::ReadOnly),
            other => Err(syn::Error::new_spanned(
                literal,
                format!(
                    "unknown write strategy `{other}`, expected \"assign\", \"reconstruct\" or \"read_only\""
                ),
            )),
        }
    }

    fn strategy_path(self) -> TokenStream2 {
        match self {
            Self::Assign => quote!(::mapbind::AssignInPlace),
            Self::Reconstruct => quote!(::mapbind::EraseAndReconstruct),
            Self::ReadOnly => quote!(::mapbind::ReadOnly),
        }
    }
}

/// Main implementation of the `MapValue` derive macro.
pub fn derive_map_value_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let expanded = match parse_options(&input) {
        Ok(options) => generate_map_value(&input, options),
        Err(error) => error.to_compile_error(),
    };

    TokenStream::from(expanded)
}

/// Reads the write strategy and access mode from the `map_value` attributes.
fn parse_options(input: &DeriveInput) -> syn::Result<Options> {
    let mut write = None;
    let mut access = None;

    for attribute in input.attrs.iter().filter(|attribute| attribute.path().is_ident("map_value")) {
        attribute.parse_nested_meta(|meta| {
            if meta.path.is_ident("write") {
                if write.is_some() {
                    return Err(meta.error("duplicate `write` in map_value attribute"));
                }
                let literal: LitStr = meta.value()?.parse()?;
                write = Some(Write::parse(&literal)?);
                Ok(())
            } else if meta.path.is_ident("access") {
                if access.is_some() {
                    return Err(meta.error("duplicate `access` in map_value attribute"));
                }
                let literal: LitStr = meta.value()?.parse()?;
                access = Some(Access::parse(&literal)?);
                Ok(())
            } else {
                Err(meta.error("unsupported map_value attribute, expected `write` or `access`"))
            }
        })?;
    }

    Ok(Options {
        write: write.unwrap_or(Write::Reconstruct),
        access: access.unwrap_or(Access::Value),
    })
}

/// Generates the `MapValue` impl.
fn generate_map_value(input: &DeriveInput, options: Options) -> TokenStream2 {
    let name = &input.ident;
    let strategy = options.write.strategy_path();
    let access = options.access.access_path();
    let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();

    quote! {
        impl #impl_generics ::mapbind::MapValue for #name #type_generics #where_clause {
            type Write = #strategy;
            type Access = #access;
        }
    }
}
