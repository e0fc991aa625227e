//! Derive macro for mapbind map values.
//!
//! This crate provides `#[derive(MapValue)]`, which implements
//! `mapbind::MapValue` for a type and selects how maps holding that type are
//! written to.
//!
//! # Write Strategies
//!
//! The strategy is chosen with the `map_value` attribute:
//!
//! - `#[map_value(write = "assign")]`: overwrite the slot in place; the type
//!   must implement `Default` and `FromLua`
//! - `#[map_value(write = "reconstruct")]`: erase and insert again; the type
//!   must implement `FromLua` (this is the default)
//! - `#[map_value(write = "read_only")]`: maps of this type have no `set`
//!
//! # Access Modes
//!
//! - `#[map_value(access = "value")]`: `m[k]` converts a clone (the default)
//! - `#[map_value(access = "reference")]`: `m[k]` aliases the live slot, so
//!   field writes and method calls on it change the stored value; the type
//!   must implement `mlua::UserData`
//!
//! Both keys can be combined: `#[map_value(write = "reconstruct", access = "reference")]`.
//!
//! # Example
//!
//! ```rust,ignore
//! use mapbind::MapValue;
//!
//! #[derive(Clone, MapValue)]
//! #[map_value(write = "read_only")]
//! struct Snapshot {
//!     taken_at: u64,
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod map_value;

use proc_macro::TokenStream;

/// Derive macro implementing `mapbind::MapValue`.
///
/// # Requirements
///
/// - The type must implement `Clone` and `mlua::IntoLua` (every `UserData`
///   type does)
/// - The chosen write strategy and access mode add their own requirements,
///   checked when the generated impl is compiled
///
/// # Generated Code
///
/// ```rust,ignore
/// impl ::mapbind::MapValue for TypeName {
///     type Write = ::mapbind::EraseAndReconstruct;
///     type Access = ::mapbind::ByValue;
/// }
/// ```
///
/// # Generics
///
/// Generic parameters and where clauses are carried over to the impl as
/// written; add any bounds the strategy needs to the type's where clause.
#[proc_macro_derive(MapValue, attributes(map_value))]
pub fn derive_map_value(input: TokenStream) -> TokenStream {
    map_value::derive_map_value_impl(input)
}
