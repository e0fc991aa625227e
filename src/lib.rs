//! # mapbind
//!
//! Expose native Rust maps to Lua with live mapping semantics.
//!
//! ## Overview
//!
//! `mapbind` wraps an in-memory associative container in a
//! [`MapAdapter`] that Lua code can use like a mapping: length, membership,
//! key iteration, subscript get/set/delete, and `keys()`/`values()`/`items()`
//! views. The container's own storage and iteration order stay the single
//! source of truth; nothing is copied into a Lua table.
//!
//! - **Adapters**: [`MapAdapter`], a shared handle over one native map
//! - **Views**: [`KeyView`], [`ValueView`], [`ItemView`], live projections
//! - **Sequences**: [`KeyIter`], [`ValueIter`], [`ItemIter`], lazy iterators
//!   that also convert into Lua iterator functions
//! - **Capabilities**: [`MapKey`], [`MapValue`], the write strategies
//!   [`AssignInPlace`], [`EraseAndReconstruct`] and [`ReadOnly`], and the
//!   read access modes [`ByValue`] and [`ByReference`]
//! - **Aliases**: [`ValueAlias`], a Lua handle on one live map entry
//! - **Binding**: [`bind_map`] publishes a map class into a Lua scope
//!
//! Views, sequences and value references share ownership of the map, so a
//! map lives exactly as long as anything derived from it. Everything is
//! single-threaded: adapters are neither `Send` nor `Sync`.
//!
//! ## Feature Flags
//!
//! - `derive`: `#[derive(MapValue)]` (enabled by default)
//! - `fxhash`: [`FxMap`](native::FxMap), a hash map using `rustc-hash`
//! - `ahash`: [`AHashMap`](native::AHashMap), a hash map using `ahash`
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use mapbind::prelude::*;
//! use mlua::Lua;
//! use std::collections::BTreeMap;
//!
//! let lua = Lua::new();
//! let inventory: MapAdapter<BTreeMap<String, i64>> = MapAdapter::named("Inventory", BTreeMap::new());
//! lua.globals().set("inventory", inventory.clone()).unwrap();
//!
//! lua.load(
//!     r#"
//!     inventory["bolt"] = 40
//!     inventory["nut"] = 12
//!     inventory["nut"] = nil
//!     assert(#inventory == 1)
//!     assert(inventory:contains("bolt"))
//!     assert(not inventory:contains(42))
//!     "#,
//! )
//! .exec()
//! .unwrap();
//!
//! assert_eq!(inventory.keys().iter().collect::<Vec<_>>(), vec!["bolt"]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use mapbind::prelude::*;
/// ```
pub mod prelude {
    pub use crate::adapter::{MapAdapter, ValueRef};
    pub use crate::alias::ValueAlias;
    pub use crate::bind::bind_map;
    pub use crate::capability::{
        AssignInPlace, ByReference, ByValue, EraseAndReconstruct, MapKey, MapValue, ReadOnly,
        Settable, ValueAccess, WriteStrategy,
    };
    pub use crate::error::MapError;
    pub use crate::native::NativeMap;
    pub use crate::view::{ItemView, KeyView, ValueView};

    #[cfg(feature = "derive")]
    pub use mapbind_derive::MapValue;
}

pub mod adapter;
pub mod alias;
pub mod bind;
pub mod capability;
pub mod error;
pub mod iter;
pub mod native;
pub mod view;

pub use adapter::{MapAdapter, ValueRef};
pub use alias::ValueAlias;
pub use bind::bind_map;
pub use capability::{
    AssignInPlace, ByReference, ByValue, EraseAndReconstruct, MapKey, MapValue, ReadOnly,
    Settable, ValueAccess, WriteStrategy,
};
pub use error::MapError;
pub use iter::{ItemIter, KeyIter, Sequence, ValueIter};
pub use native::NativeMap;
pub use view::{ItemView, KeyView, ValueView};

#[cfg(feature = "derive")]
pub use mapbind_derive::MapValue;

/// Re-export of the Lua runtime the adapters bind into.
pub use mlua;
