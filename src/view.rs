//! Key, value and item views.
//!
//! Views are live projections of one map. They hold a handle to the map,
//! never a copy of its entries, so iterating a view always reflects the
//! contents at the time of iteration. Each call to
//! [`MapAdapter::keys`], [`MapAdapter::values`] or [`MapAdapter::items`]
//! creates a new view.
//!
//! # Examples
//!
//! ```rust
//! use mapbind::MapAdapter;
//! use std::collections::BTreeMap;
//!
//! let stock: MapAdapter<BTreeMap<String, i64>> = MapAdapter::new();
//! let keys = stock.keys();
//! assert_eq!(keys.len(), 0);
//!
//! stock.set_item("bolt".to_string(), 40).unwrap();
//! stock.set_item("nut".to_string(), 12).unwrap();
//!
//! // The view was created before the writes and still sees them
//! assert_eq!(keys.iter().collect::<Vec<_>>(), vec!["bolt", "nut"]);
//! assert_eq!(stock.values().iter().sum::<i64>(), 52);
//! ```

use std::fmt;

use mlua::Value;

use crate::adapter::MapAdapter;
use crate::iter::{ItemIter, KeyIter, Sequence, ValueIter};
use crate::native::NativeMap;

macro_rules! view {
    ($(#[$meta:meta])* $view:ident, $iter:ident, $item:ty) => {
        $(#[$meta])*
        pub struct $view<M: NativeMap> {
            map: MapAdapter<M>,
        }

        impl<M: NativeMap> $view<M> {
            pub(crate) const fn new(map: MapAdapter<M>) -> Self {
                Self { map }
            }

            /// Returns the map this view projects.
            pub const fn map(&self) -> &MapAdapter<M> {
                &self.map
            }

            /// Returns the number of entries in the map.
            pub fn len(&self) -> usize {
                self.map.len()
            }

            /// Returns `true` if the map has no entries.
            pub fn is_empty(&self) -> bool {
                self.map.is_empty()
            }

            /// Returns a new lazy sequence in the map's native order.
            pub fn iter(&self) -> $iter<M> {
                Sequence::new(self.map.clone())
            }
        }

        impl<M: NativeMap> Clone for $view<M> {
            fn clone(&self) -> Self {
                Self::new(self.map.clone())
            }
        }

        impl<M: NativeMap> fmt::Debug for $view<M> {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter
                    .debug_struct(stringify!($view))
                    .field("map", &self.map)
                    .finish()
            }
        }

        impl<M: NativeMap> IntoIterator for &$view<M> {
            type Item = $item;
            type IntoIter = $iter<M>;

            fn into_iter(self) -> Self::IntoIter {
                self.iter()
            }
        }
    };
}

view!(
    /// A live view over the keys of a map.
    KeyView,
    KeyIter,
    M::Key
);

view!(
    /// A live view over the values of a map.
    ValueView,
    ValueIter,
    M::Value
);

view!(
    /// A live view over the `(key, value)` entries of a map.
    ItemView,
    ItemIter,
    (M::Key, M::Value)
);

impl<M: NativeMap> KeyView<M> {
    /// Returns `true` if the map has an entry for `key`.
    pub fn contains(&self, key: &M::Key) -> bool {
        self.map.contains(key)
    }

    /// Total membership test for an arbitrary Lua value, with the same
    /// contract as [`MapAdapter::contains_value`].
    pub fn contains_value(&self, key: &Value) -> bool {
        self.map.contains_value(key)
    }
}
