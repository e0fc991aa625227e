//! The map adapter.
//!
//! [`MapAdapter`] is a cheap, cloneable handle to one native map. Every clone,
//! every view returned by [`keys`](MapAdapter::keys),
//! [`values`](MapAdapter::values) and [`items`](MapAdapter::items), every lazy
//! sequence and every [`ValueRef`] shares ownership of the same map cell, so
//! the map lives exactly as long as the last object derived from it.
//!
//! # Examples
//!
//! ```rust
//! use mapbind::MapAdapter;
//! use std::collections::BTreeMap;
//!
//! let scores: MapAdapter<BTreeMap<String, i64>> = MapAdapter::new();
//! scores.set_item("carol".to_string(), 7).unwrap();
//! scores.set_item("alice".to_string(), 3).unwrap();
//!
//! assert_eq!(scores.len(), 2);
//! assert!(scores.contains(&"alice".to_string()));
//!
//! // Native (sorted) order
//! let keys: Vec<String> = scores.iter().collect();
//! assert_eq!(keys, vec!["alice".to_string(), "carol".to_string()]);
//!
//! // Aliased access to the stored value
//! let alice = scores.get_item("alice".to_string()).unwrap();
//! *alice.get_mut().unwrap() += 10;
//! assert_eq!(*scores.get_item("alice".to_string()).unwrap().get().unwrap(), 13);
//! ```
//!
//! # Borrowing
//!
//! The map sits in a [`RefCell`]. Operations borrow it for their own duration
//! only. `len`, `contains` and iteration panic if a [`RefMut`] obtained from
//! [`ValueRef::get_mut`] is alive at the same time, the same way
//! [`RefCell::borrow`] does; fallible operations, including
//! [`try_len`](MapAdapter::try_len) and
//! [`try_contains_value`](MapAdapter::try_contains_value), report
//! [`MapError::Busy`] instead. The Lua surface only uses the fallible ones.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use mlua::Value;
use tracing::trace;

use crate::capability::{MapKey, MapValue, Settable, WriteStrategy};
use crate::error::MapError;
use crate::iter::KeyIter;
use crate::native::NativeMap;
use crate::view::{ItemView, KeyView, ValueView};

/// The write strategy selected by the value type of `M`.
pub(crate) type Strategy<M> = <<M as NativeMap>::Value as MapValue>::Write;

/// The read access selected by the value type of `M`.
pub(crate) type Access<M> = <<M as NativeMap>::Value as MapValue>::Access;

const DEFAULT_CLASS: &str = "Map";

struct MapCell<M> {
    class: String,
    map: RefCell<M>,
}

/// A shared handle exposing mapping semantics over a native map.
pub struct MapAdapter<M: NativeMap> {
    shared: Rc<MapCell<M>>,
}

static_assertions::assert_not_impl_any!(
    MapAdapter<std::collections::BTreeMap<String, i64>>: Send,
    Sync
);

impl<M: NativeMap> MapAdapter<M> {
    /// Creates an adapter over a new, empty map.
    pub fn new() -> Self {
        Self::from_map(M::default())
    }

    /// Creates an adapter that takes ownership of an existing map.
    pub fn from_map(map: M) -> Self {
        Self::named(DEFAULT_CLASS, map)
    }

    /// Creates an adapter reporting itself as `class` in diagnostics.
    pub fn named(class: impl Into<String>, map: M) -> Self {
        Self {
            shared: Rc::new(MapCell {
                class: class.into(),
                map: RefCell::new(map),
            }),
        }
    }

    /// Returns the class name used in diagnostics.
    pub fn class_name(&self) -> &str {
        &self.shared.class
    }

    /// Returns the number of entries.
    ///
    /// # Complexity
    ///
    /// O(1) for the provided containers.
    pub fn len(&self) -> usize {
        self.shared.map.borrow().len()
    }

    /// Returns `true` if the map has no entries.
    pub fn is_empty(&self) -> bool {
        !self.is_non_empty()
    }

    /// Returns `true` if the map has at least one entry.
    pub fn is_non_empty(&self) -> bool {
        self.len() > 0
    }

    /// Returns the number of entries, or [`MapError::Busy`] instead of
    /// panicking when the map is mutably borrowed.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Busy`] if the map is mutably borrowed.
    pub fn try_len(&self) -> Result<usize, MapError> {
        Ok(self.read()?.len())
    }

    /// Total membership test for an arbitrary Lua value that reports
    /// [`MapError::Busy`] instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Busy`] if the map is mutably borrowed.
    pub fn try_contains_value(&self, key: &Value) -> Result<bool, MapError> {
        match M::Key::match_key(key) {
            Some(key) => Ok(self.read()?.find(&key).is_some()),
            None => Ok(false),
        }
    }

    /// Returns `true` if an entry for `key` exists.
    pub fn contains(&self, key: &M::Key) -> bool {
        self.shared.map.borrow().find(key).is_some()
    }

    /// Membership test for an arbitrary Lua value.
    ///
    /// This is a total predicate: a value that is not of the native key type
    /// is reported as absent instead of raising a type error. A caller that
    /// passes the wrong kind of key therefore gets `false`, never an error.
    pub fn contains_value(&self, key: &Value) -> bool {
        M::Key::match_key(key).is_some_and(|key| self.contains(&key))
    }

    /// Returns a lazy sequence over the keys, in native order.
    pub fn iter(&self) -> KeyIter<M> {
        KeyIter::new(self.clone())
    }

    /// Returns an aliased reference to the value stored for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::KeyNotFound`] if the key is absent, or
    /// [`MapError::Busy`] if the map is mutably borrowed.
    pub fn get_item(&self, key: M::Key) -> Result<ValueRef<M>, MapError> {
        if self.read()?.find(&key).is_none() {
            return Err(self.missing(&key));
        }
        Ok(ValueRef {
            adapter: self.clone(),
            key,
        })
    }

    /// Removes the entry for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::KeyNotFound`] if the key is absent, or
    /// [`MapError::Busy`] if the map is borrowed.
    pub fn delete_item(&self, key: &M::Key) -> Result<(), MapError> {
        let removed = self.write()?.erase(key);
        match removed {
            Some(_) => {
                trace!(class = %self.class_name(), key = ?key, "deleted item");
                Ok(())
            }
            None => Err(self.missing(key)),
        }
    }

    /// Returns a new live view over the keys.
    pub fn keys(&self) -> KeyView<M> {
        trace!(class = %self.class_name(), "created key view");
        KeyView::new(self.clone())
    }

    /// Returns a new live view over the values.
    pub fn values(&self) -> ValueView<M> {
        trace!(class = %self.class_name(), "created value view");
        ValueView::new(self.clone())
    }

    /// Returns a new live view over the entries.
    pub fn items(&self) -> ItemView<M> {
        trace!(class = %self.class_name(), "created item view");
        ItemView::new(self.clone())
    }

    /// Runs `action` against the native map.
    pub fn with_map<R>(&self, action: impl FnOnce(&M) -> R) -> R {
        action(&*self.shared.map.borrow())
    }

    /// Runs `action` against the native map, mutably.
    ///
    /// Changes are visible through every view and sequence derived from
    /// this adapter.
    pub fn with_map_mut<R>(&self, action: impl FnOnce(&mut M) -> R) -> R {
        action(&mut *self.shared.map.borrow_mut())
    }

    /// Returns the number of live handles sharing this map: adapters, views,
    /// sequences and value references.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.shared)
    }

    /// Returns `true` if both adapters expose the same map.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn read(&self) -> Result<Ref<'_, M>, MapError> {
        self.shared.map.try_borrow().map_err(|_| self.busy())
    }

    pub(crate) fn write(&self) -> Result<RefMut<'_, M>, MapError> {
        self.shared.map.try_borrow_mut().map_err(|_| self.busy())
    }

    /// Clones the value stored for `key` out of the map.
    pub(crate) fn cloned_value(&self, key: &M::Key) -> Result<M::Value, MapError> {
        let value = self.read()?.find(key).cloned();
        value.ok_or_else(|| self.missing(key))
    }

    /// Writes `value` with the strategy `S`.
    pub(crate) fn store<S: Settable<M::Value>>(
        &self,
        key: M::Key,
        value: M::Value,
    ) -> Result<(), MapError> {
        trace!(
            class = %self.class_name(),
            key = ?key,
            strategy = <S as WriteStrategy<M::Value>>::NAME,
            "set item"
        );
        let mut map = self.write()?;
        S::write(&mut *map, key, value);
        Ok(())
    }

    pub(crate) fn missing(&self, key: &M::Key) -> MapError {
        trace!(class = %self.class_name(), key = ?key, "key not found");
        MapError::KeyNotFound {
            key: format!("{key:?}"),
        }
    }

    fn busy(&self) -> MapError {
        MapError::Busy {
            class: self.class_name().to_string(),
        }
    }
}

impl<M> MapAdapter<M>
where
    M: NativeMap,
    Strategy<M>: Settable<M::Value>,
{
    /// Inserts or overwrites the entry for `key`.
    ///
    /// Only available when the value type has a write strategy. With
    /// [`AssignInPlace`](crate::AssignInPlace) the existing slot is
    /// overwritten (or default-constructed first); with
    /// [`EraseAndReconstruct`](crate::EraseAndReconstruct) an existing entry
    /// is erased and a new one inserted.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Busy`] if the map is borrowed.
    pub fn set_item(&self, key: M::Key, value: M::Value) -> Result<(), MapError> {
        self.store::<Strategy<M>>(key, value)
    }
}

impl<M: NativeMap> Clone for MapAdapter<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<M: NativeMap> Default for MapAdapter<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: NativeMap> From<M> for MapAdapter<M> {
    fn from(map: M) -> Self {
        Self::from_map(map)
    }
}

impl<M: NativeMap> fmt::Debug for MapAdapter<M> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MapAdapter")
            .field("class", &self.class_name())
            .field("len", &self.read().map(|map| map.len()).ok())
            .finish()
    }
}

impl<M: NativeMap> IntoIterator for &MapAdapter<M> {
    type Item = M::Key;
    type IntoIter = KeyIter<M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// ValueRef
// =============================================================================

/// An aliased reference to a value stored in a map.
///
/// The reference names its entry by key and keeps the map alive. Reads and
/// writes go to the live slot, so a write through one `ValueRef` is visible
/// to every later read of that key. If the entry is deleted, later accesses
/// report [`MapError::KeyNotFound`].
pub struct ValueRef<M: NativeMap> {
    adapter: MapAdapter<M>,
    key: M::Key,
}

impl<M: NativeMap> ValueRef<M> {
    /// Returns the key this reference points at.
    pub const fn key(&self) -> &M::Key {
        &self.key
    }

    /// Returns the adapter owning the referenced entry.
    pub const fn adapter(&self) -> &MapAdapter<M> {
        &self.adapter
    }

    /// Borrows the stored value.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::KeyNotFound`] if the entry was deleted, or
    /// [`MapError::Busy`] if the map is mutably borrowed.
    pub fn get(&self) -> Result<Ref<'_, M::Value>, MapError> {
        let map = self.adapter.read()?;
        Ref::filter_map(map, |map| map.find(&self.key))
            .map_err(|_| self.adapter.missing(&self.key))
    }

    /// Mutably borrows the stored value.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::KeyNotFound`] if the entry was deleted, or
    /// [`MapError::Busy`] if the map is borrowed.
    pub fn get_mut(&self) -> Result<RefMut<'_, M::Value>, MapError> {
        let map = self.adapter.write()?;
        RefMut::filter_map(map, |map| map.find_mut(&self.key))
            .map_err(|_| self.adapter.missing(&self.key))
    }

    /// Clones the stored value.
    ///
    /// # Errors
    ///
    /// Same as [`get`](ValueRef::get).
    pub fn cloned(&self) -> Result<M::Value, MapError> {
        self.adapter.cloned_value(&self.key)
    }
}

impl<M: NativeMap> Clone for ValueRef<M> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            key: self.key.clone(),
        }
    }
}

impl<M: NativeMap> fmt::Debug for ValueRef<M> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ValueRef")
            .field("class", &self.adapter.class_name())
            .field("key", &self.key)
            .finish()
    }
}
