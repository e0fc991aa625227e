//! Lazy sequences over a map.
//!
//! A [`Sequence`] walks the native iteration order of one map, one entry per
//! step, and projects each entry into a key, a value or a key/value pair.
//! It holds a handle to the map, so the map stays alive as long as the
//! sequence does. Sequences are single-pass; asking the adapter or view for
//! a new one starts over from the beginning of the current contents.
//!
//! [`Sequence::into_lua_function`] turns a sequence into a Lua iterator
//! function for use in a generic `for`.

use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use mlua::{Function, IntoLua, Lua, Value, Variadic};

use crate::adapter::MapAdapter;
use crate::capability::MapKey;
use crate::error::MapError;
use crate::native::NativeMap;

/// Projects a map entry into the item a sequence yields.
pub trait Projection<M: NativeMap>: 'static {
    /// The projected item.
    type Item;

    /// Clones the projected part of an entry out of the map.
    fn project(key: &M::Key, value: &M::Value) -> Self::Item;

    /// Converts a projected item into the values a Lua iterator returns.
    ///
    /// # Errors
    ///
    /// Returns an error if Lua fails to allocate the values.
    fn to_lua_values(lua: &Lua, item: Self::Item) -> mlua::Result<Variadic<Value>>;
}

/// Projects entries onto their keys.
#[derive(Debug, Clone, Copy)]
pub struct Keys;

/// Projects entries onto their values.
#[derive(Debug, Clone, Copy)]
pub struct Values;

/// Keeps whole entries as `(key, value)` pairs.
#[derive(Debug, Clone, Copy)]
pub struct Entries;

impl<M: NativeMap> Projection<M> for Keys {
    type Item = M::Key;

    fn project(key: &M::Key, _value: &M::Value) -> Self::Item {
        key.clone()
    }

    fn to_lua_values(lua: &Lua, item: Self::Item) -> mlua::Result<Variadic<Value>> {
        Ok(Variadic::from(vec![item.to_lua(lua)?]))
    }
}

impl<M: NativeMap> Projection<M> for Values {
    type Item = M::Value;

    fn project(_key: &M::Key, value: &M::Value) -> Self::Item {
        value.clone()
    }

    fn to_lua_values(lua: &Lua, item: Self::Item) -> mlua::Result<Variadic<Value>> {
        Ok(Variadic::from(vec![item.into_lua(lua)?]))
    }
}

impl<M: NativeMap> Projection<M> for Entries {
    type Item = (M::Key, M::Value);

    fn project(key: &M::Key, value: &M::Value) -> Self::Item {
        (key.clone(), value.clone())
    }

    fn to_lua_values(lua: &Lua, (key, value): Self::Item) -> mlua::Result<Variadic<Value>> {
        Ok(Variadic::from(vec![key.to_lua(lua)?, value.into_lua(lua)?]))
    }
}

/// A lazy sequence of keys.
pub type KeyIter<M> = Sequence<M, Keys>;

/// A lazy sequence of values.
pub type ValueIter<M> = Sequence<M, Values>;

/// A lazy sequence of `(key, value)` pairs.
pub type ItemIter<M> = Sequence<M, Entries>;

/// A lazy, single-pass sequence over the entries of a map.
///
/// # Panics
///
/// [`Iterator::next`] panics if the map is mutably borrowed through a live
/// [`ValueRef::get_mut`](crate::ValueRef::get_mut) guard. Use
/// [`try_next`](Sequence::try_next) to get [`MapError::Busy`] instead.
pub struct Sequence<M: NativeMap, P> {
    adapter: MapAdapter<M>,
    cursor: M::Cursor,
    finished: bool,
    projection: PhantomData<P>,
}

impl<M: NativeMap, P: Projection<M>> Sequence<M, P> {
    pub(crate) fn new(adapter: MapAdapter<M>) -> Self {
        Self {
            adapter,
            cursor: M::Cursor::default(),
            finished: false,
            projection: PhantomData,
        }
    }

    /// Returns the adapter this sequence walks.
    pub const fn adapter(&self) -> &MapAdapter<M> {
        &self.adapter
    }

    /// Advances the sequence.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Busy`] if the map is mutably borrowed.
    pub fn try_next(&mut self) -> Result<Option<P::Item>, MapError> {
        if self.finished {
            return Ok(None);
        }
        let map = self.adapter.read()?;
        let item = map
            .step(&mut self.cursor)
            .map(|(key, value)| P::project(key, value));
        self.finished = item.is_none();
        Ok(item)
    }

    /// Turns the sequence into a stateful Lua iterator function.
    ///
    /// Each call returns the next item (two values for entries) and nothing
    /// once the sequence is exhausted, which ends a generic `for`. The
    /// function keeps the map alive until Lua collects it.
    ///
    /// # Errors
    ///
    /// Returns an error if Lua fails to create the function.
    pub fn into_lua_function(mut self, lua: &Lua) -> mlua::Result<Function> {
        lua.create_function_mut(move |lua, ()| match self.try_next()? {
            Some(item) => P::to_lua_values(lua, item),
            None => Ok(Variadic::new()),
        })
    }
}

impl<M: NativeMap, P: Projection<M>> Iterator for Sequence<M, P> {
    type Item = P::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let cursor = &mut self.cursor;
        let item = self.adapter.with_map(|map| {
            map.step(cursor)
                .map(|(key, value)| P::project(key, value))
        });
        self.finished = item.is_none();
        item
    }
}

impl<M: NativeMap, P: Projection<M>> FusedIterator for Sequence<M, P> {}

impl<M: NativeMap, P> fmt::Debug for Sequence<M, P> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Sequence")
            .field("class", &self.adapter.class_name())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
