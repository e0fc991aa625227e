//! Key and value capabilities.
//!
//! A map can only be exposed when its key type is a [`MapKey`] and its value
//! type a [`MapValue`]. The value type also decides, at compile time, how
//! (and whether) entries are written:
//!
//! - [`AssignInPlace`]: overwrite the existing slot, or a default-constructed
//!   one for a new key. Requires `Default`.
//! - [`EraseAndReconstruct`]: insert a new entry; when the key is already
//!   present, erase the old entry first and insert again.
//! - [`ReadOnly`]: no write operation at all.
//!
//! It also decides how a read from Lua hands the value out:
//!
//! - [`ByValue`]: `m[k]` converts a clone of the stored value.
//! - [`ByReference`]: `m[k]` returns a [`ValueAlias`] userdata whose field
//!   reads, field writes and method calls go to the live slot, so
//!   `m[k].count = 5` changes the stored value. Requires a `UserData` value.
//!
//! # Examples
//!
//! ```rust
//! use mapbind::{ByValue, EraseAndReconstruct, MapValue};
//! use mlua::{FromLua, IntoLua, Lua, Value};
//!
//! // A value with no sensible default, so it cannot be assigned in place.
//! #[derive(Clone)]
//! struct Port(u16);
//!
//! impl IntoLua for Port {
//!     fn into_lua(self, lua: &Lua) -> mlua::Result<Value> {
//!         self.0.into_lua(lua)
//!     }
//! }
//!
//! impl FromLua for Port {
//!     fn from_lua(value: Value, lua: &Lua) -> mlua::Result<Self> {
//!         u16::from_lua(value, lua).map(Port)
//!     }
//! }
//!
//! impl MapValue for Port {
//!     type Write = EraseAndReconstruct;
//!     type Access = ByValue;
//! }
//! ```

use std::fmt;

use mlua::{FromLua, IntoLua, Lua, UserData, Value};
use tracing::trace;

use crate::adapter::{MapAdapter, ValueRef};
use crate::alias::ValueAlias;
use crate::native::NativeMap;

// =============================================================================
// Keys
// =============================================================================

/// A type usable as the key of an exposed map.
///
/// [`match_key`](MapKey::match_key) is a strict runtime-type match: it never
/// applies Lua's string/number coercions, so the string `"1"` does not match
/// the integer key `1`. Membership tests rely on this to stay total.
///
/// `u64` and `usize` keys above `i64::MAX` are handed to Lua as floats.
/// Those that a float represents exactly (such as `2^63`) match again on
/// the way back; the others round to a neighbouring float and do not.
pub trait MapKey: Clone + fmt::Debug + 'static {
    /// Returns the native key if `value` has the matching runtime type.
    fn match_key(value: &Value) -> Option<Self>;

    /// Converts the key into a Lua value.
    ///
    /// # Errors
    ///
    /// Returns an error if Lua fails to allocate the value.
    fn to_lua(&self, lua: &Lua) -> mlua::Result<Value>;
}

/// Converts an integral float into an integer, the way Lua normalizes
/// float table keys.
#[allow(
    clippy::float_cmp,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
fn integral(number: f64) -> Option<i64> {
    let in_range = number >= i64::MIN as f64 && number < i64::MAX as f64;
    (number.fract() == 0.0 && in_range).then(|| number as i64)
}

/// Converts an integral float in `[2^63, 2^64)` into an unsigned integer.
///
/// `u64` keys above `i64::MAX` reach Lua as floats, so this is the way back.
#[allow(
    clippy::float_cmp,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn integral_unsigned(number: f64) -> Option<u64> {
    let in_range = number >= i64::MAX as f64 && number < u64::MAX as f64;
    (number.fract() == 0.0 && in_range).then(|| number as u64)
}

macro_rules! integer_key {
    ($($integer:ty),* $(,)?) => {
        $(
            impl MapKey for $integer {
                fn match_key(value: &Value) -> Option<Self> {
                    match value {
                        Value::Integer(integer) => Self::try_from(*integer).ok(),
                        Value::Number(number) => integral(*number)
                            .and_then(|integer| Self::try_from(integer).ok())
                            .or_else(|| {
                                integral_unsigned(*number)
                                    .and_then(|integer| Self::try_from(integer).ok())
                            }),
                        _ => None,
                    }
                }

                fn to_lua(&self, lua: &Lua) -> mlua::Result<Value> {
                    (*self).into_lua(lua)
                }
            }
        )*
    };
}

integer_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl MapKey for bool {
    fn match_key(value: &Value) -> Option<Self> {
        match value {
            Value::Boolean(boolean) => Some(*boolean),
            _ => None,
        }
    }

    fn to_lua(&self, _lua: &Lua) -> mlua::Result<Value> {
        Ok(Value::Boolean(*self))
    }
}

impl MapKey for String {
    fn match_key(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => text.to_str().ok().map(|text| (*text).to_owned()),
            _ => None,
        }
    }

    fn to_lua(&self, lua: &Lua) -> mlua::Result<Value> {
        lua.create_string(self).map(Value::String)
    }
}

/// Converts a Lua argument into a native key, or rejects it at the call
/// boundary.
pub(crate) fn expect_key<K: MapKey>(value: &Value) -> mlua::Result<K> {
    K::match_key(value).ok_or_else(|| mlua::Error::FromLuaConversionError {
        from: value.type_name(),
        to: std::any::type_name::<K>().to_string(),
        message: Some("value is not a key of this map".to_string()),
    })
}

// =============================================================================
// Values
// =============================================================================

/// A type usable as the value of an exposed map.
///
/// `Write` selects the write strategy. Picking [`AssignInPlace`] for a type
/// that is not `Default + FromLua`, or [`EraseAndReconstruct`] for a type
/// that is not `FromLua`, does not compile.
///
/// `Access` selects what a Lua read returns: a converted clone
/// ([`ByValue`]) or an alias of the live slot ([`ByReference`], for
/// `UserData` values only).
pub trait MapValue: IntoLua + Clone + 'static {
    /// How `set` writes entries of this type.
    type Write: WriteStrategy<Self>;

    /// How `m[k]` hands entries of this type to Lua.
    type Access: ValueAccess<Self>;
}

macro_rules! assignable_value {
    ($($value:ty),* $(,)?) => {
        $(
            impl MapValue for $value {
                type Write = AssignInPlace;
                type Access = ByValue;
            }
        )*
    };
}

assignable_value!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String
);

/// `None` is stored with `m:set(k, nil)`. Assigning `m[k] = nil` deletes
/// the entry instead, like it does for every other value type.
impl<T: MapValue + FromLua> MapValue for Option<T> {
    type Write = AssignInPlace;
    type Access = ByValue;
}

impl<T: MapValue + FromLua> MapValue for Vec<T> {
    type Write = AssignInPlace;
    type Access = ByValue;
}

// =============================================================================
// Value Access
// =============================================================================

/// How a value read from Lua is handed out.
pub trait ValueAccess<V>: 'static {
    /// Name used in diagnostics.
    const NAME: &'static str;

    /// Converts the entry `value` names into the Lua value `m[k]` returns.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::KeyNotFound`](crate::MapError::KeyNotFound) or
    /// [`MapError::Busy`](crate::MapError::Busy) if the entry cannot be
    /// read, or an error if Lua fails to allocate the value.
    fn value_to_lua<M>(value: ValueRef<M>, lua: &Lua) -> mlua::Result<Value>
    where
        M: NativeMap<Value = V>;
}

/// Reads convert a clone of the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByValue;

/// Reads return a [`ValueAlias`] of the live slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByReference;

impl<V: IntoLua + Clone + 'static> ValueAccess<V> for ByValue {
    const NAME: &'static str = "by-value";

    fn value_to_lua<M>(value: ValueRef<M>, lua: &Lua) -> mlua::Result<Value>
    where
        M: NativeMap<Value = V>,
    {
        value.cloned()?.into_lua(lua)
    }
}

impl<V: UserData + Clone + 'static> ValueAccess<V> for ByReference {
    const NAME: &'static str = "by-reference";

    fn value_to_lua<M>(value: ValueRef<M>, lua: &Lua) -> mlua::Result<Value>
    where
        M: NativeMap<Value = V>,
    {
        lua.create_userdata(ValueAlias::new(value)).map(Value::UserData)
    }
}

// =============================================================================
// Write Strategies
// =============================================================================

/// The Lua-facing side of a write strategy.
pub trait WriteStrategy<V>: 'static {
    /// Name used in diagnostics.
    const NAME: &'static str;

    /// Whether the `set` method is part of the Lua surface.
    const EXPOSED: bool;

    /// Handles `m[key] = value` and `m:set(key, value)` from Lua.
    ///
    /// # Errors
    ///
    /// Returns a conversion error for a key or value of the wrong type, and
    /// [`MapError::ReadOnly`](crate::MapError::ReadOnly) when the value type
    /// has no write strategy.
    fn assign_from_lua<M>(
        adapter: &MapAdapter<M>,
        lua: &Lua,
        key: &Value,
        value: Value,
    ) -> mlua::Result<()>
    where
        M: NativeMap<Value = V>;
}

/// A write strategy that can store values of type `V`.
pub trait Settable<V>: WriteStrategy<V> {
    /// Inserts or overwrites the entry for `key`.
    fn write<M>(map: &mut M, key: M::Key, value: V)
    where
        M: NativeMap<Value = V>;
}

/// Overwrites the slot for the key, default-constructing it first when the
/// key is new.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignInPlace;

/// Inserts a fresh entry, erasing any existing entry for the key first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraseAndReconstruct;

/// No write operation is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOnly;

fn assign_with<S, M>(
    adapter: &MapAdapter<M>,
    lua: &Lua,
    key: &Value,
    value: Value,
) -> mlua::Result<()>
where
    S: Settable<M::Value>,
    M: NativeMap,
    M::Value: FromLua,
{
    let key = expect_key::<M::Key>(key)?;
    let value = match ValueAlias::<M::Value>::resolve(&value) {
        Some(aliased) => aliased?,
        None => M::Value::from_lua(value, lua)?,
    };
    adapter.store::<S>(key, value).map_err(mlua::Error::from)
}

impl<V: FromLua + Default + 'static> WriteStrategy<V> for AssignInPlace {
    const NAME: &'static str = "assign-in-place";
    const EXPOSED: bool = true;

    fn assign_from_lua<M>(
        adapter: &MapAdapter<M>,
        lua: &Lua,
        key: &Value,
        value: Value,
    ) -> mlua::Result<()>
    where
        M: NativeMap<Value = V>,
    {
        assign_with::<Self, M>(adapter, lua, key, value)
    }
}

impl<V: FromLua + Default + 'static> Settable<V> for AssignInPlace {
    fn write<M>(map: &mut M, key: M::Key, value: V)
    where
        M: NativeMap<Value = V>,
    {
        *map.slot_or_default(key) = value;
    }
}

impl<V: FromLua + 'static> WriteStrategy<V> for EraseAndReconstruct {
    const NAME: &'static str = "erase-and-reconstruct";
    const EXPOSED: bool = true;

    fn assign_from_lua<M>(
        adapter: &MapAdapter<M>,
        lua: &Lua,
        key: &Value,
        value: Value,
    ) -> mlua::Result<()>
    where
        M: NativeMap<Value = V>,
    {
        assign_with::<Self, M>(adapter, lua, key, value)
    }
}

impl<V: FromLua + 'static> Settable<V> for EraseAndReconstruct {
    fn write<M>(map: &mut M, key: M::Key, value: V)
    where
        M: NativeMap<Value = V>,
    {
        if let Err((key, value)) = map.emplace(key, value) {
            trace!(key = ?key, "key exists, reconstructing entry");
            map.erase(&key);
            let reinserted = map.emplace(key, value);
            debug_assert!(reinserted.is_ok());
        }
    }
}

impl<V: 'static> WriteStrategy<V> for ReadOnly {
    const NAME: &'static str = "read-only";
    const EXPOSED: bool = false;

    fn assign_from_lua<M>(
        adapter: &MapAdapter<M>,
        _lua: &Lua,
        _key: &Value,
        _value: Value,
    ) -> mlua::Result<()>
    where
        M: NativeMap<Value = V>,
    {
        Err(crate::MapError::ReadOnly {
            class: adapter.class_name().to_string(),
        }
        .into())
    }
}

static_assertions::assert_impl_all!(
    AssignInPlace: Settable<i64>,
    Settable<String>,
    Settable<Option<f64>>
);
static_assertions::assert_impl_all!(EraseAndReconstruct: Settable<i64>, Settable<Vec<String>>);
static_assertions::assert_not_impl_any!(ReadOnly: Settable<i64>, Settable<String>);
