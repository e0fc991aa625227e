//! Aliased userdata values.
//!
//! A map whose value type uses [`ByReference`](crate::ByReference) access
//! hands `m[k]` to Lua as a [`ValueAlias`]: a userdata naming the entry by
//! key instead of a converted copy. Every field read, field write and method
//! call on the alias runs against the value stored in the map at that
//! moment, and writes land back in the map's own slot.
//!
//! ```lua
//! local c = counters["hits"]
//! c.count = 5
//! assert(counters["hits"].count == 5)
//! ```
//!
//! Internally each access materialises the stored value as a temporary
//! userdata, performs the access on it with the value type's own fields and
//! methods, and writes the result back. Assigning an alias into a map
//! (`other[k] = m[k]`) stores a copy of the aliased value.

use std::fmt;
use std::rc::Rc;

use mlua::{
    AnyUserData, Function, Lua, MetaMethod, MultiValue, ObjectLike, UserData, UserDataMethods,
    Value,
};

use crate::adapter::ValueRef;
use crate::error::MapError;
use crate::native::NativeMap;

/// The live slot behind an alias, with the map type erased.
trait Slot<V> {
    fn load(&self) -> Result<V, MapError>;

    fn store(&self, value: V) -> Result<(), MapError>;
}

impl<M: NativeMap> Slot<M::Value> for ValueRef<M> {
    fn load(&self) -> Result<M::Value, MapError> {
        self.cloned()
    }

    fn store(&self, value: M::Value) -> Result<(), MapError> {
        *self.get_mut()? = value;
        Ok(())
    }
}

/// A Lua-facing alias of one map entry.
///
/// The alias keeps its map alive. Once the entry is deleted, every access
/// raises [`MapError::KeyNotFound`].
pub struct ValueAlias<V> {
    slot: Rc<dyn Slot<V>>,
}

impl<V: 'static> ValueAlias<V> {
    pub(crate) fn new<M: NativeMap<Value = V>>(value: ValueRef<M>) -> Self {
        Self {
            slot: Rc::new(value),
        }
    }

    /// Clones the aliased value out of the map.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::KeyNotFound`] if the entry was deleted, or
    /// [`MapError::Busy`] if the map is mutably borrowed.
    pub fn load(&self) -> Result<V, MapError> {
        self.slot.load()
    }

    /// Overwrites the aliased value in the map.
    ///
    /// # Errors
    ///
    /// Same as [`load`](ValueAlias::load).
    pub fn store(&self, value: V) -> Result<(), MapError> {
        self.slot.store(value)
    }

    /// Loads the value behind `value` if it is an alias of a `V` entry.
    pub(crate) fn resolve(value: &Value) -> Option<Result<V, MapError>> {
        match value {
            Value::UserData(userdata) => userdata
                .borrow::<Self>()
                .ok()
                .map(|alias| alias.load()),
            _ => None,
        }
    }
}

impl<V: UserData + Clone + 'static> ValueAlias<V> {
    /// Materialises the stored value as a temporary userdata.
    fn receiver(&self, lua: &Lua) -> mlua::Result<AnyUserData> {
        lua.create_userdata(self.load()?)
    }

    fn write_back(&self, receiver: &AnyUserData) -> mlua::Result<()> {
        let updated = V::clone(&*receiver.borrow::<V>()?);
        self.store(updated)?;
        Ok(())
    }

    /// Wraps a method of the value type so that `alias:method(...)` runs on
    /// the stored value and keeps its effects.
    fn bind_method(&self, lua: &Lua, method: Function) -> mlua::Result<Function> {
        let alias = self.clone();
        lua.create_function(move |lua, mut arguments: MultiValue| {
            let receiver = alias.receiver(lua)?;
            let called_on_alias = matches!(
                arguments.front(),
                Some(Value::UserData(first)) if first.is::<Self>()
            );
            if called_on_alias {
                arguments.pop_front();
                arguments.push_front(Value::UserData(receiver.clone()));
            }
            let results: MultiValue = method.call(arguments)?;
            alias.write_back(&receiver)?;
            Ok(results)
        })
    }
}

impl<V> Clone for ValueAlias<V> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<V> fmt::Debug for ValueAlias<V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("ValueAlias").finish_non_exhaustive()
    }
}

impl<V: UserData + Clone + 'static> UserData for ValueAlias<V> {
    fn add_methods<T: UserDataMethods<Self>>(methods: &mut T) {
        methods.add_meta_method(MetaMethod::Index, |lua, this, key: Value| {
            let receiver = this.receiver(lua)?;
            match receiver.get::<Value>(key)? {
                Value::Function(method) => this.bind_method(lua, method).map(Value::Function),
                field => Ok(field),
            }
        });

        methods.add_meta_method(
            MetaMethod::NewIndex,
            |lua, this, (key, value): (Value, Value)| {
                let receiver = this.receiver(lua)?;
                receiver.set(key, value)?;
                this.write_back(&receiver)
            },
        );

        methods.add_meta_method(MetaMethod::ToString, |lua, this, ()| {
            let receiver = this.receiver(lua)?;
            let tostring: Function = lua.globals().get("tostring")?;
            tostring.call::<String>(receiver)
        });
    }
}
