//! Lua bindings.
//!
//! [`MapAdapter`] and the three views are `mlua` userdata. [`bind_map`]
//! publishes a class table with a `new` constructor into a Lua scope, and an
//! existing adapter can be handed to Lua directly to share one map between
//! Rust and Lua.
//!
//! | Operation | Lua |
//! |---|---|
//! | construct | `Class.new()` |
//! | entry count | `#m` |
//! | emptiness | `m:is_non_empty()` |
//! | membership | `m:contains(k)` |
//! | iteration over keys | `for k in m:iter() do ... end` |
//! | read | `m[k]`, `m:get(k)` |
//! | write | `m[k] = v`, `m:set(k, v)` |
//! | delete | `m[k] = nil`, `m:delete(k)` |
//! | views | `m:keys()`, `m:values()`, `m:items()` |
//!
//! Methods take precedence over indexing, so on a string-keyed map `m.keys`
//! is the method; use `m:get("keys")` to read such an entry.
//!
//! `m[k] = nil` always deletes. A map of `Option<T>` stores `None` with
//! `m:set(k, nil)`.
//!
//! Reads follow the value type's access mode: values with
//! [`ByValue`](crate::ByValue) access arrive as converted copies, userdata
//! values with [`ByReference`](crate::ByReference) access arrive as a
//! [`ValueAlias`](crate::ValueAlias) of the live slot.
//!
//! Every hook reports a conflicting Rust borrow as
//! [`MapError::Busy`](crate::MapError::Busy); none of them panics.
//!
//! # Examples
//!
//! ```rust
//! use mapbind::bind_map;
//! use mlua::Lua;
//! use std::collections::BTreeMap;
//!
//! let lua = Lua::new();
//! bind_map::<BTreeMap<String, i64>>(&lua, &lua.globals(), "Scores").unwrap();
//!
//! let total: i64 = lua
//!     .load(
//!         r#"
//!         local scores = Scores.new()
//!         scores["alice"] = 3
//!         scores:set("bob", 4)
//!         local total = 0
//!         for name, score in scores:items():iter() do
//!             total = total + score
//!         end
//!         return total
//!         "#,
//!     )
//!     .eval()
//!     .unwrap();
//! assert_eq!(total, 7);
//! ```

use std::any::type_name;

use mlua::{FromLua, Lua, MetaMethod, Table, UserData, UserDataMethods, Value};
use tracing::debug;

use crate::adapter::{Access, MapAdapter, Strategy};
use crate::capability::{ValueAccess, WriteStrategy, expect_key};
use crate::native::NativeMap;
use crate::view::{ItemView, KeyView, ValueView};

/// Publishes a map class named `name` into `scope`.
///
/// The class is a table whose `new` function creates an empty map. Maps
/// created this way report `name` in `tostring` and in error messages. The
/// `set` method is only part of the class when the value type has a write
/// strategy.
///
/// # Errors
///
/// Returns an error if Lua fails to create or store the class table.
pub fn bind_map<M: NativeMap>(lua: &Lua, scope: &Table, name: &str) -> mlua::Result<Table> {
    let class = lua.create_table()?;
    let class_name = name.to_string();
    let constructor = lua.create_function(move |_, ()| {
        Ok(MapAdapter::<M>::named(class_name.clone(), M::default()))
    })?;
    class.set("new", constructor)?;
    class.set("__name", name)?;
    scope.set(name, class.clone())?;

    debug!(
        class = name,
        key = type_name::<M::Key>(),
        value = type_name::<M::Value>(),
        strategy = <Strategy<M> as WriteStrategy<M::Value>>::NAME,
        access = <Access<M> as ValueAccess<M::Value>>::NAME,
        "bound map class"
    );
    Ok(class)
}

fn get_from_lua<M: NativeMap>(
    lua: &Lua,
    map: &MapAdapter<M>,
    key: &Value,
) -> mlua::Result<Value> {
    let key = expect_key::<M::Key>(key)?;
    let value = map.get_item(key)?;
    <Access<M> as ValueAccess<M::Value>>::value_to_lua(value, lua)
}

fn delete_from_lua<M: NativeMap>(map: &MapAdapter<M>, key: &Value) -> mlua::Result<()> {
    let key = expect_key::<M::Key>(key)?;
    map.delete_item(&key).map_err(mlua::Error::from)
}

impl<M: NativeMap> UserData for MapAdapter<M> {
    fn add_methods<T: UserDataMethods<Self>>(methods: &mut T) {
        methods.add_meta_method(MetaMethod::Len, |_, this, ()| Ok(this.try_len()?));

        methods.add_method("is_non_empty", |_, this, ()| Ok(this.try_len()? > 0));

        // Total: keys of the wrong type are simply absent
        methods.add_method("contains", |_, this, key: Value| {
            Ok(this.try_contains_value(&key)?)
        });

        methods.add_method("iter", |lua, this, ()| this.iter().into_lua_function(lua));

        methods.add_meta_method(MetaMethod::Index, |lua, this, key: Value| {
            get_from_lua(lua, this, &key)
        });
        methods.add_method("get", |lua, this, key: Value| get_from_lua(lua, this, &key));

        methods.add_meta_method(
            MetaMethod::NewIndex,
            |lua, this, (key, value): (Value, Value)| {
                if value.is_nil() {
                    delete_from_lua(this, &key)
                } else {
                    <Strategy<M> as WriteStrategy<M::Value>>::assign_from_lua(
                        this, lua, &key, value,
                    )
                }
            },
        );
        if <Strategy<M> as WriteStrategy<M::Value>>::EXPOSED {
            methods.add_method("set", |lua, this, (key, value): (Value, Value)| {
                <Strategy<M> as WriteStrategy<M::Value>>::assign_from_lua(
                    this, lua, &key, value,
                )
            });
        }
        methods.add_method("delete", |_, this, key: Value| delete_from_lua(this, &key));

        methods.add_method("keys", |_, this, ()| Ok(this.keys()));
        methods.add_method("values", |_, this, ()| Ok(this.values()));
        methods.add_method("items", |_, this, ()| Ok(this.items()));

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("{}(len={})", this.class_name(), this.try_len()?))
        });
    }
}

impl<M: NativeMap> FromLua for MapAdapter<M> {
    fn from_lua(value: Value, _lua: &Lua) -> mlua::Result<Self> {
        match value {
            Value::UserData(userdata) => userdata
                .borrow::<Self>()
                .map(|adapter| Self::clone(&adapter)),
            _ => Err(mlua::Error::FromLuaConversionError {
                from: value.type_name(),
                to: type_name::<Self>().to_string(),
                message: Some("expected map userdata".to_string()),
            }),
        }
    }
}

impl<M: NativeMap> UserData for KeyView<M> {
    fn add_methods<T: UserDataMethods<Self>>(methods: &mut T) {
        methods.add_meta_method(MetaMethod::Len, |_, this, ()| Ok(this.map().try_len()?));
        methods.add_method("contains", |_, this, key: Value| {
            Ok(this.map().try_contains_value(&key)?)
        });
        methods.add_method("iter", |lua, this, ()| this.iter().into_lua_function(lua));
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("{}.keys(len={})", this.map().class_name(), this.map().try_len()?))
        });
    }
}

impl<M: NativeMap> UserData for ValueView<M> {
    fn add_methods<T: UserDataMethods<Self>>(methods: &mut T) {
        methods.add_meta_method(MetaMethod::Len, |_, this, ()| Ok(this.map().try_len()?));
        methods.add_method("iter", |lua, this, ()| this.iter().into_lua_function(lua));
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("{}.values(len={})", this.map().class_name(), this.map().try_len()?))
        });
    }
}

impl<M: NativeMap> UserData for ItemView<M> {
    fn add_methods<T: UserDataMethods<Self>>(methods: &mut T) {
        methods.add_meta_method(MetaMethod::Len, |_, this, ()| Ok(this.map().try_len()?));
        methods.add_method("iter", |lua, this, ()| this.iter().into_lua_function(lua));
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("{}.items(len={})", this.map().class_name(), this.map().try_len()?))
        });
    }
}
