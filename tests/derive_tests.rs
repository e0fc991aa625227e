//! Tests for the `MapValue` derive macro.
//!
//! Each write strategy is derived for a small value type and then exercised
//! through a map adapter, from Rust and from Lua.

use mapbind::{
    AssignInPlace, ByReference, ByValue, EraseAndReconstruct, MapAdapter, MapError, MapValue, ReadOnly, Settable,
    WriteStrategy, bind_map,
};
use mlua::{FromLua, IntoLua, Lua, UserData, UserDataFields, Value};
use rstest::rstest;
use std::collections::{BTreeMap, HashMap};

// =============================================================================
// Test Value Types
// =============================================================================

/// A userdata handle with no default, so it can only be reconstructed.
/// Lua reads alias the stored handle.
#[derive(Debug, Clone, PartialEq, MapValue)]
#[map_value(write = "reconstruct", access = "reference")]
struct Handle {
    id: u32,
}

impl UserData for Handle {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("id", |_, this| Ok(this.id));
        fields.add_field_method_set("id", |_, this, id: u32| {
            this.id = id;
            Ok(())
        });
    }
}

impl FromLua for Handle {
    fn from_lua(value: Value, _lua: &Lua) -> mlua::Result<Self> {
        match value {
            Value::UserData(userdata) => userdata.borrow::<Self>().map(|handle| handle.clone()),
            _ => Err(mlua::Error::FromLuaConversionError {
                from: value.type_name(),
                to: "Handle".to_string(),
                message: Some("expected Handle userdata".to_string()),
            }),
        }
    }
}

/// A counter that is overwritten in place.
#[derive(Debug, Clone, Default, PartialEq, MapValue)]
#[map_value(write = "assign")]
struct Counter(i64);

impl IntoLua for Counter {
    fn into_lua(self, lua: &Lua) -> mlua::Result<Value> {
        self.0.into_lua(lua)
    }
}

impl FromLua for Counter {
    fn from_lua(value: Value, lua: &Lua) -> mlua::Result<Self> {
        i64::from_lua(value, lua).map(Counter)
    }
}

/// A value that is never written through the adapter.
#[derive(Debug, Clone, PartialEq, MapValue)]
#[map_value(write = "read_only")]
struct Snapshot {
    taken_at: u64,
}

impl IntoLua for Snapshot {
    fn into_lua(self, lua: &Lua) -> mlua::Result<Value> {
        self.taken_at.into_lua(lua)
    }
}

/// A value that relies on the default strategy.
#[derive(Debug, Clone, PartialEq, MapValue)]
struct Label(String);

impl IntoLua for Label {
    fn into_lua(self, lua: &Lua) -> mlua::Result<Value> {
        self.0.into_lua(lua)
    }
}

impl FromLua for Label {
    fn from_lua(value: Value, lua: &Lua) -> mlua::Result<Self> {
        String::from_lua(value, lua).map(Label)
    }
}

static_assertions::assert_type_eq_all!(<Handle as MapValue>::Write, EraseAndReconstruct);
static_assertions::assert_type_eq_all!(<Counter as MapValue>::Write, AssignInPlace);
static_assertions::assert_type_eq_all!(<Snapshot as MapValue>::Write, ReadOnly);
static_assertions::assert_type_eq_all!(<Label as MapValue>::Write, EraseAndReconstruct);
static_assertions::assert_type_eq_all!(<Handle as MapValue>::Access, ByReference);
static_assertions::assert_type_eq_all!(<Counter as MapValue>::Access, ByValue);
static_assertions::assert_type_eq_all!(<Label as MapValue>::Access, ByValue);
static_assertions::assert_not_impl_any!(ReadOnly: Settable<Snapshot>);

// =============================================================================
// Erase-and-Reconstruct Tests
// =============================================================================

#[rstest]
fn test_reconstruct_set_twice_keeps_one_entry_with_second_value() {
    let handles: MapAdapter<BTreeMap<String, Handle>> = MapAdapter::new();

    handles.set_item("main".to_string(), Handle { id: 1 }).unwrap();
    assert_eq!(handles.len(), 1);
    handles.set_item("main".to_string(), Handle { id: 2 }).unwrap();

    assert_eq!(handles.len(), 1);
    assert_eq!(
        handles.get_item("main".to_string()).unwrap().cloned(),
        Ok(Handle { id: 2 })
    );
}

#[rstest]
fn test_reconstruct_over_hash_map() {
    let labels: MapAdapter<HashMap<i64, Label>> = MapAdapter::new();
    labels.set_item(1, Label("one".to_string())).unwrap();
    labels.set_item(1, Label("uno".to_string())).unwrap();

    assert_eq!(labels.len(), 1);
    assert_eq!(labels.values().iter().collect::<Vec<_>>(), vec![Label("uno".to_string())]);
}

#[rstest]
fn test_reconstruct_from_lua_userdata() {
    let lua = Lua::new();
    let handles: MapAdapter<BTreeMap<String, Handle>> = MapAdapter::new();
    lua.globals().set("handles", handles.clone()).unwrap();
    lua.globals().set("first", Handle { id: 7 }).unwrap();
    lua.globals().set("second", Handle { id: 8 }).unwrap();

    let id: u32 = lua
        .load(
            r#"
            handles["main"] = first
            handles:set("main", second)
            assert(#handles == 1)
            return handles["main"].id
            "#,
        )
        .eval()
        .unwrap();

    assert_eq!(id, 8);
    assert_eq!(handles.len(), 1);
}

#[rstest]
fn test_reference_access_writes_reach_the_stored_handle() {
    let lua = Lua::new();
    let handles: MapAdapter<BTreeMap<String, Handle>> = MapAdapter::new();
    handles.set_item("main".to_string(), Handle { id: 1 }).unwrap();
    lua.globals().set("handles", handles.clone()).unwrap();

    let (before, after): (u32, u32) = lua
        .load(
            r#"
            local main = handles["main"]
            local before = main.id
            main.id = 30
            return before, handles["main"].id
            "#,
        )
        .eval()
        .unwrap();

    assert_eq!((before, after), (1, 30));
    assert_eq!(
        handles.get_item("main".to_string()).unwrap().cloned(),
        Ok(Handle { id: 30 })
    );
}

// =============================================================================
// Assign-in-Place Tests
// =============================================================================

#[rstest]
fn test_assign_overwrites_slot() {
    let counters: MapAdapter<BTreeMap<String, Counter>> = MapAdapter::new();
    counters.set_item("hits".to_string(), Counter(1)).unwrap();
    counters.set_item("hits".to_string(), Counter(2)).unwrap();

    assert_eq!(counters.len(), 1);
    assert_eq!(counters.get_item("hits".to_string()).unwrap().cloned(), Ok(Counter(2)));
}

#[rstest]
fn test_assign_from_lua_bound_class() {
    let lua = Lua::new();
    bind_map::<BTreeMap<String, Counter>>(&lua, &lua.globals(), "Counters").unwrap();

    let hits: i64 = lua
        .load(
            r#"
            local counters = Counters.new()
            counters["hits"] = 1
            counters["hits"] = counters["hits"] + 1
            return counters["hits"]
            "#,
        )
        .eval()
        .unwrap();
    assert_eq!(hits, 2);
}

// =============================================================================
// Read-Only Tests
// =============================================================================

#[rstest]
fn test_read_only_values_are_readable() {
    let lua = Lua::new();
    let snapshots: MapAdapter<BTreeMap<String, Snapshot>> =
        MapAdapter::named("Snapshots", BTreeMap::new());
    snapshots.with_map_mut(|native| native.insert("boot".to_string(), Snapshot { taken_at: 42 }));
    lua.globals().set("snapshots", snapshots.clone()).unwrap();

    let taken_at: u64 = lua.load(r#"return snapshots["boot"]"#).eval().unwrap();
    assert_eq!(taken_at, 42);

    let error = lua.load(r#"snapshots["boot"] = 1"#).exec().unwrap_err();
    assert_eq!(
        MapError::from_lua_error(&error),
        Some(&MapError::ReadOnly {
            class: "Snapshots".to_string()
        })
    );
    assert!(!<ReadOnly as WriteStrategy<Snapshot>>::EXPOSED);
}
