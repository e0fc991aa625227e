//! Benchmark for MapAdapter vs direct native map access.
//!
//! Measures the cost the adapter adds over the underlying container for key
//! iteration, lookups and both write strategies, and the cost of the same
//! operations driven from Lua.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mapbind::{MapAdapter, MapValue, bind_map};
use mlua::{FromLua, IntoLua, Lua, Value};
use std::collections::{BTreeMap, HashMap};
use std::hint::black_box;

/// An integer value written with erase-and-reconstruct.
#[derive(Clone)]
struct Rebuilt(i64);

impl IntoLua for Rebuilt {
    fn into_lua(self, lua: &Lua) -> mlua::Result<Value> {
        self.0.into_lua(lua)
    }
}

impl FromLua for Rebuilt {
    fn from_lua(value: Value, lua: &Lua) -> mlua::Result<Self> {
        i64::from_lua(value, lua).map(Rebuilt)
    }
}

impl MapValue for Rebuilt {
    type Write = mapbind::EraseAndReconstruct;
    type Access = mapbind::ByValue;
}

// =============================================================================
// iterate_keys Benchmark
// =============================================================================

fn benchmark_iterate_keys(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("iterate_keys");

    for size in [100, 1000, 10000] {
        let tree: MapAdapter<BTreeMap<i64, i64>> =
            MapAdapter::from_map((0..size).map(|index| (index, index * 2)).collect());
        let hash: MapAdapter<HashMap<i64, i64>> =
            MapAdapter::from_map((0..size).map(|index| (index, index * 2)).collect());

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &size, |bencher, _| {
            bencher.iter(|| black_box(tree.iter().sum::<i64>()));
        });

        group.bench_with_input(BenchmarkId::new("BTreeMap native", size), &size, |bencher, _| {
            bencher.iter(|| black_box(tree.with_map(|native| native.keys().sum::<i64>())));
        });

        group.bench_with_input(BenchmarkId::new("HashMap", size), &size, |bencher, _| {
            bencher.iter(|| black_box(hash.iter().sum::<i64>()));
        });

        group.bench_with_input(BenchmarkId::new("HashMap native", size), &size, |bencher, _| {
            bencher.iter(|| black_box(hash.with_map(|native| native.keys().sum::<i64>())));
        });

        group.bench_with_input(BenchmarkId::new("HashMap items", size), &size, |bencher, _| {
            bencher.iter(|| {
                black_box(hash.items().iter().map(|(key, value)| key + value).sum::<i64>())
            });
        });
    }

    group.finish();
}

// =============================================================================
// get_item Benchmark
// =============================================================================

fn benchmark_get_item(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("get_item");

    for size in [100, 1000, 10000] {
        let map: MapAdapter<BTreeMap<i64, i64>> =
            MapAdapter::from_map((0..size).map(|index| (index, index * 2)).collect());

        group.bench_with_input(BenchmarkId::new("ValueRef", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut sum = 0;
                for key in 0..size {
                    if let Ok(value) = map.get_item(black_box(key)) {
                        sum += value.cloned().unwrap_or_default();
                    }
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

// =============================================================================
// set_item Benchmark
// =============================================================================

fn benchmark_set_item(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("set_item");

    for size in [100, 1000, 10000] {
        group.bench_with_input(BenchmarkId::new("AssignInPlace", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let map: MapAdapter<BTreeMap<i64, i64>> = MapAdapter::new();
                for round in 0..2 {
                    for key in 0..size {
                        let _ = map.set_item(black_box(key), black_box(round));
                    }
                }
                black_box(map)
            });
        });

        group.bench_with_input(
            BenchmarkId::new("EraseAndReconstruct", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let map: MapAdapter<BTreeMap<i64, Rebuilt>> = MapAdapter::new();
                    for round in 0..2 {
                        for key in 0..size {
                            let _ = map.set_item(black_box(key), Rebuilt(black_box(round)));
                        }
                    }
                    black_box(map)
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// lua_round_trip Benchmark
// =============================================================================

fn benchmark_lua_round_trip(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("lua_round_trip");
    let lua = Lua::new();
    if let Err(error) = bind_map::<BTreeMap<i64, i64>>(&lua, &lua.globals(), "Numbers") {
        panic!("failed to bind benchmark class: {error}");
    }

    for size in [100, 1000] {
        let script = format!(
            r#"
            local numbers = Numbers.new()
            for index = 1, {size} do numbers[index] = index end
            local total = 0
            for key, value in numbers:items():iter() do total = total + value end
            return total
            "#
        );
        let chunk = lua.load(script.as_str()).into_function();
        let Ok(chunk) = chunk else {
            panic!("failed to compile benchmark script");
        };

        group.bench_with_input(BenchmarkId::new("write_then_iterate", size), &size, |bencher, _| {
            bencher.iter(|| black_box(chunk.call::<i64>(())));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_iterate_keys,
    benchmark_get_item,
    benchmark_set_item,
    benchmark_lua_round_trip
);
criterion_main!(benches);
