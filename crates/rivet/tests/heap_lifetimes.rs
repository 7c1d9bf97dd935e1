//! Reference-count lifetimes: cells free exactly when the last holder lets
//! go, and the heap returns to its baseline after user values are released.

use rivet::{Args, Runtime, RuntimeConfig, Value};

fn runtime() -> Runtime {
    Runtime::with_console(RuntimeConfig::default(), Box::new(rivet::NoConsole))
}

#[test]
fn clones_and_releases_balance() {
    let mut rt = runtime();
    let s = rt.string("shared").unwrap();
    assert_eq!(rt.value_refcount(&s), 1);

    let extra = rt.clone_value(&s);
    assert_eq!(rt.value_refcount(&s), 2);
    rt.release(extra);
    assert_eq!(rt.value_refcount(&s), 1);
    rt.release(s);
}

#[test]
fn container_release_frees_children() {
    let mut rt = runtime();
    let baseline = rt.heap_stats().live_cells;

    let o = rt.object().unwrap();
    let inner = rt.string("payload").unwrap();
    let inner_probe = rt.clone_value(&inner);
    rt.set(&o, "data", inner).unwrap();
    assert_eq!(rt.value_refcount(&inner_probe), 2, "slot plus probe");

    rt.release(o);
    assert_eq!(rt.value_refcount(&inner_probe), 1, "slot reference released with the object");
    rt.release(inner_probe);

    assert_eq!(rt.heap_stats().live_cells, baseline);
}

#[test]
fn slot_overwrites_release_the_previous_value() {
    let mut rt = runtime();
    let o = rt.object().unwrap();
    let first = rt.string("first").unwrap();
    let probe = rt.clone_value(&first);
    rt.set(&o, "x", first).unwrap();
    assert_eq!(rt.value_refcount(&probe), 2);

    rt.set(&o, "x", Value::number(2.0)).unwrap();
    assert_eq!(rt.value_refcount(&probe), 1, "overwrite released the slot reference");

    rt.release(probe);
    rt.release(o);
}

#[test]
fn freed_slots_are_reused() {
    let mut rt = runtime();
    let before = rt.heap_stats();

    let values: Vec<Value> = (0..16).map(|i| rt.string(format!("v{i}")).unwrap()).collect();
    for v in values {
        rt.release(v);
    }

    let after = rt.heap_stats();
    assert_eq!(after.live_cells, before.live_cells);
    assert!(after.free_slots >= 16, "released cells land on the free list");

    // New allocations reuse the freed slots instead of growing the arena.
    let grown = after.total_slots;
    let v = rt.string("reused").unwrap();
    assert_eq!(rt.heap_stats().total_slots, grown);
    rt.release(v);
}

#[test]
fn pending_reactions_keep_their_promise_alive() {
    let mut rt = runtime();

    let promise = rt.promise_resolve_value(Value::number(1.0)).unwrap();
    let handler = rt
        .method("", |rt, this, mut args| {
            rt.release(this);
            let v = args.take(0);
            rt.release_args(args);
            rt.release(v);
            Ok(Value::undefined())
        })
        .unwrap();
    let derived = rt.promise_then(&promise, handler, Value::undefined()).unwrap();
    let derived_probe = rt.clone_value(&derived);
    rt.release(derived);
    rt.release(promise);

    // The queued reaction still holds the derived promise.
    assert!(rt.value_refcount(&derived_probe) >= 2);
    rt.run_event_loop();
    assert_eq!(rt.value_refcount(&derived_probe), 1, "reaction reference dropped after it ran");
    rt.release(derived_probe);
}

#[test]
fn argument_packs_release_unconsumed_values() {
    let mut rt = runtime();
    let sink = rt
        .method("sink", |rt, this, args| {
            rt.release(this);
            rt.release_args(args);
            Ok(Value::undefined())
        })
        .unwrap();

    let payload = rt.string("argument").unwrap();
    let probe = rt.clone_value(&payload);
    let result = rt.call(&sink, Value::undefined(), Args::from_values([payload])).unwrap();
    rt.release(result);

    assert_eq!(rt.value_refcount(&probe), 1, "callee released the argument");
    rt.release(probe);
    rt.release(sink);
}

#[test]
fn prototype_constructor_pairs_are_cyclic_by_design() {
    // A function and its prototype object reference each other; releasing
    // the function value alone must not free either cell. This documents the
    // accepted leak for cycles.
    let mut rt = runtime();
    let before = rt.heap_stats().live_cells;
    let f = rt
        .function("Cyclic", |rt, this, args| {
            rt.release(this);
            rt.release_args(args);
            Ok(Value::undefined())
        })
        .unwrap();
    rt.release(f);
    assert!(rt.heap_stats().live_cells > before, "the ctor/prototype cycle stays live");
}
