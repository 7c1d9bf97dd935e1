//! Object model: shape sharing, enumeration order, deletion masking,
//! descriptors and the prototype chain.

use rivet::{Args, Runtime, RuntimeConfig, Value};

fn runtime() -> Runtime {
    Runtime::with_console(RuntimeConfig::default(), Box::new(rivet::NoConsole))
}

#[test]
fn same_write_sequence_shares_the_shape() {
    let mut rt = runtime();
    let a = rt.object().unwrap();
    let b = rt.object().unwrap();
    for target in [&a, &b] {
        rt.set(target, "x", Value::number(1.0)).unwrap();
        rt.set(target, "y", Value::number(2.0)).unwrap();
    }

    assert_eq!(rt.shape_of(&a), rt.shape_of(&b));
    assert_eq!(rt.slot_count_of(&a), rt.slot_count_of(&b));

    // Diverging one object does not disturb the other's layout.
    let before = rt.shape_of(&b);
    rt.set(&a, "z", Value::number(3.0)).unwrap();
    assert_ne!(rt.shape_of(&a), rt.shape_of(&b));
    assert_eq!(rt.shape_of(&b), before);

    rt.release(a);
    rt.release(b);
}

#[test]
fn enumeration_order_is_write_order() {
    let mut rt = runtime();
    let o = rt.object().unwrap();
    for (name, n) in [("first", 1.0), ("second", 2.0), ("third", 3.0)] {
        rt.set(&o, name, Value::number(n)).unwrap();
    }
    assert_eq!(rt.own_enumerable_names(&o).unwrap(), ["first", "second", "third"]);

    // Overwrites keep the original position.
    rt.set(&o, "second", Value::number(20.0)).unwrap();
    assert_eq!(rt.own_enumerable_names(&o).unwrap(), ["first", "second", "third"]);
    let v = rt.get(&o, "second").unwrap();
    assert_eq!(v.as_number(), 20.0);

    rt.release(o);
}

#[test]
fn deleted_names_are_masked_and_readd_moves_to_the_end() {
    let mut rt = runtime();
    let o = rt.object().unwrap();
    rt.set(&o, "a", Value::number(1.0)).unwrap();
    rt.set(&o, "b", Value::number(2.0)).unwrap();
    rt.set(&o, "c", Value::number(3.0)).unwrap();

    assert!(rt.delete(&o, "b").unwrap());
    assert_eq!(rt.own_enumerable_names(&o).unwrap(), ["a", "c"]);
    let gone = rt.get(&o, "b").unwrap();
    assert!(gone.is_undefined());
    assert!(!rt.has_own(&o, "b").unwrap());

    // Re-adding enumerates last, as if the property were new.
    rt.set(&o, "b", Value::number(4.0)).unwrap();
    assert_eq!(rt.own_enumerable_names(&o).unwrap(), ["a", "c", "b"]);
    let back = rt.get(&o, "b").unwrap();
    assert_eq!(back.as_number(), 4.0);

    rt.release(o);
}

#[test]
fn read_only_properties_reject_writes() {
    let mut rt = runtime();
    let o = rt.object().unwrap();
    let v = rt.string("fixed").unwrap();
    rt.define_data_property_flags(&o, "constant", v, false, true, true).unwrap();

    let err = rt.set(&o, "constant", Value::number(1.0)).unwrap_err();
    let rendered = format!("{err:?}");
    assert!(rendered.contains("read only"), "unexpected error: {rendered}");
    rt.release_error(err);

    // The original value is untouched.
    let current = rt.get(&o, "constant").unwrap();
    assert_eq!(rt.to_js_string(&current).unwrap(), "fixed");
    rt.release(current);
    rt.release(o);
}

#[test]
fn accessors_run_with_the_original_receiver() {
    let mut rt = runtime();
    let proto = rt.object().unwrap();

    // get doubled() { return this.base * 2; }  -- defined on the prototype.
    let getter = rt
        .method("doubled", |rt, this, args| {
            rt.release_args(args);
            let base = rt.get(&this, "base")?;
            let doubled = rt.mul(&base, &Value::number(2.0));
            rt.release(base);
            rt.release(this);
            Ok(doubled)
        })
        .unwrap();
    rt.define_getter(&proto, "doubled", getter).unwrap();

    let receiver = rt.object_with_proto(rt.clone_value(&proto)).unwrap();
    rt.set(&receiver, "base", Value::number(21.0)).unwrap();

    let result = rt.get(&receiver, "doubled").unwrap();
    assert_eq!(result.as_number(), 42.0);

    rt.release(receiver);
    rt.release(proto);
}

#[test]
fn setters_on_the_prototype_intercept_writes() {
    let mut rt = runtime();
    let proto = rt.object().unwrap();

    let setter = rt
        .method("tracked", |rt, this, mut args| {
            let value = args.take(0);
            rt.release_args(args);
            let result = rt.set(&this, "written", value);
            rt.release(this);
            result?;
            Ok(Value::undefined())
        })
        .unwrap();
    rt.define_setter(&proto, "tracked", setter).unwrap();

    let receiver = rt.object_with_proto(rt.clone_value(&proto)).unwrap();
    rt.set(&receiver, "tracked", Value::number(5.0)).unwrap();

    // The setter ran against the receiver, not the prototype.
    let written = rt.get(&receiver, "written").unwrap();
    assert_eq!(written.as_number(), 5.0);
    assert!(!rt.has_own(&proto, "written").unwrap());

    rt.release(receiver);
    rt.release(proto);
}

#[test]
fn getter_only_accessors_reject_assignment() {
    let mut rt = runtime();
    let o = rt.object().unwrap();
    let getter = rt
        .method("", |rt, this, args| {
            rt.release(this);
            rt.release_args(args);
            Ok(Value::number(1.0))
        })
        .unwrap();
    rt.define_getter(&o, "lonely", getter).unwrap();

    let err = rt.set(&o, "lonely", Value::number(2.0)).unwrap_err();
    rt.release_error(err);
    rt.release(o);
}

#[test]
fn has_own_property_is_presence_only() {
    let mut rt = runtime();
    let proto = rt.object().unwrap();
    rt.set(&proto, "inherited", Value::number(1.0)).unwrap();
    let o = rt.object_with_proto(rt.clone_value(&proto)).unwrap();
    rt.set(&o, "own", Value::number(2.0)).unwrap();

    let check = |rt: &mut Runtime, target: &Value, name: &str| -> bool {
        let arg = rt.string(name).unwrap();
        let result = rt.call_method(target, "hasOwnProperty", Args::from_values([arg])).unwrap();
        let answer = result.as_boolean();
        rt.release(result);
        answer
    };

    assert!(check(&mut rt, &o, "own"));
    assert!(!check(&mut rt, &o, "inherited"));
    assert!(rt.has_property_named(&o, "inherited").unwrap());

    rt.release(o);
    rt.release(proto);
}

#[test]
fn object_spread_copies_own_enumerable_keys() {
    let mut rt = runtime();
    let source = rt.object().unwrap();
    rt.set(&source, "a", Value::number(1.0)).unwrap();
    rt.set(&source, "b", Value::number(2.0)).unwrap();
    let hidden = rt.string("x").unwrap();
    rt.define_data_property_flags(&source, "hidden", hidden, true, false, true)
        .unwrap();

    let copy = rt.object().unwrap();
    rt.spread_into_object(&copy, &source).unwrap();

    assert_eq!(rt.own_enumerable_names(&copy).unwrap(), rt.own_enumerable_names(&source).unwrap());
    assert!(!rt.has_own(&copy, "hidden").unwrap());

    rt.release(copy);
    rt.release(source);
}

#[test]
fn prototype_chain_walks_to_the_root() {
    let mut rt = runtime();
    let grandparent = rt.object().unwrap();
    rt.set(&grandparent, "depth", Value::number(2.0)).unwrap();
    let parent = rt.object_with_proto(rt.clone_value(&grandparent)).unwrap();
    let child = rt.object_with_proto(rt.clone_value(&parent)).unwrap();

    let found = rt.get(&child, "depth").unwrap();
    assert_eq!(found.as_number(), 2.0);
    let missing = rt.get(&child, "absent").unwrap();
    assert!(missing.is_undefined());

    rt.release(child);
    rt.release(parent);
    rt.release(grandparent);
}

/// Test-side helper: errors may own heap values and must be released.
trait ReleaseError {
    fn release_error(&mut self, err: rivet::RunError);
}

impl ReleaseError for Runtime {
    fn release_error(&mut self, err: rivet::RunError) {
        match err {
            rivet::RunError::Thrown(value) => self.release(value),
            rivet::RunError::Exc(_) => {}
        }
    }
}
