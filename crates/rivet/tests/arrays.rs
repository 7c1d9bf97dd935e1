//! Array storage semantics: length coupling, truncation, canonical index
//! recognition, holes and the standard methods.

use rivet::{Args, Runtime, RuntimeConfig, Value};

fn runtime() -> Runtime {
    Runtime::with_console(RuntimeConfig::default(), Box::new(rivet::NoConsole))
}

fn length_of(rt: &mut Runtime, arr: &Value) -> f64 {
    let len = rt.get(arr, "length").unwrap();
    len.as_number()
}

#[test]
fn writing_past_the_end_extends_length() {
    let mut rt = runtime();
    let arr = rt.array(Vec::new()).unwrap();
    assert_eq!(length_of(&mut rt, &arr), 0.0);

    rt.set_index(&arr, 0, Value::number(10.0)).unwrap();
    assert_eq!(length_of(&mut rt, &arr), 1.0);

    rt.set_index(&arr, 4, Value::number(50.0)).unwrap();
    assert_eq!(length_of(&mut rt, &arr), 5.0);

    // The gap reads as undefined.
    let hole = rt.get_index(&arr, 2).unwrap();
    assert!(hole.is_undefined());

    rt.release(arr);
}

#[test]
fn shrinking_length_truncates_storage() {
    let mut rt = runtime();
    let elements = (0..5).map(|i| Value::number(f64::from(i))).collect();
    let arr = rt.array(elements).unwrap();

    rt.set(&arr, "length", Value::number(2.0)).unwrap();
    assert_eq!(length_of(&mut rt, &arr), 2.0);
    let kept = rt.get_index(&arr, 1).unwrap();
    assert_eq!(kept.as_number(), 1.0);
    let truncated = rt.get_index(&arr, 3).unwrap();
    assert!(truncated.is_undefined());

    rt.release(arr);
}

#[test]
fn invalid_lengths_raise() {
    let mut rt = runtime();
    let arr = rt.array(Vec::new()).unwrap();
    for bad in [-1.0, 1.5, f64::NAN, 4_294_967_296.0] {
        let err = rt.set(&arr, "length", Value::number(bad)).unwrap_err();
        assert!(format!("{err:?}").contains("Invalid array length"));
    }
    rt.release(arr);
}

#[test]
fn the_largest_u32_is_a_plain_string_key() {
    let mut rt = runtime();
    let arr = rt.array(Vec::new()).unwrap();

    rt.set(&arr, "4294967295", Value::number(1.0)).unwrap();
    assert_eq!(length_of(&mut rt, &arr), 0.0, "2^32 - 1 must not be an index");
    assert!(rt.has_own(&arr, "4294967295").unwrap());

    // One below it is a real index.
    rt.set(&arr, "4294967294", Value::number(2.0)).unwrap();
    assert_eq!(length_of(&mut rt, &arr), 4_294_967_295.0);

    rt.release(arr);
}

#[test]
fn far_indices_live_in_sparse_storage() {
    let mut rt = runtime();
    let arr = rt.array(Vec::new()).unwrap();
    rt.set_index(&arr, 0, Value::number(1.0)).unwrap();
    rt.set_index(&arr, 1_000_000, Value::number(2.0)).unwrap();

    assert_eq!(length_of(&mut rt, &arr), 1_000_001.0);
    let far = rt.get_index(&arr, 1_000_000).unwrap();
    assert_eq!(far.as_number(), 2.0);
    let near_miss = rt.get_index(&arr, 500_000).unwrap();
    assert!(near_miss.is_undefined());

    // Truncation reaches sparse entries too.
    rt.set(&arr, "length", Value::number(10.0)).unwrap();
    let gone = rt.get_index(&arr, 1_000_000).unwrap();
    assert!(gone.is_undefined());

    rt.release(arr);
}

#[test]
fn holes_render_empty_in_to_string() {
    let mut rt = runtime();
    // [1, , 3] via a delete-made hole.
    let arr = rt
        .array(vec![Value::number(1.0), Value::number(2.0), Value::number(3.0)])
        .unwrap();
    assert!(rt.delete(&arr, "1").unwrap());
    let text = rt.call_method(&arr, "toString", Args::new()).unwrap();
    assert_eq!(rt.to_js_string(&text).unwrap(), "1,,3");
    rt.release(text);
    rt.release(arr);

    // [null, undefined].toString() === ","
    let arr = rt.array(vec![Value::null(), Value::undefined()]).unwrap();
    let text = rt.call_method(&arr, "toString", Args::new()).unwrap();
    assert_eq!(rt.to_js_string(&text).unwrap(), ",");
    rt.release(text);
    rt.release(arr);
}

#[test]
fn non_index_names_go_to_the_named_table() {
    let mut rt = runtime();
    let arr = rt.array(vec![Value::number(1.0)]).unwrap();
    rt.set(&arr, "foo", Value::number(9.0)).unwrap();
    assert_eq!(length_of(&mut rt, &arr), 1.0);
    let foo = rt.get(&arr, "foo").unwrap();
    assert_eq!(foo.as_number(), 9.0);
    // Leading zeros and negatives are names, not indices.
    rt.set(&arr, "01", Value::number(1.0)).unwrap();
    rt.set(&arr, "-1", Value::number(1.0)).unwrap();
    assert_eq!(length_of(&mut rt, &arr), 1.0);
    rt.release(arr);
}

#[test]
fn standard_methods_roundtrip() {
    let mut rt = runtime();
    let arr = rt.array(vec![Value::number(1.0), Value::number(2.0)]).unwrap();

    let len = rt
        .call_method(&arr, "push", Args::from_values([Value::number(3.0)]))
        .unwrap();
    assert_eq!(len.as_number(), 3.0);

    let doubler = rt
        .method("", |rt, this, mut args| {
            rt.release(this);
            let x = args.take(0);
            rt.release_args(args);
            let doubled = rt.mul(&x, &Value::number(2.0));
            rt.release(x);
            Ok(doubled)
        })
        .unwrap();
    let doubled = rt.call_method(&arr, "map", Args::from_values([doubler])).unwrap();
    assert_eq!(rt.to_js_string(&doubled).unwrap(), "2,4,6");
    rt.release(doubled);

    let idx = rt
        .call_method(&arr, "indexOf", Args::from_values([Value::number(2.0)]))
        .unwrap();
    assert_eq!(idx.as_number(), 1.0);

    let sep = rt.string(" - ").unwrap();
    let joined = rt.call_method(&arr, "join", Args::from_values([sep])).unwrap();
    assert_eq!(rt.to_js_string(&joined).unwrap(), "1 - 2 - 3");
    rt.release(joined);

    let popped = rt.call_method(&arr, "pop", Args::new()).unwrap();
    assert_eq!(popped.as_number(), 3.0);
    assert_eq!(length_of(&mut rt, &arr), 2.0);

    rt.release(arr);
}

#[test]
fn array_iteration_follows_indices() {
    let mut rt = runtime();
    let arr = rt
        .array(vec![Value::number(7.0), Value::number(8.0), Value::number(9.0)])
        .unwrap();
    let copy = rt.array_from_iterable(&arr).unwrap();
    assert_eq!(rt.to_js_string(&copy).unwrap(), "7,8,9");
    assert!(!rt.strict_eq(&arr, &copy), "Array.from builds a fresh array");
    rt.release(copy);
    rt.release(arr);
}

#[test]
fn is_array_distinguishes_arrays() {
    let mut rt = runtime();
    let array_ctor = rt.global_get("Array").unwrap();
    let arr = rt.array(Vec::new()).unwrap();
    let obj = rt.object().unwrap();

    let check = |rt: &mut Runtime, candidate: &Value| -> bool {
        let ctor = rt.global_get("Array").unwrap();
        let arg = rt.clone_value(candidate);
        let result = rt.call_method(&ctor, "isArray", Args::from_values([arg])).unwrap();
        let answer = result.as_boolean();
        rt.release(ctor);
        answer
    };

    assert!(check(&mut rt, &arr));
    assert!(!check(&mut rt, &obj));

    rt.release(array_ctor);
    rt.release(arr);
    rt.release(obj);
}
