//! Operator and coercion semantics: equality families, addition, relational
//! comparisons, `typeof`/`in`/`instanceof`/`delete`, optional chaining and
//! spread.

use rivet::{Args, Runtime, RuntimeConfig, Value};

fn runtime() -> Runtime {
    Runtime::with_console(RuntimeConfig::default(), Box::new(rivet::NoConsole))
}

#[test]
fn strict_equality_is_identity_except_nan() {
    let mut rt = runtime();

    let n = Value::number(3.5);
    assert!(rt.strict_eq(&n, &n));
    let nan = Value::number(f64::NAN);
    assert!(!rt.strict_eq(&nan, &nan), "NaN is never equal to itself");
    assert!(rt.strict_eq(&Value::number(0.0), &Value::number(-0.0)));

    let a = rt.string("abc").unwrap();
    let b = rt.string("abc").unwrap();
    assert!(rt.strict_eq(&a, &b), "strings compare by content");

    let o1 = rt.object().unwrap();
    let o2 = rt.object().unwrap();
    let o1_again = rt.clone_value(&o1);
    assert!(rt.strict_eq(&o1, &o1_again));
    assert!(!rt.strict_eq(&o1, &o2), "objects compare by identity");

    assert!(!rt.strict_eq(&Value::number(1.0), &a));

    rt.release(a);
    rt.release(b);
    rt.release(o1);
    rt.release(o1_again);
    rt.release(o2);
}

#[test]
fn loose_equality_null_and_undefined_pair_up() {
    let mut rt = runtime();
    assert!(rt.loose_eq(&Value::null(), &Value::undefined()).unwrap());
    assert!(rt.loose_eq(&Value::undefined(), &Value::null()).unwrap());
    assert!(!rt.loose_eq(&Value::null(), &Value::number(0.0)).unwrap());
    assert!(!rt.loose_eq(&Value::undefined(), &Value::boolean(false)).unwrap());

    let five = rt.string("5").unwrap();
    assert!(rt.loose_eq(&Value::number(5.0), &five).unwrap());
    assert!(rt.loose_eq(&five, &Value::number(5.0)).unwrap());
    assert!(rt.loose_eq(&Value::boolean(true), &Value::number(1.0)).unwrap());
    rt.release(five);
}

#[test]
fn addition_concatenates_when_a_string_is_involved() {
    let mut rt = runtime();

    let sum = rt.add(&Value::number(1.0), &Value::number(2.0)).unwrap();
    assert_eq!(sum.as_number(), 3.0);

    let prefix = rt.string("n = ").unwrap();
    let joined = rt.add(&prefix, &Value::number(4.0)).unwrap();
    assert_eq!(rt.to_js_string(&joined).unwrap(), "n = 4");
    rt.release(joined);
    rt.release(prefix);

    let one = rt.string("1").unwrap();
    let two = rt.string("2").unwrap();
    let concat = rt.add(&one, &two).unwrap();
    assert_eq!(rt.to_js_string(&concat).unwrap(), "12");
    rt.release(concat);
    rt.release(one);
    rt.release(two);
}

#[test]
fn relational_comparisons() {
    let mut rt = runtime();
    assert!(rt.lt(&Value::number(1.0), &Value::number(2.0)));
    assert!(!rt.lt(&Value::number(f64::NAN), &Value::number(2.0)));
    assert!(!rt.gt(&Value::number(f64::NAN), &Value::number(2.0)));

    let a = rt.string("apple").unwrap();
    let b = rt.string("banana").unwrap();
    assert!(rt.lt(&a, &b), "string pairs compare lexicographically");
    // String versus number compares numerically.
    let ten = rt.string("10").unwrap();
    assert!(rt.lt(&Value::number(9.0), &ten));
    rt.release(a);
    rt.release(b);
    rt.release(ten);
}

#[test]
fn typeof_reports_the_language_types() {
    let mut rt = runtime();
    assert_eq!(rt.type_of(&Value::undefined()), "undefined");
    assert_eq!(rt.type_of(&Value::null()), "object");
    assert_eq!(rt.type_of(&Value::boolean(true)), "boolean");
    assert_eq!(rt.type_of(&Value::number(1.0)), "number");
    let s = rt.string("x").unwrap();
    assert_eq!(rt.type_of(&s), "string");
    rt.release(s);
    let o = rt.object().unwrap();
    assert_eq!(rt.type_of(&o), "object");
    rt.release(o);
    let f = rt.method("f", |rt, this, args| {
        rt.release(this);
        rt.release_args(args);
        Ok(Value::undefined())
    });
    let f = f.unwrap();
    assert_eq!(rt.type_of(&f), "function");
    rt.release(f);
}

#[test]
fn in_requires_an_object_kind_operand() {
    let mut rt = runtime();
    let o = rt.object().unwrap();
    rt.set(&o, "present", Value::number(1.0)).unwrap();

    let key = rt.string("present").unwrap();
    assert!(rt.in_op(&key, &o).unwrap());
    rt.release(key);
    let key = rt.string("absent").unwrap();
    assert!(!rt.in_op(&key, &o).unwrap());

    let err = rt.in_op(&key, &Value::number(1.0)).unwrap_err();
    match err {
        rivet::RunError::Thrown(v) => rt.release(v),
        rivet::RunError::Exc(exc) => assert_eq!(exc.exc_type, rivet::ExcType::TypeError),
    }
    rt.release(key);
    rt.release(o);
}

#[test]
fn instanceof_walks_the_prototype_chain() {
    let mut rt = runtime();
    let ctor = rt.function("Widget", |rt, this, args| {
        rt.release_args(args);
        rt.release(this);
        Ok(Value::undefined())
    });
    let ctor = ctor.unwrap();

    let instance = rt.construct(&ctor, Args::new()).unwrap();
    assert!(rt.instance_of(&instance, &ctor).unwrap());

    let unrelated = rt.object().unwrap();
    assert!(!rt.instance_of(&unrelated, &ctor).unwrap());

    // Error cells chain through their constructor's prototype.
    let error_ctor = rt.global_get("TypeError").unwrap();
    let base_ctor = rt.global_get("Error").unwrap();
    let msg = rt.string("nope").unwrap();
    let error = rt.construct(&error_ctor, Args::from_values([msg])).unwrap();
    assert!(rt.instance_of(&error, &error_ctor).unwrap());
    assert!(rt.instance_of(&error, &base_ctor).unwrap());

    rt.release(error);
    rt.release(error_ctor);
    rt.release(base_ctor);
    rt.release(instance);
    rt.release(unrelated);
    rt.release(ctor);
}

#[test]
fn optional_chain_short_circuits_on_nullish() {
    let mut rt = runtime();
    let missing = rt.get_optional(&Value::null(), "whatever").unwrap();
    assert!(missing.is_undefined());
    let missing = rt.get_optional(&Value::undefined(), "whatever").unwrap();
    assert!(missing.is_undefined());

    // A non-nullish base reads normally.
    let o = rt.object().unwrap();
    rt.set(&o, "x", Value::number(1.0)).unwrap();
    let x = rt.get_optional(&o, "x").unwrap();
    assert_eq!(x.as_number(), 1.0);
    rt.release(o);

    // Nullish coalescing keys off the same predicate.
    assert!(rt.is_nullish(&Value::null()));
    assert!(!rt.is_nullish(&Value::number(0.0)));
}

#[test]
fn spreading_a_non_iterable_raises() {
    let mut rt = runtime();
    let target = rt.array(Vec::new()).unwrap();
    let err = rt.spread_into_array(&target, &Value::number(5.0)).unwrap_err();
    match err {
        rivet::RunError::Thrown(v) => rt.release(v),
        rivet::RunError::Exc(exc) => assert_eq!(exc.exc_type, rivet::ExcType::TypeError),
    }
    rt.release(target);
}

#[test]
fn strings_spread_by_element() {
    let mut rt = runtime();
    let target = rt.array(Vec::new()).unwrap();
    let s = rt.string("hola").unwrap();
    rt.spread_into_array(&target, &s).unwrap();
    let text = rt.to_js_string(&target).unwrap();
    assert_eq!(text, "h,o,l,a");
    rt.release(s);
    rt.release(target);
}

#[test]
fn string_length_counts_storage_units() {
    let mut rt = runtime();
    let plain = rt.string("cafe").unwrap();
    let len = rt.get(&plain, "length").unwrap();
    assert_eq!(len.as_number(), 4.0);
    rt.release(plain);

    // A two-unit encoding counts both units, and charCodeAt reads the raw
    // unit value at the offset.
    let accented = rt.string("café").unwrap();
    let len = rt.get(&accented, "length").unwrap();
    assert_eq!(len.as_number(), 5.0);
    let code = rt
        .call_method(&accented, "charCodeAt", Args::from_values([Value::number(3.0)]))
        .unwrap();
    assert_eq!(code.as_number(), 195.0);
    let ascii = rt
        .call_method(&accented, "charAt", Args::from_values([Value::number(0.0)]))
        .unwrap();
    assert_eq!(rt.to_js_string(&ascii).unwrap(), "c");
    rt.release(ascii);
    rt.release(accented);
}

#[test]
fn function_call_law() {
    // f.call(t, a, b) behaves exactly like f(a, b) with t as the receiver.
    let mut rt = runtime();
    let f = rt
        .method("sum", |rt, this, mut args| {
            let a = args.take(0);
            let b = args.take(1);
            rt.release_args(args);
            let base = rt.get(&this, "base")?;
            rt.release(this);
            let ab = rt.add(&a, &b)?;
            let total = rt.add(&ab, &base)?;
            rt.release(a);
            rt.release(b);
            rt.release(ab);
            rt.release(base);
            Ok(total)
        })
        .unwrap();

    let receiver = rt.object().unwrap();
    rt.set(&receiver, "base", Value::number(100.0)).unwrap();

    let direct = rt
        .call(
            &f,
            rt.clone_value(&receiver),
            Args::from_values([Value::number(1.0), Value::number(2.0)]),
        )
        .unwrap();

    let via_call = rt
        .call_method(
            &f,
            "call",
            Args::from_values([rt.clone_value(&receiver), Value::number(1.0), Value::number(2.0)]),
        )
        .unwrap();

    assert_eq!(direct.as_number(), via_call.as_number());
    assert_eq!(direct.as_number(), 103.0);

    rt.release(receiver);
    rt.release(f);
}

#[test]
fn number_to_string_follows_default_formatting() {
    let mut rt = runtime();
    for (n, expected) in [
        (0.0, "0"),
        (42.0, "42"),
        (-7.5, "-7.5"),
        (0.1, "0.1"),
        (1e21, "1e+21"),
        (1e-7, "1e-7"),
        (f64::NAN, "NaN"),
        (f64::INFINITY, "Infinity"),
    ] {
        assert_eq!(rt.to_js_string(&Value::number(n)).unwrap(), expected);
    }
}
