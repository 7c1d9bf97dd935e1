//! Generator semantics: two-way value flow, early return, thrown-in
//! exceptions, and iterator identity.

use rivet::{Args, GenBody, Resume, RunError, RunResult, Runtime, Step, Value};

fn runtime() -> Runtime {
    Runtime::with_console(rivet::RuntimeConfig::default(), Box::new(rivet::NoConsole))
}

/// The lowered form of:
/// ```js
/// function* addOne() { let x = 0; while (true) { x = yield x + 1; } }
/// ```
struct AddOne;

impl GenBody for AddOne {
    fn step(&mut self, rt: &mut Runtime, input: Resume) -> RunResult<Step> {
        match input {
            Resume::Return(v) => Ok(Step::Done(v)),
            Resume::Throw(e) => Err(RunError::Thrown(e)),
            Resume::Next(v) => {
                let x = if v.is_undefined() { 0.0 } else { v.as_number() };
                rt.release(v);
                Ok(Step::Yield(Value::number(x + 1.0)))
            }
        }
    }
}

/// Counts down from `n`, swallowing thrown-in errors once.
struct Tolerant {
    remaining: u32,
    caught: bool,
}

impl GenBody for Tolerant {
    fn step(&mut self, rt: &mut Runtime, input: Resume) -> RunResult<Step> {
        match input {
            Resume::Return(v) => Ok(Step::Done(v)),
            Resume::Throw(e) => {
                if self.caught {
                    // Only the first throw is handled; later ones unwind.
                    return Err(RunError::Thrown(e));
                }
                rt.release(e);
                self.caught = true;
                Ok(Step::Yield(rt.string("caught")?))
            }
            Resume::Next(v) => {
                rt.release(v);
                if self.remaining == 0 {
                    return Ok(Step::Done(Value::undefined()));
                }
                self.remaining -= 1;
                Ok(Step::Yield(Value::number(f64::from(self.remaining))))
            }
        }
    }
}

/// Drives `iter.next(input)` through the prototype method and reads the
/// result object.
fn next(rt: &mut Runtime, iter: &Value, input: Value) -> (Value, bool) {
    let result = rt.call_method(iter, "next", Args::from_values([input])).unwrap();
    let parts = rt.iter_result_parts(&result).unwrap();
    rt.release(result);
    parts
}

#[test]
fn two_way_value_flow() {
    let mut rt = runtime();
    let gen_fn = rt
        .generator("addOne", |_rt, _this, _args| Ok(Box::new(AddOne) as Box<dyn GenBody>))
        .unwrap();
    let iter = rt.call(&gen_fn, Value::undefined(), Args::new()).unwrap();

    let (value, done) = next(&mut rt, &iter, Value::undefined());
    assert_eq!(value.as_number(), 1.0);
    assert!(!done);

    let (value, done) = next(&mut rt, &iter, Value::number(10.0));
    assert_eq!(value.as_number(), 11.0);
    assert!(!done);

    let (value, done) = next(&mut rt, &iter, Value::number(20.0));
    assert_eq!(value.as_number(), 21.0);
    assert!(!done);

    let result = rt
        .call_method(&iter, "return", Args::from_values([Value::number(99.0)]))
        .unwrap();
    let (value, done) = rt.iter_result_parts(&result).unwrap();
    rt.release(result);
    assert_eq!(value.as_number(), 99.0);
    assert!(done);

    // Exhausted generators keep reporting the terminal state.
    let (value, done) = next(&mut rt, &iter, Value::undefined());
    assert!(value.is_undefined());
    assert!(done);

    rt.release(iter);
    rt.release(gen_fn);
}

#[test]
fn throw_can_be_caught_by_the_body() {
    let mut rt = runtime();
    let iter = {
        let gen_fn = rt
            .generator("countdown", |_rt, _this, _args| {
                Ok(Box::new(Tolerant {
                    remaining: 2,
                    caught: false,
                }) as Box<dyn GenBody>)
            })
            .unwrap();
        let iter = rt.call(&gen_fn, Value::undefined(), Args::new()).unwrap();
        rt.release(gen_fn);
        iter
    };

    let (value, done) = next(&mut rt, &iter, Value::undefined());
    assert_eq!(value.as_number(), 1.0);
    assert!(!done);

    // First throw is caught and iteration continues.
    let thrown = rt.string("boom").unwrap();
    let result = rt.iter_throw(&iter, thrown).unwrap();
    let (value, done) = rt.iter_result_parts(&result).unwrap();
    rt.release(result);
    assert_eq!(rt.to_js_string(&value).unwrap(), "caught");
    rt.release(value);
    assert!(!done);

    // Second throw propagates out of `throw`.
    let thrown = rt.string("boom again").unwrap();
    let err = rt.iter_throw(&iter, thrown).unwrap_err();
    match err {
        RunError::Thrown(v) => rt.release(v),
        RunError::Exc(_) => panic!("expected the thrown value to propagate"),
    }

    rt.release(iter);
}

#[test]
fn throw_into_fresh_generator_propagates() {
    let mut rt = runtime();
    let gen_fn = rt
        .generator("addOne", |_rt, _this, _args| Ok(Box::new(AddOne) as Box<dyn GenBody>))
        .unwrap();
    let iter = rt.call(&gen_fn, Value::undefined(), Args::new()).unwrap();

    let err = rt.iter_throw(&iter, Value::number(5.0)).unwrap_err();
    match err {
        RunError::Thrown(v) => assert_eq!(v.as_number(), 5.0),
        RunError::Exc(_) => panic!("expected the thrown value back"),
    }
    // The generator is dead afterwards.
    let (value, done) = next(&mut rt, &iter, Value::undefined());
    assert!(value.is_undefined());
    assert!(done);

    rt.release(iter);
    rt.release(gen_fn);
}

#[test]
fn iterators_are_their_own_iterable() {
    let mut rt = runtime();
    let gen_fn = rt
        .generator("addOne", |_rt, _this, _args| Ok(Box::new(AddOne) as Box<dyn GenBody>))
        .unwrap();
    let iter = rt.call(&gen_fn, Value::undefined(), Args::new()).unwrap();

    let again = rt.get_iterator(&iter).unwrap();
    assert!(rt.strict_eq(&iter, &again), "the iteration method returns the iterator itself");
    rt.release(again);

    rt.release(iter);
    rt.release(gen_fn);
}

#[test]
fn generators_spread_into_arrays() {
    struct Three(u32);
    impl GenBody for Three {
        fn step(&mut self, rt: &mut Runtime, input: Resume) -> RunResult<Step> {
            match input {
                Resume::Return(v) => Ok(Step::Done(v)),
                Resume::Throw(e) => Err(RunError::Thrown(e)),
                Resume::Next(v) => {
                    rt.release(v);
                    if self.0 >= 3 {
                        return Ok(Step::Done(Value::undefined()));
                    }
                    self.0 += 1;
                    Ok(Step::Yield(Value::number(f64::from(self.0))))
                }
            }
        }
    }

    let mut rt = runtime();
    let gen_fn = rt
        .generator("three", |_rt, _this, _args| Ok(Box::new(Three(0)) as Box<dyn GenBody>))
        .unwrap();
    let iter = rt.call(&gen_fn, Value::undefined(), Args::new()).unwrap();

    let collected = rt.array_from_iterable(&iter).unwrap();
    let text = rt.to_js_string(&collected).unwrap();
    assert_eq!(text, "1,2,3");

    rt.release(collected);
    rt.release(iter);
    rt.release(gen_fn);
}
