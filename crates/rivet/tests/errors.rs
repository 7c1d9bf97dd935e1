//! Error taxonomy and the program boundary: thrown shapes, TDZ semantics,
//! and exit codes.

use rivet::{Args, CollectConsole, ExcType, RunError, Runtime, RuntimeConfig, Value};

fn collecting_runtime() -> (Runtime, CollectConsole) {
    let console = CollectConsole::new();
    let output = console.handle();
    let rt = Runtime::with_console(RuntimeConfig::default(), Box::new(console));
    (rt, output)
}

fn release_error(rt: &mut Runtime, err: RunError) {
    match err {
        RunError::Thrown(value) => rt.release(value),
        RunError::Exc(_) => {}
    }
}

#[test]
fn calling_a_non_function_is_a_type_error() {
    let (mut rt, _output) = collecting_runtime();
    let err = rt.call(&Value::number(5.0), Value::undefined(), Args::new()).unwrap_err();
    match &err {
        RunError::Exc(exc) => {
            assert_eq!(exc.exc_type, ExcType::TypeError);
            assert!(exc.message.contains("is not a function"));
        }
        RunError::Thrown(_) => panic!("expected a native TypeError"),
    }
    release_error(&mut rt, err);
}

#[test]
fn constructing_a_non_constructor_is_a_type_error() {
    let (mut rt, _output) = collecting_runtime();
    let o = rt.object().unwrap();
    let err = rt.construct(&o, Args::new()).unwrap_err();
    match &err {
        RunError::Exc(exc) => {
            assert_eq!(exc.exc_type, ExcType::TypeError);
            assert!(exc.message.contains("is not a constructor"));
        }
        RunError::Thrown(_) => panic!("expected a native TypeError"),
    }
    release_error(&mut rt, err);
    rt.release(o);
}

#[test]
fn property_access_on_nullish_is_a_type_error() {
    let (mut rt, _output) = collecting_runtime();
    for base in [Value::undefined(), Value::null()] {
        let err = rt.get(&base, "anything").unwrap_err();
        match &err {
            RunError::Exc(exc) => {
                assert_eq!(exc.exc_type, ExcType::TypeError);
                assert!(exc.message.contains("anything"));
            }
            RunError::Thrown(_) => panic!("expected a native TypeError"),
        }
        release_error(&mut rt, err);
    }
}

#[test]
fn dead_zone_reads_are_reference_errors() {
    let (mut rt, _output) = collecting_runtime();

    // Stack-resident binding.
    let binding = Value::uninitialized();
    let err = rt.tdz_check(&binding, "x").unwrap_err();
    match &err {
        RunError::Exc(exc) => {
            assert_eq!(exc.exc_type, ExcType::ReferenceError);
            assert!(exc.message.contains("'x'"));
        }
        RunError::Thrown(_) => panic!("expected a native ReferenceError"),
    }
    release_error(&mut rt, err);

    // The sentinel is distinct from plain undefined.
    assert!(rt.tdz_check(&Value::undefined(), "x").is_ok());

    // Shared cell binding: uninitialized until the first write.
    let cell = rt.new_cell(Value::uninitialized()).unwrap();
    let err = rt.cell_read(cell, "captured").unwrap_err();
    release_error(&mut rt, err);
    rt.cell_write(cell, Value::number(1.0));
    let value = rt.cell_read(cell, "captured").unwrap();
    assert_eq!(value.as_number(), 1.0);
    rt.cell_release(cell);
}

#[test]
fn undefined_globals_are_reference_errors() {
    let (mut rt, _output) = collecting_runtime();
    let err = rt.global_get("definitelyMissing").unwrap_err();
    match &err {
        RunError::Exc(exc) => {
            assert_eq!(exc.exc_type, ExcType::ReferenceError);
            assert!(exc.message.contains("definitelyMissing is not defined"));
        }
        RunError::Thrown(_) => panic!("expected a native ReferenceError"),
    }
    release_error(&mut rt, err);
}

#[test]
fn error_cells_compose_name_message_and_stack() {
    let (mut rt, _output) = collecting_runtime();
    let ctor = rt.global_get("RangeError").unwrap();
    let msg = rt.string("too big").unwrap();
    let error = rt.construct(&ctor, Args::from_values([msg])).unwrap();
    rt.release(ctor);

    let name = rt.get(&error, "name").unwrap();
    assert_eq!(rt.to_js_string(&name).unwrap(), "RangeError");
    rt.release(name);

    let message = rt.get(&error, "message").unwrap();
    assert_eq!(rt.to_js_string(&message).unwrap(), "too big");
    rt.release(message);

    let stack = rt.get(&error, "stack").unwrap();
    assert_eq!(rt.to_js_string(&stack).unwrap(), "RangeError: too big");
    rt.release(stack);

    let rendered = rt.call_method(&error, "toString", Args::new()).unwrap();
    assert_eq!(rt.to_js_string(&rendered).unwrap(), "RangeError: too big");
    rt.release(rendered);

    rt.release(error);
}

#[test]
fn any_value_is_a_legal_throw_target() {
    let (mut rt, _output) = collecting_runtime();
    let thrower = rt
        .method("", |_rt, _this, _args| Err(RunError::Thrown(Value::number(42.0))))
        .unwrap();
    let err = rt.call(&thrower, Value::undefined(), Args::new()).unwrap_err();
    match err {
        RunError::Thrown(v) => assert_eq!(v.as_number(), 42.0),
        RunError::Exc(_) => panic!("expected the raw thrown value"),
    }
    rt.release(thrower);
}

#[test]
fn clean_programs_exit_zero() {
    let (mut rt, output) = collecting_runtime();
    let code = rt.run_program(|rt| {
        let console = rt.global_get("console")?;
        let message = rt.string("done")?;
        let result = rt.call_method(&console, "log", Args::from_values([message]))?;
        rt.release(result);
        rt.release(console);
        Ok(Value::undefined())
    });
    assert_eq!(code, 0);
    assert_eq!(output.output(), "done\n");
}

#[test]
fn escaped_exceptions_exit_one_and_report() {
    let (mut rt, output) = collecting_runtime();
    let code = rt.run_program(|rt| Err(rt.throw(ExcType::TypeError, "boom")));
    assert_eq!(code, 1);
    assert_eq!(output.output(), "Uncaught TypeError: boom\n");
}

#[test]
fn timer_callback_exceptions_are_reported_but_do_not_stop_the_loop() {
    let (mut rt, output) = collecting_runtime();
    let set_timeout = rt.global_get("setTimeout").unwrap();

    let bad = rt
        .method("", |rt, this, args| {
            rt.release(this);
            rt.release_args(args);
            Err(rt.throw(ExcType::Error, "timer exploded"))
        })
        .unwrap();
    let id = rt
        .call(
            &set_timeout,
            Value::undefined(),
            Args::from_values([bad, Value::number(0.0)]),
        )
        .unwrap();
    rt.release(id);

    let good = rt
        .method("", |rt, this, args| {
            rt.release(this);
            rt.release_args(args);
            let console = rt.global_get("console")?;
            let message = rt.string("still alive")?;
            let result = rt.call_method(&console, "log", Args::from_values([message]))?;
            rt.release(result);
            rt.release(console);
            Ok(Value::undefined())
        })
        .unwrap();
    let id = rt
        .call(
            &set_timeout,
            Value::undefined(),
            Args::from_values([good, Value::number(0.0)]),
        )
        .unwrap();
    rt.release(id);
    rt.release(set_timeout);

    rt.run_event_loop();
    assert_eq!(output.output(), "Uncaught Error: timer exploded\nstill alive\n");
}

#[test]
fn invalid_array_length_is_a_range_error() {
    let (mut rt, _output) = collecting_runtime();
    let arr = rt.array(Vec::new()).unwrap();
    let err = rt.set(&arr, "length", Value::number(-1.0)).unwrap_err();
    match &err {
        RunError::Exc(exc) => assert_eq!(exc.exc_type, ExcType::RangeError),
        RunError::Thrown(_) => panic!("expected a native RangeError"),
    }
    release_error(&mut rt, err);
    rt.release(arr);
}
