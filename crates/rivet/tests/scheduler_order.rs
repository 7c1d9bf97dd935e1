//! Event-loop ordering guarantees: microtask FIFO, timer (due, insertion)
//! order, and the rule that promise reactions never run inline.

use pretty_assertions::assert_eq;
use rivet::{Args, CollectConsole, Runtime, RuntimeConfig, Value};

fn collecting_runtime() -> (Runtime, CollectConsole) {
    let console = CollectConsole::new();
    let output = console.handle();
    let rt = Runtime::with_console(RuntimeConfig::default(), Box::new(console));
    (rt, output)
}

/// `console.log(text)` through the real builtin.
fn log(rt: &mut Runtime, text: &str) {
    let console = rt.global_get("console").unwrap();
    let message = rt.string(text).unwrap();
    let result = rt.call_method(&console, "log", Args::from_values([message])).unwrap();
    rt.release(result);
    rt.release(console);
}

/// A native callback that logs a fixed line when invoked.
fn logger(rt: &mut Runtime, text: &'static str) -> Value {
    rt.method("", move |rt, this, args| {
        rt.release(this);
        rt.release_args(args);
        let console = rt.global_get("console")?;
        let message = rt.string(text)?;
        let result = rt.call_method(&console, "log", Args::from_values([message]))?;
        rt.release(result);
        rt.release(console);
        Ok(Value::undefined())
    })
    .unwrap()
}

#[test]
fn microtask_runs_after_synchronous_code() {
    // Promise.resolve(1).then(v => log(v)); log(2);  =>  "2\n1\n"
    let (mut rt, output) = collecting_runtime();

    let promise = rt.promise_resolve_value(Value::number(1.0)).unwrap();
    let handler = rt
        .method("", |rt, this, mut args| {
            rt.release(this);
            let value = args.take(0);
            rt.release_args(args);
            let console = rt.global_get("console")?;
            let result = rt.call_method(&console, "log", Args::from_values([value]))?;
            rt.release(result);
            rt.release(console);
            Ok(Value::undefined())
        })
        .unwrap();
    let derived = rt.promise_then(&promise, handler, Value::undefined()).unwrap();
    rt.release(derived);
    rt.release(promise);

    log(&mut rt, "2");
    rt.run_event_loop();

    assert_eq!(output.output(), "2\n1\n");
}

#[test]
fn timers_fire_after_microtasks_in_due_order() {
    // setTimeout(t1, 10); setTimeout(t0, 0); Promise.resolve().then(mt);
    let (mut rt, output) = collecting_runtime();

    let set_timeout = rt.global_get("setTimeout").unwrap();
    let t1 = logger(&mut rt, "t1");
    let id = rt
        .call(
            &set_timeout,
            Value::undefined(),
            Args::from_values([t1, Value::number(10.0)]),
        )
        .unwrap();
    rt.release(id);
    let t0 = logger(&mut rt, "t0");
    let id = rt
        .call(
            &set_timeout,
            Value::undefined(),
            Args::from_values([t0, Value::number(0.0)]),
        )
        .unwrap();
    rt.release(id);
    rt.release(set_timeout);

    let promise = rt.promise_resolve_value(Value::undefined()).unwrap();
    let mt = logger(&mut rt, "mt");
    let derived = rt.promise_then(&promise, mt, Value::undefined()).unwrap();
    rt.release(derived);
    rt.release(promise);

    rt.run_event_loop();
    assert_eq!(output.output(), "mt\nt0\nt1\n");
}

#[test]
fn equal_due_times_fire_in_insertion_order() {
    let (mut rt, output) = collecting_runtime();
    let set_timeout = rt.global_get("setTimeout").unwrap();
    for text in ["first", "second", "third"] {
        let cb = logger(&mut rt, text);
        let id = rt
            .call(
                &set_timeout,
                Value::undefined(),
                Args::from_values([cb, Value::number(0.0)]),
            )
            .unwrap();
        rt.release(id);
    }
    rt.release(set_timeout);

    rt.run_event_loop();
    assert_eq!(output.output(), "first\nsecond\nthird\n");
}

#[test]
fn cleared_timers_never_fire() {
    let (mut rt, output) = collecting_runtime();
    let set_timeout = rt.global_get("setTimeout").unwrap();

    let doomed = logger(&mut rt, "doomed");
    let doomed_id = rt
        .call(
            &set_timeout,
            Value::undefined(),
            Args::from_values([doomed, Value::number(0.0)]),
        )
        .unwrap();
    let survivor = logger(&mut rt, "survivor");
    let survivor_id = rt
        .call(
            &set_timeout,
            Value::undefined(),
            Args::from_values([survivor, Value::number(0.0)]),
        )
        .unwrap();
    rt.release(survivor_id);
    rt.release(set_timeout);

    let clear_timeout = rt.global_get("clearTimeout").unwrap();
    let result = rt
        .call(&clear_timeout, Value::undefined(), Args::from_values([doomed_id]))
        .unwrap();
    rt.release(result);
    rt.release(clear_timeout);

    rt.run_event_loop();
    assert_eq!(output.output(), "survivor\n");
}

#[test]
fn settled_promise_reactions_still_go_through_the_queue() {
    let (mut rt, output) = collecting_runtime();

    let promise = rt.promise_resolve_value(Value::number(7.0)).unwrap();
    let handler = logger(&mut rt, "handler");
    let derived = rt.promise_then(&promise, handler, Value::undefined()).unwrap();
    rt.release(derived);
    rt.release(promise);

    // Attached after settlement, yet nothing runs until the loop turns.
    log(&mut rt, "sync");
    assert_eq!(output.output(), "sync\n");

    rt.run_event_loop();
    assert_eq!(output.output(), "sync\nhandler\n");
}

#[test]
fn intervals_repeat_until_cleared() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let (mut rt, _output) = collecting_runtime();
    let fired = Rc::new(RefCell::new(0u32));
    let interval_id = Rc::new(RefCell::new(0.0f64));

    let fired_in_cb = Rc::clone(&fired);
    let id_in_cb = Rc::clone(&interval_id);
    let callback = rt
        .method("", move |rt, this, args| {
            rt.release(this);
            rt.release_args(args);
            *fired_in_cb.borrow_mut() += 1;
            if *fired_in_cb.borrow() == 3 {
                let clear = rt.global_get("clearInterval")?;
                let result = rt.call(
                    &clear,
                    Value::undefined(),
                    Args::from_values([Value::number(*id_in_cb.borrow())]),
                )?;
                rt.release(result);
                rt.release(clear);
            }
            Ok(Value::undefined())
        })
        .unwrap();

    let set_interval = rt.global_get("setInterval").unwrap();
    let id = rt
        .call(
            &set_interval,
            Value::undefined(),
            Args::from_values([callback, Value::number(0.0)]),
        )
        .unwrap();
    *interval_id.borrow_mut() = id.as_number();
    rt.release(id);
    rt.release(set_interval);

    rt.run_event_loop();
    assert_eq!(*fired.borrow(), 3);
}

#[test]
fn queue_microtask_runs_in_fifo_order() {
    let (mut rt, output) = collecting_runtime();
    let queue = rt.global_get("queueMicrotask").unwrap();
    for text in ["a", "b"] {
        let cb = logger(&mut rt, text);
        let result = rt.call(&queue, Value::undefined(), Args::from_values([cb])).unwrap();
        rt.release(result);
    }
    rt.release(queue);
    log(&mut rt, "sync");

    rt.run_event_loop();
    assert_eq!(output.output(), "sync\na\nb\n");
}
