//! Async functions and async generators: await suspension, FIFO
//! backpressure, and termination of queued calls.

use std::cell::RefCell;
use std::rc::Rc;

use rivet::{Args, GenBody, Resume, RunError, RunResult, Runtime, RuntimeConfig, Step, Value};

fn runtime() -> Runtime {
    Runtime::with_console(RuntimeConfig::default(), Box::new(rivet::NoConsole))
}

/// The lowered form of:
/// ```js
/// async function addLater(n) { const v = await n; return v + 1; }
/// ```
struct AddLater {
    argument: Value,
    state: u8,
}

impl GenBody for AddLater {
    fn step(&mut self, rt: &mut Runtime, input: Resume) -> RunResult<Step> {
        match input {
            Resume::Return(v) => Ok(Step::Done(v)),
            Resume::Throw(e) => Err(RunError::Thrown(e)),
            Resume::Next(v) => match self.state {
                0 => {
                    rt.release(v);
                    self.state = 1;
                    Ok(Step::Await(std::mem::take(&mut self.argument)))
                }
                _ => {
                    let result = rt.add(&v, &Value::number(1.0))?;
                    rt.release(v);
                    Ok(Step::Done(result))
                }
            },
        }
    }

    fn dispose(&mut self, heap: &mut rivet::Heap) {
        heap.release(std::mem::take(&mut self.argument));
    }
}

/// The lowered form of:
/// ```js
/// async function* pace() { for (let i = 1; i <= 3; i++) { await 0; yield i; } }
/// ```
struct Pace {
    i: u32,
    awaited: bool,
}

impl GenBody for Pace {
    fn step(&mut self, rt: &mut Runtime, input: Resume) -> RunResult<Step> {
        match input {
            Resume::Return(v) => Ok(Step::Done(v)),
            Resume::Throw(e) => Err(RunError::Thrown(e)),
            Resume::Next(v) => {
                rt.release(v);
                if !self.awaited {
                    if self.i >= 3 {
                        return Ok(Step::Done(Value::undefined()));
                    }
                    self.awaited = true;
                    return Ok(Step::Await(Value::number(0.0)));
                }
                self.awaited = false;
                self.i += 1;
                Ok(Step::Yield(Value::number(f64::from(self.i))))
            }
        }
    }
}

/// Records `{value, done}` of a settled iteration promise.
fn record_result(rt: &mut Runtime, promise: &Value, seen: &Rc<RefCell<Vec<String>>>) {
    let seen = Rc::clone(seen);
    let handler = rt
        .method("", move |rt, this, mut args| {
            rt.release(this);
            let result = args.take(0);
            rt.release_args(args);
            let (value, done) = rt.iter_result_parts(&result)?;
            let text = format!("{}:{done}", rt.to_js_string(&value)?);
            seen.borrow_mut().push(text);
            rt.release(value);
            rt.release(result);
            Ok(Value::undefined())
        })
        .unwrap();
    let tail = rt.promise_then(promise, handler, Value::undefined()).unwrap();
    rt.release(tail);
}

#[test]
fn async_functions_resolve_their_promise() {
    let mut rt = runtime();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let async_fn = rt
        .async_function("addLater", |_rt, _this, mut args| {
            let argument = args.take(0);
            Ok(Box::new(AddLater { argument, state: 0 }) as Box<dyn GenBody>)
        })
        .unwrap();

    let promise = rt
        .call(&async_fn, Value::undefined(), Args::from_values([Value::number(41.0)]))
        .unwrap();
    assert!(promise.is_promise());

    let logger = {
        let seen = Rc::clone(&seen);
        rt.method("", move |rt, this, mut args| {
            rt.release(this);
            let value = args.take(0);
            rt.release_args(args);
            seen.borrow_mut().push(rt.to_js_string(&value)?);
            rt.release(value);
            Ok(Value::undefined())
        })
        .unwrap()
    };
    let tail = rt.promise_then(&promise, logger, Value::undefined()).unwrap();
    rt.release(tail);

    // Nothing settles before the loop turns.
    assert!(seen.borrow().is_empty());
    rt.run_event_loop();
    assert_eq!(*seen.borrow(), ["42"]);

    rt.release(promise);
    rt.release(async_fn);
}

#[test]
fn async_function_throws_reject_the_promise() {
    let mut rt = runtime();
    let seen = Rc::new(RefCell::new(Vec::new()));

    struct Fails;
    impl GenBody for Fails {
        fn step(&mut self, rt: &mut Runtime, input: Resume) -> RunResult<Step> {
            match input {
                Resume::Return(v) => Ok(Step::Done(v)),
                Resume::Throw(e) => Err(RunError::Thrown(e)),
                Resume::Next(v) => {
                    rt.release(v);
                    let reason = rt.string("async failure")?;
                    Err(RunError::Thrown(reason))
                }
            }
        }
    }

    let async_fn = rt
        .async_function("fails", |_rt, _this, _args| Ok(Box::new(Fails) as Box<dyn GenBody>))
        .unwrap();
    let promise = rt.call(&async_fn, Value::undefined(), Args::new()).unwrap();

    let catcher = {
        let seen = Rc::clone(&seen);
        rt.method("", move |rt, this, mut args| {
            rt.release(this);
            let reason = args.take(0);
            rt.release_args(args);
            seen.borrow_mut().push(rt.to_js_string(&reason)?);
            rt.release(reason);
            Ok(Value::undefined())
        })
        .unwrap()
    };
    let tail = rt.promise_then(&promise, Value::undefined(), catcher).unwrap();
    rt.release(tail);

    rt.run_event_loop();
    assert_eq!(*seen.borrow(), ["async failure"]);

    rt.release(promise);
    rt.release(async_fn);
}

#[test]
fn queued_next_calls_resolve_in_order() {
    // Three next() calls before the first yield; the three promises resolve
    // in FIFO order as the coroutine yields.
    let mut rt = runtime();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let gen_fn = rt
        .async_generator("pace", |_rt, _this, _args| {
            Ok(Box::new(Pace { i: 0, awaited: false }) as Box<dyn GenBody>)
        })
        .unwrap();
    let iter = rt.call(&gen_fn, Value::undefined(), Args::new()).unwrap();
    assert!(iter.is_async_iterator());

    for _ in 0..3 {
        let promise = rt.async_next(&iter, Value::undefined()).unwrap();
        record_result(&mut rt, &promise, &seen);
        rt.release(promise);
    }

    rt.run_event_loop();
    assert_eq!(*seen.borrow(), ["1:false", "2:false", "3:false"]);

    // The next call observes completion.
    let promise = rt.async_next(&iter, Value::undefined()).unwrap();
    record_result(&mut rt, &promise, &seen);
    rt.release(promise);
    rt.run_event_loop();
    assert_eq!(seen.borrow().last().unwrap(), "undefined:true");

    rt.release(iter);
    rt.release(gen_fn);
}

#[test]
fn return_terminates_and_drains_the_queue() {
    let mut rt = runtime();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let gen_fn = rt
        .async_generator("pace", |_rt, _this, _args| {
            Ok(Box::new(Pace { i: 0, awaited: false }) as Box<dyn GenBody>)
        })
        .unwrap();
    let iter = rt.call(&gen_fn, Value::undefined(), Args::new()).unwrap();

    // A fresh async iterator returned early reports done immediately.
    let promise = rt.async_return(&iter, Value::number(7.0)).unwrap();
    record_result(&mut rt, &promise, &seen);
    rt.release(promise);
    rt.run_event_loop();
    assert_eq!(*seen.borrow(), ["7:true"]);

    // Every call after termination is done.
    let promise = rt.async_next(&iter, Value::undefined()).unwrap();
    record_result(&mut rt, &promise, &seen);
    rt.release(promise);
    rt.run_event_loop();
    assert_eq!(seen.borrow().last().unwrap(), "undefined:true");

    rt.release(iter);
    rt.release(gen_fn);
}

#[test]
fn generator_throws_reject_every_queued_promise() {
    // The body parks on an await, then throws; every call queued behind the
    // await rejects with the same reason.
    struct ThrowsAfterAwait {
        awaited: bool,
    }
    impl GenBody for ThrowsAfterAwait {
        fn step(&mut self, rt: &mut Runtime, input: Resume) -> RunResult<Step> {
            match input {
                Resume::Return(v) => Ok(Step::Done(v)),
                Resume::Throw(e) => Err(RunError::Thrown(e)),
                Resume::Next(v) => {
                    rt.release(v);
                    if !self.awaited {
                        self.awaited = true;
                        return Ok(Step::Await(Value::number(0.0)));
                    }
                    let reason = rt.string("stream broke")?;
                    Err(RunError::Thrown(reason))
                }
            }
        }
    }

    let mut rt = runtime();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let gen_fn = rt
        .async_generator("breaks", |_rt, _this, _args| {
            Ok(Box::new(ThrowsAfterAwait { awaited: false }) as Box<dyn GenBody>)
        })
        .unwrap();
    let iter = rt.call(&gen_fn, Value::undefined(), Args::new()).unwrap();

    let record_rejection = |rt: &mut Runtime, promise: &Value, seen: &Rc<RefCell<Vec<String>>>| {
        let seen = Rc::clone(seen);
        let handler = rt
            .method("", move |rt, this, mut args| {
                rt.release(this);
                let reason = args.take(0);
                rt.release_args(args);
                seen.borrow_mut().push(format!("rejected:{}", rt.to_js_string(&reason)?));
                rt.release(reason);
                Ok(Value::undefined())
            })
            .unwrap();
        let tail = rt.promise_then(promise, Value::undefined(), handler).unwrap();
        rt.release(tail);
    };

    for _ in 0..3 {
        let promise = rt.async_next(&iter, Value::undefined()).unwrap();
        record_rejection(&mut rt, &promise, &seen);
        rt.release(promise);
    }

    rt.run_event_loop();
    assert_eq!(
        *seen.borrow(),
        ["rejected:stream broke", "rejected:stream broke", "rejected:stream broke"]
    );

    rt.release(iter);
    rt.release(gen_fn);
}
