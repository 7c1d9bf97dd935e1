//! Timer builtins: setTimeout/setInterval and their cancellations.
//!
//! Extra arguments after the delay are forwarded to the callback on every
//! fire, as the timer API of the source language does.

use std::time::Duration;

use crate::{
    args::Args,
    builtins::set_global,
    exception::RunResult,
    heap::DropWithHeap,
    runtime::Runtime,
    value::Value,
};

pub(crate) fn install(rt: &mut Runtime) -> RunResult<()> {
    let set_timeout = rt.method("setTimeout", |rt, this, args| schedule(rt, this, args, false))?;
    set_global(rt, "setTimeout", set_timeout)?;
    let set_interval = rt.method("setInterval", |rt, this, args| schedule(rt, this, args, true))?;
    set_global(rt, "setInterval", set_interval)?;
    let clear_timeout = rt.method("clearTimeout", cancel)?;
    set_global(rt, "clearTimeout", clear_timeout)?;
    let clear_interval = rt.method("clearInterval", cancel)?;
    set_global(rt, "clearInterval", clear_interval)
}

fn schedule(rt: &mut Runtime, this: Value, mut args: Args, repeat: bool) -> RunResult<Value> {
    this.drop_with_heap(&mut rt.heap);
    let callback = args.take(0);
    let delay_value = args.take(1);
    let delay_ms = rt.to_number_value(&delay_value);
    delay_value.drop_with_heap(&mut rt.heap);

    if !callback.is_function() {
        let msg = format!("{} is not a function", rt.brief(&callback));
        callback.drop_with_heap(&mut rt.heap);
        args.drop_with_heap(&mut rt.heap);
        return Err(rt.throw_type(msg));
    }

    let extra: Vec<Value> = args.into_values().into_iter().skip(2).collect();
    let delay = if delay_ms.is_finite() && delay_ms > 0.0 {
        Duration::from_secs_f64(delay_ms / 1000.0)
    } else {
        Duration::ZERO
    };
    let id = rt.scheduler.set_timer(callback, extra, delay, repeat);
    Ok(Value::number(f64::from(id)))
}

fn cancel(rt: &mut Runtime, this: Value, args: Args) -> RunResult<Value> {
    this.drop_with_heap(&mut rt.heap);
    let [id_value] = args.destructure(&mut rt.heap);
    let id = rt.to_number_value(&id_value);
    id_value.drop_with_heap(&mut rt.heap);
    if id.is_finite() && id > 0.0 && id.fract() == 0.0 {
        rt.scheduler.clear_timer(id as u32);
    }
    Ok(Value::undefined())
}
