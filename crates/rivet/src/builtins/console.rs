//! The `console` namespace: log/warn/error plus the time/timeEnd label map.

use std::time::Instant;

use crate::{
    args::Args,
    builtins::{set_global, set_method},
    display,
    exception::RunResult,
    heap::DropWithHeap,
    io::ConsoleStream,
    runtime::Runtime,
    value::Value,
};

pub(crate) fn install(rt: &mut Runtime) -> RunResult<()> {
    let console = rt.object()?;
    set_method(rt, &console, "log", |rt, this, args| {
        write_args(rt, this, args, ConsoleStream::Out)
    })?;
    set_method(rt, &console, "warn", |rt, this, args| {
        write_args(rt, this, args, ConsoleStream::Err)
    })?;
    set_method(rt, &console, "error", |rt, this, args| {
        write_args(rt, this, args, ConsoleStream::Err)
    })?;
    set_method(rt, &console, "time", |rt, this, mut args| {
        let label = args.take(0);
        let name = label_text(rt, &label)?;
        rt.console_timers.insert(name.into(), Instant::now());
        label.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        args.drop_with_heap(&mut rt.heap);
        Ok(Value::undefined())
    })?;
    set_method(rt, &console, "timeEnd", |rt, this, mut args| {
        let label = args.take(0);
        let name = label_text(rt, &label)?;
        if let Some(started) = rt.console_timers.remove(name.as_str()) {
            let ms = started.elapsed().as_secs_f64() * 1000.0;
            let line = format!("{name}: {ms:.3}ms");
            rt.console.write_line(ConsoleStream::Out, &line);
        }
        label.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        args.drop_with_heap(&mut rt.heap);
        Ok(Value::undefined())
    })?;
    set_global(rt, "console", console)
}

fn label_text(rt: &mut Runtime, label: &Value) -> RunResult<String> {
    if label.is_undefined() {
        Ok("default".to_owned())
    } else {
        rt.to_js_string(label)
    }
}

fn write_args(rt: &mut Runtime, this: Value, args: Args, stream: ConsoleStream) -> RunResult<Value> {
    let mut parts = Vec::with_capacity(args.len());
    for value in args.into_values() {
        parts.push(display::format_top(&rt.heap, &rt.interns, &value));
        value.drop_with_heap(&mut rt.heap);
    }
    rt.console.write_line(stream, &parts.join(" "));
    this.drop_with_heap(&mut rt.heap);
    Ok(Value::undefined())
}
