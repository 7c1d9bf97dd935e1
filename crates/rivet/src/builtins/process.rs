//! The `process` namespace for CLI-shaped programs.

use crate::{
    builtins::{set_global, set_method},
    exception::RunResult,
    heap::DropWithHeap,
    runtime::Runtime,
};

pub(crate) fn install(rt: &mut Runtime) -> RunResult<()> {
    let process = rt.object()?;

    let mut argv_elements = Vec::new();
    for arg in std::env::args() {
        argv_elements.push(rt.string(arg)?);
    }
    let argv = rt.array(argv_elements)?;
    rt.set(&process, "argv", argv)?;

    let env = rt.object()?;
    for (key, value) in std::env::vars() {
        let value = rt.string(value)?;
        rt.set(&env, &key, value)?;
    }
    rt.set(&process, "env", env)?;

    let platform = rt.string(platform_name())?;
    rt.set(&process, "platform", platform)?;

    set_method(rt, &process, "exit", |rt, this, args| {
        let [code] = args.destructure(&mut rt.heap);
        let n = if code.is_undefined() { 0.0 } else { rt.to_number_value(&code) };
        code.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        std::process::exit(if n.is_finite() { n as i32 } else { 0 });
    })?;

    set_global(rt, "process", process)
}

/// Platform names follow the source language's conventions.
fn platform_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}
