//! Bare global functions.

use crate::{
    builtins::set_global,
    exception::RunResult,
    heap::DropWithHeap,
    runtime::Runtime,
    value::Value,
};

pub(crate) fn install(rt: &mut Runtime) -> RunResult<()> {
    let queue_microtask = rt.method("queueMicrotask", |rt, this, mut args| {
        let callback = args.take(0);
        this.drop_with_heap(&mut rt.heap);
        args.drop_with_heap(&mut rt.heap);
        if !callback.is_function() {
            let msg = format!("{} is not a function", rt.brief(&callback));
            callback.drop_with_heap(&mut rt.heap);
            return Err(rt.throw_type(msg));
        }
        rt.queue_microtask_call(callback, Vec::new());
        Ok(Value::undefined())
    })?;
    set_global(rt, "queueMicrotask", queue_microtask)
}
