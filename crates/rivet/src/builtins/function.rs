//! `Function.prototype` and the `Function` global.

use std::rc::Rc;

use crate::{
    args::Args,
    builtins::{set_global, set_method},
    exception::RunResult,
    heap::DropWithHeap,
    runtime::Runtime,
    value::Value,
};

pub(crate) fn install(rt: &mut Runtime) -> RunResult<()> {
    let proto = rt.realm.function_proto.clone_with_heap(&rt.heap);

    set_method(rt, &proto, "call", |rt, this, mut args| {
        let receiver = args.take(0);
        let rest: Vec<Value> = args.into_values().into_iter().skip(1).collect();
        let result = rt.call(&this, receiver, Args::from_values(rest));
        this.drop_with_heap(&mut rt.heap);
        result
    })?;

    set_method(rt, &proto, "apply", |rt, this, mut args| {
        let receiver = args.take(0);
        let list = args.take(1);
        args.drop_with_heap(&mut rt.heap);
        let mut forwarded = Vec::new();
        if list.is_array() {
            let len = rt.array_length(&list);
            for i in 0..len {
                forwarded.push(rt.get_index(&list, i as u32)?);
            }
        } else if !list.is_nullish() {
            let msg = "CreateListFromArrayLike called on non-object";
            list.drop_with_heap(&mut rt.heap);
            receiver.drop_with_heap(&mut rt.heap);
            this.drop_with_heap(&mut rt.heap);
            return Err(rt.throw_type(msg));
        }
        list.drop_with_heap(&mut rt.heap);
        let result = rt.call(&this, receiver, Args::from_values(forwarded));
        this.drop_with_heap(&mut rt.heap);
        result
    })?;

    set_method(rt, &proto, "bind", |rt, this, mut args| {
        if !this.is_function() {
            let msg = format!("{} is not a function", rt.brief(&this));
            this.drop_with_heap(&mut rt.heap);
            args.drop_with_heap(&mut rt.heap);
            return Err(rt.throw_type(msg));
        }
        let receiver = args.take(0);
        let bound_args: Vec<Value> = args.into_values().into_iter().skip(1).collect();

        // Target, receiver and bound arguments live in cells the bound
        // function keeps alive.
        let target_cell = rt.new_cell(this)?;
        let receiver_cell = rt.new_cell(receiver)?;
        let bound = rt.array(bound_args)?;
        let bound_cell = rt.new_cell(bound)?;

        let captures = vec![target_cell, receiver_cell, bound_cell];
        let bound_fn = rt.native_with_captures(
            "bound",
            captures,
            Rc::new(move |rt: &mut Runtime, this: Value, args: Args| {
                this.drop_with_heap(&mut rt.heap);
                let target = rt.heap.cell_get(target_cell);
                let receiver = rt.heap.cell_get(receiver_cell);
                let bound = rt.heap.cell_get(bound_cell);
                let mut forwarded = Vec::new();
                let len = rt.array_length(&bound);
                for i in 0..len {
                    forwarded.push(rt.get_index(&bound, i as u32)?);
                }
                bound.drop_with_heap(&mut rt.heap);
                forwarded.extend(args.into_values());
                let result = rt.call(&target, receiver, Args::from_values(forwarded));
                target.drop_with_heap(&mut rt.heap);
                result
            }),
        )?;
        Ok(bound_fn)
    })?;

    set_method(rt, &proto, "toString", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        let text = match this.heap_id().map(|id| rt.heap.get(id)) {
            Some(crate::heap::HeapData::Function(f)) => {
                format!("function {}() {{ [native code] }}", f.name)
            }
            _ => "function () { [native code] }".to_owned(),
        };
        this.drop_with_heap(&mut rt.heap);
        rt.string(text)
    })?;

    proto.drop_with_heap(&mut rt.heap);

    // Compiling source text at runtime is not part of this runtime; the
    // constructor exists but refuses.
    let function_ctor = rt.function("Function", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        args.drop_with_heap(&mut rt.heap);
        Err(rt.throw(
            crate::exception::ExcType::SyntaxError,
            "Function constructor is not supported in compiled programs",
        ))
    })?;
    let proto = rt.realm.function_proto.clone_with_heap(&rt.heap);
    rt.set_own(&function_ctor, "prototype", proto)?;
    set_global(rt, "Function", function_ctor)
}
