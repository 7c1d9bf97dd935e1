//! The `Error` constructors and prototypes.

use crate::{
    builtins::{set_global, set_method},
    exception::{ExcType, RunResult},
    heap::DropWithHeap,
    runtime::Runtime,
};

pub(crate) fn install(rt: &mut Runtime) -> RunResult<()> {
    for exc in [
        ExcType::Error,
        ExcType::TypeError,
        ExcType::RangeError,
        ExcType::ReferenceError,
        ExcType::SyntaxError,
        ExcType::AggregateError,
    ] {
        install_ctor(rt, exc)?;
    }

    // Shared toString on the base prototype; name lives per prototype.
    let error_proto = rt.realm.error_protos[ExcType::Error as usize].clone_with_heap(&rt.heap);
    set_method(rt, &error_proto, "toString", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        let name_value = rt.get(&this, "name")?;
        let name = if name_value.is_undefined() {
            "Error".to_owned()
        } else {
            rt.to_js_string(&name_value)?
        };
        name_value.drop_with_heap(&mut rt.heap);
        let message_value = rt.get(&this, "message")?;
        let message = if message_value.is_undefined() {
            String::new()
        } else {
            rt.to_js_string(&message_value)?
        };
        message_value.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        rt.string(if message.is_empty() {
            name
        } else {
            format!("{name}: {message}")
        })
    })?;
    error_proto.drop_with_heap(&mut rt.heap);
    Ok(())
}

fn install_ctor(rt: &mut Runtime, exc: ExcType) -> RunResult<()> {
    let name: &'static str = exc.into();

    // The constructor ignores its receiver and returns a fresh error cell,
    // which makes plain calls and `new` behave identically.
    let ctor = match exc {
        ExcType::AggregateError => rt.function(name, move |rt, this, mut args| {
            this.drop_with_heap(&mut rt.heap);
            let errors = args.take(0);
            let message = args.take(1);
            args.drop_with_heap(&mut rt.heap);
            let text = if message.is_undefined() {
                String::new()
            } else {
                rt.to_js_string(&message)?
            };
            message.drop_with_heap(&mut rt.heap);
            let error = rt.new_error(exc, &text)?;
            let list = if errors.is_undefined() {
                errors.drop_with_heap(&mut rt.heap);
                rt.array(Vec::new())?
            } else {
                let list = rt.array_from_iterable(&errors)?;
                errors.drop_with_heap(&mut rt.heap);
                list
            };
            rt.set(&error, "errors", list)?;
            Ok(error)
        })?,
        _ => rt.function(name, move |rt, this, args| {
            this.drop_with_heap(&mut rt.heap);
            let [message] = args.destructure(&mut rt.heap);
            let text = if message.is_undefined() {
                String::new()
            } else {
                rt.to_js_string(&message)?
            };
            message.drop_with_heap(&mut rt.heap);
            rt.new_error(exc, &text)
        })?,
    };

    // Wire the constructor's prototype to the intrinsic error prototype.
    let proto = rt.realm.error_protos[exc as usize].clone_with_heap(&rt.heap);
    rt.set_own(&ctor, "prototype", proto)?;
    let proto_ref = rt.realm.error_protos[exc as usize].clone_with_heap(&rt.heap);
    let ctor_ref = ctor.clone_with_heap(&rt.heap);
    rt.define_data_property_flags(&proto_ref, "constructor", ctor_ref, true, false, true)?;
    let name_value = rt.string(name)?;
    rt.set(&proto_ref, "name", name_value)?;
    let empty_message = rt.string("")?;
    rt.set(&proto_ref, "message", empty_message)?;
    proto_ref.drop_with_heap(&mut rt.heap);

    set_global(rt, name, ctor)
}
