//! The `Object` constructor, its statics, and `Object.prototype`.

use crate::{
    builtins::{set_global, set_method},
    exception::RunResult,
    heap::DropWithHeap,
    runtime::Runtime,
    value::Value,
};

pub(crate) fn install(rt: &mut Runtime) -> RunResult<()> {
    // Object(v): identity for object-kind arguments, fresh object otherwise.
    let object_ctor = rt.function("Object", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        let [value] = args.destructure(&mut rt.heap);
        if value.is_object_like() {
            Ok(value)
        } else {
            value.drop_with_heap(&mut rt.heap);
            rt.object()
        }
    })?;

    // Wire Object.prototype to the intrinsic root object prototype.
    let proto = rt.realm.object_proto.clone_with_heap(&rt.heap);
    rt.set_own(&object_ctor, "prototype", proto)?;
    let ctor_ref = object_ctor.clone_with_heap(&rt.heap);
    let root = rt.realm.object_proto.clone_with_heap(&rt.heap);
    rt.define_data_property_flags(&root, "constructor", ctor_ref, true, false, true)?;
    root.drop_with_heap(&mut rt.heap);

    set_method(rt, &object_ctor, "keys", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        let [target] = args.destructure(&mut rt.heap);
        let names = rt.own_enumerable_names(&target)?;
        target.drop_with_heap(&mut rt.heap);
        let mut elements = Vec::with_capacity(names.len());
        for name in names {
            elements.push(rt.string(name)?);
        }
        rt.array(elements)
    })?;

    set_method(rt, &object_ctor, "values", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        let [target] = args.destructure(&mut rt.heap);
        let names = rt.own_enumerable_names(&target)?;
        let mut elements = Vec::with_capacity(names.len());
        for name in names {
            if let Some(value) = rt.get_own(&target, &name)? {
                elements.push(value);
            }
        }
        target.drop_with_heap(&mut rt.heap);
        rt.array(elements)
    })?;

    set_method(rt, &object_ctor, "entries", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        let [target] = args.destructure(&mut rt.heap);
        let names = rt.own_enumerable_names(&target)?;
        let mut elements = Vec::with_capacity(names.len());
        for name in names {
            if let Some(value) = rt.get_own(&target, &name)? {
                let key = rt.string(name)?;
                elements.push(rt.array(vec![key, value])?);
            }
        }
        target.drop_with_heap(&mut rt.heap);
        rt.array(elements)
    })?;

    set_method(rt, &object_ctor, "assign", |rt, this, mut args| {
        this.drop_with_heap(&mut rt.heap);
        let target = args.take(0);
        if !target.is_object_like() {
            let msg = "Cannot convert undefined or null to object";
            target.drop_with_heap(&mut rt.heap);
            args.drop_with_heap(&mut rt.heap);
            return Err(rt.throw_type(msg));
        }
        for source in args.into_values().into_iter().skip(1) {
            rt.spread_into_object(&target, &source)?;
            source.drop_with_heap(&mut rt.heap);
        }
        Ok(target)
    })?;

    set_method(rt, &object_ctor, "create", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        let [proto] = args.destructure(&mut rt.heap);
        rt.object_with_proto(proto)
    })?;

    set_method(rt, &object_ctor, "getPrototypeOf", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        let [target] = args.destructure(&mut rt.heap);
        let result = rt.get_prototype_of(&target);
        target.drop_with_heap(&mut rt.heap);
        result
    })?;

    set_method(rt, &object_ctor, "setPrototypeOf", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        let [target, proto] = args.destructure(&mut rt.heap);
        rt.set_prototype(&target, proto)?;
        Ok(target)
    })?;

    set_method(rt, &object_ctor, "getOwnPropertyNames", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        let [target] = args.destructure(&mut rt.heap);
        // Enumerability is ignored here; the internal symbol keys stay
        // hidden.
        let names = rt.own_all_names(&target);
        target.drop_with_heap(&mut rt.heap);
        let mut elements = Vec::with_capacity(names.len());
        for name in names {
            elements.push(rt.string(name)?);
        }
        rt.array(elements)
    })?;

    set_method(rt, &object_ctor, "defineProperty", |rt, this, mut args| {
        this.drop_with_heap(&mut rt.heap);
        let target = args.take(0);
        let key = args.take(1);
        let desc = args.take(2);
        args.drop_with_heap(&mut rt.heap);
        let result = define_property_from_descriptor(rt, &target, &key, &desc);
        key.drop_with_heap(&mut rt.heap);
        desc.drop_with_heap(&mut rt.heap);
        match result {
            Ok(()) => Ok(target),
            Err(err) => {
                target.drop_with_heap(&mut rt.heap);
                Err(err)
            }
        }
    })?;

    // Object.prototype methods.
    let proto = rt.realm.object_proto.clone_with_heap(&rt.heap);
    set_method(rt, &proto, "hasOwnProperty", |rt, this, args| {
        let [key] = args.destructure(&mut rt.heap);
        let name = rt.to_js_string(&key)?;
        key.drop_with_heap(&mut rt.heap);
        let result = rt.has_own(&this, &name);
        this.drop_with_heap(&mut rt.heap);
        Ok(Value::boolean(result?))
    })?;
    set_method(rt, &proto, "toString", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        rt.string("[object Object]")
    })?;
    proto.drop_with_heap(&mut rt.heap);

    set_global(rt, "Object", object_ctor)
}

/// `Object.defineProperty(target, key, descriptor)`: reads the descriptor
/// object and installs a data or accessor property.
fn define_property_from_descriptor(rt: &mut Runtime, target: &Value, key: &Value, desc: &Value) -> RunResult<()> {
    if !target.is_object_like() {
        return Err(rt.throw_type("Object.defineProperty called on non-object"));
    }
    if !desc.is_object_like() {
        return Err(rt.throw_type("Property description must be an object"));
    }
    let name = rt.to_js_string(key)?;

    let getter = rt.get(desc, "get")?;
    let setter = rt.get(desc, "set")?;
    if getter.is_function() || setter.is_function() {
        if getter.is_function() {
            rt.define_getter(target, &name, getter)?;
        } else {
            getter.drop_with_heap(&mut rt.heap);
        }
        if setter.is_function() {
            rt.define_setter(target, &name, setter)?;
        } else {
            setter.drop_with_heap(&mut rt.heap);
        }
        return Ok(());
    }
    getter.drop_with_heap(&mut rt.heap);
    setter.drop_with_heap(&mut rt.heap);

    let value = rt.get(desc, "value")?;
    let flag = |rt: &mut Runtime, name: &str| -> RunResult<bool> {
        let v = rt.get(desc, name)?;
        let truthy = rt.truthy(&v);
        v.drop_with_heap(&mut rt.heap);
        Ok(truthy)
    };
    let writable = flag(rt, "writable")?;
    let enumerable = flag(rt, "enumerable")?;
    let configurable = flag(rt, "configurable")?;
    rt.define_data_property_flags(target, &name, value, writable, enumerable, configurable)
}
