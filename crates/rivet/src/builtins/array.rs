//! The `Array` constructor and `Array.prototype`.

use crate::{
    args::Args,
    builtins::{set_global, set_method},
    exception::RunResult,
    heap::DropWithHeap,
    runtime::Runtime,
    value::Value,
};

pub(crate) fn install(rt: &mut Runtime) -> RunResult<()> {
    // Array(n) presizes; Array(...items) builds from the arguments.
    let array_ctor = rt.function("Array", |rt, this, mut args| {
        this.drop_with_heap(&mut rt.heap);
        if args.len() == 1 {
            let first = args.take(0);
            args.drop_with_heap(&mut rt.heap);
            if first.is_number() {
                let n = first.as_number();
                if !(n >= 0.0) || n.fract() != 0.0 || n > 4_294_967_295.0 {
                    return Err(rt.throw(crate::exception::ExcType::RangeError, "Invalid array length"));
                }
                let arr = rt.array(Vec::new())?;
                rt.set(&arr, "length", first)?;
                return Ok(arr);
            }
            return rt.array(vec![first]);
        }
        let elements: Vec<Value> = args.into_values().into_iter().collect();
        rt.array(elements)
    })?;

    let proto = rt.realm.array_proto.clone_with_heap(&rt.heap);
    rt.set_own(&array_ctor, "prototype", proto)?;
    let ctor_ref = array_ctor.clone_with_heap(&rt.heap);
    let proto_ref = rt.realm.array_proto.clone_with_heap(&rt.heap);
    rt.define_data_property_flags(&proto_ref, "constructor", ctor_ref, true, false, true)?;
    proto_ref.drop_with_heap(&mut rt.heap);

    set_method(rt, &array_ctor, "isArray", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        let [value] = args.destructure(&mut rt.heap);
        let is = value.is_array();
        value.drop_with_heap(&mut rt.heap);
        Ok(Value::boolean(is))
    })?;

    set_method(rt, &array_ctor, "from", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        let [source, mapper] = args.destructure(&mut rt.heap);
        let result = rt.array_from_iterable(&source);
        source.drop_with_heap(&mut rt.heap);
        let arr = result?;
        if !mapper.is_function() {
            mapper.drop_with_heap(&mut rt.heap);
            return Ok(arr);
        }
        let len = rt.array_length(&arr);
        for i in 0..len {
            let element = rt.get_index(&arr, i as u32)?;
            let mapped = rt.call(
                &mapper,
                Value::undefined(),
                Args::from_values([element, Value::number(i as f64)]),
            )?;
            rt.set_index(&arr, i as u32, mapped)?;
        }
        mapper.drop_with_heap(&mut rt.heap);
        Ok(arr)
    })?;

    set_method(rt, &array_ctor, "of", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        let elements: Vec<Value> = args.into_values().into_iter().collect();
        rt.array(elements)
    })?;

    let proto = rt.realm.array_proto.clone_with_heap(&rt.heap);

    set_method(rt, &proto, "push", |rt, this, args| {
        let mut len = rt.array_length(&this);
        for value in args.into_values() {
            rt.set_index(&this, len as u32, value)?;
            len += 1;
        }
        this.drop_with_heap(&mut rt.heap);
        Ok(Value::number(len as f64))
    })?;

    set_method(rt, &proto, "pop", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        let len = rt.array_length(&this);
        if len == 0 {
            this.drop_with_heap(&mut rt.heap);
            return Ok(Value::undefined());
        }
        let last = rt.get_index(&this, (len - 1) as u32)?;
        set_length(rt, &this, len - 1)?;
        this.drop_with_heap(&mut rt.heap);
        Ok(last)
    })?;

    set_method(rt, &proto, "shift", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        let len = rt.array_length(&this);
        if len == 0 {
            this.drop_with_heap(&mut rt.heap);
            return Ok(Value::undefined());
        }
        let first = rt.get_index(&this, 0)?;
        for i in 1..len {
            let value = rt.get_index(&this, i as u32)?;
            rt.set_index(&this, (i - 1) as u32, value)?;
        }
        set_length(rt, &this, len - 1)?;
        this.drop_with_heap(&mut rt.heap);
        Ok(first)
    })?;

    set_method(rt, &proto, "unshift", |rt, this, args| {
        let len = rt.array_length(&this);
        let incoming: Vec<Value> = args.into_values().into_iter().collect();
        let shift = incoming.len() as u64;
        if shift > 0 {
            let mut i = len;
            while i > 0 {
                i -= 1;
                let value = rt.get_index(&this, i as u32)?;
                rt.set_index(&this, (i + shift) as u32, value)?;
            }
            for (offset, value) in incoming.into_iter().enumerate() {
                rt.set_index(&this, offset as u32, value)?;
            }
        }
        let new_len = len + shift;
        this.drop_with_heap(&mut rt.heap);
        Ok(Value::number(new_len as f64))
    })?;

    set_method(rt, &proto, "slice", |rt, this, args| {
        let len = rt.array_length(&this) as i64;
        let [start, end] = args.destructure(&mut rt.heap);
        let from = clamp_index(rt, &start, 0, len);
        let to = if end.is_undefined() { len } else { clamp_index(rt, &end, 0, len) };
        start.drop_with_heap(&mut rt.heap);
        end.drop_with_heap(&mut rt.heap);
        let mut elements = Vec::new();
        let mut i = from;
        while i < to {
            elements.push(rt.get_index(&this, i as u32)?);
            i += 1;
        }
        this.drop_with_heap(&mut rt.heap);
        rt.array(elements)
    })?;

    set_method(rt, &proto, "indexOf", |rt, this, args| {
        let [needle] = args.destructure(&mut rt.heap);
        let len = rt.array_length(&this);
        let mut found = -1.0;
        for i in 0..len {
            let element = rt.get_index(&this, i as u32)?;
            let hit = rt.strict_eq(&element, &needle);
            element.drop_with_heap(&mut rt.heap);
            if hit {
                found = i as f64;
                break;
            }
        }
        needle.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        Ok(Value::number(found))
    })?;

    set_method(rt, &proto, "includes", |rt, this, args| {
        let [needle] = args.destructure(&mut rt.heap);
        let len = rt.array_length(&this);
        let mut found = false;
        for i in 0..len {
            let element = rt.get_index(&this, i as u32)?;
            // SameValueZero: strict equality plus NaN matching itself.
            let hit = rt.strict_eq(&element, &needle)
                || (element.is_number()
                    && needle.is_number()
                    && element.as_number().is_nan()
                    && needle.as_number().is_nan());
            element.drop_with_heap(&mut rt.heap);
            if hit {
                found = true;
                break;
            }
        }
        needle.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        Ok(Value::boolean(found))
    })?;

    set_method(rt, &proto, "join", |rt, this, args| {
        let [separator] = args.destructure(&mut rt.heap);
        let sep = if separator.is_undefined() {
            ",".to_owned()
        } else {
            rt.to_js_string(&separator)?
        };
        separator.drop_with_heap(&mut rt.heap);
        let text = rt.array_join(&this, &sep)?;
        this.drop_with_heap(&mut rt.heap);
        rt.string(text)
    })?;

    set_method(rt, &proto, "toString", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        let text = rt.array_join(&this, ",")?;
        this.drop_with_heap(&mut rt.heap);
        rt.string(text)
    })?;

    set_method(rt, &proto, "concat", |rt, this, args| {
        let result = rt.array(Vec::new())?;
        rt.spread_into_array(&result, &this)?;
        for value in args.into_values() {
            if value.is_array() {
                rt.spread_into_array(&result, &value)?;
            } else {
                let len = rt.array_length(&result);
                rt.set_index(&result, len as u32, value.clone_with_heap(&rt.heap))?;
            }
            value.drop_with_heap(&mut rt.heap);
        }
        this.drop_with_heap(&mut rt.heap);
        Ok(result)
    })?;

    set_method(rt, &proto, "map", |rt, this, args| {
        let [callback] = args.destructure(&mut rt.heap);
        let len = rt.array_length(&this);
        let mut elements = Vec::with_capacity(len as usize);
        for i in 0..len {
            let element = rt.get_index(&this, i as u32)?;
            let mapped = rt.call(
                &callback,
                Value::undefined(),
                Args::from_values([element, Value::number(i as f64), this.clone_with_heap(&rt.heap)]),
            )?;
            elements.push(mapped);
        }
        callback.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        rt.array(elements)
    })?;

    set_method(rt, &proto, "filter", |rt, this, args| {
        let [callback] = args.destructure(&mut rt.heap);
        let len = rt.array_length(&this);
        let mut elements = Vec::new();
        for i in 0..len {
            let element = rt.get_index(&this, i as u32)?;
            let keep = rt.call(
                &callback,
                Value::undefined(),
                Args::from_values([
                    element.clone_with_heap(&rt.heap),
                    Value::number(i as f64),
                    this.clone_with_heap(&rt.heap),
                ]),
            )?;
            let truthy = rt.truthy(&keep);
            keep.drop_with_heap(&mut rt.heap);
            if truthy {
                elements.push(element);
            } else {
                element.drop_with_heap(&mut rt.heap);
            }
        }
        callback.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        rt.array(elements)
    })?;

    set_method(rt, &proto, "forEach", |rt, this, args| {
        let [callback] = args.destructure(&mut rt.heap);
        let len = rt.array_length(&this);
        for i in 0..len {
            let element = rt.get_index(&this, i as u32)?;
            let result = rt.call(
                &callback,
                Value::undefined(),
                Args::from_values([element, Value::number(i as f64), this.clone_with_heap(&rt.heap)]),
            )?;
            result.drop_with_heap(&mut rt.heap);
        }
        callback.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        Ok(Value::undefined())
    })?;

    set_method(rt, &proto, "reduce", |rt, this, mut args| {
        let callback = args.take(0);
        let has_seed = args.len() > 1;
        let seed = args.take(1);
        args.drop_with_heap(&mut rt.heap);
        let len = rt.array_length(&this);
        let mut acc;
        let mut start = 0;
        if has_seed {
            acc = seed;
        } else {
            seed.drop_with_heap(&mut rt.heap);
            if len == 0 {
                callback.drop_with_heap(&mut rt.heap);
                this.drop_with_heap(&mut rt.heap);
                return Err(rt.throw_type("Reduce of empty array with no initial value"));
            }
            acc = rt.get_index(&this, 0)?;
            start = 1;
        }
        for i in start..len {
            let element = rt.get_index(&this, i as u32)?;
            acc = rt.call(
                &callback,
                Value::undefined(),
                Args::from_values([acc, element, Value::number(i as f64), this.clone_with_heap(&rt.heap)]),
            )?;
        }
        callback.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        Ok(acc)
    })?;

    set_method(rt, &proto, "find", |rt, this, args| {
        let [callback] = args.destructure(&mut rt.heap);
        let len = rt.array_length(&this);
        let mut found = Value::undefined();
        for i in 0..len {
            let element = rt.get_index(&this, i as u32)?;
            let keep = rt.call(
                &callback,
                Value::undefined(),
                Args::from_values([
                    element.clone_with_heap(&rt.heap),
                    Value::number(i as f64),
                    this.clone_with_heap(&rt.heap),
                ]),
            )?;
            let truthy = rt.truthy(&keep);
            keep.drop_with_heap(&mut rt.heap);
            if truthy {
                found = element;
                break;
            }
            element.drop_with_heap(&mut rt.heap);
        }
        callback.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        Ok(found)
    })?;

    set_method(rt, &proto, "some", |rt, this, args| {
        let [callback] = args.destructure(&mut rt.heap);
        let len = rt.array_length(&this);
        let mut any = false;
        for i in 0..len {
            let element = rt.get_index(&this, i as u32)?;
            let keep = rt.call(
                &callback,
                Value::undefined(),
                Args::from_values([element, Value::number(i as f64), this.clone_with_heap(&rt.heap)]),
            )?;
            let truthy = rt.truthy(&keep);
            keep.drop_with_heap(&mut rt.heap);
            if truthy {
                any = true;
                break;
            }
        }
        callback.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        Ok(Value::boolean(any))
    })?;

    set_method(rt, &proto, "every", |rt, this, args| {
        let [callback] = args.destructure(&mut rt.heap);
        let len = rt.array_length(&this);
        let mut all = true;
        for i in 0..len {
            let element = rt.get_index(&this, i as u32)?;
            let keep = rt.call(
                &callback,
                Value::undefined(),
                Args::from_values([element, Value::number(i as f64), this.clone_with_heap(&rt.heap)]),
            )?;
            let truthy = rt.truthy(&keep);
            keep.drop_with_heap(&mut rt.heap);
            if !truthy {
                all = false;
                break;
            }
        }
        callback.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        Ok(Value::boolean(all))
    })?;

    set_method(rt, &proto, "reverse", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        let len = rt.array_length(&this);
        let mut i = 0u64;
        while i < len / 2 {
            let j = len - 1 - i;
            let a = rt.get_index(&this, i as u32)?;
            let b = rt.get_index(&this, j as u32)?;
            rt.set_index(&this, i as u32, b)?;
            rt.set_index(&this, j as u32, a)?;
            i += 1;
        }
        Ok(this)
    })?;

    proto.drop_with_heap(&mut rt.heap);
    set_global(rt, "Array", array_ctor)
}

/// Writes `length` through the property engine so truncation rules apply.
fn set_length(rt: &mut Runtime, array: &Value, len: u64) -> RunResult<()> {
    rt.set(array, "length", Value::number(len as f64))
}

/// Relative-index clamping for `slice`.
fn clamp_index(rt: &Runtime, value: &Value, low: i64, len: i64) -> i64 {
    let n = rt.to_number_value(value);
    if n.is_nan() {
        return low;
    }
    let i = n as i64;
    if i < 0 { (len + i).max(0) } else { i.min(len) }
}
