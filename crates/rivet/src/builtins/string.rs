//! `String.prototype` essentials.

use crate::{
    builtins::set_method,
    exception::RunResult,
    heap::{DropWithHeap, HeapData},
    runtime::Runtime,
    types::string::unit_to_string,
    value::Value,
};

/// Reads the receiver's string content; primitives only reach these methods
/// through the string prototype, so anything else stringifies.
fn this_text(rt: &mut Runtime, this: &Value) -> RunResult<String> {
    if this.is_string()
        && let Some(id) = this.heap_id()
        && let HeapData::Str(s) = rt.heap.get(id)
    {
        return Ok(s.as_str().to_owned());
    }
    rt.to_js_string(this)
}

pub(crate) fn install(rt: &mut Runtime) -> RunResult<()> {
    let proto = rt.realm.string_proto.clone_with_heap(&rt.heap);

    set_method(rt, &proto, "charAt", |rt, this, args| {
        let [index] = args.destructure(&mut rt.heap);
        let text = this_text(rt, &this)?;
        let i = rt.to_number_value(&index);
        index.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        let unit = if i >= 0.0 && i.fract() == 0.0 {
            text.as_bytes().get(i as usize).copied().map(unit_to_string)
        } else {
            None
        };
        rt.string(unit.unwrap_or_default())
    })?;

    set_method(rt, &proto, "charCodeAt", |rt, this, args| {
        let [index] = args.destructure(&mut rt.heap);
        let text = this_text(rt, &this)?;
        let i = rt.to_number_value(&index);
        index.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        let code = if i >= 0.0 && i.fract() == 0.0 {
            text.as_bytes().get(i as usize).map(|&unit| f64::from(unit))
        } else {
            None
        };
        Ok(Value::number(code.unwrap_or(f64::NAN)))
    })?;

    set_method(rt, &proto, "indexOf", |rt, this, args| {
        let [needle] = args.destructure(&mut rt.heap);
        let text = this_text(rt, &this)?;
        let pat = rt.to_js_string(&needle)?;
        needle.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        // Positions are unit offsets, which is what `find` reports.
        let found = match text.find(&pat) {
            Some(pos) => pos as f64,
            None => -1.0,
        };
        Ok(Value::number(found))
    })?;

    set_method(rt, &proto, "includes", |rt, this, args| {
        let [needle] = args.destructure(&mut rt.heap);
        let text = this_text(rt, &this)?;
        let pat = rt.to_js_string(&needle)?;
        needle.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        Ok(Value::boolean(text.contains(&pat)))
    })?;

    set_method(rt, &proto, "startsWith", |rt, this, args| {
        let [needle] = args.destructure(&mut rt.heap);
        let text = this_text(rt, &this)?;
        let pat = rt.to_js_string(&needle)?;
        needle.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        Ok(Value::boolean(text.starts_with(&pat)))
    })?;

    set_method(rt, &proto, "endsWith", |rt, this, args| {
        let [needle] = args.destructure(&mut rt.heap);
        let text = this_text(rt, &this)?;
        let pat = rt.to_js_string(&needle)?;
        needle.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        Ok(Value::boolean(text.ends_with(&pat)))
    })?;

    set_method(rt, &proto, "slice", |rt, this, args| {
        let [start, end] = args.destructure(&mut rt.heap);
        let text = this_text(rt, &this)?;
        this.drop_with_heap(&mut rt.heap);
        let len = text.len() as i64;
        let clamp = |v: f64| -> i64 {
            if v.is_nan() {
                return 0;
            }
            let i = v as i64;
            if i < 0 { (len + i).max(0) } else { i.min(len) }
        };
        let from = clamp(rt.to_number_value(&start));
        let to = if end.is_undefined() { len } else { clamp(rt.to_number_value(&end)) };
        start.drop_with_heap(&mut rt.heap);
        end.drop_with_heap(&mut rt.heap);
        // Unit offsets; a cut through a multi-unit encoding lossy-renders
        // the severed units.
        let out = if from < to {
            String::from_utf8_lossy(&text.as_bytes()[from as usize..to as usize]).into_owned()
        } else {
            String::new()
        };
        rt.string(out)
    })?;

    set_method(rt, &proto, "split", |rt, this, args| {
        let [separator] = args.destructure(&mut rt.heap);
        let text = this_text(rt, &this)?;
        this.drop_with_heap(&mut rt.heap);
        if separator.is_undefined() {
            separator.drop_with_heap(&mut rt.heap);
            let whole = rt.string(text)?;
            return rt.array(vec![whole]);
        }
        let sep = rt.to_js_string(&separator)?;
        separator.drop_with_heap(&mut rt.heap);
        let mut elements = Vec::new();
        if sep.is_empty() {
            for unit in text.bytes() {
                elements.push(rt.string(unit_to_string(unit))?);
            }
        } else {
            for part in text.split(sep.as_str()) {
                elements.push(rt.string(part)?);
            }
        }
        rt.array(elements)
    })?;

    set_method(rt, &proto, "toUpperCase", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        let text = this_text(rt, &this)?;
        this.drop_with_heap(&mut rt.heap);
        rt.string(text.to_uppercase())
    })?;

    set_method(rt, &proto, "toLowerCase", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        let text = this_text(rt, &this)?;
        this.drop_with_heap(&mut rt.heap);
        rt.string(text.to_lowercase())
    })?;

    set_method(rt, &proto, "trim", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        let text = this_text(rt, &this)?;
        this.drop_with_heap(&mut rt.heap);
        rt.string(text.trim())
    })?;

    set_method(rt, &proto, "repeat", |rt, this, args| {
        let [count] = args.destructure(&mut rt.heap);
        let text = this_text(rt, &this)?;
        let n = rt.to_number_value(&count);
        count.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        if !(n >= 0.0) || !n.is_finite() {
            return Err(rt.throw(crate::exception::ExcType::RangeError, "Invalid count value"));
        }
        rt.string(text.repeat(n as usize))
    })?;

    set_method(rt, &proto, "concat", |rt, this, args| {
        let mut text = this_text(rt, &this)?;
        this.drop_with_heap(&mut rt.heap);
        for value in args.into_values() {
            text.push_str(&rt.to_js_string(&value)?);
            value.drop_with_heap(&mut rt.heap);
        }
        rt.string(text)
    })?;

    set_method(rt, &proto, "toString", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        let text = this_text(rt, &this)?;
        this.drop_with_heap(&mut rt.heap);
        rt.string(text)
    })?;

    proto.drop_with_heap(&mut rt.heap);
    Ok(())
}
