//! `Number.prototype` essentials.

use crate::{
    builtins::set_method,
    convert,
    exception::{ExcType, RunResult},
    heap::DropWithHeap,
    runtime::Runtime,
};

pub(crate) fn install(rt: &mut Runtime) -> RunResult<()> {
    let proto = rt.realm.number_proto.clone_with_heap(&rt.heap);

    set_method(rt, &proto, "toString", |rt, this, args| {
        let [radix] = args.destructure(&mut rt.heap);
        let n = rt.to_number_value(&this);
        this.drop_with_heap(&mut rt.heap);
        if radix.is_undefined() {
            radix.drop_with_heap(&mut rt.heap);
            return rt.string(convert::number_to_string(n));
        }
        let r = rt.to_number_value(&radix);
        radix.drop_with_heap(&mut rt.heap);
        if !(2.0..=36.0).contains(&r) || r.fract() != 0.0 {
            return Err(rt.throw(ExcType::RangeError, "toString() radix must be between 2 and 36"));
        }
        let radix = r as u32;
        if radix == 10 {
            return rt.string(convert::number_to_string(n));
        }
        rt.string(format_radix(n, radix))
    })?;

    set_method(rt, &proto, "toFixed", |rt, this, args| {
        let [digits] = args.destructure(&mut rt.heap);
        let n = rt.to_number_value(&this);
        this.drop_with_heap(&mut rt.heap);
        let d = if digits.is_undefined() { 0.0 } else { rt.to_number_value(&digits) };
        digits.drop_with_heap(&mut rt.heap);
        if !(0.0..=100.0).contains(&d) || d.fract() != 0.0 {
            return Err(rt.throw(ExcType::RangeError, "toFixed() digits argument must be between 0 and 100"));
        }
        if n.is_nan() {
            return rt.string("NaN");
        }
        if !n.is_finite() {
            return rt.string(if n > 0.0 { "Infinity" } else { "-Infinity" });
        }
        rt.string(format!("{n:.prec$}", prec = d as usize))
    })?;

    proto.drop_with_heap(&mut rt.heap);
    Ok(())
}

/// Integer-part radix formatting for radices other than ten. Fractional
/// parts are truncated, which covers the integer uses translated code has.
fn format_radix(n: f64, radix: u32) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if !n.is_finite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    let negative = n < 0.0;
    let mut magnitude = n.abs().trunc() as u64;
    if magnitude == 0 {
        return "0".to_owned();
    }
    let digits = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    while magnitude > 0 {
        out.push(digits[(magnitude % u64::from(radix)) as usize]);
        magnitude /= u64::from(radix);
    }
    if negative {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8(out).expect("radix digits are ASCII")
}
