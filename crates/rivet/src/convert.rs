//! Primitive coercions: ToNumber, ToInt32/ToUint32, truthiness, and the
//! default number-to-string algorithm.

use crate::{heap::Heap, heap::HeapData, value::Value};

/// Renders a number the way the language's default `ToString` does:
/// integers without a decimal point, extreme magnitudes in scientific
/// notation, everything else as the shortest decimal that round-trips.
pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if n == 0.0 {
        return "0".to_owned();
    }
    let magnitude = n.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        // "1e21" -> "1e+21" to match the source language's rendering.
        let s = format!("{n:e}");
        return match s.find('e') {
            Some(pos) if !s[pos + 1..].starts_with('-') => format!("{}e+{}", &s[..pos], &s[pos + 1..]),
            _ => s,
        };
    }
    if n.fract() == 0.0 {
        return format!("{n:.0}");
    }
    // ryu flips to exponential notation slightly earlier than the threshold
    // above; fall back to positional formatting for that sliver.
    let mut buffer = ryu::Buffer::new();
    let printed = buffer.format(n);
    if printed.contains('e') {
        format!("{n}")
    } else {
        printed.to_owned()
    }
}

/// Parses a string as a numeric literal: whitespace-trimmed, empty means 0,
/// `Infinity` and radix prefixes recognized, anything malformed is NaN.
pub(crate) fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |v| v as f64);
    }
    if let Some(oct) = t.strip_prefix("0o").or_else(|| t.strip_prefix("0O")) {
        return u64::from_str_radix(oct, 8).map_or(f64::NAN, |v| v as f64);
    }
    if let Some(bin) = t.strip_prefix("0b").or_else(|| t.strip_prefix("0B")) {
        return u64::from_str_radix(bin, 2).map_or(f64::NAN, |v| v as f64);
    }
    // Reject forms Rust's float parser accepts but the language does not
    // ("inf", "NaN" spellings are not numeric literals here).
    if !t.bytes().all(|b| matches!(b, b'0'..=b'9' | b'+' | b'-' | b'.' | b'e' | b'E')) {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

/// ToNumber for any value. Objects coerce to NaN here; the operator layer
/// routes objects through their string form first where the language
/// requires it.
pub(crate) fn to_number(heap: &Heap, value: &Value) -> f64 {
    if value.is_number() {
        return value.as_number();
    }
    if value.is_null() {
        return 0.0;
    }
    if value.is_undefined() || value.is_uninitialized() {
        return f64::NAN;
    }
    if value.is_boolean() {
        return if value.as_boolean() { 1.0 } else { 0.0 };
    }
    if value.is_string()
        && let Some(id) = value.heap_id()
        && let HeapData::Str(s) = heap.get(id)
    {
        return string_to_number(s.as_str());
    }
    f64::NAN
}

/// ToInt32: truncate, wrap modulo 2^32, reinterpret as signed.
pub(crate) fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// ToUint32: truncate and wrap modulo 2^32.
pub(crate) fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let truncated = n.trunc();
    let modulus = truncated % 4_294_967_296.0;
    let wrapped = if modulus < 0.0 { modulus + 4_294_967_296.0 } else { modulus };
    wrapped as u32
}

/// Truthiness: false for undefined, null, the uninitialized sentinel,
/// `false`, ±0, NaN and the empty string; true for everything else.
pub(crate) fn truthy(heap: &Heap, value: &Value) -> bool {
    if value.is_undefined() || value.is_null() || value.is_uninitialized() {
        return false;
    }
    if value.is_boolean() {
        return value.as_boolean();
    }
    if value.is_number() {
        let n = value.as_number();
        return n != 0.0 && !n.is_nan();
    }
    if value.is_string()
        && let Some(id) = value.heap_id()
        && let HeapData::Str(s) = heap.get(id)
    {
        return !s.as_str().is_empty();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_print_without_a_point() {
        assert_eq!(number_to_string(0.0), "0");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(42.0), "42");
        assert_eq!(number_to_string(-7.0), "-7");
        assert_eq!(number_to_string(1e20), "100000000000000000000");
    }

    #[test]
    fn fractions_print_shortest() {
        assert_eq!(number_to_string(0.1), "0.1");
        assert_eq!(number_to_string(1.5), "1.5");
        assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn extremes_use_scientific_notation() {
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1e-7), "1e-7");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::INFINITY), "Infinity");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn string_parsing_follows_numeric_literals() {
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("  12  "), 12.0);
        assert_eq!(string_to_number("1.5e3"), 1500.0);
        assert_eq!(string_to_number("0x10"), 16.0);
        assert_eq!(string_to_number("Infinity"), f64::INFINITY);
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("inf").is_nan());
    }

    #[test]
    fn int32_wrapping() {
        assert_eq!(to_int32(0.0), 0);
        assert_eq!(to_int32(-1.0), -1);
        assert_eq!(to_int32(2_147_483_648.0), -2_147_483_648);
        assert_eq!(to_uint32(-1.0), 4_294_967_295);
        assert_eq!(to_uint32(f64::NAN), 0);
        assert_eq!(to_uint32(f64::INFINITY), 0);
        assert_eq!(to_uint32(4_294_967_296.0), 0);
    }
}
