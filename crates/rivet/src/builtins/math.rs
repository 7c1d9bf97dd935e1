//! The `Math` namespace.

use rand::Rng;

use crate::{
    builtins::{set_global, set_method},
    exception::RunResult,
    heap::DropWithHeap,
    runtime::Runtime,
    value::Value,
};

pub(crate) fn install(rt: &mut Runtime) -> RunResult<()> {
    let math = rt.object()?;

    rt.set(&math, "PI", Value::number(std::f64::consts::PI))?;
    rt.set(&math, "E", Value::number(std::f64::consts::E))?;
    rt.set(&math, "LN2", Value::number(std::f64::consts::LN_2))?;
    rt.set(&math, "LN10", Value::number(std::f64::consts::LN_10))?;
    rt.set(&math, "LOG2E", Value::number(std::f64::consts::LOG2_E))?;
    rt.set(&math, "LOG10E", Value::number(std::f64::consts::LOG10_E))?;
    rt.set(&math, "SQRT2", Value::number(std::f64::consts::SQRT_2))?;
    rt.set(&math, "SQRT1_2", Value::number(std::f64::consts::FRAC_1_SQRT_2))?;

    unary(rt, &math, "abs", f64::abs)?;
    unary(rt, &math, "floor", f64::floor)?;
    unary(rt, &math, "ceil", f64::ceil)?;
    unary(rt, &math, "trunc", f64::trunc)?;
    unary(rt, &math, "sign", js_sign)?;
    unary(rt, &math, "sqrt", f64::sqrt)?;
    unary(rt, &math, "cbrt", f64::cbrt)?;
    unary(rt, &math, "exp", f64::exp)?;
    unary(rt, &math, "expm1", f64::exp_m1)?;
    unary(rt, &math, "log", f64::ln)?;
    unary(rt, &math, "log1p", f64::ln_1p)?;
    unary(rt, &math, "log2", f64::log2)?;
    unary(rt, &math, "log10", f64::log10)?;
    unary(rt, &math, "sin", f64::sin)?;
    unary(rt, &math, "cos", f64::cos)?;
    unary(rt, &math, "tan", f64::tan)?;
    unary(rt, &math, "asin", f64::asin)?;
    unary(rt, &math, "acos", f64::acos)?;
    unary(rt, &math, "atan", f64::atan)?;
    unary(rt, &math, "sinh", f64::sinh)?;
    unary(rt, &math, "cosh", f64::cosh)?;
    unary(rt, &math, "tanh", f64::tanh)?;
    unary(rt, &math, "asinh", f64::asinh)?;
    unary(rt, &math, "acosh", f64::acosh)?;
    unary(rt, &math, "atanh", f64::atanh)?;

    // round: half-up, unlike Rust's half-away-from-zero.
    unary(rt, &math, "round", |n| {
        if n.is_finite() { (n + 0.5).floor() } else { n }
    })?;

    binary(rt, &math, "pow", f64::powf)?;
    binary(rt, &math, "atan2", f64::atan2)?;
    binary(rt, &math, "hypot", f64::hypot)?;

    set_method(rt, &math, "min", |rt, this, args| {
        fold_args(rt, this, args, f64::INFINITY, f64::min)
    })?;
    set_method(rt, &math, "max", |rt, this, args| {
        fold_args(rt, this, args, f64::NEG_INFINITY, f64::max)
    })?;
    set_method(rt, &math, "random", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        args.drop_with_heap(&mut rt.heap);
        Ok(Value::number(rt.rng.r#gen::<f64>()))
    })?;

    set_global(rt, "Math", math)
}

// Math.sign keeps NaN and signed zeros, unlike f64::signum.
fn js_sign(n: f64) -> f64 {
    if n.is_nan() || n == 0.0 { n } else { n.signum() }
}

fn unary(rt: &mut Runtime, math: &Value, name: &str, f: impl Fn(f64) -> f64 + 'static) -> RunResult<()> {
    set_method(rt, math, name, move |rt, this, args| {
        let [x] = args.destructure(&mut rt.heap);
        let n = rt.to_number_value(&x);
        x.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        Ok(Value::number(f(n)))
    })
}

fn binary(rt: &mut Runtime, math: &Value, name: &str, f: impl Fn(f64, f64) -> f64 + 'static) -> RunResult<()> {
    set_method(rt, math, name, move |rt, this, args| {
        let [x, y] = args.destructure(&mut rt.heap);
        let a = rt.to_number_value(&x);
        let b = rt.to_number_value(&y);
        x.drop_with_heap(&mut rt.heap);
        y.drop_with_heap(&mut rt.heap);
        this.drop_with_heap(&mut rt.heap);
        Ok(Value::number(f(a, b)))
    })
}

/// Variadic min/max: NaN is contagious, the empty call yields the seed.
fn fold_args(
    rt: &mut Runtime,
    this: Value,
    args: crate::args::Args,
    seed: f64,
    f: impl Fn(f64, f64) -> f64,
) -> RunResult<Value> {
    let mut acc = seed;
    let mut saw_nan = false;
    for value in args.into_values() {
        let n = rt.to_number_value(&value);
        value.drop_with_heap(&mut rt.heap);
        if n.is_nan() {
            saw_nan = true;
        } else {
            acc = f(acc, n);
        }
    }
    this.drop_with_heap(&mut rt.heap);
    Ok(Value::number(if saw_nan { f64::NAN } else { acc }))
}
