//! The `Promise` constructor, combinators and prototype.

use std::rc::Rc;

use crate::{
    args::Args,
    builtins::{set_global, set_method},
    exception::{ExcType, RunResult},
    heap::{DropWithHeap, HeapId},
    nanbox::Tag,
    runtime::Runtime,
    value::Value,
};

pub(crate) fn install(rt: &mut Runtime) -> RunResult<()> {
    let promise_ctor = rt.class_constructor("Promise", |rt, this, mut args| {
        this.drop_with_heap(&mut rt.heap);
        let executor = args.take(0);
        args.drop_with_heap(&mut rt.heap);
        if !executor.is_function() {
            let msg = format!("Promise resolver {} is not a function", rt.brief(&executor));
            executor.drop_with_heap(&mut rt.heap);
            return Err(rt.throw_type(msg));
        }
        let (promise, id) = rt.promise_new()?;

        rt.heap.inc_ref(id);
        let resolve = rt.native_with_captures(
            "resolve",
            vec![id],
            Rc::new(move |rt: &mut Runtime, this: Value, args: Args| {
                this.drop_with_heap(&mut rt.heap);
                let [value] = args.destructure(&mut rt.heap);
                rt.resolve_promise(id, value);
                Ok(Value::undefined())
            }),
        )?;
        rt.heap.inc_ref(id);
        let reject = rt.native_with_captures(
            "reject",
            vec![id],
            Rc::new(move |rt: &mut Runtime, this: Value, args: Args| {
                this.drop_with_heap(&mut rt.heap);
                let [reason] = args.destructure(&mut rt.heap);
                rt.reject_promise(id, reason);
                Ok(Value::undefined())
            }),
        )?;

        let outcome = rt.call(&executor, Value::undefined(), Args::from_values([resolve, reject]));
        executor.drop_with_heap(&mut rt.heap);
        match outcome {
            Ok(result) => result.drop_with_heap(&mut rt.heap),
            Err(err) => {
                let reason = rt.error_value(err);
                rt.reject_promise(id, reason);
            }
        }
        Ok(promise)
    })?;

    let proto = rt.realm.promise_proto.clone_with_heap(&rt.heap);
    rt.set_own(&promise_ctor, "prototype", proto)?;
    let proto_ref = rt.realm.promise_proto.clone_with_heap(&rt.heap);
    let ctor_ref = promise_ctor.clone_with_heap(&rt.heap);
    rt.define_data_property_flags(&proto_ref, "constructor", ctor_ref, true, false, true)?;

    // --- statics ----------------------------------------------------------

    set_method(rt, &promise_ctor, "resolve", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        let [value] = args.destructure(&mut rt.heap);
        rt.promise_resolve_value(value)
    })?;

    set_method(rt, &promise_ctor, "reject", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        let [reason] = args.destructure(&mut rt.heap);
        rt.promise_reject_value(reason)
    })?;

    set_method(rt, &promise_ctor, "all", |rt, this, args| {
        combine(rt, this, args, Combinator::All)
    })?;
    set_method(rt, &promise_ctor, "allSettled", |rt, this, args| {
        combine(rt, this, args, Combinator::AllSettled)
    })?;
    set_method(rt, &promise_ctor, "race", |rt, this, args| {
        combine(rt, this, args, Combinator::Race)
    })?;
    set_method(rt, &promise_ctor, "any", |rt, this, args| {
        combine(rt, this, args, Combinator::Any)
    })?;

    // --- prototype --------------------------------------------------------

    set_method(rt, &proto_ref, "then", |rt, this, mut args| {
        let on_fulfilled = args.take(0);
        let on_rejected = args.take(1);
        args.drop_with_heap(&mut rt.heap);
        let result = rt.promise_then(&this, on_fulfilled, on_rejected);
        this.drop_with_heap(&mut rt.heap);
        result
    })?;

    set_method(rt, &proto_ref, "catch", |rt, this, mut args| {
        let handler = args.take(0);
        args.drop_with_heap(&mut rt.heap);
        let result = rt.promise_then(&this, Value::undefined(), handler);
        this.drop_with_heap(&mut rt.heap);
        result
    })?;

    set_method(rt, &proto_ref, "finally", |rt, this, mut args| {
        let handler = args.take(0);
        args.drop_with_heap(&mut rt.heap);
        if !handler.is_function() {
            // Non-callable cleanup handlers forward the settlement as-is.
            let pass = handler.clone_with_heap(&rt.heap);
            let result = rt.promise_then(&this, pass, handler);
            this.drop_with_heap(&mut rt.heap);
            return result;
        }
        let cell = rt.new_cell(handler)?;

        rt.heap.inc_ref(cell);
        let on_fulfilled = rt.native_with_captures(
            "",
            vec![cell],
            Rc::new(move |rt: &mut Runtime, this: Value, args: Args| {
                this.drop_with_heap(&mut rt.heap);
                let [value] = args.destructure(&mut rt.heap);
                let h = rt.heap.cell_get(cell);
                let outcome = rt.call(&h, Value::undefined(), Args::new());
                h.drop_with_heap(&mut rt.heap);
                match outcome {
                    Ok(r) => {
                        r.drop_with_heap(&mut rt.heap);
                        Ok(value)
                    }
                    Err(err) => {
                        value.drop_with_heap(&mut rt.heap);
                        Err(err)
                    }
                }
            }),
        )?;
        rt.heap.inc_ref(cell);
        let on_rejected = rt.native_with_captures(
            "",
            vec![cell],
            Rc::new(move |rt: &mut Runtime, this: Value, args: Args| {
                this.drop_with_heap(&mut rt.heap);
                let [reason] = args.destructure(&mut rt.heap);
                let h = rt.heap.cell_get(cell);
                let outcome = rt.call(&h, Value::undefined(), Args::new());
                h.drop_with_heap(&mut rt.heap);
                match outcome {
                    Ok(r) => {
                        r.drop_with_heap(&mut rt.heap);
                        Err(crate::exception::RunError::Thrown(reason))
                    }
                    Err(err) => {
                        reason.drop_with_heap(&mut rt.heap);
                        Err(err)
                    }
                }
            }),
        )?;
        rt.heap.dec_ref(cell);

        let result = rt.promise_then(&this, on_fulfilled, on_rejected);
        this.drop_with_heap(&mut rt.heap);
        result
    })?;

    proto_ref.drop_with_heap(&mut rt.heap);
    set_global(rt, "Promise", promise_ctor)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Combinator {
    All,
    AllSettled,
    Race,
    Any,
}

/// Shared combinator driver: materializes the iterable, subscribes to every
/// entry, and settles the result promise per the combinator's rule.
fn combine(rt: &mut Runtime, this: Value, args: Args, kind: Combinator) -> RunResult<Value> {
    this.drop_with_heap(&mut rt.heap);
    let [iterable] = args.destructure(&mut rt.heap);
    let items = rt.array_from_iterable(&iterable);
    iterable.drop_with_heap(&mut rt.heap);
    let items = items?;
    let count = rt.array_length(&items);

    let (result, result_id) = rt.promise_new()?;

    if count == 0 {
        match kind {
            Combinator::All | Combinator::AllSettled => {
                let empty = rt.array(Vec::new())?;
                rt.resolve_promise(result_id, empty);
            }
            Combinator::Any => {
                let reason = aggregate_error(rt, Vec::new())?;
                rt.reject_promise(result_id, reason);
            }
            Combinator::Race => {}
        }
        items.drop_with_heap(&mut rt.heap);
        return Ok(result);
    }

    // Shared bookkeeping: the collected outcomes and the remaining counter.
    let outcomes: Vec<Value> = (0..count).map(|_| Value::undefined()).collect();
    let collected = rt.array(outcomes)?;
    let collected_id = collected.heap_id().expect("array is heap backed");
    let remaining = rt.new_cell(Value::number(count as f64))?;

    for i in 0..count {
        let item = rt.get_index(&items, i as u32)?;
        let entry = rt.promise_resolve_value(item)?;
        let index = i as u32;

        let on_fulfilled = subscriber(rt, kind, true, index, collected_id, remaining, result_id)?;
        let on_rejected = subscriber(rt, kind, false, index, collected_id, remaining, result_id)?;
        let derived = rt.promise_then(&entry, on_fulfilled, on_rejected)?;
        derived.drop_with_heap(&mut rt.heap);
        entry.drop_with_heap(&mut rt.heap);
    }

    rt.heap.dec_ref(remaining);
    collected.drop_with_heap(&mut rt.heap);
    items.drop_with_heap(&mut rt.heap);
    Ok(result)
}

/// Builds the per-entry reaction for one combinator side.
fn subscriber(
    rt: &mut Runtime,
    kind: Combinator,
    fulfilled: bool,
    index: u32,
    collected: HeapId,
    remaining: HeapId,
    result: HeapId,
) -> RunResult<Value> {
    rt.heap.inc_ref(collected);
    rt.heap.inc_ref(remaining);
    rt.heap.inc_ref(result);
    let captures = vec![collected, remaining, result];
    rt.native_with_captures(
        "",
        captures,
        Rc::new(move |rt: &mut Runtime, this: Value, args: Args| {
            this.drop_with_heap(&mut rt.heap);
            let [outcome] = args.destructure(&mut rt.heap);
            match (kind, fulfilled) {
                (Combinator::Race, _) => {
                    if fulfilled {
                        rt.resolve_promise(result, outcome);
                    } else {
                        rt.reject_promise(result, outcome);
                    }
                }
                (Combinator::All, false) => rt.reject_promise(result, outcome),
                (Combinator::All, true) => {
                    rt.heap.array_set_element(collected, index, outcome);
                    if decrement(rt, remaining) == 0 {
                        let all = rt.value_from_id(Tag::Array, collected);
                        rt.resolve_promise(result, all);
                    }
                }
                (Combinator::AllSettled, _) => {
                    let entry = settled_entry(rt, fulfilled, outcome)?;
                    rt.heap.array_set_element(collected, index, entry);
                    if decrement(rt, remaining) == 0 {
                        let all = rt.value_from_id(Tag::Array, collected);
                        rt.resolve_promise(result, all);
                    }
                }
                (Combinator::Any, true) => rt.resolve_promise(result, outcome),
                (Combinator::Any, false) => {
                    rt.heap.array_set_element(collected, index, outcome);
                    if decrement(rt, remaining) == 0 {
                        let mut reasons = Vec::new();
                        let all = rt.value_from_id(Tag::Array, collected);
                        let len = rt.array_length(&all);
                        for i in 0..len {
                            reasons.push(rt.get_index(&all, i as u32)?);
                        }
                        all.drop_with_heap(&mut rt.heap);
                        let error = aggregate_error(rt, reasons)?;
                        rt.reject_promise(result, error);
                    }
                }
            }
            Ok(Value::undefined())
        }),
    )
}

fn decrement(rt: &mut Runtime, counter: HeapId) -> u64 {
    let current = rt.heap.cell_get(counter);
    let next = current.as_number() - 1.0;
    rt.heap.cell_set(counter, Value::number(next));
    next as u64
}

/// One `{status, value|reason}` record for `allSettled`.
fn settled_entry(rt: &mut Runtime, fulfilled: bool, outcome: Value) -> RunResult<Value> {
    let entry = rt.object()?;
    let status = rt.string(if fulfilled { "fulfilled" } else { "rejected" })?;
    rt.set(&entry, "status", status)?;
    if fulfilled {
        rt.set(&entry, "value", outcome)?;
    } else {
        rt.set(&entry, "reason", outcome)?;
    }
    Ok(entry)
}

/// The AggregateError `Promise.any` rejects with.
fn aggregate_error(rt: &mut Runtime, reasons: Vec<Value>) -> RunResult<Value> {
    let error = rt.new_error(ExcType::AggregateError, "All promises were rejected")?;
    let list = rt.array(reasons)?;
    rt.set(&error, "errors", list)?;
    Ok(error)
}
