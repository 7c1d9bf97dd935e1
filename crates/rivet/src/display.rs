//! Console rendering of values.
//!
//! This is the formatter behind `console.log` and the uncaught-exception
//! report. It never invokes user code: accessors render as `[Getter]` and
//! friends, and cycles are cut with `[Circular]`. Strings print bare at the
//! top level but quoted inside containers.

use crate::{
    convert,
    heap::{Heap, HeapData, HeapId},
    intern::{Interns, statics},
    nanbox::Tag,
    types::PromiseState,
    value::Value,
};

/// Containers deeper than this render as their summary form.
const MAX_DEPTH: usize = 4;

/// Renders one console argument.
pub(crate) fn format_top(heap: &Heap, interns: &Interns, value: &Value) -> String {
    let mut seen = Vec::new();
    format_value(heap, interns, value, false, 0, &mut seen)
}

/// The uncaught-exception report line: error cells print their stack,
/// everything else prints as a console value.
pub(crate) fn format_uncaught(heap: &Heap, interns: &Interns, value: &Value) -> String {
    if let Some(stack) = error_stack(heap, value) {
        return format!("Uncaught {stack}");
    }
    let mut seen = Vec::new();
    format!("Uncaught {}", format_value(heap, interns, value, true, 0, &mut seen))
}

/// The `stack` string of an error-shaped object (own `stack` and `message`).
fn error_stack(heap: &Heap, value: &Value) -> Option<String> {
    if !value.is_object() {
        return None;
    }
    let id = value.heap_id()?;
    let stack_slot = heap.object_own_slot(id, statics::STACK)?;
    heap.object_own_slot(id, statics::MESSAGE)?;
    let HeapData::Object(o) = heap.get(id) else {
        return None;
    };
    let stored = &o.slots[stack_slot];
    match stored.heap_id().map(|sid| heap.get(sid)) {
        Some(HeapData::Str(s)) => Some(s.as_str().to_owned()),
        _ => None,
    }
}

fn format_value(
    heap: &Heap,
    interns: &Interns,
    value: &Value,
    nested: bool,
    depth: usize,
    seen: &mut Vec<HeapId>,
) -> String {
    match value.tag() {
        Tag::Undefined => "undefined".to_owned(),
        Tag::Null => "null".to_owned(),
        Tag::Uninit => "<uninitialized>".to_owned(),
        Tag::Bool => value.as_boolean().to_string(),
        Tag::Number => {
            let n = value.as_number();
            if n == 0.0 && n.is_sign_negative() {
                "-0".to_owned()
            } else {
                convert::number_to_string(n)
            }
        }
        Tag::Str => {
            let text = match value.heap_id().map(|id| heap.get(id)) {
                Some(HeapData::Str(s)) => s.as_str().to_owned(),
                _ => String::new(),
            };
            if nested { format!("'{text}'") } else { text }
        }
        Tag::Symbol => match value.heap_id().map(|id| heap.get(id)) {
            Some(HeapData::Symbol(sym)) => sym.display(),
            _ => "Symbol()".to_owned(),
        },
        Tag::Function => match value.heap_id().map(|id| heap.get(id)) {
            Some(HeapData::Function(f)) => {
                if f.is_class_ctor {
                    format!("[class {}]", f.name)
                } else if f.name.is_empty() {
                    "[Function (anonymous)]".to_owned()
                } else {
                    format!("[Function: {}]", f.name)
                }
            }
            _ => "[Function (anonymous)]".to_owned(),
        },
        Tag::Iterator => "Object [Generator] {}".to_owned(),
        Tag::AsyncIterator => "Object [AsyncGenerator] {}".to_owned(),
        Tag::Promise => format_promise(heap, interns, value, depth, seen),
        Tag::Array => format_array(heap, interns, value, depth, seen),
        Tag::Object => format_object(heap, interns, value, depth, seen),
        Tag::DataDesc | Tag::AccessorDesc => "[object Descriptor]".to_owned(),
    }
}

fn format_promise(heap: &Heap, interns: &Interns, value: &Value, depth: usize, seen: &mut Vec<HeapId>) -> String {
    let Some(id) = value.heap_id() else {
        return "Promise { <pending> }".to_owned();
    };
    match heap.get(id) {
        HeapData::Promise(p) => match p.state {
            PromiseState::Pending => "Promise { <pending> }".to_owned(),
            PromiseState::Fulfilled => {
                let inner = format_value(heap, interns, &p.result, true, depth + 1, seen);
                format!("Promise {{ {inner} }}")
            }
            PromiseState::Rejected => {
                let inner = format_value(heap, interns, &p.result, true, depth + 1, seen);
                format!("Promise {{ <rejected> {inner} }}")
            }
        },
        _ => "Promise { <pending> }".to_owned(),
    }
}

fn format_array(heap: &Heap, interns: &Interns, value: &Value, depth: usize, seen: &mut Vec<HeapId>) -> String {
    let Some(id) = value.heap_id() else {
        return "[]".to_owned();
    };
    if seen.contains(&id) {
        return "[Circular]".to_owned();
    }
    if depth >= MAX_DEPTH {
        return "[Array]".to_owned();
    }
    seen.push(id);
    let mut parts = Vec::new();
    let len = match heap.get(id) {
        HeapData::Array(a) => a.length,
        _ => 0,
    };
    // Very long arrays render a truncated view.
    let shown = len.min(100);
    for i in 0..shown {
        let rendered = match heap.get(id) {
            HeapData::Array(a) => {
                let idx = i as usize;
                if idx < a.dense.len() {
                    let v = &a.dense[idx];
                    if v.is_uninitialized() {
                        "<empty>".to_owned()
                    } else {
                        format_value(heap, interns, v, true, depth + 1, seen)
                    }
                } else if let Some(v) = a.sparse.get(&(i as u32)) {
                    format_value(heap, interns, v, true, depth + 1, seen)
                } else {
                    "<empty>".to_owned()
                }
            }
            _ => break,
        };
        parts.push(rendered);
    }
    if shown < len {
        parts.push(format!("... {} more items", len - shown));
    }
    seen.pop();
    if parts.is_empty() {
        "[]".to_owned()
    } else {
        format!("[ {} ]", parts.join(", "))
    }
}

fn format_object(heap: &Heap, interns: &Interns, value: &Value, depth: usize, seen: &mut Vec<HeapId>) -> String {
    let Some(id) = value.heap_id() else {
        return "{}".to_owned();
    };
    if seen.contains(&id) {
        return "[Circular]".to_owned();
    }
    if let Some(stack) = error_stack(heap, value) {
        return stack;
    }
    if depth >= MAX_DEPTH {
        return "[Object]".to_owned();
    }
    seen.push(id);
    let names = heap.object_own_names(id);
    let mut parts = Vec::new();
    for name in names {
        let text = interns.get(name);
        if text.starts_with("@@") {
            continue;
        }
        let Some(slot) = heap.object_own_slot(id, name) else {
            continue;
        };
        let HeapData::Object(o) = heap.get(id) else { break };
        let stored = &o.slots[slot];
        let rendered = if let Some(desc_id) = stored.heap_id() {
            match heap.get(desc_id) {
                HeapData::DataDesc(d) => {
                    if !d.enumerable {
                        continue;
                    }
                    format_value(heap, interns, &d.value, true, depth + 1, seen)
                }
                HeapData::AccessorDesc(d) => {
                    if !d.enumerable {
                        continue;
                    }
                    match (d.get.is_function(), d.set.is_function()) {
                        (true, true) => "[Getter/Setter]".to_owned(),
                        (true, false) => "[Getter]".to_owned(),
                        (false, true) => "[Setter]".to_owned(),
                        (false, false) => "undefined".to_owned(),
                    }
                }
                _ => format_value(heap, interns, stored, true, depth + 1, seen),
            }
        } else {
            format_value(heap, interns, stored, true, depth + 1, seen)
        };
        parts.push(format!("{text}: {rendered}"));
    }
    seen.pop();
    if parts.is_empty() {
        "{}".to_owned()
    } else {
        format!("{{ {} }}", parts.join(", "))
    }
}
