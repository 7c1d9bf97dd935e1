//! The `Symbol` object: constructor-like callable, the global registry, and
//! the well-known symbol members.

use crate::{
    builtins::{set_global, set_method},
    exception::RunResult,
    heap::{DropWithHeap, HeapData},
    runtime::Runtime,
    value::Value,
};

pub(crate) fn install(rt: &mut Runtime) -> RunResult<()> {
    let symbol_fn = rt.method("Symbol", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        let [description] = args.destructure(&mut rt.heap);
        let desc = if description.is_undefined() {
            None
        } else {
            Some(rt.to_js_string(&description)?)
        };
        description.drop_with_heap(&mut rt.heap);
        rt.symbol(desc.as_deref())
    })?;

    set_method(rt, &symbol_fn, "for", |rt, this, args| {
        this.drop_with_heap(&mut rt.heap);
        let [key] = args.destructure(&mut rt.heap);
        let name = rt.to_js_string(&key)?;
        key.drop_with_heap(&mut rt.heap);
        if let Some(existing) = rt.realm.symbol_registry.get(name.as_str()) {
            return Ok(existing.clone_with_heap(&rt.heap));
        }
        let fresh = rt.symbol(Some(&name))?;
        let registered = fresh.clone_with_heap(&rt.heap);
        rt.realm.symbol_registry.insert(name.into(), registered);
        Ok(fresh)
    })?;

    // The well-known members.
    let members: Vec<(&str, Value)> = vec![
        ("iterator", rt.realm.well_known.iterator.clone_with_heap(&rt.heap)),
        ("asyncIterator", rt.realm.well_known.async_iterator.clone_with_heap(&rt.heap)),
        ("hasInstance", rt.realm.well_known.has_instance.clone_with_heap(&rt.heap)),
        (
            "isConcatSpreadable",
            rt.realm.well_known.is_concat_spreadable.clone_with_heap(&rt.heap),
        ),
        ("match", rt.realm.well_known.match_sym.clone_with_heap(&rt.heap)),
        ("matchAll", rt.realm.well_known.match_all.clone_with_heap(&rt.heap)),
        ("replace", rt.realm.well_known.replace.clone_with_heap(&rt.heap)),
        ("search", rt.realm.well_known.search.clone_with_heap(&rt.heap)),
        ("species", rt.realm.well_known.species.clone_with_heap(&rt.heap)),
        ("split", rt.realm.well_known.split.clone_with_heap(&rt.heap)),
        ("toPrimitive", rt.realm.well_known.to_primitive.clone_with_heap(&rt.heap)),
        ("toStringTag", rt.realm.well_known.to_string_tag.clone_with_heap(&rt.heap)),
        ("unscopables", rt.realm.well_known.unscopables.clone_with_heap(&rt.heap)),
    ];
    for (name, value) in members {
        rt.set(&symbol_fn, name, value)?;
    }

    // Symbol.prototype.toString.
    let proto = rt.realm.symbol_proto.clone_with_heap(&rt.heap);
    set_method(rt, &proto, "toString", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        let text = match this.heap_id().map(|id| rt.heap.get(id)) {
            Some(HeapData::Symbol(sym)) => sym.display(),
            _ => "Symbol()".to_owned(),
        };
        this.drop_with_heap(&mut rt.heap);
        rt.string(text)
    })?;
    proto.drop_with_heap(&mut rt.heap);

    set_global(rt, "Symbol", symbol_fn)
}
