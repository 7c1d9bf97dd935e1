//! The built-in library: intrinsic prototypes, the global object, and the
//! standard constructors and namespaces translated code expects.
//!
//! Everything here is defined as function values installed into global and
//! prototype cells; nothing is special-cased in the property engine beyond
//! the intrinsic prototype hookup.

pub(crate) mod array;
pub(crate) mod console;
pub(crate) mod error;
pub(crate) mod function;
pub(crate) mod global;
pub(crate) mod iterator;
pub(crate) mod math;
pub(crate) mod number;
pub(crate) mod object;
pub(crate) mod process;
pub(crate) mod promise;
pub(crate) mod string;
pub(crate) mod symbol;
pub(crate) mod timers;

use crate::{
    exception::{ExcType, RunResult},
    heap::{DropWithHeap, HeapData},
    intern::{StringId, statics},
    runtime::Runtime,
    types::{JsObject, JsSymbol},
    value::Value,
};

/// Populates a fresh runtime's realm: prototypes, well-known symbols, the
/// global object and the standard library.
pub(crate) fn install(rt: &mut Runtime) -> RunResult<()> {
    // The root prototype first; everything else chains off it.
    rt.realm.object_proto = rt.heap.alloc_value(HeapData::Object(JsObject::new(Value::null())))?;
    rt.realm.function_proto = rt.object()?;
    rt.realm.array_proto = rt.object()?;
    rt.realm.string_proto = rt.object()?;
    rt.realm.number_proto = rt.object()?;
    rt.realm.boolean_proto = rt.object()?;
    rt.realm.symbol_proto = rt.object()?;
    rt.realm.iterator_proto = rt.object()?;
    rt.realm.async_iterator_proto = rt.object()?;
    rt.realm.promise_proto = rt.object()?;

    let error_proto = rt.object()?;
    rt.realm.error_protos[ExcType::Error as usize] = error_proto;
    for exc in [
        ExcType::TypeError,
        ExcType::RangeError,
        ExcType::ReferenceError,
        ExcType::SyntaxError,
        ExcType::AggregateError,
    ] {
        let base = rt.realm.error_protos[ExcType::Error as usize].clone_with_heap(&rt.heap);
        let proto = rt.object_with_proto(base)?;
        rt.realm.error_protos[exc as usize] = proto;
    }

    install_well_known_symbols(rt)?;

    let global = rt.object()?;
    rt.realm.global = global;
    let global_self = rt.global();
    let global_ref = rt.global();
    rt.set(&global_ref, "globalThis", global_self)?;
    rt.set(&global_ref, "NaN", Value::number(f64::NAN))?;
    rt.set(&global_ref, "Infinity", Value::number(f64::INFINITY))?;
    rt.set(&global_ref, "undefined", Value::undefined())?;
    global_ref.drop_with_heap(&mut rt.heap);

    global::install(rt)?;
    console::install(rt)?;
    math::install(rt)?;
    process::install(rt)?;
    timers::install(rt)?;
    object::install(rt)?;
    function::install(rt)?;
    array::install(rt)?;
    string::install(rt)?;
    number::install(rt)?;
    symbol::install(rt)?;
    error::install(rt)?;
    promise::install(rt)?;
    iterator::install(rt)?;
    Ok(())
}

fn install_well_known_symbols(rt: &mut Runtime) -> RunResult<()> {
    fn well_known(rt: &mut Runtime, description: &str, key: StringId) -> RunResult<Value> {
        rt.heap
            .alloc_value(HeapData::Symbol(JsSymbol::new(Some(description.into()), key)))
    }
    rt.realm.well_known.iterator = well_known(rt, "Symbol.iterator", statics::SYM_ITERATOR)?;
    rt.realm.well_known.async_iterator = well_known(rt, "Symbol.asyncIterator", statics::SYM_ASYNC_ITERATOR)?;
    rt.realm.well_known.has_instance = well_known(rt, "Symbol.hasInstance", statics::SYM_HAS_INSTANCE)?;
    rt.realm.well_known.is_concat_spreadable =
        well_known(rt, "Symbol.isConcatSpreadable", statics::SYM_IS_CONCAT_SPREADABLE)?;
    rt.realm.well_known.match_sym = well_known(rt, "Symbol.match", statics::SYM_MATCH)?;
    rt.realm.well_known.match_all = well_known(rt, "Symbol.matchAll", statics::SYM_MATCH_ALL)?;
    rt.realm.well_known.replace = well_known(rt, "Symbol.replace", statics::SYM_REPLACE)?;
    rt.realm.well_known.search = well_known(rt, "Symbol.search", statics::SYM_SEARCH)?;
    rt.realm.well_known.species = well_known(rt, "Symbol.species", statics::SYM_SPECIES)?;
    rt.realm.well_known.split = well_known(rt, "Symbol.split", statics::SYM_SPLIT)?;
    rt.realm.well_known.to_primitive = well_known(rt, "Symbol.toPrimitive", statics::SYM_TO_PRIMITIVE)?;
    rt.realm.well_known.to_string_tag = well_known(rt, "Symbol.toStringTag", statics::SYM_TO_STRING_TAG)?;
    rt.realm.well_known.unscopables = well_known(rt, "Symbol.unscopables", statics::SYM_UNSCOPABLES)?;
    Ok(())
}

/// Installs a native method on a target cell under `name`.
pub(crate) fn set_method<F>(rt: &mut Runtime, target: &Value, name: &str, f: F) -> RunResult<()>
where
    F: Fn(&mut Runtime, Value, crate::args::Args) -> RunResult<Value> + 'static,
{
    let func = rt.method(name, f)?;
    rt.set(target, name, func)
}

/// Installs a value on the global object under `name`.
pub(crate) fn set_global(rt: &mut Runtime, name: &str, value: Value) -> RunResult<()> {
    let global = rt.global();
    let result = rt.set(&global, name, value);
    global.drop_with_heap(&mut rt.heap);
    result
}
