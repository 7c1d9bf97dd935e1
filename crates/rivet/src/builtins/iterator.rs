//! Prototype methods for iterator and async-iterator cells, and the
//! well-known iteration hooks on the container prototypes.

use crate::{builtins::set_method, exception::RunResult, heap::DropWithHeap, runtime::Runtime};

pub(crate) fn install(rt: &mut Runtime) -> RunResult<()> {
    let proto = rt.realm.iterator_proto.clone_with_heap(&rt.heap);

    set_method(rt, &proto, "next", |rt, this, args| {
        let [input] = args.destructure(&mut rt.heap);
        let result = rt.iter_next(&this, input);
        this.drop_with_heap(&mut rt.heap);
        result
    })?;
    set_method(rt, &proto, "return", |rt, this, args| {
        let [value] = args.destructure(&mut rt.heap);
        let result = rt.iter_return(&this, value);
        this.drop_with_heap(&mut rt.heap);
        result
    })?;
    set_method(rt, &proto, "throw", |rt, this, args| {
        let [error] = args.destructure(&mut rt.heap);
        let result = rt.iter_throw(&this, error);
        this.drop_with_heap(&mut rt.heap);
        result
    })?;

    // An iterator is its own iterable.
    let self_iter = rt.method("[Symbol.iterator]", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        Ok(this)
    })?;
    let sym = rt.realm.well_known.iterator.clone_with_heap(&rt.heap);
    rt.set_key(&proto, &sym, self_iter)?;
    sym.drop_with_heap(&mut rt.heap);
    proto.drop_with_heap(&mut rt.heap);

    // Async iterator prototype.
    let proto = rt.realm.async_iterator_proto.clone_with_heap(&rt.heap);
    set_method(rt, &proto, "next", |rt, this, args| {
        let [input] = args.destructure(&mut rt.heap);
        let result = rt.async_next(&this, input);
        this.drop_with_heap(&mut rt.heap);
        result
    })?;
    set_method(rt, &proto, "return", |rt, this, args| {
        let [value] = args.destructure(&mut rt.heap);
        let result = rt.async_return(&this, value);
        this.drop_with_heap(&mut rt.heap);
        result
    })?;
    let self_async_iter = rt.method("[Symbol.asyncIterator]", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        Ok(this)
    })?;
    let sym = rt.realm.well_known.async_iterator.clone_with_heap(&rt.heap);
    rt.set_key(&proto, &sym, self_async_iter)?;
    sym.drop_with_heap(&mut rt.heap);
    proto.drop_with_heap(&mut rt.heap);

    // Containers expose their standard iterators through the well-known key.
    let array_iter = rt.method("[Symbol.iterator]", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        let iter = rt.get_iterator(&this);
        this.drop_with_heap(&mut rt.heap);
        iter
    })?;
    let proto = rt.realm.array_proto.clone_with_heap(&rt.heap);
    let sym = rt.realm.well_known.iterator.clone_with_heap(&rt.heap);
    rt.set_key(&proto, &sym, array_iter)?;
    sym.drop_with_heap(&mut rt.heap);
    proto.drop_with_heap(&mut rt.heap);

    let string_iter = rt.method("[Symbol.iterator]", |rt, this, args| {
        args.drop_with_heap(&mut rt.heap);
        let iter = rt.get_iterator(&this);
        this.drop_with_heap(&mut rt.heap);
        iter
    })?;
    let proto = rt.realm.string_proto.clone_with_heap(&rt.heap);
    let sym = rt.realm.well_known.iterator.clone_with_heap(&rt.heap);
    rt.set_key(&proto, &sym, string_iter)?;
    sym.drop_with_heap(&mut rt.heap);
    proto.drop_with_heap(&mut rt.heap);

    Ok(())
}
