//! The iteration protocol: iterator cell stepping, the standard iterators for
//! arrays and strings, and spread.

use crate::{
    args::Args,
    exception::{RunError, RunResult},
    heap::{DropWithHeap, Heap, HeapData, HeapId},
    runtime::Runtime,
    types::{
        GenState, JsIterator,
        iterator::{GenBody, Resume, Step},
        string::unit_to_string,
    },
    value::Value,
};

/// One `next`/`return`/`throw` outcome before it is wrapped in a result
/// object.
pub(crate) struct IterOutcome {
    pub value: Value,
    pub done: bool,
}

impl Runtime {
    // --- obtaining iterators ----------------------------------------------

    /// Resolves a value to an iterator: iterator cells pass through
    /// (iterators are their own iterable), arrays and strings get their
    /// standard iterators, and anything else is asked for its
    /// well-known iteration method.
    pub fn get_iterator(&mut self, value: &Value) -> RunResult<Value> {
        if value.is_iterator() {
            return Ok(value.clone_with_heap(&self.heap));
        }
        if value.is_array() {
            let arr = value.clone_with_heap(&self.heap);
            return self
                .heap
                .alloc_value(HeapData::Iterator(JsIterator::new(Box::new(ArrayIter {
                    array: arr,
                    index: 0,
                }))));
        }
        if value.is_string()
            && let Some(id) = value.heap_id()
            && let HeapData::Str(s) = self.heap.get(id)
        {
            let units: Vec<Box<str>> = s.as_str().bytes().map(|b| unit_to_string(b).into()).collect();
            return self
                .heap
                .alloc_value(HeapData::Iterator(JsIterator::new(Box::new(StringIter {
                    units,
                    index: 0,
                }))));
        }
        if value.is_object_like() {
            let sym = self.realm.well_known.iterator.clone_with_heap(&self.heap);
            let method = self.get_key(value, &sym);
            sym.drop_with_heap(&mut self.heap);
            let method = method?;
            if method.is_function() {
                let this = value.clone_with_heap(&self.heap);
                let iter = self.call(&method, this, Args::new());
                method.drop_with_heap(&mut self.heap);
                return iter;
            }
            method.drop_with_heap(&mut self.heap);
        }
        Err(self.throw_type(format!("{} is not iterable", self.brief(value))))
    }

    // --- driving iterators ------------------------------------------------

    /// `iter.next(input)`, returning a `{value, done}` result object.
    pub fn iter_next(&mut self, iter: &Value, input: Value) -> RunResult<Value> {
        let outcome = self.iter_next_raw(iter, input)?;
        self.iter_result_object(outcome)
    }

    /// `iter.return(value)`.
    pub fn iter_return(&mut self, iter: &Value, value: Value) -> RunResult<Value> {
        let outcome = self.iter_return_raw(iter, value)?;
        self.iter_result_object(outcome)
    }

    /// `iter.throw(error)`.
    pub fn iter_throw(&mut self, iter: &Value, error: Value) -> RunResult<Value> {
        let outcome = self.iter_throw_raw(iter, error)?;
        self.iter_result_object(outcome)
    }

    /// `next` without the result-object wrapper, for internal loops.
    pub(crate) fn iter_next_raw(&mut self, iter: &Value, input: Value) -> RunResult<IterOutcome> {
        if iter.is_iterator() {
            let id = iter.heap_id().expect("iterator is heap backed");
            return self.step_iterator(id, Resume::Next(input));
        }
        if iter.is_object_like() {
            // A user object following the protocol: call its `next`.
            let result = self.call_method(iter, "next", Args::from_values([input]))?;
            let value = self.get(&result, "value")?;
            let done_value = self.get(&result, "done")?;
            let done = crate::convert::truthy(&self.heap, &done_value);
            done_value.drop_with_heap(&mut self.heap);
            result.drop_with_heap(&mut self.heap);
            return Ok(IterOutcome { value, done });
        }
        input.drop_with_heap(&mut self.heap);
        Err(self.throw_type(format!("{} is not an iterator", self.brief(iter))))
    }

    pub(crate) fn iter_return_raw(&mut self, iter: &Value, value: Value) -> RunResult<IterOutcome> {
        if !iter.is_iterator() {
            return Ok(IterOutcome { value, done: true });
        }
        let id = iter.heap_id().expect("iterator is heap backed");
        let state = self.iterator_state(id);
        match state {
            GenState::New | GenState::Finished => {
                self.finish_iterator(id);
                Ok(IterOutcome { value, done: true })
            }
            GenState::Running => {
                value.drop_with_heap(&mut self.heap);
                Err(self.throw_type("Generator is already running"))
            }
            GenState::Suspended => self.step_iterator(id, Resume::Return(value)),
        }
    }

    pub(crate) fn iter_throw_raw(&mut self, iter: &Value, error: Value) -> RunResult<IterOutcome> {
        if !iter.is_iterator() {
            return Err(RunError::Thrown(error));
        }
        let id = iter.heap_id().expect("iterator is heap backed");
        match self.iterator_state(id) {
            GenState::New | GenState::Finished => {
                self.finish_iterator(id);
                Err(RunError::Thrown(error))
            }
            GenState::Running => {
                error.drop_with_heap(&mut self.heap);
                Err(self.throw_type("Generator is already running"))
            }
            GenState::Suspended => self.step_iterator(id, Resume::Throw(error)),
        }
    }

    fn iterator_state(&self, id: HeapId) -> GenState {
        match self.heap.get(id) {
            HeapData::Iterator(it) => it.state,
            _ => GenState::Finished,
        }
    }

    /// Marks an iterator finished and disposes its body.
    fn finish_iterator(&mut self, id: HeapId) {
        let body = match self.heap.get_mut(id) {
            HeapData::Iterator(it) => {
                it.state = GenState::Finished;
                it.body.take()
            }
            _ => None,
        };
        if let Some(mut body) = body {
            body.dispose(&mut self.heap);
        }
    }

    /// Resumes an iterator body once. Re-entry is a TypeError; the body is
    /// taken out of the cell while it runs.
    fn step_iterator(&mut self, id: HeapId, resume: Resume) -> RunResult<IterOutcome> {
        if self.iterator_state(id) == GenState::Running {
            resume.drop_with_heap(&mut self.heap);
            return Err(self.throw_type("Generator is already running"));
        }
        let body = match self.heap.get_mut(id) {
            HeapData::Iterator(it) if it.state != GenState::Finished => {
                it.state = GenState::Running;
                it.body.take()
            }
            _ => None,
        };
        let Some(mut body) = body else {
            // Finished: next() keeps reporting the terminal result.
            let value = match resume {
                Resume::Next(v) | Resume::Return(v) => {
                    v.drop_with_heap(&mut self.heap);
                    Value::undefined()
                }
                Resume::Throw(e) => return Err(RunError::Thrown(e)),
            };
            return Ok(IterOutcome { value, done: true });
        };

        let outcome = body.step(self, resume);
        match outcome {
            Ok(Step::Yield(value)) => {
                match self.heap.get_mut(id) {
                    HeapData::Iterator(it) => {
                        it.state = GenState::Suspended;
                        it.body = Some(body);
                    }
                    _ => unreachable!("iterator cell kind cannot change mid-step"),
                }
                Ok(IterOutcome { value, done: false })
            }
            Ok(Step::Done(value)) => {
                body.dispose(&mut self.heap);
                if let HeapData::Iterator(it) = self.heap.get_mut(id) {
                    it.state = GenState::Finished;
                }
                Ok(IterOutcome { value, done: true })
            }
            Ok(Step::Await(value)) => {
                value.drop_with_heap(&mut self.heap);
                body.dispose(&mut self.heap);
                if let HeapData::Iterator(it) = self.heap.get_mut(id) {
                    it.state = GenState::Finished;
                }
                Err(self.throw_type("await is only valid in async functions"))
            }
            Err(err) => {
                body.dispose(&mut self.heap);
                if let HeapData::Iterator(it) = self.heap.get_mut(id) {
                    it.state = GenState::Finished;
                }
                Err(err)
            }
        }
    }

    /// Builds the `{value, done}` result object.
    pub(crate) fn iter_result_object(&mut self, outcome: IterOutcome) -> RunResult<Value> {
        let result = self.object()?;
        self.set(&result, "value", outcome.value)?;
        self.set(&result, "done", Value::boolean(outcome.done))?;
        Ok(result)
    }

    /// Reads `value`/`done` out of a result object.
    pub fn iter_result_parts(&mut self, result: &Value) -> RunResult<(Value, bool)> {
        let value = self.get(result, "value")?;
        let done_value = self.get(result, "done")?;
        let done = crate::convert::truthy(&self.heap, &done_value);
        done_value.drop_with_heap(&mut self.heap);
        Ok((value, done))
    }

    // --- spread -----------------------------------------------------------

    /// `[...source]` tail: appends the spread of `source` onto `target`
    /// (an array). Arrays iterate by index, strings by element, everything
    /// else through the iteration protocol.
    pub fn spread_into_array(&mut self, target: &Value, source: &Value) -> RunResult<()> {
        let mut start = self.array_length(target);
        if source.is_array() {
            let len = self.array_length(source);
            for i in 0..len {
                let element = self.get_index(source, i as u32)?;
                self.set_index(target, start as u32, element)?;
                start += 1;
            }
            return Ok(());
        }
        if source.is_string()
            && let Some(id) = source.heap_id()
            && let HeapData::Str(s) = self.heap.get(id)
        {
            let units: Vec<Box<str>> = s.as_str().bytes().map(|b| unit_to_string(b).into()).collect();
            for unit in units {
                let element = self.heap.str_value(unit)?;
                self.set_index(target, start as u32, element)?;
                start += 1;
            }
            return Ok(());
        }
        let iter = self.get_iterator(source)?;
        loop {
            let outcome = match self.iter_next_raw(&iter, Value::undefined()) {
                Ok(outcome) => outcome,
                Err(err) => {
                    iter.drop_with_heap(&mut self.heap);
                    return Err(err);
                }
            };
            if outcome.done {
                outcome.value.drop_with_heap(&mut self.heap);
                iter.drop_with_heap(&mut self.heap);
                return Ok(());
            }
            self.set_index(target, start as u32, outcome.value)?;
            start += 1;
        }
    }

    /// `{...source}`: copies the source's own enumerable properties onto
    /// `target`, resolving accessors. Nullish sources are a no-op.
    pub fn spread_into_object(&mut self, target: &Value, source: &Value) -> RunResult<()> {
        if source.is_nullish() {
            return Ok(());
        }
        let names = self.own_enumerable_names(source)?;
        for name in names {
            if let Some(value) = self.get_own(source, &name)? {
                self.set(target, &name, value)?;
            }
        }
        Ok(())
    }

    /// `Array.from`-style materialization of any iterable into a new array.
    pub fn array_from_iterable(&mut self, source: &Value) -> RunResult<Value> {
        let target = self.array(Vec::new())?;
        match self.spread_into_array(&target, source) {
            Ok(()) => Ok(target),
            Err(err) => {
                target.drop_with_heap(&mut self.heap);
                Err(err)
            }
        }
    }

    /// TypeError whose payload is a full Error cell.
    pub(crate) fn throw_type(&mut self, message: impl Into<Box<str>>) -> RunError {
        self.throw(crate::exception::ExcType::TypeError, &message.into())
    }
}

/// The standard array iterator: yields `get_property(i)` for `i` in
/// `[0, length)`, observing mutation during iteration.
struct ArrayIter {
    array: Value,
    index: u64,
}

impl GenBody for ArrayIter {
    fn step(&mut self, rt: &mut Runtime, input: Resume) -> RunResult<Step> {
        match input {
            Resume::Return(v) => Ok(Step::Done(v)),
            Resume::Throw(e) => Err(RunError::Thrown(e)),
            Resume::Next(v) => {
                v.drop_with_heap(&mut rt.heap);
                let len = rt.array_length(&self.array);
                if self.index >= len {
                    return Ok(Step::Done(Value::undefined()));
                }
                let element = rt.get_index(&self.array, self.index as u32)?;
                self.index += 1;
                Ok(Step::Yield(element))
            }
        }
    }

    fn dispose(&mut self, heap: &mut Heap) {
        std::mem::take(&mut self.array).drop_with_heap(heap);
    }
}

/// The string iterator: yields one-element strings.
struct StringIter {
    units: Vec<Box<str>>,
    index: usize,
}

impl GenBody for StringIter {
    fn step(&mut self, rt: &mut Runtime, input: Resume) -> RunResult<Step> {
        match input {
            Resume::Return(v) => Ok(Step::Done(v)),
            Resume::Throw(e) => Err(RunError::Thrown(e)),
            Resume::Next(v) => {
                v.drop_with_heap(&mut rt.heap);
                if self.index >= self.units.len() {
                    return Ok(Step::Done(Value::undefined()));
                }
                let unit = self.units[self.index].clone();
                self.index += 1;
                Ok(Step::Yield(rt.heap.str_value(unit)?))
            }
        }
    }
}
