//! Callable dispatch: calls, construction, and method invocation.

use crate::{
    args::Args,
    exception::{RunError, RunResult},
    heap::{DropWithHeap, HeapData},
    nanbox::Tag,
    runtime::Runtime,
    types::{AsyncKind, Callable, JsAsyncIterator, JsIterator, JsPromise},
    value::Value,
};

impl Runtime {
    /// Invokes a callable value with an explicit receiver. Consumes `this`
    /// and `args`; raises a TypeError for non-functions.
    pub fn call(&mut self, callee: &Value, this: Value, args: Args) -> RunResult<Value> {
        self.invoke(callee, this, args, false)
    }

    /// `new callee(...)`: allocates a receiver on `callee.prototype`, runs
    /// the constructor, and returns the explicit object result or the
    /// allocated receiver.
    pub fn construct(&mut self, ctor: &Value, args: Args) -> RunResult<Value> {
        if !ctor.is_function() {
            args.drop_with_heap(&mut self.heap);
            return Err(RunError::type_error(format!("{} is not a constructor", self.brief(ctor))));
        }
        let proto = self.get(ctor, "prototype")?;
        let proto = if proto.is_object_like() {
            proto
        } else {
            proto.drop_with_heap(&mut self.heap);
            self.realm.object_proto.clone_with_heap(&self.heap)
        };
        let receiver = self.object_with_proto(proto)?;

        let this = receiver.clone_with_heap(&self.heap);
        match self.invoke(ctor, this, args, true) {
            Ok(result) => {
                if result.is_object_like() {
                    receiver.drop_with_heap(&mut self.heap);
                    Ok(result)
                } else {
                    result.drop_with_heap(&mut self.heap);
                    Ok(receiver)
                }
            }
            Err(err) => {
                receiver.drop_with_heap(&mut self.heap);
                Err(err)
            }
        }
    }

    /// Optional call: `callee?.(...)` short-circuits to undefined when the
    /// callee is nullish.
    pub fn call_optional(&mut self, callee: &Value, this: Value, args: Args) -> RunResult<Value> {
        if callee.is_nullish() {
            this.drop_with_heap(&mut self.heap);
            args.drop_with_heap(&mut self.heap);
            return Ok(Value::undefined());
        }
        self.call(callee, this, args)
    }

    /// `base.name(...)`: property read plus call with `base` as receiver.
    pub fn call_method(&mut self, base: &Value, name: &str, args: Args) -> RunResult<Value> {
        let callee = match self.get(base, name) {
            Ok(callee) => callee,
            Err(err) => {
                args.drop_with_heap(&mut self.heap);
                return Err(err);
            }
        };
        if !callee.is_function() {
            let msg = format!("{}.{name} is not a function", self.brief(base));
            callee.drop_with_heap(&mut self.heap);
            args.drop_with_heap(&mut self.heap);
            return Err(RunError::type_error(msg));
        }
        let this = base.clone_with_heap(&self.heap);
        let result = self.call(&callee, this, args);
        callee.drop_with_heap(&mut self.heap);
        result
    }

    fn invoke(&mut self, callee: &Value, this: Value, args: Args, via_new: bool) -> RunResult<Value> {
        let Some(id) = callee.heap_id().filter(|_| callee.is_function()) else {
            let msg = format!("{} is not a function", self.brief(callee));
            this.drop_with_heap(&mut self.heap);
            args.drop_with_heap(&mut self.heap);
            return Err(RunError::type_error(msg));
        };
        let (callable, is_class, name) = match self.heap.get(id) {
            HeapData::Function(f) => (f.callable.clone(), f.is_class_ctor, f.name.clone()),
            _ => unreachable!("function-tagged value must hold a function cell"),
        };
        if is_class && !via_new {
            this.drop_with_heap(&mut self.heap);
            args.drop_with_heap(&mut self.heap);
            return Err(RunError::type_error(format!(
                "Class constructor {name} cannot be invoked without 'new'"
            )));
        }

        match callable {
            Callable::Plain(f) => f(self, this, args),
            Callable::Generator(factory) => {
                let body = factory(self, this, args)?;
                self.heap.alloc_value(HeapData::Iterator(JsIterator::new(body)))
            }
            Callable::Async(factory) => {
                let body = factory(self, this, args)?;
                let promise = self.heap.alloc_value(HeapData::Promise(JsPromise::new()))?;
                let promise_id = promise.heap_id().expect("promise is heap backed");
                self.heap.inc_ref(promise_id);
                let cell = JsAsyncIterator::new(body, AsyncKind::Function { result: promise_id });
                let cell_id = self.heap.allocate(HeapData::AsyncIterator(cell))?;
                // The body runs synchronously up to its first await; after
                // that only pending reactions keep the coroutine alive.
                self.drive_async(cell_id, crate::types::iterator::Resume::Next(Value::undefined()));
                self.heap.dec_ref(cell_id);
                Ok(promise)
            }
            Callable::AsyncGenerator(factory) => {
                let body = factory(self, this, args)?;
                let cell = JsAsyncIterator::new(body, AsyncKind::Generator);
                self.heap.alloc_value(HeapData::AsyncIterator(cell))
            }
        }
    }

    /// A short rendering of a value for error messages, cheap and total.
    pub(crate) fn brief(&self, value: &Value) -> String {
        match value.tag() {
            Tag::Undefined => "undefined".to_owned(),
            Tag::Null => "null".to_owned(),
            Tag::Uninit => "<uninitialized>".to_owned(),
            Tag::Bool => value.as_boolean().to_string(),
            Tag::Number => crate::convert::number_to_string(value.as_number()),
            Tag::Str => match value.heap_id().map(|id| self.heap.get(id)) {
                Some(HeapData::Str(s)) => format!("'{}'", s.as_str()),
                _ => "'...'".to_owned(),
            },
            Tag::Function => match value.heap_id().map(|id| self.heap.get(id)) {
                Some(HeapData::Function(f)) => format!("function {}", f.name),
                _ => "function".to_owned(),
            },
            Tag::Array => "[object Array]".to_owned(),
            Tag::Symbol => "Symbol()".to_owned(),
            Tag::Promise => "[object Promise]".to_owned(),
            _ => "[object Object]".to_owned(),
        }
    }
}
