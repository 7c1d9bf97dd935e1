//! Callable cells.

use std::fmt;
use std::rc::Rc;

use crate::{
    args::Args,
    exception::RunResult,
    heap::{DropWithHeap, Heap, HeapId},
    runtime::Runtime,
    types::{PropMap, iterator::GenBody},
    value::Value,
};

/// A synchronous native entry point. Receives the runtime, the bound `this`
/// and the argument span; owns `this` and the arguments.
pub(crate) type NativeFn = Rc<dyn Fn(&mut Runtime, Value, Args) -> RunResult<Value>>;

/// Produces a fresh coroutine body for one generator / async invocation.
/// Argument binding happens here; execution starts on the first resume.
pub(crate) type GenFactory = Rc<dyn Fn(&mut Runtime, Value, Args) -> RunResult<Box<dyn GenBody>>>;

/// The callable variants a function cell dispatches over. New callable kinds
/// extend this enum; call sites switch on the variant.
#[derive(Clone)]
pub(crate) enum Callable {
    /// Runs synchronously and returns a value.
    Plain(NativeFn),
    /// Produces an iterator cell wrapping a fresh coroutine body.
    Generator(GenFactory),
    /// Produces a promise cell; the body runs until its first suspension.
    Async(GenFactory),
    /// Produces an async-iterator cell.
    AsyncGenerator(GenFactory),
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain(_) => "Plain",
            Self::Generator(_) => "Generator",
            Self::Async(_) => "Async",
            Self::AsyncGenerator(_) => "AsyncGenerator",
        })
    }
}

/// A function cell.
#[derive(Debug)]
pub(crate) struct JsFunction {
    /// Display name, used by `name`, console output and error messages.
    pub name: Box<str>,
    pub callable: Callable,
    /// Own properties, including the `prototype` object when wired.
    pub props: PropMap,
    /// Class constructors render differently and reject plain calls.
    pub is_class_ctor: bool,
    /// The function object's own prototype reference (`Function.prototype`).
    pub proto: Value,
    /// Variable cells captured by the closure. The function cell keeps them
    /// alive; the Rust closure addresses them by (copyable) heap id.
    pub captures: Vec<HeapId>,
}

impl JsFunction {
    pub(crate) fn new(name: impl Into<Box<str>>, callable: Callable, proto: Value) -> Self {
        Self {
            name: name.into(),
            callable,
            props: PropMap::default(),
            is_class_ctor: false,
            proto,
            captures: Vec::new(),
        }
    }
}

impl DropWithHeap for JsFunction {
    fn drop_with_heap(self, heap: &mut Heap) {
        self.proto.drop_with_heap(heap);
        for (_, value) in self.props {
            value.drop_with_heap(heap);
        }
        for cell in self.captures {
            heap.dec_ref(cell);
        }
    }
}
