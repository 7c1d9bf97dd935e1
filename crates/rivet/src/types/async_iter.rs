//! Async coroutine cells.
//!
//! One driver type backs both async functions and async generators: the body
//! is the same lowered state machine as a synchronous generator, but `Await`
//! steps suspend on a promise, and produced values settle promises instead of
//! being returned directly.

use std::collections::VecDeque;
use std::fmt;

use crate::{
    heap::{DropWithHeap, Heap, HeapId},
    types::{PropMap, iterator::GenBody},
    value::Value,
};

/// What the coroutine's completions feed.
#[derive(Debug, Clone, Copy)]
pub(crate) enum AsyncKind {
    /// An async function: a single result promise, fulfilled by `Done` and
    /// rejected by a throw. Yields are invalid.
    Function { result: HeapId },
    /// An async generator: each `next(v)` enqueues a pending promise that a
    /// later yield/return/throw settles in FIFO order.
    Generator,
}

/// An async coroutine cell.
pub(crate) struct JsAsyncIterator {
    pub body: Option<Box<dyn GenBody>>,
    pub kind: AsyncKind,
    /// Pending `(promise, input)` pairs from `next(v)` calls, settled in
    /// arrival order. Each entry owns a reference to its promise.
    pub queue: VecDeque<(HeapId, Value)>,
    /// Guards against re-entering the body while it executes.
    pub running: bool,
    /// True while suspended on an awaited promise.
    pub awaiting: bool,
    /// True once the body has been resumed at least once. An unstarted
    /// coroutine can be terminated without running any of its code.
    pub started: bool,
    pub finished: bool,
    pub props: PropMap,
}

impl JsAsyncIterator {
    pub(crate) fn new(body: Box<dyn GenBody>, kind: AsyncKind) -> Self {
        Self {
            body: Some(body),
            kind,
            queue: VecDeque::new(),
            running: false,
            awaiting: false,
            started: false,
            finished: false,
            props: PropMap::default(),
        }
    }
}

impl fmt::Debug for JsAsyncIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsAsyncIterator")
            .field("kind", &self.kind)
            .field("queued", &self.queue.len())
            .field("running", &self.running)
            .field("awaiting", &self.awaiting)
            .field("finished", &self.finished)
            .finish()
    }
}

impl DropWithHeap for JsAsyncIterator {
    fn drop_with_heap(self, heap: &mut Heap) {
        if let Some(mut body) = self.body {
            body.dispose(heap);
        }
        if let AsyncKind::Function { result } = self.kind {
            heap.dec_ref(result);
        }
        for (promise, input) in self.queue {
            heap.dec_ref(promise);
            input.drop_with_heap(heap);
        }
        for (_, value) in self.props {
            value.drop_with_heap(heap);
        }
    }
}
