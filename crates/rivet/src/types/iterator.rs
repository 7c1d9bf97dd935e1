//! Iterator cells and the coroutine step protocol.
//!
//! Generator bodies are lowered by the code generator to explicit state
//! machines: a saved-locals struct plus a step function. The two-way
//! `next(v)` channel is the [`Resume`] input read at each resume; `return(v)`
//! and `throw(e)` arrive as dedicated resume variants the body observes at
//! its current suspension point.

use std::fmt;

use crate::{
    exception::RunResult,
    heap::{DropWithHeap, Heap},
    runtime::Runtime,
    types::PropMap,
    value::Value,
};

/// Input delivered to a coroutine body when it resumes.
#[derive(Debug)]
pub enum Resume {
    /// `next(v)`: the value of the suspended `yield`/`await` expression.
    Next(Value),
    /// `return(v)`: unwind, treating `v` as the result. A body with cleanup
    /// to run may keep yielding before finishing.
    Return(Value),
    /// `throw(e)`: rethrow `e` at the suspension point. A body that catches
    /// it continues normally.
    Throw(Value),
}

impl DropWithHeap for Resume {
    fn drop_with_heap(self, heap: &mut Heap) {
        match self {
            Self::Next(v) | Self::Return(v) | Self::Throw(v) => v.drop_with_heap(heap),
        }
    }
}

/// Outcome of one coroutine step.
#[derive(Debug)]
pub enum Step {
    /// Suspended at `yield`, producing a value.
    Yield(Value),
    /// Suspended at `await`; the scheduler resumes the body when the awaited
    /// value settles. Only meaningful inside async bodies.
    Await(Value),
    /// The body returned; terminal.
    Done(Value),
}

/// A lowered coroutine body.
///
/// `step` drives the state machine one suspension at a time. Once it returns
/// `Step::Done` or an error it must not be stepped again.
pub trait GenBody {
    fn step(&mut self, rt: &mut Runtime, input: Resume) -> RunResult<Step>;

    /// Releases any runtime values the saved-locals struct still owns.
    /// Called when the owning cell is freed before the body finished.
    fn dispose(&mut self, heap: &mut Heap) {
        let _ = heap;
    }
}

/// Execution state of an iterator cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GenState {
    /// Created, not yet resumed.
    New,
    /// Currently executing. Re-entry is a TypeError.
    Running,
    /// Parked at a yield.
    Suspended,
    /// Ran to completion (returned or threw). Further `next()` calls report
    /// `{value: undefined, done: true}`.
    Finished,
}

/// An iterator cell produced by calling a generator function.
pub(crate) struct JsIterator {
    /// The coroutine body. Taken out of the cell while stepping; `None` also
    /// after the body finished and was dropped.
    pub body: Option<Box<dyn GenBody>>,
    pub state: GenState,
    pub props: PropMap,
}

impl JsIterator {
    pub(crate) fn new(body: Box<dyn GenBody>) -> Self {
        Self {
            body: Some(body),
            state: GenState::New,
            props: PropMap::default(),
        }
    }
}

impl fmt::Debug for JsIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsIterator")
            .field("state", &self.state)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

impl DropWithHeap for JsIterator {
    fn drop_with_heap(self, heap: &mut Heap) {
        if let Some(mut body) = self.body {
            body.dispose(heap);
        }
        for (_, value) in self.props {
            value.drop_with_heap(heap);
        }
    }
}
