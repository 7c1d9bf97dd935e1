//! Promise cells.

use crate::{
    heap::{DropWithHeap, Heap, HeapId},
    types::PropMap,
    value::Value,
};

/// Settlement state. At most one transition out of `Pending` ever happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromiseState {
    Pending,
    Fulfilled,
    Rejected,
}

/// Where a settled reaction delivers its outcome.
#[derive(Debug)]
pub(crate) enum ReactionTarget {
    /// Run the handler and settle this derived promise with the result
    /// (`then`/`catch`/`finally`). Owns a reference to the promise.
    Settle(HeapId),
    /// Forward the settlement into this promise unchanged (promise adoption
    /// during resolution). Owns a reference.
    Propagate(HeapId),
    /// Resume this suspended async coroutine cell (`await`). Owns a
    /// reference.
    Resume(HeapId),
}

impl DropWithHeap for ReactionTarget {
    fn drop_with_heap(self, heap: &mut Heap) {
        match self {
            Self::Settle(id) | Self::Propagate(id) | Self::Resume(id) => heap.dec_ref(id),
        }
    }
}

/// A fulfillment or rejection callback attached to a promise. Fires as a
/// microtask once the promise settles.
#[derive(Debug)]
pub(crate) struct Reaction {
    /// The user handler, or `undefined` to forward the value/reason.
    pub handler: Value,
    pub target: ReactionTarget,
}

impl DropWithHeap for Reaction {
    fn drop_with_heap(self, heap: &mut Heap) {
        self.handler.drop_with_heap(heap);
        self.target.drop_with_heap(heap);
    }
}

/// A promise cell: the three-state settlement machine plus its reaction
/// queues. Reactions attached after settlement still go through the
/// microtask queue, never inline.
#[derive(Debug)]
pub(crate) struct JsPromise {
    pub state: PromiseState,
    /// The resolution value or rejection reason once settled.
    pub result: Value,
    pub on_fulfilled: Vec<Reaction>,
    pub on_rejected: Vec<Reaction>,
    pub props: PropMap,
}

impl JsPromise {
    pub(crate) fn new() -> Self {
        Self {
            state: PromiseState::Pending,
            result: Value::undefined(),
            on_fulfilled: Vec::new(),
            on_rejected: Vec::new(),
            props: PropMap::default(),
        }
    }
}

impl DropWithHeap for JsPromise {
    fn drop_with_heap(self, heap: &mut Heap) {
        self.result.drop_with_heap(heap);
        for reaction in self.on_fulfilled {
            reaction.drop_with_heap(heap);
        }
        for reaction in self.on_rejected {
            reaction.drop_with_heap(heap);
        }
        for (_, value) in self.props {
            value.drop_with_heap(heap);
        }
    }
}
