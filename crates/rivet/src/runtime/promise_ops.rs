//! The promise settlement machine and resolution algorithm.

use crate::{
    args::Args,
    exception::RunResult,
    heap::{DropWithHeap, HeapData, HeapId},
    runtime::Runtime,
    scheduler::Microtask,
    types::{JsPromise, PromiseState, Reaction, ReactionTarget},
    value::Value,
};

impl Runtime {
    /// Allocates a pending promise, returning the value and its cell id.
    pub fn promise_new(&mut self) -> RunResult<(Value, HeapId)> {
        let value = self.heap.alloc_value(HeapData::Promise(JsPromise::new()))?;
        let id = value.heap_id().expect("promise is heap backed");
        Ok((value, id))
    }

    /// `Promise.resolve(x)`: forwards a promise unchanged, wraps any other
    /// value in an already-resolved promise.
    pub fn promise_resolve_value(&mut self, value: Value) -> RunResult<Value> {
        if value.is_promise() {
            return Ok(value);
        }
        let (promise, id) = self.promise_new()?;
        self.resolve_promise(id, value);
        Ok(promise)
    }

    /// `Promise.reject(r)`.
    pub fn promise_reject_value(&mut self, reason: Value) -> RunResult<Value> {
        let (promise, id) = self.promise_new()?;
        self.reject_promise(id, reason);
        Ok(promise)
    }

    /// The resolution algorithm. Resolving with a promise adopts its
    /// eventual state; resolving with the promise itself is a cycle and
    /// rejects with a TypeError. Settled promises ignore further calls.
    pub(crate) fn resolve_promise(&mut self, id: HeapId, value: Value) {
        if !self.promise_pending(id) {
            value.drop_with_heap(&mut self.heap);
            return;
        }
        if value.is_promise() {
            let inner = value.heap_id().expect("promise is heap backed");
            if inner == id {
                value.drop_with_heap(&mut self.heap);
                let cycle = self.throw(
                    crate::exception::ExcType::TypeError,
                    "Chaining cycle detected for promise",
                );
                let reason = self.error_value(cycle);
                self.reject_promise(id, reason);
                return;
            }
            // Adopt the inner promise's eventual settlement.
            self.heap.inc_ref(id);
            let on_fulfilled = Reaction {
                handler: Value::undefined(),
                target: ReactionTarget::Propagate(id),
            };
            self.heap.inc_ref(id);
            let on_rejected = Reaction {
                handler: Value::undefined(),
                target: ReactionTarget::Propagate(id),
            };
            self.attach_reactions(inner, on_fulfilled, on_rejected);
            value.drop_with_heap(&mut self.heap);
            return;
        }
        self.settle(id, PromiseState::Fulfilled, value);
    }

    pub(crate) fn reject_promise(&mut self, id: HeapId, reason: Value) {
        if !self.promise_pending(id) {
            reason.drop_with_heap(&mut self.heap);
            return;
        }
        self.settle(id, PromiseState::Rejected, reason);
    }

    fn promise_pending(&self, id: HeapId) -> bool {
        matches!(
            self.heap.get_if_live(id),
            Some(HeapData::Promise(p)) if p.state == PromiseState::Pending
        )
    }

    /// The single transition out of pending: stores the result and flushes
    /// one reaction queue onto the microtask queue, discarding the other.
    fn settle(&mut self, id: HeapId, state: PromiseState, result: Value) {
        let (fire, discard) = match self.heap.get_mut(id) {
            HeapData::Promise(p) => {
                p.state = state;
                p.result = result;
                let fulfilled = std::mem::take(&mut p.on_fulfilled);
                let rejected = std::mem::take(&mut p.on_rejected);
                if state == PromiseState::Fulfilled {
                    (fulfilled, rejected)
                } else {
                    (rejected, fulfilled)
                }
            }
            _ => unreachable!("settle on a non-promise cell"),
        };
        let rejected = state == PromiseState::Rejected;
        for reaction in fire {
            let argument = match self.heap.get(id) {
                HeapData::Promise(p) => p.result.clone_with_heap(&self.heap),
                _ => Value::undefined(),
            };
            self.scheduler.enqueue_microtask(Microtask::Reaction {
                reaction,
                argument,
                rejected,
            });
        }
        for reaction in discard {
            reaction.drop_with_heap(&mut self.heap);
        }
    }

    /// Attaches a reaction pair: queued while pending, scheduled as a
    /// microtask when already settled (never run inline).
    pub(crate) fn attach_reactions(&mut self, id: HeapId, on_fulfilled: Reaction, on_rejected: Reaction) {
        let state = match self.heap.get_if_live(id) {
            Some(HeapData::Promise(p)) => Some(p.state),
            _ => None,
        };
        let Some(state) = state else {
            on_fulfilled.drop_with_heap(&mut self.heap);
            on_rejected.drop_with_heap(&mut self.heap);
            return;
        };
        match state {
            PromiseState::Pending => {
                if let HeapData::Promise(p) = self.heap.get_mut(id) {
                    p.on_fulfilled.push(on_fulfilled);
                    p.on_rejected.push(on_rejected);
                }
            }
            PromiseState::Fulfilled | PromiseState::Rejected => {
                let rejected = state == PromiseState::Rejected;
                let argument = match self.heap.get(id) {
                    HeapData::Promise(p) => p.result.clone_with_heap(&self.heap),
                    _ => Value::undefined(),
                };
                let (fire, discard) = if rejected {
                    (on_rejected, on_fulfilled)
                } else {
                    (on_fulfilled, on_rejected)
                };
                discard.drop_with_heap(&mut self.heap);
                self.scheduler.enqueue_microtask(Microtask::Reaction {
                    reaction: fire,
                    argument,
                    rejected,
                });
            }
        }
    }

    /// `p.then(onFulfilled, onRejected)`: returns the derived promise.
    /// Non-callable handlers forward the settlement.
    pub fn promise_then(&mut self, promise: &Value, on_fulfilled: Value, on_rejected: Value) -> RunResult<Value> {
        if !promise.is_promise() {
            on_fulfilled.drop_with_heap(&mut self.heap);
            on_rejected.drop_with_heap(&mut self.heap);
            return Err(self.throw_type(format!("{}.then is not a function", self.brief(promise))));
        }
        let id = promise.heap_id().expect("promise is heap backed");
        let (derived, derived_id) = self.promise_new()?;
        self.heap.inc_ref(derived_id);
        let fulfill = Reaction {
            handler: on_fulfilled,
            target: ReactionTarget::Settle(derived_id),
        };
        self.heap.inc_ref(derived_id);
        let reject = Reaction {
            handler: on_rejected,
            target: ReactionTarget::Settle(derived_id),
        };
        self.attach_reactions(id, fulfill, reject);
        Ok(derived)
    }

    /// Runs one settled reaction (already dequeued as a microtask).
    pub(crate) fn run_reaction(&mut self, reaction: Reaction, argument: Value, rejected: bool) -> RunResult<()> {
        let Reaction { handler, target } = reaction;
        match target {
            ReactionTarget::Settle(derived) => {
                if handler.is_function() {
                    let result = self.call(&handler, Value::undefined(), Args::from_values([argument]));
                    match result {
                        Ok(value) => self.resolve_promise(derived, value),
                        Err(err) => {
                            let reason = self.error_value(err);
                            self.reject_promise(derived, reason);
                        }
                    }
                } else if rejected {
                    self.reject_promise(derived, argument);
                } else {
                    self.resolve_promise(derived, argument);
                }
                handler.drop_with_heap(&mut self.heap);
                self.heap.dec_ref(derived);
            }
            ReactionTarget::Propagate(target_id) => {
                if rejected {
                    self.reject_promise(target_id, argument);
                } else {
                    self.resolve_promise(target_id, argument);
                }
                handler.drop_with_heap(&mut self.heap);
                self.heap.dec_ref(target_id);
            }
            ReactionTarget::Resume(cell) => {
                let resume = if rejected {
                    crate::types::iterator::Resume::Throw(argument)
                } else {
                    crate::types::iterator::Resume::Next(argument)
                };
                handler.drop_with_heap(&mut self.heap);
                self.drive_async_resume(cell, resume);
                self.heap.dec_ref(cell);
            }
        }
        Ok(())
    }

    /// Queues a bare callable on the microtask queue (`queueMicrotask`).
    pub fn queue_microtask_call(&mut self, func: Value, args: Vec<Value>) {
        self.scheduler.enqueue_microtask(Microtask::Call { func, args });
    }

    /// Current promise state, for display and tests: 0 pending, 1 fulfilled,
    /// 2 rejected.
    pub(crate) fn promise_state(&self, id: HeapId) -> PromiseState {
        match self.heap.get_if_live(id) {
            Some(HeapData::Promise(p)) => p.state,
            _ => PromiseState::Pending,
        }
    }
}
