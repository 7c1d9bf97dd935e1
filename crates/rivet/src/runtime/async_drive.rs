//! Driving async coroutines: await suspension, the pending-call FIFO of
//! async generators, and settlement of their promises.

use crate::{
    exception::RunResult,
    heap::{DropWithHeap, HeapData, HeapId},
    runtime::{Runtime, iteration::IterOutcome},
    types::{
        AsyncKind, Reaction, ReactionTarget,
        iterator::{Resume, Step},
    },
    value::Value,
};

impl Runtime {
    /// `asyncIter.next(input)`: returns a promise for `{value, done}`.
    ///
    /// If the coroutine is idle it resumes immediately; if it is running or
    /// parked on an await, the call queues behind the outstanding work and is
    /// settled in FIFO order as the body yields.
    pub fn async_next(&mut self, iter: &Value, input: Value) -> RunResult<Value> {
        let Some(id) = iter.heap_id().filter(|_| iter.is_async_iterator()) else {
            input.drop_with_heap(&mut self.heap);
            return Err(self.throw_type(format!("{}.next is not a function", self.brief(iter))));
        };

        if self.async_finished(id) {
            input.drop_with_heap(&mut self.heap);
            let result = self.iter_result_object(IterOutcome {
                value: Value::undefined(),
                done: true,
            })?;
            return self.promise_resolve_value(result);
        }

        let (promise, promise_id) = self.promise_new()?;
        self.heap.inc_ref(promise_id);
        let idle = match self.heap.get_mut(id) {
            HeapData::AsyncIterator(it) => {
                it.queue.push_back((promise_id, input));
                !it.running && !it.awaiting
            }
            _ => false,
        };
        if idle {
            let resume_input = self.take_head_input(id);
            self.drive_async(id, Resume::Next(resume_input));
        }
        Ok(promise)
    }

    /// `asyncIter.return(value)`: unwinds the coroutine; queued calls
    /// resolve as done.
    pub fn async_return(&mut self, iter: &Value, value: Value) -> RunResult<Value> {
        let Some(id) = iter.heap_id().filter(|_| iter.is_async_iterator()) else {
            value.drop_with_heap(&mut self.heap);
            return Err(self.throw_type(format!("{}.return is not a function", self.brief(iter))));
        };
        if self.async_finished(id) || !self.async_started(id) {
            self.finish_async(id);
            let result = self.iter_result_object(IterOutcome { value, done: true })?;
            return self.promise_resolve_value(result);
        }
        let (promise, promise_id) = self.promise_new()?;
        self.heap.inc_ref(promise_id);
        let idle = match self.heap.get_mut(id) {
            HeapData::AsyncIterator(it) => {
                it.queue.push_back((promise_id, Value::undefined()));
                !it.running && !it.awaiting
            }
            _ => false,
        };
        if idle {
            // Discard the queued placeholder input: this resume delivers the
            // return instead.
            let _ = self.take_head_input(id);
            self.drive_async(id, Resume::Return(value));
        } else {
            value.drop_with_heap(&mut self.heap);
        }
        Ok(promise)
    }

    fn async_finished(&self, id: HeapId) -> bool {
        matches!(self.heap.get_if_live(id), Some(HeapData::AsyncIterator(it)) if it.finished)
    }

    fn async_started(&self, id: HeapId) -> bool {
        match self.heap.get_if_live(id) {
            Some(HeapData::AsyncIterator(it)) => it.started,
            _ => false,
        }
    }

    fn finish_async(&mut self, id: HeapId) {
        let body = match self.heap.get_mut(id) {
            HeapData::AsyncIterator(it) => {
                it.finished = true;
                it.body.take()
            }
            _ => None,
        };
        if let Some(mut body) = body {
            body.dispose(&mut self.heap);
        }
    }

    /// Takes the input slot of the queue head, leaving undefined.
    fn take_head_input(&mut self, id: HeapId) -> Value {
        match self.heap.get_mut(id) {
            HeapData::AsyncIterator(it) => match it.queue.front_mut() {
                Some((_, input)) => std::mem::take(input),
                None => Value::undefined(),
            },
            _ => Value::undefined(),
        }
    }

    /// Resumption arriving from a settled awaited promise.
    pub(crate) fn drive_async_resume(&mut self, id: HeapId, resume: Resume) {
        if self.heap.get_if_live(id).is_none() {
            resume.drop_with_heap(&mut self.heap);
            return;
        }
        if let HeapData::AsyncIterator(it) = self.heap.get_mut(id) {
            it.awaiting = false;
        }
        self.drive_async(id, resume);
    }

    /// The drain loop: steps the coroutine, settling queued promises on
    /// yields, suspending on awaits, and finishing on return or throw.
    pub(crate) fn drive_async(&mut self, id: HeapId, first: Resume) {
        let mut resume = first;
        loop {
            let can_run = matches!(
                self.heap.get_if_live(id),
                Some(HeapData::AsyncIterator(it)) if !it.finished && !it.running
            );
            if !can_run {
                resume.drop_with_heap(&mut self.heap);
                return;
            }
            let (body, kind) = match self.heap.get_mut(id) {
                HeapData::AsyncIterator(it) => {
                    it.running = true;
                    it.started = true;
                    (it.body.take(), it.kind)
                }
                _ => unreachable!("async cell liveness just checked"),
            };
            let Some(mut body) = body else {
                if let HeapData::AsyncIterator(it) = self.heap.get_mut(id) {
                    it.running = false;
                }
                resume.drop_with_heap(&mut self.heap);
                return;
            };

            let outcome = body.step(self, resume);

            let still_live = self.heap.get_if_live(id).is_some();
            if still_live {
                if let HeapData::AsyncIterator(it) = self.heap.get_mut(id) {
                    it.running = false;
                    it.body = Some(body);
                }
            } else {
                body.dispose(&mut self.heap);
                return;
            }

            match outcome {
                Ok(Step::Await(awaited)) => {
                    self.suspend_on(id, awaited);
                    return;
                }
                Ok(Step::Yield(value)) => {
                    match kind {
                        AsyncKind::Function { result } => {
                            // A plain async body must not yield.
                            value.drop_with_heap(&mut self.heap);
                            self.finish_async(id);
                            let err = self.throw_type("yield is only valid in generator functions");
                            let reason = self.error_value(err);
                            self.reject_promise(result, reason);
                            return;
                        }
                        AsyncKind::Generator => {
                            self.settle_head(id, value, false);
                            // Service the next queued call, if any.
                            let has_next = match self.heap.get_if_live(id) {
                                Some(HeapData::AsyncIterator(it)) => !it.queue.is_empty(),
                                _ => false,
                            };
                            if !has_next {
                                return;
                            }
                            let input = self.take_head_input(id);
                            resume = Resume::Next(input);
                        }
                    }
                }
                Ok(Step::Done(value)) => {
                    self.finish_async(id);
                    match kind {
                        AsyncKind::Function { result } => self.resolve_promise(result, value),
                        AsyncKind::Generator => {
                            self.settle_head(id, value, true);
                            self.drain_queue_done(id);
                        }
                    }
                    return;
                }
                Err(err) => {
                    self.finish_async(id);
                    let reason = self.error_value(err);
                    match kind {
                        AsyncKind::Function { result } => self.reject_promise(result, reason),
                        AsyncKind::Generator => {
                            let head = self.pop_head(id);
                            if let Some((promise, input)) = head {
                                input.drop_with_heap(&mut self.heap);
                                self.reject_promise(promise, reason.clone_with_heap(&self.heap));
                                self.heap.dec_ref(promise);
                            }
                            self.drain_queue_rejected(id, &reason);
                            reason.drop_with_heap(&mut self.heap);
                        }
                    }
                    return;
                }
            }
        }
    }

    /// Parks the coroutine on an awaited value: the value is wrapped in a
    /// promise when needed and resume reactions re-enter the drain loop
    /// through the microtask queue.
    fn suspend_on(&mut self, id: HeapId, awaited: Value) {
        if let HeapData::AsyncIterator(it) = self.heap.get_mut(id) {
            it.awaiting = true;
        }
        let promise = match self.promise_resolve_value(awaited) {
            Ok(promise) => promise,
            Err(err) => {
                // Could not even allocate the wrapper: fail the coroutine.
                if let HeapData::AsyncIterator(it) = self.heap.get_mut(id) {
                    it.awaiting = false;
                }
                let reason = self.error_value(err);
                self.drive_async(id, Resume::Throw(reason));
                return;
            }
        };
        let promise_id = promise.heap_id().expect("promise is heap backed");
        self.heap.inc_ref(id);
        let on_fulfilled = Reaction {
            handler: Value::undefined(),
            target: ReactionTarget::Resume(id),
        };
        self.heap.inc_ref(id);
        let on_rejected = Reaction {
            handler: Value::undefined(),
            target: ReactionTarget::Resume(id),
        };
        self.attach_reactions(promise_id, on_fulfilled, on_rejected);
        promise.drop_with_heap(&mut self.heap);
    }

    fn pop_head(&mut self, id: HeapId) -> Option<(HeapId, Value)> {
        match self.heap.get_mut(id) {
            HeapData::AsyncIterator(it) => it.queue.pop_front(),
            _ => None,
        }
    }

    /// Settles the queue head with `{value, done}`.
    fn settle_head(&mut self, id: HeapId, value: Value, done: bool) {
        let Some((promise, input)) = self.pop_head(id) else {
            value.drop_with_heap(&mut self.heap);
            return;
        };
        input.drop_with_heap(&mut self.heap);
        match self.iter_result_object(IterOutcome { value, done }) {
            Ok(result) => self.resolve_promise(promise, result),
            Err(err) => {
                let reason = self.error_value(err);
                self.reject_promise(promise, reason);
            }
        }
        self.heap.dec_ref(promise);
    }

    /// After a return, every still-queued call resolves `{undefined, true}`.
    fn drain_queue_done(&mut self, id: HeapId) {
        while let Some((promise, input)) = self.pop_head(id) {
            input.drop_with_heap(&mut self.heap);
            match self.iter_result_object(IterOutcome {
                value: Value::undefined(),
                done: true,
            }) {
                Ok(result) => self.resolve_promise(promise, result),
                Err(err) => {
                    let reason = self.error_value(err);
                    self.reject_promise(promise, reason);
                }
            }
            self.heap.dec_ref(promise);
        }
    }

    /// After a throw, every still-queued call rejects with the same reason.
    fn drain_queue_rejected(&mut self, id: HeapId, reason: &Value) {
        while let Some((promise, input)) = self.pop_head(id) {
            input.drop_with_heap(&mut self.heap);
            let shared = reason.clone_with_heap(&self.heap);
            self.reject_promise(promise, shared);
            self.heap.dec_ref(promise);
        }
    }
}
