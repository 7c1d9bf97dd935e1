//! Event-loop data structures: the microtask FIFO and the timer min-heap.
//!
//! The scheduler owns the queues; executing tasks needs the full runtime and
//! lives in [`crate::runtime`]. Single worker, cooperative: microtasks drain
//! to empty, then due timers fire (draining microtasks after each), then the
//! loop sleeps until the nearest timer.

use std::collections::{BinaryHeap, VecDeque};
use std::time::{Duration, Instant};

use ahash::AHashSet;

use crate::{
    heap::{DropWithHeap, Heap},
    types::Reaction,
    value::Value,
};

/// Timer ids wrap at this ceiling and restart from 1.
const MAX_TIMER_ID: u32 = 2_147_483_647;

/// A queued microtask.
#[derive(Debug)]
pub(crate) enum Microtask {
    /// A settled promise reaction to run.
    Reaction {
        reaction: Reaction,
        /// The settlement value or rejection reason (owned).
        argument: Value,
        /// Whether the promise rejected.
        rejected: bool,
    },
    /// A plain callable (`queueMicrotask`).
    Call { func: Value, args: Vec<Value> },
}

impl DropWithHeap for Microtask {
    fn drop_with_heap(self, heap: &mut Heap) {
        match self {
            Self::Reaction { reaction, argument, .. } => {
                reaction.drop_with_heap(heap);
                argument.drop_with_heap(heap);
            }
            Self::Call { func, args } => {
                func.drop_with_heap(heap);
                for arg in args {
                    arg.drop_with_heap(heap);
                }
            }
        }
    }
}

/// A scheduled timer. Ordered by (due time, insertion sequence) so that two
/// timers due at the same instant fire in insertion order.
#[derive(Debug)]
pub(crate) struct TimerEntry {
    pub id: u32,
    pub due: Instant,
    /// Monotone insertion sequence breaking due-time ties.
    seq: u64,
    /// Repeat interval; `None` for one-shot timers.
    pub interval: Option<Duration>,
    pub callback: Value,
    pub args: Vec<Value>,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    // Reversed so the std max-heap pops the earliest (due, seq) first.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl DropWithHeap for TimerEntry {
    fn drop_with_heap(self, heap: &mut Heap) {
        self.callback.drop_with_heap(heap);
        for arg in self.args {
            arg.drop_with_heap(heap);
        }
    }
}

/// Outcome of asking the timer heap for work.
pub(crate) enum TimerPop {
    /// This timer is due; run it.
    Ready(TimerEntry),
    /// This timer was cancelled; release its values and ask again.
    Cancelled(TimerEntry),
    /// The nearest timer is due at this instant; sleep until then.
    NotDue(Instant),
    /// No timers scheduled.
    Empty,
}

/// The single-threaded event-loop state.
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    microtasks: VecDeque<Microtask>,
    timers: BinaryHeap<TimerEntry>,
    /// Ids cancelled via `clearTimeout`/`clearInterval`, consulted lazily at
    /// pop time.
    cancelled: AHashSet<u32>,
    next_timer_id: u32,
    next_seq: u64,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self {
            next_timer_id: 1,
            ..Self::default()
        }
    }

    // --- microtasks -------------------------------------------------------

    pub(crate) fn enqueue_microtask(&mut self, task: Microtask) {
        self.microtasks.push_back(task);
    }

    pub(crate) fn pop_microtask(&mut self) -> Option<Microtask> {
        self.microtasks.pop_front()
    }

    // --- timers -----------------------------------------------------------

    /// Schedules a timer and returns its id.
    pub(crate) fn set_timer(&mut self, callback: Value, args: Vec<Value>, delay: Duration, repeat: bool) -> u32 {
        let id = self.next_timer_id;
        self.next_timer_id = if id >= MAX_TIMER_ID { 1 } else { id + 1 };
        // After a wrap, a stale cancellation record must not swallow the
        // fresh timer.
        self.cancelled.remove(&id);

        let entry = TimerEntry {
            id,
            due: Instant::now() + delay,
            seq: self.next_seq,
            interval: repeat.then_some(delay),
            callback,
            args,
        };
        self.next_seq += 1;
        self.timers.push(entry);
        id
    }

    /// Re-inserts an interval timer for its next run.
    pub(crate) fn reschedule(&mut self, mut entry: TimerEntry, interval: Duration) {
        entry.due = Instant::now() + interval;
        entry.seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(entry);
    }

    /// Records a cancellation; the id is discarded at the next pop.
    pub(crate) fn clear_timer(&mut self, id: u32) {
        self.cancelled.insert(id);
    }

    pub(crate) fn is_cancelled(&self, id: u32) -> bool {
        self.cancelled.contains(&id)
    }

    /// Pops the next timer if it is due at `now`. A `Cancelled` result means
    /// the caller should release the entry and ask again.
    pub(crate) fn pop_timer(&mut self, now: Instant) -> TimerPop {
        let Some(head) = self.timers.peek() else {
            return TimerPop::Empty;
        };
        if self.cancelled.contains(&head.id) {
            let entry = self.timers.pop().expect("peeked timer must pop");
            self.cancelled.remove(&entry.id);
            return TimerPop::Cancelled(entry);
        }
        if head.due <= now {
            TimerPop::Ready(self.timers.pop().expect("peeked timer must pop"))
        } else {
            TimerPop::NotDue(head.due)
        }
    }

    /// Whether any work (microtask or timer) remains.
    pub(crate) fn has_work(&self) -> bool {
        !self.microtasks.is_empty() || !self.timers.is_empty()
    }

    /// Empties both queues for shutdown; the caller releases the values.
    pub(crate) fn drain_all(&mut self) -> (Vec<Microtask>, Vec<TimerEntry>) {
        let micro = self.microtasks.drain(..).collect();
        let timers = std::mem::take(&mut self.timers).into_vec();
        self.cancelled.clear();
        (micro, timers)
    }
}
