//! Argument vectors for calls into runtime functions.

use smallvec::SmallVec;

use crate::{
    heap::{DropWithHeap, Heap},
    value::Value,
};

/// The argument span passed to a callable. The callee owns the values and is
/// responsible for releasing whatever it does not consume.
#[derive(Debug, Default)]
pub struct Args(pub(crate) SmallVec<[Value; 4]>);

impl Args {
    #[must_use]
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self(values.into_iter().collect())
    }

    pub fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the argument at `index` without consuming it.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Takes the argument at `index`, leaving `undefined` in its place.
    /// Out-of-range indices yield `undefined`.
    pub fn take(&mut self, index: usize) -> Value {
        match self.0.get_mut(index) {
            Some(slot) => std::mem::replace(slot, Value::undefined()),
            None => Value::undefined(),
        }
    }

    /// Splits off the first `N` arguments (missing ones become `undefined`)
    /// and releases the rest.
    pub(crate) fn destructure<const N: usize>(mut self, heap: &mut Heap) -> [Value; N] {
        let out = std::array::from_fn(|i| self.take(i));
        self.drop_with_heap(heap);
        out
    }

    pub(crate) fn into_values(self) -> SmallVec<[Value; 4]> {
        self.0
    }
}

impl DropWithHeap for Args {
    fn drop_with_heap(self, heap: &mut Heap) {
        for value in self.0 {
            value.drop_with_heap(heap);
        }
    }
}
