//! Property descriptor cells.
//!
//! Descriptors are first-class heap cells so that object slots store plain
//! values and descriptors uniformly: a slot either holds the value itself or
//! a reference to one of these cells.

use crate::{
    heap::{DropWithHeap, Heap},
    value::Value,
};

/// A data descriptor: a value plus the writable/enumerable/configurable flags.
#[derive(Debug)]
pub(crate) struct DataDescriptor {
    pub value: Value,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl DropWithHeap for DataDescriptor {
    fn drop_with_heap(self, heap: &mut Heap) {
        self.value.drop_with_heap(heap);
    }
}

/// An accessor descriptor: optional getter/setter functions (undefined when
/// absent) plus the enumerable/configurable flags.
#[derive(Debug)]
pub(crate) struct AccessorDescriptor {
    pub get: Value,
    pub set: Value,
    pub enumerable: bool,
    pub configurable: bool,
}

impl DropWithHeap for AccessorDescriptor {
    fn drop_with_heap(self, heap: &mut Heap) {
        self.get.drop_with_heap(heap);
        self.set.drop_with_heap(heap);
    }
}
