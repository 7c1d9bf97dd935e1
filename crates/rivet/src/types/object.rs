//! Ordinary object cells.

use ahash::AHashSet;

use crate::{
    heap::{DropWithHeap, Heap},
    intern::StringId,
    shape::{ShapeId, Shapes},
    value::Value,
};

/// An ordinary object: a prototype reference, a shape, and a dense slot
/// vector parallel to the shape's name order.
///
/// Invariants:
/// - `slots.len()` equals the shape's slot count.
/// - Enumeration order is the shape's insertion order, skipping deleted names
///   and shadowed duplicate entries.
/// - Writing an existing property does not transition; adding a new one does.
/// - A slot may hold a descriptor cell instead of a plain value.
#[derive(Debug)]
pub(crate) struct JsObject {
    pub proto: Value,
    pub shape: ShapeId,
    pub slots: Vec<Value>,
    /// Names masked by `delete`. Masking avoids a reverse shape transition;
    /// re-adding a masked name transitions as if it were new.
    pub deleted: AHashSet<StringId>,
}

impl JsObject {
    pub(crate) fn new(proto: Value) -> Self {
        Self {
            proto,
            shape: ShapeId::EMPTY,
            slots: Vec::new(),
            deleted: AHashSet::new(),
        }
    }

    /// Slot index of a live own property.
    pub(crate) fn own_slot(&self, shapes: &Shapes, name: StringId) -> Option<usize> {
        if self.deleted.contains(&name) {
            return None;
        }
        shapes.offset_of(self.shape, name).map(|o| o as usize)
    }

    /// Appends a new property via a shape transition and stores `value` in
    /// the new slot. The caller has already established the name is absent.
    pub(crate) fn append(&mut self, shapes: &mut Shapes, name: StringId, value: Value) {
        self.deleted.remove(&name);
        self.shape = shapes.transition(self.shape, name);
        debug_assert_eq!(self.slots.len() + 1, shapes.slot_count(self.shape));
        self.slots.push(value);
    }

    /// Live own property names in enumeration order.
    pub(crate) fn own_names(&self, shapes: &Shapes) -> Vec<StringId> {
        shapes
            .names(self.shape)
            .iter()
            .enumerate()
            .filter(|&(i, name)| shapes.is_live_entry(self.shape, i) && !self.deleted.contains(name))
            .map(|(_, &name)| name)
            .collect()
    }
}

impl DropWithHeap for JsObject {
    fn drop_with_heap(self, heap: &mut Heap) {
        self.proto.drop_with_heap(heap);
        for slot in self.slots {
            slot.drop_with_heap(heap);
        }
    }
}
