//! Reference-counted cell arena.
//!
//! Every heap-backed value lives in a slot of this arena, addressed by
//! [`HeapId`] and carrying an intrusive reference count. Counts are not
//! thread-safe; the runtime is single-threaded. Freeing a cell releases the
//! values it holds, which decrements their counts in turn. Reference cycles
//! are tolerated and leak (there is no tracing collector).

use std::cell::Cell;
use std::collections::BTreeMap;

use crate::{
    exception::RunResult,
    intern::StringId,
    limits::{MAX_DATA_RECURSION_DEPTH, ResourceError, RuntimeConfig},
    nanbox::Tag,
    shape::Shapes,
    types::{
        AccessorDescriptor, DataDescriptor, JsArray, JsAsyncIterator, JsFunction, JsIterator, JsObject, JsPromise,
        JsString, JsSymbol,
    },
    value::Value,
};

/// Handle to a cell in the heap arena. Opaque outside the runtime; generated
/// code holds these for closure-captured variable cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapId(pub(crate) u32);

impl HeapId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Releases a value's held references back to the heap. The counterpart of
/// `Drop` for types that own reference-counted values.
pub(crate) trait DropWithHeap {
    fn drop_with_heap(self, heap: &mut Heap);
}

/// Payload of a heap cell. The discriminator doubles as the runtime type of
/// values referencing the cell.
#[derive(Debug)]
pub(crate) enum HeapData {
    Str(JsString),
    Object(JsObject),
    Array(JsArray),
    Function(JsFunction),
    Symbol(JsSymbol),
    Iterator(JsIterator),
    AsyncIterator(JsAsyncIterator),
    Promise(JsPromise),
    DataDesc(DataDescriptor),
    AccessorDesc(AccessorDescriptor),
    /// A shared variable cell captured by closures. Never referenced by a
    /// value directly; closures and scopes address it by id.
    Cell(Value),
}

impl HeapData {
    /// The value tag for cells that values can reference.
    fn tag(&self) -> Option<Tag> {
        match self {
            Self::Str(_) => Some(Tag::Str),
            Self::Object(_) => Some(Tag::Object),
            Self::Array(_) => Some(Tag::Array),
            Self::Function(_) => Some(Tag::Function),
            Self::Symbol(_) => Some(Tag::Symbol),
            Self::Iterator(_) => Some(Tag::Iterator),
            Self::AsyncIterator(_) => Some(Tag::AsyncIterator),
            Self::Promise(_) => Some(Tag::Promise),
            Self::DataDesc(_) => Some(Tag::DataDesc),
            Self::AccessorDesc(_) => Some(Tag::AccessorDesc),
            Self::Cell(_) => None,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "Str",
            Self::Object(_) => "Object",
            Self::Array(_) => "Array",
            Self::Function(_) => "Function",
            Self::Symbol(_) => "Symbol",
            Self::Iterator(_) => "Iterator",
            Self::AsyncIterator(_) => "AsyncIterator",
            Self::Promise(_) => "Promise",
            Self::DataDesc(_) => "DataDesc",
            Self::AccessorDesc(_) => "AccessorDesc",
            Self::Cell(_) => "Cell",
        }
    }
}

impl DropWithHeap for HeapData {
    fn drop_with_heap(self, heap: &mut Heap) {
        match self {
            Self::Str(_) => {}
            Self::Object(o) => o.drop_with_heap(heap),
            Self::Array(a) => a.drop_with_heap(heap),
            Self::Function(f) => f.drop_with_heap(heap),
            Self::Symbol(_) => {}
            Self::Iterator(i) => i.drop_with_heap(heap),
            Self::AsyncIterator(i) => i.drop_with_heap(heap),
            Self::Promise(p) => p.drop_with_heap(heap),
            Self::DataDesc(d) => d.drop_with_heap(heap),
            Self::AccessorDesc(d) => d.drop_with_heap(heap),
            Self::Cell(v) => v.drop_with_heap(heap),
        }
    }
}

#[derive(Debug)]
struct HeapEntry {
    refcount: Cell<u32>,
    /// `None` while the payload is temporarily taken out (coroutine step).
    data: Option<HeapData>,
}

/// Snapshot of heap occupancy, used by monitoring and leak-checking tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    /// Number of live cells.
    pub live_cells: usize,
    /// Freed slots available for reuse.
    pub free_slots: usize,
    /// Total arena capacity (live + free).
    pub total_slots: usize,
    /// Live cells by kind name, in deterministic order.
    pub cells_by_kind: BTreeMap<&'static str, usize>,
}

/// The cell arena. Also owns the shape table, since shapes describe the
/// layout of object cells.
#[derive(Debug)]
pub struct Heap {
    entries: Vec<Option<HeapEntry>>,
    free_list: Vec<HeapId>,
    pub(crate) shapes: Shapes,
    config: RuntimeConfig,
    live: usize,
    depth_remaining: Cell<u16>,
}

impl Heap {
    pub(crate) fn new(config: RuntimeConfig) -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
            shapes: Shapes::new(),
            config,
            live: 0,
            depth_remaining: Cell::new(MAX_DATA_RECURSION_DEPTH),
        }
    }

    /// Allocates a cell with refcount 1.
    pub(crate) fn allocate(&mut self, data: HeapData) -> Result<HeapId, ResourceError> {
        if let Some(limit) = self.config.max_heap_cells
            && self.live >= limit
        {
            return Err(ResourceError {
                live_cells: self.live,
                limit,
            });
        }
        let entry = HeapEntry {
            refcount: Cell::new(1),
            data: Some(data),
        };
        self.live += 1;
        if let Some(id) = self.free_list.pop() {
            self.entries[id.index()] = Some(entry);
            Ok(id)
        } else {
            let id = HeapId(u32::try_from(self.entries.len()).expect("heap arena exceeded u32 ids"));
            self.entries.push(Some(entry));
            Ok(id)
        }
    }

    /// Allocates a cell and wraps it in a value carrying the matching tag.
    pub(crate) fn alloc_value(&mut self, data: HeapData) -> RunResult<Value> {
        let tag = data.tag().expect("alloc_value on a payload without a value tag");
        let id = self.allocate(data)?;
        Ok(Value::from_heap(tag, id))
    }

    /// Allocates a string cell.
    pub(crate) fn str_value(&mut self, s: impl Into<Box<str>>) -> RunResult<Value> {
        self.alloc_value(HeapData::Str(JsString::new(s)))
    }

    /// Increments the reference count. Interior mutability keeps this a
    /// shared-access operation so values can be cloned during lookups.
    ///
    /// # Panics
    /// Panics when the id is invalid or the cell has been freed.
    pub(crate) fn inc_ref(&self, id: HeapId) {
        let entry = self
            .entries
            .get(id.index())
            .expect("Heap::inc_ref: slot missing")
            .as_ref()
            .expect("Heap::inc_ref: cell already freed");
        entry.refcount.set(entry.refcount.get() + 1);
    }

    /// Decrements the reference count, freeing the cell (and releasing its
    /// children recursively) once it reaches zero.
    ///
    /// # Panics
    /// Panics when the id is invalid or the cell has been freed.
    pub(crate) fn dec_ref(&mut self, id: HeapId) {
        let entry = {
            let slot = self.entries.get_mut(id.index()).expect("Heap::dec_ref: slot missing");
            let entry = slot.as_mut().expect("Heap::dec_ref: cell already freed");
            let count = entry.refcount.get();
            if count > 1 {
                entry.refcount.set(count - 1);
                return;
            }
            slot.take().expect("Heap::dec_ref: cell already freed")
        };

        self.live -= 1;
        self.free_list.push(id);
        if let Some(data) = entry.data {
            data.drop_with_heap(self);
        }
    }

    /// Reads a cell's payload.
    ///
    /// # Panics
    /// Panics when the id is invalid, the cell is freed, or the payload is
    /// temporarily taken out (a coroutine body mid-step).
    #[must_use]
    pub(crate) fn get(&self, id: HeapId) -> &HeapData {
        self.entries
            .get(id.index())
            .expect("Heap::get: slot missing")
            .as_ref()
            .expect("Heap::get: cell already freed")
            .data
            .as_ref()
            .expect("Heap::get: payload currently taken")
    }

    /// Reads a cell's payload mutably. Same panics as [`Heap::get`].
    pub(crate) fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        self.entries
            .get_mut(id.index())
            .expect("Heap::get_mut: slot missing")
            .as_mut()
            .expect("Heap::get_mut: cell already freed")
            .data
            .as_mut()
            .expect("Heap::get_mut: payload currently taken")
    }

    /// Reads a cell's payload when the slot is still live.
    pub(crate) fn get_if_live(&self, id: HeapId) -> Option<&HeapData> {
        self.entries.get(id.index())?.as_ref()?.data.as_ref()
    }

    /// Current reference count of a live cell (0 when freed). Test support.
    pub(crate) fn refcount(&self, id: HeapId) -> u32 {
        self.entries
            .get(id.index())
            .and_then(Option::as_ref)
            .map_or(0, |entry| entry.refcount.get())
    }

    // --- variable cells ---------------------------------------------------

    /// Allocates a shared variable cell for a closure-captured binding.
    pub(crate) fn new_cell(&mut self, value: Value) -> RunResult<HeapId> {
        Ok(self.allocate(HeapData::Cell(value))?)
    }

    /// Reads a variable cell, returning a fresh reference to its value.
    pub(crate) fn cell_get(&self, id: HeapId) -> Value {
        match self.get(id) {
            HeapData::Cell(value) => value.clone_with_heap(self),
            other => panic!("cell_get on a {} cell", other.kind_name()),
        }
    }

    /// Overwrites a variable cell, releasing the previous value.
    pub(crate) fn cell_set(&mut self, id: HeapId, value: Value) {
        let old = match self.get_mut(id) {
            HeapData::Cell(slot) => std::mem::replace(slot, value),
            other => panic!("cell_set on a {} cell", other.kind_name()),
        };
        old.drop_with_heap(self);
    }

    // --- object and array access -----------------------------------------
    //
    // These split the borrow between a cell's payload and the shape table /
    // arena internally, which callers outside the heap cannot do.

    /// Slot index of a live own property on an object cell.
    pub(crate) fn object_own_slot(&self, id: HeapId, name: StringId) -> Option<usize> {
        match self.get(id) {
            HeapData::Object(o) => o.own_slot(&self.shapes, name),
            _ => None,
        }
    }

    /// Appends a new property to an object cell via a shape transition.
    pub(crate) fn object_append(&mut self, id: HeapId, name: StringId, value: Value) {
        let Self { entries, shapes, .. } = self;
        let data = entries
            .get_mut(id.index())
            .expect("Heap::object_append: slot missing")
            .as_mut()
            .expect("Heap::object_append: cell already freed")
            .data
            .as_mut()
            .expect("Heap::object_append: payload currently taken");
        match data {
            HeapData::Object(o) => o.append(shapes, name, value),
            other => panic!("object_append on a {} cell", other.kind_name()),
        }
    }

    /// Live own property names of an object cell, in enumeration order.
    pub(crate) fn object_own_names(&self, id: HeapId) -> Vec<StringId> {
        match self.get(id) {
            HeapData::Object(o) => o.own_names(&self.shapes),
            _ => Vec::new(),
        }
    }

    /// Replaces an object slot, releasing the displaced value.
    pub(crate) fn object_replace_slot(&mut self, id: HeapId, slot: usize, value: Value) {
        let old = match self.get_mut(id) {
            HeapData::Object(o) => std::mem::replace(&mut o.slots[slot], value),
            other => panic!("object_replace_slot on a {} cell", other.kind_name()),
        };
        old.drop_with_heap(self);
    }

    /// Writes an array element, releasing whatever it displaces.
    pub(crate) fn array_set_element(&mut self, id: HeapId, index: u32, value: Value) {
        let displaced = match self.get_mut(id) {
            HeapData::Array(a) => a.set_element(index, value),
            other => panic!("array_set_element on a {} cell", other.kind_name()),
        };
        if let Some(old) = displaced {
            old.drop_with_heap(self);
        }
    }

    /// Truncates an array to a new length, releasing removed elements.
    pub(crate) fn array_truncate(&mut self, id: HeapId, new_length: u64) {
        let removed = match self.get_mut(id) {
            HeapData::Array(a) => a.truncate_collect(new_length),
            other => panic!("array_truncate on a {} cell", other.kind_name()),
        };
        for value in removed {
            value.drop_with_heap(self);
        }
    }

    // --- public value helpers --------------------------------------------

    /// Clones a value, taking a new reference when it is heap-backed.
    #[must_use]
    pub fn clone_value(&self, value: &Value) -> Value {
        value.clone_with_heap(self)
    }

    /// Releases a value's reference.
    pub fn release(&mut self, value: Value) {
        value.drop_with_heap(self);
    }

    // --- recursion guard --------------------------------------------------

    /// Enters one level of recursive data traversal. Returns `false` when the
    /// depth budget is exhausted; in that case `data_depth_exit` must NOT be
    /// called.
    #[must_use]
    pub(crate) fn data_depth_enter(&self) -> bool {
        let remaining = self.depth_remaining.get();
        if remaining == 0 {
            false
        } else {
            self.depth_remaining.set(remaining - 1);
            true
        }
    }

    /// Leaves one level of recursive data traversal. Must pair with a
    /// successful [`Heap::data_depth_enter`].
    pub(crate) fn data_depth_exit(&self) {
        self.depth_remaining.set(self.depth_remaining.get() + 1);
    }

    // --- observability ----------------------------------------------------

    /// Snapshot of current heap occupancy.
    #[must_use]
    pub fn stats(&self) -> HeapStats {
        let mut cells_by_kind: BTreeMap<&'static str, usize> = BTreeMap::new();
        for entry in self.entries.iter().flatten() {
            if let Some(data) = &entry.data {
                *cells_by_kind.entry(data.kind_name()).or_insert(0) += 1;
            }
        }
        HeapStats {
            live_cells: self.live,
            free_slots: self.free_list.len(),
            total_slots: self.entries.len(),
            cells_by_kind,
        }
    }
}
