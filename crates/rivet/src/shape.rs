//! Hidden-class shape table.
//!
//! A shape records the property layout of every object built by the same
//! sequence of property additions. Shapes form a transition trie rooted at
//! the empty shape: adding name `p` to any object in shape `S` always yields
//! the same child shape, so layout metadata is shared across objects and a
//! property read is one hash lookup to a slot index.
//!
//! Shapes are addressed by identity (`ShapeId`) and are immortal: the table
//! only grows. Deleted properties are masked per-object, not per-shape, and
//! re-adding a name after deletion transitions again, so a name can appear
//! more than once in a shape's name list; the offsets map always points at
//! the most recent occurrence.

use ahash::AHashMap;

use crate::intern::StringId;

/// Identity of a shape node in the transition trie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ShapeId(u32);

impl ShapeId {
    /// The process-wide root shape every object is born with.
    pub(crate) const EMPTY: Self = Self(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }

    /// Opaque numeric identity, for layout assertions in tests.
    pub(crate) fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Default)]
struct ShapeNode {
    /// Property names in insertion order. May contain duplicates when a name
    /// was re-added after deletion; only the last occurrence is live.
    names: Vec<StringId>,
    /// Name -> slot index of its most recent occurrence.
    offsets: AHashMap<StringId, u32>,
    /// Child shapes, keyed by the added name.
    transitions: AHashMap<StringId, ShapeId>,
}

/// The shape transition trie. Owned by the heap.
#[derive(Debug)]
pub(crate) struct Shapes {
    nodes: Vec<ShapeNode>,
}

impl Shapes {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![ShapeNode::default()],
        }
    }

    /// Slot index of `name` in `shape`, if present.
    #[inline]
    pub(crate) fn offset_of(&self, shape: ShapeId, name: StringId) -> Option<u32> {
        self.nodes[shape.index()].offsets.get(&name).copied()
    }

    /// Number of slots objects in `shape` carry.
    #[inline]
    pub(crate) fn slot_count(&self, shape: ShapeId) -> usize {
        self.nodes[shape.index()].names.len()
    }

    /// The ordered name list of `shape`, duplicates included.
    #[inline]
    pub(crate) fn names(&self, shape: ShapeId) -> &[StringId] {
        &self.nodes[shape.index()].names
    }

    /// Whether the entry at `index` is the live occurrence of its name.
    /// Earlier occurrences of a re-added name are shadowed and skipped by
    /// enumeration.
    pub(crate) fn is_live_entry(&self, shape: ShapeId, index: usize) -> bool {
        let node = &self.nodes[shape.index()];
        let name = node.names[index];
        node.offsets.get(&name) == Some(&(index as u32))
    }

    /// Follows (or creates) the transition from `shape` on `name`.
    ///
    /// The child appends `name` at the next slot index; transitions are
    /// deduplicated inside the parent so repeated construction sequences
    /// share layout.
    pub(crate) fn transition(&mut self, shape: ShapeId, name: StringId) -> ShapeId {
        if let Some(&child) = self.nodes[shape.index()].transitions.get(&name) {
            return child;
        }

        let parent = &self.nodes[shape.index()];
        let mut child = ShapeNode {
            names: parent.names.clone(),
            offsets: parent.offsets.clone(),
            transitions: AHashMap::new(),
        };
        let offset = child.names.len() as u32;
        child.names.push(name);
        child.offsets.insert(name, offset);

        let child_id = ShapeId(u32::try_from(self.nodes.len()).expect("shape table exceeded u32 ids"));
        self.nodes.push(child);
        self.nodes[shape.index()].transitions.insert(name, child_id);
        child_id
    }
}
