//! Array cells.

use std::collections::BTreeMap;

use crate::{
    heap::{DropWithHeap, Heap},
    types::PropMap,
    value::Value,
};

/// Indices within this distance of the dense tail extend the dense vector;
/// anything farther lands in the sparse map.
pub(crate) const DENSE_GROWTH_SLACK: u32 = 1024;

/// Largest valid array index. `2^32 - 1` itself is an ordinary string key.
pub(crate) const MAX_INDEX: u32 = u32::MAX - 1;

/// Recognizes a canonical array index: the decimal rendering of a 32-bit
/// unsigned integer below `2^32 - 1`, with no leading zeros.
pub(crate) fn parse_index(key: &str) -> Option<u32> {
    if key.is_empty() || key.len() > 10 {
        return None;
    }
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u64 = key.parse().ok()?;
    if n <= u64::from(MAX_INDEX) { Some(n as u32) } else { None }
}

/// Recognizes a number used as a computed key as a canonical index.
pub(crate) fn index_from_number(n: f64) -> Option<u32> {
    if n.fract() == 0.0 && n >= 0.0 && n <= f64::from(MAX_INDEX) && !n.is_nan() {
        Some(n as u32)
    } else {
        None
    }
}

/// An array cell: dense prefix storage, a sparse overflow map, and a table
/// for non-index string properties.
///
/// Holes in the dense vector are represented by the uninitialized sentinel
/// and read back as `undefined`.
#[derive(Debug)]
pub(crate) struct JsArray {
    pub proto: Value,
    pub length: u64,
    pub dense: Vec<Value>,
    pub sparse: BTreeMap<u32, Value>,
    /// Non-index string-keyed properties (`arr.foo = 1`).
    pub named: PropMap,
}

impl JsArray {
    pub(crate) fn new(proto: Value) -> Self {
        Self {
            proto,
            length: 0,
            dense: Vec::new(),
            sparse: BTreeMap::new(),
            named: PropMap::default(),
        }
    }

    pub(crate) fn from_dense(proto: Value, elements: Vec<Value>) -> Self {
        let length = elements.len() as u64;
        Self {
            proto,
            length,
            dense: elements,
            sparse: BTreeMap::new(),
            named: PropMap::default(),
        }
    }

    /// Whether index `i` holds an element (dense non-hole or sparse).
    pub(crate) fn has_element(&self, i: u32) -> bool {
        if (i as usize) < self.dense.len() {
            return !self.dense[i as usize].is_uninitialized();
        }
        self.sparse.contains_key(&i)
    }

    /// Writes an element, extending the dense vector when the index is within
    /// the growth slack of the tail and spilling to the sparse map otherwise.
    /// Raises `length` to `i + 1` when the write lands at or past it.
    ///
    /// Returns the displaced value; the caller releases it (this type lives
    /// inside the heap and cannot borrow it mutably here).
    pub(crate) fn set_element(&mut self, i: u32, value: Value) -> Option<Value> {
        let idx = i as usize;
        let displaced = if idx < self.dense.len() {
            Some(std::mem::replace(&mut self.dense[idx], value))
        } else if (i as u64) <= self.dense.len() as u64 + u64::from(DENSE_GROWTH_SLACK) {
            while self.dense.len() < idx {
                self.dense.push(Value::uninitialized());
            }
            self.dense.push(value);
            None
        } else {
            self.sparse.insert(i, value)
        };
        if u64::from(i) >= self.length {
            self.length = u64::from(i) + 1;
        }
        displaced
    }

    /// Truncates dense and sparse storage beyond a new, smaller length,
    /// returning the removed values for the caller to release.
    pub(crate) fn truncate_collect(&mut self, new_length: u64) -> Vec<Value> {
        let keep_dense = usize::try_from(new_length).unwrap_or(usize::MAX).min(self.dense.len());
        let mut removed: Vec<Value> = self.dense.drain(keep_dense..).collect();
        let cut: Vec<u32> = self
            .sparse
            .range((new_length.min(u64::from(u32::MAX)) as u32)..)
            .map(|(&i, _)| i)
            .collect();
        for i in cut {
            if let Some(value) = self.sparse.remove(&i) {
                removed.push(value);
            }
        }
        self.length = new_length;
        removed
    }
}

impl DropWithHeap for JsArray {
    fn drop_with_heap(self, heap: &mut Heap) {
        self.proto.drop_with_heap(heap);
        for value in self.dense {
            value.drop_with_heap(heap);
        }
        for (_, value) in self.sparse {
            value.drop_with_heap(heap);
        }
        for (_, value) in self.named {
            value.drop_with_heap(heap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_index_recognition() {
        assert_eq!(parse_index("0"), Some(0));
        assert_eq!(parse_index("42"), Some(42));
        assert_eq!(parse_index("4294967294"), Some(u32::MAX - 1));
        // 2^32 - 1 is an ordinary string key, not an index.
        assert_eq!(parse_index("4294967295"), None);
        assert_eq!(parse_index("01"), None);
        assert_eq!(parse_index("-1"), None);
        assert_eq!(parse_index("1.5"), None);
        assert_eq!(parse_index(""), None);
        assert_eq!(parse_index("foo"), None);
    }

    #[test]
    fn number_keys_must_be_canonical() {
        assert_eq!(index_from_number(3.0), Some(3));
        assert_eq!(index_from_number(3.5), None);
        assert_eq!(index_from_number(-1.0), None);
        assert_eq!(index_from_number(f64::NAN), None);
        assert_eq!(index_from_number(f64::from(u32::MAX)), None);
    }
}
