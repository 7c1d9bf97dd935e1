//! Immutable string cells.
//!
//! Length and element access are measured in storage units (bytes), the flat
//! unit model of the runtime's string representation. Multi-unit encodings
//! count one per unit; `length` reads are O(1).

/// An immutable string cell.
#[derive(Debug)]
pub(crate) struct JsString {
    data: Box<str>,
}

impl JsString {
    pub(crate) fn new(data: impl Into<Box<str>>) -> Self {
        Self { data: data.into() }
    }

    #[inline]
    pub(crate) fn as_str(&self) -> &str {
        &self.data
    }

    /// Unit count (not character count).
    #[inline]
    pub(crate) fn units(&self) -> u32 {
        self.data.len() as u32
    }

    /// Raw value of the unit at `index`, if in range.
    pub(crate) fn unit_value(&self, index: u32) -> Option<u8> {
        self.data.as_bytes().get(index as usize).copied()
    }

    /// The unit at `index` as a one-unit string, if in range.
    pub(crate) fn unit_at(&self, index: u32) -> Option<String> {
        self.unit_value(index).map(unit_to_string)
    }
}

/// Renders one raw unit as a string. Units that are not self-contained UTF-8
/// surface as the replacement character; runtime strings stay valid UTF-8,
/// so the exact value of such a unit is only observable numerically
/// (`charCodeAt`).
pub(crate) fn unit_to_string(unit: u8) -> String {
    if unit.is_ascii() {
        (unit as char).to_string()
    } else {
        String::from_utf8_lossy(&[unit]).into_owned()
    }
}
