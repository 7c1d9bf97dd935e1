//! Symbol cells.

use crate::intern::StringId;

/// A symbol cell. The interned `key` doubles as the property name when the
/// symbol is used as a key, which keeps symbol-keyed properties in the same
/// shape and own-property machinery as string keys. Well-known symbols use
/// fixed `@@`-prefixed keys; user symbols get a unique serial-numbered key.
#[derive(Debug)]
pub(crate) struct JsSymbol {
    pub description: Option<Box<str>>,
    pub key: StringId,
}

impl JsSymbol {
    pub(crate) fn new(description: Option<Box<str>>, key: StringId) -> Self {
        Self { description, key }
    }

    /// Rendering used by `toString` and console output.
    pub(crate) fn display(&self) -> String {
        match &self.description {
            Some(desc) => format!("Symbol({desc})"),
            None => "Symbol()".to_owned(),
        }
    }
}
