//! Property-name interning.
//!
//! Every property key in the runtime is an interned string. Interning keeps
//! shape maps and own-property tables keyed by a `u32` instead of by string
//! content, and gives well-known names (and well-known symbol keys) stable
//! ids that the rest of the crate can reference as constants.

use ahash::AHashMap;

/// Identifier of an interned property name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StringId(pub(crate) u32);

impl StringId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

macro_rules! static_names {
    ($($konst:ident => $text:literal),+ $(,)?) => {
        /// Pre-interned names with fixed ids, seeded before any user code runs.
        pub(crate) mod statics {
            use super::StringId;
            static_names!(@consts 0u32; $($konst => $text),+);
        }

        const STATIC_NAMES: &[&str] = &[$($text),+];
    };
    (@consts $idx:expr; $konst:ident => $text:literal $(, $rest:ident => $rtext:literal)*) => {
        pub(crate) const $konst: StringId = StringId($idx);
        static_names!(@consts $idx + 1; $($rest => $rtext),*);
    };
    (@consts $idx:expr;) => {};
}

static_names! {
    LENGTH => "length",
    PROTOTYPE => "prototype",
    CONSTRUCTOR => "constructor",
    NAME => "name",
    MESSAGE => "message",
    STACK => "stack",
    ERRORS => "errors",
    VALUE => "value",
    DONE => "done",
    NEXT => "next",
    RETURN => "return",
    THROW => "throw",
    THEN => "then",
    CATCH => "catch",
    FINALLY => "finally",
    STATUS => "status",
    REASON => "reason",
    TO_STRING => "toString",
    HAS_OWN_PROPERTY => "hasOwnProperty",
    CALL => "call",
    APPLY => "apply",
    BIND => "bind",
    DESCRIPTION => "description",
    SYM_ITERATOR => "@@iterator",
    SYM_ASYNC_ITERATOR => "@@asyncIterator",
    SYM_HAS_INSTANCE => "@@hasInstance",
    SYM_IS_CONCAT_SPREADABLE => "@@isConcatSpreadable",
    SYM_MATCH => "@@match",
    SYM_MATCH_ALL => "@@matchAll",
    SYM_REPLACE => "@@replace",
    SYM_SEARCH => "@@search",
    SYM_SPECIES => "@@species",
    SYM_SPLIT => "@@split",
    SYM_TO_PRIMITIVE => "@@toPrimitive",
    SYM_TO_STRING_TAG => "@@toStringTag",
    SYM_UNSCOPABLES => "@@unscopables",
}

/// Intern table mapping property names to stable `StringId`s.
///
/// Names are never removed; a property name interned once stays valid for the
/// lifetime of the runtime that owns the table.
#[derive(Debug)]
pub(crate) struct Interns {
    lookup: AHashMap<Box<str>, StringId>,
    names: Vec<Box<str>>,
}

impl Interns {
    pub(crate) fn new() -> Self {
        let mut interns = Self {
            lookup: AHashMap::with_capacity(STATIC_NAMES.len() * 2),
            names: Vec::with_capacity(STATIC_NAMES.len() * 2),
        };
        for name in STATIC_NAMES {
            interns.intern(name);
        }
        interns
    }

    /// Interns a name, returning its id. Idempotent.
    pub(crate) fn intern(&mut self, name: &str) -> StringId {
        if let Some(&id) = self.lookup.get(name) {
            return id;
        }
        let id = StringId(u32::try_from(self.names.len()).expect("intern table exceeded u32 ids"));
        let owned: Box<str> = name.into();
        self.names.push(owned.clone());
        self.lookup.insert(owned, id);
        id
    }

    /// Looks a name up without interning it.
    pub(crate) fn get_id(&self, name: &str) -> Option<StringId> {
        self.lookup.get(name).copied()
    }

    /// Returns the text of an interned name.
    #[inline]
    pub(crate) fn get(&self, id: StringId) -> &str {
        &self.names[id.index()]
    }

    /// Number of interned names (static set included).
    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }
}
