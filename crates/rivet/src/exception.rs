//! Error propagation for runtime operations.
//!
//! Anything user code can observe as a thrown value travels as a [`RunError`]:
//! either a native exception (type + message, materialized into an Error cell
//! only when user code catches or prints it) or an already-built runtime value
//! thrown by translated code. Host-facing failures unwind through `Result`
//! with `?` all the way to the program boundary.

use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    heap::{DropWithHeap, Heap},
    limits::ResourceError,
    value::Value,
};

/// Result type alias for operations that can raise a runtime exception.
pub type RunResult<T> = Result<T, RunError>;

/// Native exception kinds the runtime itself can raise.
///
/// Uses strum derives so the variant name doubles as the user-visible error
/// name (`TypeError` -> "TypeError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ExcType {
    /// Plain `Error`, also the base prototype of the other kinds.
    Error,
    /// Wrong dynamic type: calling a non-function, reading through null, ...
    TypeError,
    /// Out-of-range numeric argument, invalid array length, resource limits.
    RangeError,
    /// Reading an uninitialized or undefined binding.
    ReferenceError,
    /// Invalid control flow in generated code.
    SyntaxError,
    /// Every input of `Promise.any` rejected.
    AggregateError,
}

/// A native exception before it is materialized into an Error cell.
#[derive(Debug, Clone)]
pub struct SimpleException {
    pub exc_type: ExcType,
    pub message: Box<str>,
}

impl SimpleException {
    pub(crate) fn new(exc_type: ExcType, message: impl Into<Box<str>>) -> Self {
        Self {
            exc_type,
            message: message.into(),
        }
    }

    /// The "Name: message" composition used for `stack` and `toString`.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.message.is_empty() {
            self.exc_type.to_string()
        } else {
            format!("{}: {}", self.exc_type, self.message)
        }
    }
}

/// A raised exception in flight.
#[derive(Debug)]
pub enum RunError {
    /// A native exception; becomes an Error cell when observed.
    Exc(SimpleException),
    /// A value thrown by translated code. Owns one reference.
    Thrown(Value),
}

impl RunError {
    pub(crate) fn type_error(message: impl Into<Box<str>>) -> Self {
        Self::Exc(SimpleException::new(ExcType::TypeError, message))
    }

    pub(crate) fn range_error(message: impl Into<Box<str>>) -> Self {
        Self::Exc(SimpleException::new(ExcType::RangeError, message))
    }

    pub(crate) fn reference_error(message: impl Into<Box<str>>) -> Self {
        Self::Exc(SimpleException::new(ExcType::ReferenceError, message))
    }

    pub(crate) fn syntax_error(message: impl Into<Box<str>>) -> Self {
        Self::Exc(SimpleException::new(ExcType::SyntaxError, message))
    }

    /// The exception raised for property access through `undefined`/`null`.
    pub(crate) fn nullish_access(what: &str, key: &str) -> Self {
        Self::type_error(format!("Cannot read properties of {what} (reading '{key}')"))
    }

    /// The exception raised for a read of a declared-but-unassigned binding.
    pub(crate) fn dead_zone(name: &str) -> Self {
        Self::reference_error(format!("Cannot access '{name}' before initialization"))
    }
}

impl From<ResourceError> for RunError {
    fn from(err: ResourceError) -> Self {
        Self::range_error(err.to_string())
    }
}

impl DropWithHeap for RunError {
    fn drop_with_heap(self, heap: &mut Heap) {
        match self {
            Self::Exc(_) => {}
            Self::Thrown(value) => value.drop_with_heap(heap),
        }
    }
}
