//! Heap cell payload types.

pub(crate) mod array;
pub(crate) mod async_iter;
pub(crate) mod descriptor;
pub(crate) mod function;
pub(crate) mod iterator;
pub(crate) mod object;
pub(crate) mod promise;
pub(crate) mod string;
pub(crate) mod symbol;

pub(crate) use array::JsArray;
pub(crate) use async_iter::{AsyncKind, JsAsyncIterator};
pub(crate) use descriptor::{AccessorDescriptor, DataDescriptor};
pub(crate) use function::{Callable, JsFunction, NativeFn};
pub(crate) use iterator::{GenState, JsIterator};
pub(crate) use object::JsObject;
pub(crate) use promise::{JsPromise, PromiseState, Reaction, ReactionTarget};
pub(crate) use string::JsString;
pub(crate) use symbol::JsSymbol;

use indexmap::IndexMap;

use crate::{intern::StringId, value::Value};

/// Insertion-ordered own-property table used by functions, iterators and
/// promises (objects proper use shape-indexed slots instead).
pub(crate) type PropMap = IndexMap<StringId, Value, ahash::RandomState>;
