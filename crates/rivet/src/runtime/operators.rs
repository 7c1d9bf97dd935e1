//! Operator semantics: ToString for full values, arithmetic, relational and
//! equality families, `typeof`, `in`, `instanceof` and nullish helpers.

use crate::{
    convert,
    exception::RunResult,
    heap::{DropWithHeap, HeapData},
    nanbox::Tag,
    runtime::Runtime,
    value::Value,
};

impl Runtime {
    // --- ToString ---------------------------------------------------------

    /// Full ToString: primitives format directly; object-kind values go
    /// through their (possibly overridden) `toString`.
    pub fn to_js_string(&mut self, value: &Value) -> RunResult<String> {
        match value.tag() {
            Tag::Undefined => Ok("undefined".to_owned()),
            Tag::Null => Ok("null".to_owned()),
            Tag::Uninit => Ok("<uninitialized>".to_owned()),
            Tag::Bool => Ok(value.as_boolean().to_string()),
            Tag::Number => Ok(convert::number_to_string(value.as_number())),
            Tag::Str => match value.heap_id().map(|id| self.heap.get(id)) {
                Some(HeapData::Str(s)) => Ok(s.as_str().to_owned()),
                _ => Ok(String::new()),
            },
            Tag::Symbol => match value.heap_id().map(|id| self.heap.get(id)) {
                Some(HeapData::Symbol(sym)) => Ok(sym.display()),
                _ => Ok("Symbol()".to_owned()),
            },
            Tag::DataDesc | Tag::AccessorDesc => Ok("[object Descriptor]".to_owned()),
            _ => self.object_to_string(value),
        }
    }

    fn object_to_string(&mut self, value: &Value) -> RunResult<String> {
        // A callable toString anywhere on the chain wins.
        let to_string = self.get(value, "toString")?;
        if to_string.is_function() {
            let this = value.clone_with_heap(&self.heap);
            let result = self.call(&to_string, this, crate::args::Args::new());
            to_string.drop_with_heap(&mut self.heap);
            let result = result?;
            let text = if result.is_object_like() {
                // A toString that returns an object cannot stringify.
                "[object Object]".to_owned()
            } else {
                self.to_js_string(&result)?
            };
            result.drop_with_heap(&mut self.heap);
            return Ok(text);
        }
        to_string.drop_with_heap(&mut self.heap);
        Ok(match value.tag() {
            Tag::Array => self.array_join(value, ",")?,
            Tag::Function => match value.heap_id().map(|id| self.heap.get(id)) {
                Some(HeapData::Function(f)) => format!("function {}() {{ [native code] }}", f.name),
                _ => "function () { [native code] }".to_owned(),
            },
            Tag::Promise => "[object Promise]".to_owned(),
            _ => "[object Object]".to_owned(),
        })
    }

    /// `Array.prototype.join` semantics: undefined, null and holes render
    /// empty. Guarded against cyclic arrays: the recursion budget renders
    /// the cycle's tail as empty instead of overflowing the stack.
    pub(crate) fn array_join(&mut self, array: &Value, separator: &str) -> RunResult<String> {
        if !self.heap.data_depth_enter() {
            return Ok(String::new());
        }
        let result = self.array_join_inner(array, separator);
        self.heap.data_depth_exit();
        result
    }

    fn array_join_inner(&mut self, array: &Value, separator: &str) -> RunResult<String> {
        let len = self.array_length(array);
        let mut out = String::new();
        for i in 0..len {
            if i > 0 {
                out.push_str(separator);
            }
            let element = self.get_index(array, i as u32)?;
            if !element.is_nullish() {
                match self.to_js_string(&element) {
                    Ok(text) => out.push_str(&text),
                    Err(err) => {
                        element.drop_with_heap(&mut self.heap);
                        return Err(err);
                    }
                }
            }
            element.drop_with_heap(&mut self.heap);
        }
        Ok(out)
    }

    /// ToNumber over full values.
    pub fn to_number_value(&self, value: &Value) -> f64 {
        convert::to_number(&self.heap, value)
    }

    /// Truthiness.
    pub fn truthy(&self, value: &Value) -> bool {
        convert::truthy(&self.heap, value)
    }

    // --- arithmetic -------------------------------------------------------

    /// `a + b`: string concatenation when either side is a string, numeric
    /// addition otherwise.
    pub fn add(&mut self, a: &Value, b: &Value) -> RunResult<Value> {
        if a.is_string() || b.is_string() {
            let left = self.to_js_string(a)?;
            let right = self.to_js_string(b)?;
            return self.string(left + &right);
        }
        Ok(Value::number(self.to_number_value(a) + self.to_number_value(b)))
    }

    pub fn sub(&self, a: &Value, b: &Value) -> Value {
        Value::number(self.to_number_value(a) - self.to_number_value(b))
    }

    pub fn mul(&self, a: &Value, b: &Value) -> Value {
        Value::number(self.to_number_value(a) * self.to_number_value(b))
    }

    pub fn div(&self, a: &Value, b: &Value) -> Value {
        Value::number(self.to_number_value(a) / self.to_number_value(b))
    }

    pub fn rem(&self, a: &Value, b: &Value) -> Value {
        Value::number(self.to_number_value(a) % self.to_number_value(b))
    }

    pub fn pow(&self, a: &Value, b: &Value) -> Value {
        Value::number(self.to_number_value(a).powf(self.to_number_value(b)))
    }

    pub fn neg(&self, a: &Value) -> Value {
        Value::number(-self.to_number_value(a))
    }

    // --- bitwise ----------------------------------------------------------

    pub fn bit_and(&self, a: &Value, b: &Value) -> Value {
        Value::number(f64::from(
            convert::to_int32(self.to_number_value(a)) & convert::to_int32(self.to_number_value(b)),
        ))
    }

    pub fn bit_or(&self, a: &Value, b: &Value) -> Value {
        Value::number(f64::from(
            convert::to_int32(self.to_number_value(a)) | convert::to_int32(self.to_number_value(b)),
        ))
    }

    pub fn bit_xor(&self, a: &Value, b: &Value) -> Value {
        Value::number(f64::from(
            convert::to_int32(self.to_number_value(a)) ^ convert::to_int32(self.to_number_value(b)),
        ))
    }

    pub fn shl(&self, a: &Value, b: &Value) -> Value {
        let shift = convert::to_uint32(self.to_number_value(b)) & 31;
        Value::number(f64::from(convert::to_int32(self.to_number_value(a)) << shift))
    }

    pub fn shr(&self, a: &Value, b: &Value) -> Value {
        let shift = convert::to_uint32(self.to_number_value(b)) & 31;
        Value::number(f64::from(convert::to_int32(self.to_number_value(a)) >> shift))
    }

    pub fn ushr(&self, a: &Value, b: &Value) -> Value {
        let shift = convert::to_uint32(self.to_number_value(b)) & 31;
        Value::number(f64::from(convert::to_uint32(self.to_number_value(a)) >> shift))
    }

    // --- relational -------------------------------------------------------

    /// `a < b`: lexicographic for string pairs, numeric otherwise (NaN makes
    /// every comparison false).
    pub fn lt(&self, a: &Value, b: &Value) -> bool {
        if let (Some(x), Some(y)) = (self.string_content(a), self.string_content(b)) {
            return x < y;
        }
        self.to_number_value(a) < self.to_number_value(b)
    }

    pub fn le(&self, a: &Value, b: &Value) -> bool {
        if let (Some(x), Some(y)) = (self.string_content(a), self.string_content(b)) {
            return x <= y;
        }
        self.to_number_value(a) <= self.to_number_value(b)
    }

    pub fn gt(&self, a: &Value, b: &Value) -> bool {
        self.lt(b, a)
    }

    pub fn ge(&self, a: &Value, b: &Value) -> bool {
        self.le(b, a)
    }

    fn string_content(&self, value: &Value) -> Option<&str> {
        if !value.is_string() {
            return None;
        }
        match value.heap_id().map(|id| self.heap.get(id)) {
            Some(HeapData::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    // --- equality ---------------------------------------------------------

    /// `a === b`: types must match; numbers compare bitwise-as-doubles
    /// (NaN !== NaN, ±0 equal), strings by content, heap kinds by identity.
    pub fn strict_eq(&self, a: &Value, b: &Value) -> bool {
        match (a.tag(), b.tag()) {
            (Tag::Number, Tag::Number) => a.as_number() == b.as_number(),
            (Tag::Str, Tag::Str) => self.string_content(a) == self.string_content(b),
            (Tag::Bool, Tag::Bool) => a.as_boolean() == b.as_boolean(),
            (Tag::Undefined, Tag::Undefined) | (Tag::Null, Tag::Null) => true,
            (x, y) if x == y => a.heap_id() == b.heap_id(),
            _ => false,
        }
    }

    /// `a == b`: strict when the types match, plus null/undefined mutual
    /// equality and the numeric/boolean/object coercions.
    pub fn loose_eq(&mut self, a: &Value, b: &Value) -> RunResult<bool> {
        let (ta, tb) = (a.tag(), b.tag());
        if ta == tb {
            return Ok(self.strict_eq(a, b));
        }
        // null and undefined equal each other and nothing else.
        if a.is_nullish() || b.is_nullish() {
            return Ok(a.is_nullish() && b.is_nullish());
        }
        // Booleans coerce to numbers first.
        if ta == Tag::Bool {
            let n = Value::number(self.to_number_value(a));
            return self.loose_eq(&n, b);
        }
        if tb == Tag::Bool {
            let n = Value::number(self.to_number_value(b));
            return self.loose_eq(a, &n);
        }
        match (ta, tb) {
            (Tag::Number, Tag::Str) | (Tag::Str, Tag::Number) => {
                Ok(self.to_number_value(a) == self.to_number_value(b))
            }
            // An object against a primitive compares through its string form.
            (Tag::Number | Tag::Str, _) if b.is_object_like() => {
                let text = self.to_js_string(b)?;
                let s = self.string(text)?;
                let result = self.loose_eq(a, &s);
                s.drop_with_heap(&mut self.heap);
                result
            }
            (_, Tag::Number | Tag::Str) if a.is_object_like() => {
                let text = self.to_js_string(a)?;
                let s = self.string(text)?;
                let result = self.loose_eq(&s, b);
                s.drop_with_heap(&mut self.heap);
                result
            }
            _ => Ok(false),
        }
    }

    // --- type tests -------------------------------------------------------

    /// `typeof`.
    pub fn type_of(&self, value: &Value) -> &'static str {
        match value.tag() {
            Tag::Undefined | Tag::Uninit => "undefined",
            Tag::Null => "object",
            Tag::Bool => "boolean",
            Tag::Number => "number",
            Tag::Str => "string",
            Tag::Symbol => "symbol",
            Tag::Function => "function",
            _ => "object",
        }
    }

    /// `key in base`. The right operand must be object-kind.
    pub fn in_op(&mut self, key: &Value, base: &Value) -> RunResult<bool> {
        if !base.is_object_like() {
            return Err(self.throw_type(format!(
                "Cannot use 'in' operator to search for '{}' in {}",
                self.brief(key),
                self.brief(base)
            )));
        }
        let key = self.key_from_value(key)?;
        self.has_property(base, key)
    }

    /// `value instanceof ctor`: walks the prototype chain looking for
    /// identity with `ctor.prototype`.
    pub fn instance_of(&mut self, value: &Value, ctor: &Value) -> RunResult<bool> {
        if !ctor.is_function() {
            return Err(self.throw_type("Right-hand side of 'instanceof' is not callable"));
        }
        let target = self.get(ctor, "prototype")?;
        if !target.is_object_like() {
            target.drop_with_heap(&mut self.heap);
            return Ok(false);
        }
        let target_id = target.heap_id();
        let mut current = self.proto_of(value);
        let mut found = false;
        while current.is_object_like() {
            if current.heap_id() == target_id {
                found = true;
                break;
            }
            let next = self.proto_of(&current);
            current.drop_with_heap(&mut self.heap);
            current = next;
        }
        current.drop_with_heap(&mut self.heap);
        target.drop_with_heap(&mut self.heap);
        Ok(found)
    }

    /// `a ?? b` support: whether the left operand short-circuits.
    pub fn is_nullish(&self, value: &Value) -> bool {
        value.is_nullish()
    }
}
