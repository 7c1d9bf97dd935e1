//! The property engine: reads and writes with descriptor semantics, the
//! prototype chain walk, definition, deletion and enumeration.

use crate::{
    args::Args,
    convert,
    exception::{RunError, RunResult},
    heap::{DropWithHeap, HeapData, HeapId},
    intern::{StringId, statics},
    nanbox::Tag,
    runtime::Runtime,
    types::{AccessorDescriptor, DataDescriptor, array},
    value::Value,
};

/// A normalized property key: a canonical array index or an interned name.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Key {
    Index(u32),
    Name(StringId),
}

/// Result of an own-property lookup.
enum OwnProp {
    /// A plain slot value, already cloned.
    Plain(Value),
    /// A data descriptor cell.
    Data(HeapId),
    /// An accessor descriptor cell.
    Accessor(HeapId),
    None,
}

impl Runtime {
    // --- key normalization ------------------------------------------------

    pub(crate) fn key_from_str(&mut self, name: &str) -> Key {
        match array::parse_index(name) {
            Some(i) => Key::Index(i),
            None => Key::Name(self.interns.intern(name)),
        }
    }

    /// Normalizes a computed key value. Symbols map to their internal key;
    /// numbers to a canonical index when possible, else their string form.
    pub(crate) fn key_from_value(&mut self, key: &Value) -> RunResult<Key> {
        if key.is_number() {
            let n = key.as_number();
            if let Some(i) = array::index_from_number(n) {
                return Ok(Key::Index(i));
            }
            let text = convert::number_to_string(n);
            return Ok(Key::Name(self.interns.intern(&text)));
        }
        if key.is_symbol()
            && let Some(id) = key.heap_id()
            && let HeapData::Symbol(sym) = self.heap.get(id)
        {
            return Ok(Key::Name(sym.key));
        }
        let text = self.to_js_string(key)?;
        Ok(self.key_from_str(&text))
    }

    /// Readable form of a key, for error messages.
    pub(crate) fn key_text(&self, key: Key) -> String {
        match key {
            Key::Index(i) => i.to_string(),
            Key::Name(name) => self.interns.get(name).to_owned(),
        }
    }

    // --- reads ------------------------------------------------------------

    /// `base[name]`, with `base` itself as the receiver.
    pub fn get(&mut self, base: &Value, name: &str) -> RunResult<Value> {
        let key = self.key_from_str(name);
        self.get_property(base, key, base)
    }

    /// `base[index]` for a numeric index.
    pub fn get_index(&mut self, base: &Value, index: u32) -> RunResult<Value> {
        self.get_property(base, Key::Index(index), base)
    }

    /// `base[key]` for a computed key value.
    pub fn get_key(&mut self, base: &Value, key: &Value) -> RunResult<Value> {
        let key = self.key_from_value(key)?;
        self.get_property(base, key, base)
    }

    /// Property read that forwards an explicit receiver to accessors found
    /// along the prototype chain.
    pub fn get_with_receiver(&mut self, base: &Value, name: &str, receiver: &Value) -> RunResult<Value> {
        let key = self.key_from_str(name);
        self.get_property(base, key, receiver)
    }

    /// Optional-chain read: `base?.name` yields undefined on a nullish base.
    pub fn get_optional(&mut self, base: &Value, name: &str) -> RunResult<Value> {
        if base.is_nullish() {
            return Ok(Value::undefined());
        }
        self.get(base, name)
    }

    pub(crate) fn get_property(&mut self, base: &Value, key: Key, receiver: &Value) -> RunResult<Value> {
        self.check_property_base(base, key)?;
        match self.own_lookup(base, key)? {
            OwnProp::Plain(v) => Ok(v),
            OwnProp::Data(desc) => Ok(self.data_desc_value(desc)),
            OwnProp::Accessor(desc) => self.call_getter(desc, receiver),
            OwnProp::None => {
                let mut current = self.proto_of(base);
                loop {
                    if !current.is_object_like() {
                        current.drop_with_heap(&mut self.heap);
                        return Ok(Value::undefined());
                    }
                    match self.own_lookup(&current, key)? {
                        OwnProp::Plain(v) => {
                            current.drop_with_heap(&mut self.heap);
                            return Ok(v);
                        }
                        OwnProp::Data(desc) => {
                            let v = self.data_desc_value(desc);
                            current.drop_with_heap(&mut self.heap);
                            return Ok(v);
                        }
                        OwnProp::Accessor(desc) => {
                            let result = self.call_getter(desc, receiver);
                            current.drop_with_heap(&mut self.heap);
                            return result;
                        }
                        OwnProp::None => {
                            let next = self.proto_of(&current);
                            current.drop_with_heap(&mut self.heap);
                            current = next;
                        }
                    }
                }
            }
        }
    }

    fn check_property_base(&self, base: &Value, key: Key) -> RunResult<()> {
        match base.tag() {
            Tag::Undefined => Err(RunError::nullish_access("undefined", &self.key_text(key))),
            Tag::Null => Err(RunError::nullish_access("null", &self.key_text(key))),
            Tag::Uninit => Err(RunError::reference_error("Cannot access binding before initialization")),
            Tag::DataDesc | Tag::AccessorDesc => Err(RunError::type_error("property access on a descriptor")),
            _ => Ok(()),
        }
    }

    fn data_desc_value(&self, desc: HeapId) -> Value {
        match self.heap.get(desc) {
            HeapData::DataDesc(d) => d.value.clone_with_heap(&self.heap),
            _ => Value::undefined(),
        }
    }

    fn call_getter(&mut self, desc: HeapId, receiver: &Value) -> RunResult<Value> {
        let getter = match self.heap.get(desc) {
            HeapData::AccessorDesc(d) => d.get.clone_with_heap(&self.heap),
            _ => Value::undefined(),
        };
        if !getter.is_function() {
            getter.drop_with_heap(&mut self.heap);
            return Ok(Value::undefined());
        }
        let this = receiver.clone_with_heap(&self.heap);
        let result = self.call(&getter, this, Args::new());
        getter.drop_with_heap(&mut self.heap);
        result
    }

    fn call_setter(&mut self, desc: HeapId, receiver: &Value, value: Value, key: Key) -> RunResult<()> {
        let setter = match self.heap.get(desc) {
            HeapData::AccessorDesc(d) => d.set.clone_with_heap(&self.heap),
            _ => Value::undefined(),
        };
        if !setter.is_function() {
            setter.drop_with_heap(&mut self.heap);
            value.drop_with_heap(&mut self.heap);
            return Err(RunError::type_error(format!(
                "Cannot set property {} which has only a getter",
                self.key_text(key)
            )));
        }
        let this = receiver.clone_with_heap(&self.heap);
        let result = self.call(&setter, this, Args::from_values([value]));
        setter.drop_with_heap(&mut self.heap);
        result.map(|v| v.drop_with_heap(&mut self.heap))
    }

    /// The prototype a lookup continues at after missing on `base`.
    pub(crate) fn proto_of(&self, base: &Value) -> Value {
        let realm = &self.realm;
        let from_realm = |v: &Value| v.clone_with_heap(&self.heap);
        match base.tag() {
            Tag::Str => from_realm(&realm.string_proto),
            Tag::Number => from_realm(&realm.number_proto),
            Tag::Bool => from_realm(&realm.boolean_proto),
            Tag::Symbol => from_realm(&realm.symbol_proto),
            Tag::Iterator => from_realm(&realm.iterator_proto),
            Tag::AsyncIterator => from_realm(&realm.async_iterator_proto),
            Tag::Promise => from_realm(&realm.promise_proto),
            Tag::Object => match self.heap.get(base.heap_id().expect("object is heap backed")) {
                HeapData::Object(o) => o.proto.clone_with_heap(&self.heap),
                _ => Value::null(),
            },
            Tag::Array => match self.heap.get(base.heap_id().expect("array is heap backed")) {
                HeapData::Array(a) => a.proto.clone_with_heap(&self.heap),
                _ => Value::null(),
            },
            Tag::Function => match self.heap.get(base.heap_id().expect("function is heap backed")) {
                HeapData::Function(f) => f.proto.clone_with_heap(&self.heap),
                _ => Value::null(),
            },
            _ => Value::null(),
        }
    }

    /// Classifies a stored slot value.
    fn classify(&self, stored: &Value) -> OwnProp {
        if stored.is_data_descriptor() {
            OwnProp::Data(stored.heap_id().expect("descriptor is heap backed"))
        } else if stored.is_accessor_descriptor() {
            OwnProp::Accessor(stored.heap_id().expect("descriptor is heap backed"))
        } else {
            OwnProp::Plain(stored.clone_with_heap(&self.heap))
        }
    }

    fn own_lookup(&mut self, base: &Value, key: Key) -> RunResult<OwnProp> {
        let id = base.heap_id();
        Ok(match base.tag() {
            Tag::Str => {
                let id = id.expect("string is heap backed");
                match key {
                    Key::Name(statics::LENGTH) => {
                        let HeapData::Str(s) = self.heap.get(id) else {
                            return Ok(OwnProp::None);
                        };
                        OwnProp::Plain(Value::number(f64::from(s.units())))
                    }
                    Key::Index(i) => {
                        let unit = match self.heap.get(id) {
                            HeapData::Str(s) => s.unit_at(i),
                            _ => None,
                        };
                        match unit {
                            Some(text) => OwnProp::Plain(self.heap.str_value(text)?),
                            None => OwnProp::None,
                        }
                    }
                    Key::Name(_) => OwnProp::None,
                }
            }
            Tag::Symbol => {
                let id = id.expect("symbol is heap backed");
                match key {
                    Key::Name(statics::DESCRIPTION) => {
                        let text = match self.heap.get(id) {
                            HeapData::Symbol(sym) => sym.description.clone(),
                            _ => None,
                        };
                        match text {
                            Some(text) => OwnProp::Plain(self.heap.str_value(text)?),
                            None => OwnProp::Plain(Value::undefined()),
                        }
                    }
                    _ => OwnProp::None,
                }
            }
            Tag::Object => {
                let id = id.expect("object is heap backed");
                let name = self.key_to_name(key);
                match self.heap.object_own_slot(id, name) {
                    Some(slot) => {
                        let HeapData::Object(o) = self.heap.get(id) else {
                            return Ok(OwnProp::None);
                        };
                        self.classify(&o.slots[slot])
                    }
                    None => OwnProp::None,
                }
            }
            Tag::Array => {
                let id = id.expect("array is heap backed");
                match key {
                    Key::Index(i) => {
                        let HeapData::Array(a) = self.heap.get(id) else {
                            return Ok(OwnProp::None);
                        };
                        let idx = i as usize;
                        if idx < a.dense.len() {
                            let v = &a.dense[idx];
                            if v.is_uninitialized() {
                                // A hole reads as undefined.
                                OwnProp::Plain(Value::undefined())
                            } else {
                                OwnProp::Plain(v.clone_with_heap(&self.heap))
                            }
                        } else if let Some(v) = a.sparse.get(&i) {
                            OwnProp::Plain(v.clone_with_heap(&self.heap))
                        } else {
                            OwnProp::None
                        }
                    }
                    Key::Name(statics::LENGTH) => {
                        let HeapData::Array(a) = self.heap.get(id) else {
                            return Ok(OwnProp::None);
                        };
                        OwnProp::Plain(Value::number(a.length as f64))
                    }
                    Key::Name(name) => {
                        let HeapData::Array(a) = self.heap.get(id) else {
                            return Ok(OwnProp::None);
                        };
                        match a.named.get(&name) {
                            Some(v) => self.classify(v),
                            None => OwnProp::None,
                        }
                    }
                }
            }
            Tag::Function => {
                let id = id.expect("function is heap backed");
                if let Key::Name(statics::NAME) = key {
                    let name = match self.heap.get(id) {
                        HeapData::Function(f) => f.name.clone(),
                        _ => return Ok(OwnProp::None),
                    };
                    return Ok(OwnProp::Plain(self.heap.str_value(name)?));
                }
                let name = self.key_to_name(key);
                let HeapData::Function(f) = self.heap.get(id) else {
                    return Ok(OwnProp::None);
                };
                match f.props.get(&name) {
                    Some(v) => self.classify(v),
                    None => OwnProp::None,
                }
            }
            Tag::Iterator | Tag::AsyncIterator | Tag::Promise => {
                let id = id.expect("value is heap backed");
                let name = self.key_to_name(key);
                let stored = match self.heap.get(id) {
                    HeapData::Iterator(it) => it.props.get(&name),
                    HeapData::AsyncIterator(it) => it.props.get(&name),
                    HeapData::Promise(p) => p.props.get(&name),
                    _ => None,
                };
                match stored {
                    Some(v) => self.classify(v),
                    None => OwnProp::None,
                }
            }
            _ => OwnProp::None,
        })
    }

    /// Converts a key to an interned name; indices become their decimal form
    /// for cell kinds that store numeric keys as strings.
    fn key_to_name(&mut self, key: Key) -> StringId {
        match key {
            Key::Name(name) => name,
            Key::Index(i) => self.interns.intern(&i.to_string()),
        }
    }

    // --- writes -----------------------------------------------------------

    /// `base[name] = value`.
    pub fn set(&mut self, base: &Value, name: &str, value: Value) -> RunResult<()> {
        let key = self.key_from_str(name);
        self.set_property(base, key, value, base)
    }

    /// `base[index] = value`.
    pub fn set_index(&mut self, base: &Value, index: u32, value: Value) -> RunResult<()> {
        self.set_property(base, Key::Index(index), value, base)
    }

    /// `base[key] = value` for a computed key.
    pub fn set_key(&mut self, base: &Value, key: &Value, value: Value) -> RunResult<()> {
        let key = match self.key_from_value(key) {
            Ok(key) => key,
            Err(err) => {
                value.drop_with_heap(&mut self.heap);
                return Err(err);
            }
        };
        self.set_property(base, key, value, base)
    }

    pub(crate) fn set_property(&mut self, base: &Value, key: Key, value: Value, receiver: &Value) -> RunResult<()> {
        match base.tag() {
            Tag::Undefined | Tag::Null => {
                let what = if base.is_null() { "null" } else { "undefined" };
                value.drop_with_heap(&mut self.heap);
                return Err(RunError::type_error(format!(
                    "Cannot set properties of {what} (setting '{}')",
                    self.key_text(key)
                )));
            }
            Tag::Uninit => {
                value.drop_with_heap(&mut self.heap);
                return Err(RunError::reference_error("Cannot access binding before initialization"));
            }
            // Writes to primitives are silently dropped.
            Tag::Bool | Tag::Number | Tag::Str | Tag::Symbol => {
                value.drop_with_heap(&mut self.heap);
                return Ok(());
            }
            Tag::DataDesc | Tag::AccessorDesc => {
                value.drop_with_heap(&mut self.heap);
                return Err(RunError::type_error("property write on a descriptor"));
            }
            _ => {}
        }

        // Own property first: plain slots overwrite, descriptors gate.
        match self.own_lookup_for_write(base, key)? {
            WriteSlot::Data(desc) => {
                let writable = match self.heap.get(desc) {
                    HeapData::DataDesc(d) => d.writable,
                    _ => true,
                };
                if !writable {
                    value.drop_with_heap(&mut self.heap);
                    return Err(RunError::type_error(format!(
                        "Cannot assign to read only property '{}' of object",
                        self.key_text(key)
                    )));
                }
                let old = match self.heap.get_mut(desc) {
                    HeapData::DataDesc(d) => std::mem::replace(&mut d.value, value),
                    _ => value,
                };
                old.drop_with_heap(&mut self.heap);
                return Ok(());
            }
            WriteSlot::Accessor(desc) => {
                return self.call_setter(desc, receiver, value, key);
            }
            WriteSlot::Plain => {
                return self.define_own(base, key, value);
            }
            WriteSlot::Missing => {}
        }

        // Prototype chain intercepts: accessors fire with the original
        // receiver, read-only data properties forbid the write.
        let mut current = self.proto_of(base);
        loop {
            if !current.is_object_like() {
                current.drop_with_heap(&mut self.heap);
                break;
            }
            match self.own_lookup_for_write(&current, key)? {
                WriteSlot::Accessor(desc) => {
                    current.drop_with_heap(&mut self.heap);
                    return self.call_setter(desc, receiver, value, key);
                }
                WriteSlot::Data(desc) => {
                    let writable = match self.heap.get(desc) {
                        HeapData::DataDesc(d) => d.writable,
                        _ => true,
                    };
                    current.drop_with_heap(&mut self.heap);
                    if !writable {
                        value.drop_with_heap(&mut self.heap);
                        return Err(RunError::type_error(format!(
                            "Cannot assign to read only property '{}' of object",
                            self.key_text(key)
                        )));
                    }
                    break;
                }
                WriteSlot::Plain => {
                    current.drop_with_heap(&mut self.heap);
                    break;
                }
                WriteSlot::Missing => {
                    let next = self.proto_of(&current);
                    current.drop_with_heap(&mut self.heap);
                    current = next;
                }
            }
        }

        self.define_own(base, key, value)
    }

    /// Raw own write: installs the value without consulting setters or the
    /// prototype chain.
    pub fn set_own(&mut self, base: &Value, name: &str, value: Value) -> RunResult<()> {
        if !base.is_object_like() {
            value.drop_with_heap(&mut self.heap);
            return Err(RunError::type_error("cannot define a property on a primitive"));
        }
        let key = self.key_from_str(name);
        self.define_own(base, key, value)
    }

    /// Stores a value in an own slot, transitioning the shape for new object
    /// properties and applying index/length semantics for arrays.
    fn define_own(&mut self, base: &Value, key: Key, value: Value) -> RunResult<()> {
        let id = base.heap_id().expect("define_own on a heap-backed base");
        match base.tag() {
            Tag::Object => {
                let name = self.key_to_name(key);
                match self.heap.object_own_slot(id, name) {
                    Some(slot) => self.heap.object_replace_slot(id, slot, value),
                    None => self.heap.object_append(id, name, value),
                }
                Ok(())
            }
            Tag::Array => match key {
                Key::Index(i) => {
                    self.heap.array_set_element(id, i, value);
                    Ok(())
                }
                Key::Name(statics::LENGTH) => self.array_write_length(id, value),
                Key::Name(name) => {
                    let old = match self.heap.get_mut(id) {
                        HeapData::Array(a) => a.named.insert(name, value),
                        _ => None,
                    };
                    if let Some(old) = old {
                        old.drop_with_heap(&mut self.heap);
                    }
                    Ok(())
                }
            },
            Tag::Function => {
                let name = self.key_to_name(key);
                let old = match self.heap.get_mut(id) {
                    HeapData::Function(f) => f.props.insert(name, value),
                    _ => None,
                };
                if let Some(old) = old {
                    old.drop_with_heap(&mut self.heap);
                }
                Ok(())
            }
            Tag::Iterator | Tag::AsyncIterator | Tag::Promise => {
                let name = self.key_to_name(key);
                let old = match self.heap.get_mut(id) {
                    HeapData::Iterator(it) => it.props.insert(name, value),
                    HeapData::AsyncIterator(it) => it.props.insert(name, value),
                    HeapData::Promise(p) => p.props.insert(name, value),
                    _ => None,
                };
                if let Some(old) = old {
                    old.drop_with_heap(&mut self.heap);
                }
                Ok(())
            }
            _ => {
                value.drop_with_heap(&mut self.heap);
                Ok(())
            }
        }
    }

    /// Writing `length` truncates or extends; invalid lengths raise a
    /// RangeError.
    fn array_write_length(&mut self, id: HeapId, value: Value) -> RunResult<()> {
        let n = convert::to_number(&self.heap, &value);
        value.drop_with_heap(&mut self.heap);
        if !(n >= 0.0) || n.fract() != 0.0 || n > 4_294_967_295.0 {
            return Err(RunError::range_error("Invalid array length"));
        }
        let new_length = n as u64;
        let current = match self.heap.get(id) {
            HeapData::Array(a) => a.length,
            _ => 0,
        };
        if new_length < current {
            self.heap.array_truncate(id, new_length);
        } else {
            match self.heap.get_mut(id) {
                HeapData::Array(a) => a.length = new_length,
                _ => {}
            }
        }
        Ok(())
    }

    // --- definition -------------------------------------------------------

    /// `Object.defineProperty`-style data definition with explicit flags.
    /// Fully permissive flags store the plain value; anything else installs a
    /// data descriptor cell. Non-configurable existing descriptors reject the
    /// redefinition.
    pub fn define_data_property_flags(
        &mut self,
        base: &Value,
        name: &str,
        value: Value,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    ) -> RunResult<()> {
        if !base.is_object_like() {
            value.drop_with_heap(&mut self.heap);
            return Err(RunError::type_error("Object.defineProperty called on non-object"));
        }
        let key = self.key_from_str(name);
        if let Err(err) = self.check_redefinable(base, key) {
            value.drop_with_heap(&mut self.heap);
            return Err(err);
        }
        if writable && enumerable && configurable {
            return self.define_own(base, key, value);
        }
        let desc = self.heap.alloc_value(HeapData::DataDesc(DataDescriptor {
            value,
            writable,
            enumerable,
            configurable,
        }))?;
        self.define_own(base, key, desc)
    }

    /// Data definition with the default (fully permissive) flags.
    pub fn define_data_property(&mut self, base: &Value, name: &str, value: Value) -> RunResult<()> {
        self.define_data_property_flags(base, name, value, true, true, true)
    }

    /// Installs (or extends) an accessor with a getter.
    pub fn define_getter(&mut self, base: &Value, name: &str, getter: Value) -> RunResult<()> {
        self.define_accessor(base, name, Some(getter), None)
    }

    /// Installs (or extends) an accessor with a setter.
    pub fn define_setter(&mut self, base: &Value, name: &str, setter: Value) -> RunResult<()> {
        self.define_accessor(base, name, None, Some(setter))
    }

    fn define_accessor(
        &mut self,
        base: &Value,
        name: &str,
        getter: Option<Value>,
        setter: Option<Value>,
    ) -> RunResult<()> {
        if !base.is_object_like() {
            if let Some(g) = getter {
                g.drop_with_heap(&mut self.heap);
            }
            if let Some(s) = setter {
                s.drop_with_heap(&mut self.heap);
            }
            return Err(RunError::type_error("cannot define an accessor on a primitive"));
        }
        let key = self.key_from_str(name);
        if let Err(err) = self.check_redefinable(base, key) {
            if let Some(g) = getter {
                g.drop_with_heap(&mut self.heap);
            }
            if let Some(s) = setter {
                s.drop_with_heap(&mut self.heap);
            }
            return Err(err);
        }

        // Merge into an existing accessor so a getter/setter pair defined in
        // two steps lands in one descriptor.
        match self.own_lookup(base, key)? {
            OwnProp::Accessor(desc) => {
                let mut displaced = Vec::new();
                if let HeapData::AccessorDesc(d) = self.heap.get_mut(desc) {
                    if let Some(g) = getter {
                        displaced.push(std::mem::replace(&mut d.get, g));
                    }
                    if let Some(s) = setter {
                        displaced.push(std::mem::replace(&mut d.set, s));
                    }
                }
                for old in displaced {
                    old.drop_with_heap(&mut self.heap);
                }
                Ok(())
            }
            other => {
                if let OwnProp::Plain(v) = other {
                    v.drop_with_heap(&mut self.heap);
                }
                let desc = self.heap.alloc_value(HeapData::AccessorDesc(AccessorDescriptor {
                    get: getter.unwrap_or_default(),
                    set: setter.unwrap_or_default(),
                    enumerable: true,
                    configurable: true,
                }))?;
                self.define_own(base, key, desc)
            }
        }
    }

    /// Rejects redefinition of a non-configurable descriptor.
    fn check_redefinable(&mut self, base: &Value, key: Key) -> RunResult<()> {
        let configurable = match self.own_lookup_for_write(base, key)? {
            WriteSlot::Data(desc) => match self.heap.get(desc) {
                HeapData::DataDesc(d) => d.configurable,
                _ => true,
            },
            WriteSlot::Accessor(desc) => match self.heap.get(desc) {
                HeapData::AccessorDesc(d) => d.configurable,
                _ => true,
            },
            _ => true,
        };
        if configurable {
            Ok(())
        } else {
            Err(RunError::type_error(format!(
                "Cannot redefine property: {}",
                self.key_text(key)
            )))
        }
    }

    // --- deletion ---------------------------------------------------------

    /// `delete base[name]`. Returns false only for non-configurable
    /// descriptors.
    pub fn delete(&mut self, base: &Value, name: &str) -> RunResult<bool> {
        let key = self.key_from_str(name);
        self.delete_property(base, key)
    }

    /// `delete base[key]` for a computed key.
    pub fn delete_key(&mut self, base: &Value, key: &Value) -> RunResult<bool> {
        let key = self.key_from_value(key)?;
        self.delete_property(base, key)
    }

    pub(crate) fn delete_property(&mut self, base: &Value, key: Key) -> RunResult<bool> {
        if base.is_nullish() {
            return Err(RunError::type_error(format!(
                "Cannot convert {} to object",
                if base.is_null() { "null" } else { "undefined" }
            )));
        }
        let Some(id) = base.heap_id() else {
            return Ok(true);
        };

        match self.own_lookup_for_write(base, key)? {
            WriteSlot::Data(desc) => {
                let configurable = match self.heap.get(desc) {
                    HeapData::DataDesc(d) => d.configurable,
                    _ => true,
                };
                if !configurable {
                    return Ok(false);
                }
            }
            WriteSlot::Accessor(desc) => {
                let configurable = match self.heap.get(desc) {
                    HeapData::AccessorDesc(d) => d.configurable,
                    _ => true,
                };
                if !configurable {
                    return Ok(false);
                }
            }
            WriteSlot::Missing => return Ok(true),
            WriteSlot::Plain => {}
        }

        match base.tag() {
            Tag::Object => {
                let name = self.key_to_name(key);
                if let Some(slot) = self.heap.object_own_slot(id, name) {
                    // Mask the name rather than transitioning backwards.
                    self.heap.object_replace_slot(id, slot, Value::undefined());
                    if let HeapData::Object(o) = self.heap.get_mut(id) {
                        o.deleted.insert(name);
                    }
                }
                Ok(true)
            }
            Tag::Array => match key {
                Key::Index(i) => {
                    let removed = match self.heap.get_mut(id) {
                        HeapData::Array(a) => {
                            let idx = i as usize;
                            if idx < a.dense.len() {
                                // Dense holes keep their slot as the sentinel.
                                Some(std::mem::replace(&mut a.dense[idx], Value::uninitialized()))
                            } else {
                                a.sparse.remove(&i)
                            }
                        }
                        _ => None,
                    };
                    if let Some(v) = removed {
                        v.drop_with_heap(&mut self.heap);
                    }
                    Ok(true)
                }
                Key::Name(statics::LENGTH) => Ok(false),
                Key::Name(name) => {
                    let removed = match self.heap.get_mut(id) {
                        HeapData::Array(a) => a.named.shift_remove(&name),
                        _ => None,
                    };
                    if let Some(v) = removed {
                        v.drop_with_heap(&mut self.heap);
                    }
                    Ok(true)
                }
            },
            Tag::Function | Tag::Iterator | Tag::AsyncIterator | Tag::Promise => {
                let name = self.key_to_name(key);
                let removed = match self.heap.get_mut(id) {
                    HeapData::Function(f) => f.props.shift_remove(&name),
                    HeapData::Iterator(it) => it.props.shift_remove(&name),
                    HeapData::AsyncIterator(it) => it.props.shift_remove(&name),
                    HeapData::Promise(p) => p.props.shift_remove(&name),
                    _ => None,
                };
                if let Some(v) = removed {
                    v.drop_with_heap(&mut self.heap);
                }
                Ok(true)
            }
            _ => Ok(true),
        }
    }

    // --- presence and enumeration ----------------------------------------

    /// `name in base` without the prototype walk.
    pub fn has_own(&mut self, base: &Value, name: &str) -> RunResult<bool> {
        let key = self.key_from_str(name);
        Ok(self.own_present(base, key))
    }

    /// Whether `base` or its prototype chain has the property.
    pub fn has_property_named(&mut self, base: &Value, name: &str) -> RunResult<bool> {
        let key = self.key_from_str(name);
        self.has_property(base, key)
    }

    pub(crate) fn has_property(&mut self, base: &Value, key: Key) -> RunResult<bool> {
        if self.own_present(base, key) {
            return Ok(true);
        }
        let mut current = self.proto_of(base);
        while current.is_object_like() {
            if self.own_present(&current, key) {
                current.drop_with_heap(&mut self.heap);
                return Ok(true);
            }
            let next = self.proto_of(&current);
            current.drop_with_heap(&mut self.heap);
            current = next;
        }
        current.drop_with_heap(&mut self.heap);
        Ok(false)
    }

    /// Presence-only own check; never allocates, never runs getters.
    fn own_present(&mut self, base: &Value, key: Key) -> bool {
        let Some(id) = base.heap_id() else { return false };
        match base.tag() {
            Tag::Str => match (key, self.heap.get(id)) {
                (Key::Name(statics::LENGTH), HeapData::Str(_)) => true,
                (Key::Index(i), HeapData::Str(s)) => i < s.units(),
                _ => false,
            },
            Tag::Symbol => matches!(key, Key::Name(statics::DESCRIPTION)),
            Tag::Object => {
                let name = self.key_to_name(key);
                self.heap.object_own_slot(id, name).is_some()
            }
            Tag::Array => match key {
                Key::Index(i) => match self.heap.get(id) {
                    HeapData::Array(a) => a.has_element(i),
                    _ => false,
                },
                Key::Name(statics::LENGTH) => true,
                Key::Name(name) => match self.heap.get(id) {
                    HeapData::Array(a) => a.named.contains_key(&name),
                    _ => false,
                },
            },
            Tag::Function => {
                if matches!(key, Key::Name(statics::NAME)) {
                    return true;
                }
                let name = self.key_to_name(key);
                match self.heap.get(id) {
                    HeapData::Function(f) => f.props.contains_key(&name),
                    _ => false,
                }
            }
            Tag::Iterator | Tag::AsyncIterator | Tag::Promise => {
                let name = self.key_to_name(key);
                match self.heap.get(id) {
                    HeapData::Iterator(it) => it.props.contains_key(&name),
                    HeapData::AsyncIterator(it) => it.props.contains_key(&name),
                    HeapData::Promise(p) => p.props.contains_key(&name),
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// Own property read without the prototype walk. Accessors run with
    /// `base` as receiver. `None` when absent.
    pub fn get_own(&mut self, base: &Value, name: &str) -> RunResult<Option<Value>> {
        let key = self.key_from_str(name);
        match self.own_lookup(base, key)? {
            OwnProp::Plain(v) => Ok(Some(v)),
            OwnProp::Data(desc) => Ok(Some(self.data_desc_value(desc))),
            OwnProp::Accessor(desc) => self.call_getter(desc, base).map(Some),
            OwnProp::None => Ok(None),
        }
    }

    /// Own enumerable property names in enumeration order: integer keys
    /// ascending (arrays), then named keys in insertion order. Symbol-keyed
    /// entries (internal `@@` names) are excluded.
    pub fn own_enumerable_names(&mut self, base: &Value) -> RunResult<Vec<String>> {
        let Some(id) = base.heap_id() else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        match base.tag() {
            Tag::Str => {
                if let HeapData::Str(s) = self.heap.get(id) {
                    for i in 0..s.units() {
                        out.push(i.to_string());
                    }
                }
            }
            Tag::Object => {
                let names = self.heap.object_own_names(id);
                for name in names {
                    if self.name_is_enumerable_object(id, name) {
                        let text = self.interns.get(name);
                        if !text.starts_with("@@") {
                            out.push(text.to_owned());
                        }
                    }
                }
            }
            Tag::Array => {
                let (indices, named): (Vec<u32>, Vec<StringId>) = match self.heap.get(id) {
                    HeapData::Array(a) => {
                        let mut indices = Vec::new();
                        for (i, v) in a.dense.iter().enumerate() {
                            if !v.is_uninitialized() {
                                indices.push(i as u32);
                            }
                        }
                        indices.extend(a.sparse.keys().copied());
                        (indices, a.named.keys().copied().collect())
                    }
                    _ => (Vec::new(), Vec::new()),
                };
                out.extend(indices.into_iter().map(|i| i.to_string()));
                for name in named {
                    let text = self.interns.get(name);
                    if !text.starts_with("@@") {
                        out.push(text.to_owned());
                    }
                }
            }
            Tag::Function => {
                let names: Vec<StringId> = match self.heap.get(id) {
                    HeapData::Function(f) => f.props.keys().copied().collect(),
                    _ => Vec::new(),
                };
                for name in names {
                    if name == statics::PROTOTYPE {
                        continue;
                    }
                    let text = self.interns.get(name);
                    if !text.starts_with("@@") {
                        out.push(text.to_owned());
                    }
                }
            }
            Tag::Iterator | Tag::AsyncIterator | Tag::Promise => {
                let names: Vec<StringId> = match self.heap.get(id) {
                    HeapData::Iterator(it) => it.props.keys().copied().collect(),
                    HeapData::AsyncIterator(it) => it.props.keys().copied().collect(),
                    HeapData::Promise(p) => p.props.keys().copied().collect(),
                    _ => Vec::new(),
                };
                for name in names {
                    let text = self.interns.get(name);
                    if !text.starts_with("@@") {
                        out.push(text.to_owned());
                    }
                }
            }
            _ => {}
        }
        Ok(out)
    }

    /// Own property names regardless of enumerability (internal symbol keys
    /// still excluded). Arrays include `length`.
    pub(crate) fn own_all_names(&mut self, base: &Value) -> Vec<String> {
        let Some(id) = base.heap_id() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        match base.tag() {
            Tag::Object => {
                for name in self.heap.object_own_names(id) {
                    let text = self.interns.get(name);
                    if !text.starts_with("@@") {
                        out.push(text.to_owned());
                    }
                }
            }
            Tag::Array => {
                if let HeapData::Array(a) = self.heap.get(id) {
                    for (i, v) in a.dense.iter().enumerate() {
                        if !v.is_uninitialized() {
                            out.push(i.to_string());
                        }
                    }
                    for i in a.sparse.keys() {
                        out.push(i.to_string());
                    }
                }
                out.push("length".to_owned());
                let named: Vec<StringId> = match self.heap.get(id) {
                    HeapData::Array(a) => a.named.keys().copied().collect(),
                    _ => Vec::new(),
                };
                for name in named {
                    let text = self.interns.get(name);
                    if !text.starts_with("@@") {
                        out.push(text.to_owned());
                    }
                }
            }
            _ => {
                // Other cell kinds expose the same names either way.
                return self.own_enumerable_names(base).unwrap_or_default();
            }
        }
        out
    }

    /// Whether the slot behind `name` is enumerable on an object cell.
    fn name_is_enumerable_object(&self, id: HeapId, name: StringId) -> bool {
        let Some(slot) = self.heap.object_own_slot(id, name) else {
            return false;
        };
        let HeapData::Object(o) = self.heap.get(id) else {
            return false;
        };
        let stored = &o.slots[slot];
        if let Some(desc_id) = stored.heap_id() {
            match self.heap.get(desc_id) {
                HeapData::DataDesc(d) => return d.enumerable,
                HeapData::AccessorDesc(d) => return d.enumerable,
                _ => {}
            }
        }
        true
    }

    // --- prototypes -------------------------------------------------------

    /// `Object.getPrototypeOf`.
    pub fn get_prototype_of(&mut self, base: &Value) -> RunResult<Value> {
        if base.is_nullish() {
            return Err(RunError::type_error("Cannot convert undefined or null to object"));
        }
        Ok(self.proto_of(base))
    }

    /// `Object.setPrototypeOf` / internal prototype replacement.
    pub fn set_prototype(&mut self, base: &Value, proto: Value) -> RunResult<()> {
        if !proto.is_null() && !proto.is_object_like() {
            proto.drop_with_heap(&mut self.heap);
            return Err(RunError::type_error("Object prototype may only be an Object or null"));
        }
        let Some(id) = base.heap_id() else {
            proto.drop_with_heap(&mut self.heap);
            return Ok(());
        };
        let old = match self.heap.get_mut(id) {
            HeapData::Object(o) => Some(std::mem::replace(&mut o.proto, proto)),
            HeapData::Array(a) => Some(std::mem::replace(&mut a.proto, proto)),
            HeapData::Function(f) => Some(std::mem::replace(&mut f.proto, proto)),
            _ => None,
        };
        match old {
            Some(old) => {
                old.drop_with_heap(&mut self.heap);
                Ok(())
            }
            None => Err(RunError::type_error("cannot replace the prototype of this value")),
        }
    }

    /// The hidden-class identity of an object cell, as an opaque number.
    /// Two objects built by the same property sequence report the same
    /// value. Test support.
    #[must_use]
    pub fn shape_of(&self, value: &Value) -> Option<u32> {
        let id = value.heap_id()?;
        match self.heap.get(id) {
            HeapData::Object(o) => Some(o.shape.raw()),
            _ => None,
        }
    }

    /// Number of storage slots an object currently carries. Test support.
    #[must_use]
    pub fn slot_count_of(&self, value: &Value) -> Option<usize> {
        let id = value.heap_id()?;
        match self.heap.get(id) {
            HeapData::Object(o) => Some(o.slots.len()),
            _ => None,
        }
    }

    /// Array length without going through the property engine.
    pub(crate) fn array_length(&self, value: &Value) -> u64 {
        match value.heap_id().map(|id| self.heap.get(id)) {
            Some(HeapData::Array(a)) => a.length,
            _ => 0,
        }
    }
}

/// Own-property classification for the write path: no cloning, descriptors
/// surfaced by cell id.
enum WriteSlot {
    Plain,
    Data(HeapId),
    Accessor(HeapId),
    Missing,
}

impl Runtime {
    fn own_lookup_for_write(&mut self, base: &Value, key: Key) -> RunResult<WriteSlot> {
        let Some(id) = base.heap_id() else {
            return Ok(WriteSlot::Missing);
        };
        let classify = |stored: &Value| -> WriteSlot {
            if stored.is_data_descriptor() {
                WriteSlot::Data(stored.heap_id().expect("descriptor is heap backed"))
            } else if stored.is_accessor_descriptor() {
                WriteSlot::Accessor(stored.heap_id().expect("descriptor is heap backed"))
            } else {
                WriteSlot::Plain
            }
        };
        Ok(match base.tag() {
            Tag::Object => {
                let name = self.key_to_name(key);
                match self.heap.object_own_slot(id, name) {
                    Some(slot) => {
                        let HeapData::Object(o) = self.heap.get(id) else {
                            return Ok(WriteSlot::Missing);
                        };
                        classify(&o.slots[slot])
                    }
                    None => WriteSlot::Missing,
                }
            }
            Tag::Array => match key {
                Key::Index(i) => match self.heap.get(id) {
                    HeapData::Array(a) if a.has_element(i) => WriteSlot::Plain,
                    _ => WriteSlot::Missing,
                },
                Key::Name(statics::LENGTH) => WriteSlot::Plain,
                Key::Name(name) => match self.heap.get(id) {
                    HeapData::Array(a) => match a.named.get(&name) {
                        Some(v) => classify(v),
                        None => WriteSlot::Missing,
                    },
                    _ => WriteSlot::Missing,
                },
            },
            Tag::Function | Tag::Iterator | Tag::AsyncIterator | Tag::Promise => {
                let name = self.key_to_name(key);
                let stored = match self.heap.get(id) {
                    HeapData::Function(f) => f.props.get(&name),
                    HeapData::Iterator(it) => it.props.get(&name),
                    HeapData::AsyncIterator(it) => it.props.get(&name),
                    HeapData::Promise(p) => p.props.get(&name),
                    _ => None,
                };
                match stored {
                    Some(v) => classify(v),
                    None => WriteSlot::Missing,
                }
            }
            _ => WriteSlot::Missing,
        })
    }
}
