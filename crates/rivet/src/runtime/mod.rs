//! The runtime instance: heap, interns, scheduler, realm and the embedding
//! surface translated programs call into.
//!
//! Lifetime is explicit: [`Runtime::new`] builds a fully populated realm and
//! [`Runtime::shutdown`] (or drop) releases every runtime-owned reference, so
//! isolated runs and leak-checking tests are possible without process-global
//! state.

pub(crate) mod access;
pub(crate) mod async_drive;
pub(crate) mod call;
pub(crate) mod iteration;
pub(crate) mod operators;
pub(crate) mod promise_ops;

use std::sync::Once;
use std::time::Instant;

use ahash::AHashMap;
use rand::{SeedableRng, rngs::SmallRng};

use crate::{
    args::Args,
    builtins,
    display,
    exception::{ExcType, RunError, RunResult},
    heap::{DropWithHeap, Heap, HeapData, HeapId, HeapStats},
    intern::{Interns, statics},
    io::{ConsoleStream, ConsoleWriter, StdConsole},
    limits::RuntimeConfig,
    nanbox::{self, Tag},
    scheduler::{Microtask, Scheduler, TimerPop},
    types::{Callable, JsFunction, JsObject, JsSymbol, NativeFn},
    value::Value,
};

/// The well-known symbol singletons, created once per runtime.
#[derive(Debug, Default)]
pub(crate) struct WellKnown {
    pub iterator: Value,
    pub async_iterator: Value,
    pub has_instance: Value,
    pub is_concat_spreadable: Value,
    pub match_sym: Value,
    pub match_all: Value,
    pub replace: Value,
    pub search: Value,
    pub species: Value,
    pub split: Value,
    pub to_primitive: Value,
    pub to_string_tag: Value,
    pub unscopables: Value,
}

/// Per-runtime globals: the global object, the intrinsic prototypes and the
/// symbol registries.
#[derive(Debug)]
pub(crate) struct Realm {
    pub global: Value,
    pub object_proto: Value,
    pub array_proto: Value,
    pub function_proto: Value,
    pub string_proto: Value,
    pub number_proto: Value,
    pub boolean_proto: Value,
    pub symbol_proto: Value,
    pub iterator_proto: Value,
    pub async_iterator_proto: Value,
    pub promise_proto: Value,
    /// Indexed by `ExcType as usize`.
    pub error_protos: [Value; ExcType::COUNT],
    pub well_known: WellKnown,
    /// `Symbol.for` registry.
    pub symbol_registry: AHashMap<Box<str>, Value>,
    /// Serial for unique user-symbol keys.
    pub symbol_serial: u32,
}

impl Default for Realm {
    fn default() -> Self {
        Self {
            global: Value::undefined(),
            object_proto: Value::undefined(),
            array_proto: Value::undefined(),
            function_proto: Value::undefined(),
            string_proto: Value::undefined(),
            number_proto: Value::undefined(),
            boolean_proto: Value::undefined(),
            symbol_proto: Value::undefined(),
            iterator_proto: Value::undefined(),
            async_iterator_proto: Value::undefined(),
            promise_proto: Value::undefined(),
            error_protos: std::array::from_fn(|_| Value::undefined()),
            well_known: WellKnown::default(),
            symbol_registry: AHashMap::new(),
            symbol_serial: 0,
        }
    }
}

static ENCODING_CHECK: Once = Once::new();

/// A single-threaded runtime instance.
pub struct Runtime {
    pub(crate) heap: Heap,
    pub(crate) interns: Interns,
    pub(crate) scheduler: Scheduler,
    pub(crate) realm: Realm,
    pub(crate) console: Box<dyn ConsoleWriter>,
    pub(crate) console_timers: AHashMap<Box<str>, Instant>,
    pub(crate) rng: SmallRng,
}

impl Runtime {
    /// Builds a runtime with the default configuration, writing console
    /// output to the process streams.
    #[must_use]
    pub fn new() -> Self {
        Self::with_console(RuntimeConfig::default(), Box::new(StdConsole))
    }

    /// Builds a runtime with an explicit configuration and console sink.
    #[must_use]
    pub fn with_console(config: RuntimeConfig, console: Box<dyn ConsoleWriter>) -> Self {
        ENCODING_CHECK.call_once(nanbox::verify_encoding);
        let mut rt = Self {
            heap: Heap::new(config),
            interns: Interns::new(),
            scheduler: Scheduler::new(),
            realm: Realm::default(),
            console,
            console_timers: AHashMap::new(),
            rng: SmallRng::from_entropy(),
        };
        builtins::install(&mut rt).expect("realm bootstrap cannot exceed resource limits");
        rt
    }

    /// Releases every runtime-owned reference. Equivalent to dropping, made
    /// explicit so tests can assert on heap state afterwards.
    pub fn shutdown(self) {
        // Teardown happens in Drop.
    }

    // --- embedding surface ------------------------------------------------

    /// Runs a translated program: invokes the translation unit's container
    /// inside a catch boundary, reports an escaped exception through
    /// `console.error`, drains the event loop to completion, and returns the
    /// process exit code (0 on success, 1 when the container threw).
    pub fn run_program<F>(&mut self, container: F) -> i32
    where
        F: FnOnce(&mut Self) -> RunResult<Value>,
    {
        let code = match container(self) {
            Ok(value) => {
                value.drop_with_heap(&mut self.heap);
                0
            }
            Err(err) => {
                self.report_uncaught(err);
                1
            }
        };
        self.run_event_loop();
        code
    }

    /// Alternates microtask and timer phases until both queues are empty.
    ///
    /// Within a phase microtasks run in enqueue order; all microtasks
    /// enqueued by a timer callback drain before the next timer fires. When
    /// only future timers remain the loop sleeps until the nearest due time.
    pub fn run_event_loop(&mut self) {
        loop {
            while let Some(task) = self.scheduler.pop_microtask() {
                if let Err(err) = self.run_microtask(task) {
                    self.report_uncaught(err);
                }
            }

            match self.scheduler.pop_timer(Instant::now()) {
                TimerPop::Ready(entry) => self.fire_timer(entry),
                TimerPop::Cancelled(entry) => entry.drop_with_heap(&mut self.heap),
                TimerPop::NotDue(at) => {
                    let now = Instant::now();
                    if at > now {
                        std::thread::sleep(at - now);
                    }
                }
                TimerPop::Empty => break,
            }
        }
    }

    fn fire_timer(&mut self, entry: crate::scheduler::TimerEntry) {
        let callback = entry.callback.clone_with_heap(&self.heap);
        let args = Args::from_values(entry.args.iter().map(|a| a.clone_with_heap(&self.heap)));
        match self.call(&callback, Value::undefined(), args) {
            Ok(result) => result.drop_with_heap(&mut self.heap),
            Err(err) => self.report_uncaught(err),
        }
        callback.drop_with_heap(&mut self.heap);

        // Intervals re-arm unless cancelled during their own callback.
        if let Some(interval) = entry.interval
            && !self.scheduler.is_cancelled(entry.id)
        {
            self.scheduler.reschedule(entry, interval);
        } else {
            entry.drop_with_heap(&mut self.heap);
        }
    }

    pub(crate) fn run_microtask(&mut self, task: Microtask) -> RunResult<()> {
        match task {
            Microtask::Reaction {
                reaction,
                argument,
                rejected,
            } => self.run_reaction(reaction, argument, rejected),
            Microtask::Call { func, args } => {
                let result = self.call(&func, Value::undefined(), Args::from_values(args));
                func.drop_with_heap(&mut self.heap);
                result.map(|v| v.drop_with_heap(&mut self.heap))
            }
        }
    }

    /// Reports an exception nothing caught: timer/microtask escapes and the
    /// program boundary. The loop keeps running afterwards.
    pub(crate) fn report_uncaught(&mut self, err: RunError) {
        let value = self.error_value(err);
        let rendered = display::format_uncaught(&self.heap, &self.interns, &value);
        self.console.write_line(ConsoleStream::Err, &rendered);
        value.drop_with_heap(&mut self.heap);
    }

    // --- value construction ----------------------------------------------

    /// Allocates a string value.
    pub fn string(&mut self, s: impl Into<Box<str>>) -> RunResult<Value> {
        self.heap.str_value(s)
    }

    /// Allocates an empty ordinary object with the default prototype.
    pub fn object(&mut self) -> RunResult<Value> {
        let proto = self.realm.object_proto.clone_with_heap(&self.heap);
        self.heap.alloc_value(HeapData::Object(JsObject::new(proto)))
    }

    /// Allocates an ordinary object with an explicit prototype (`null` or an
    /// object-like value).
    pub fn object_with_proto(&mut self, proto: Value) -> RunResult<Value> {
        if !proto.is_null() && !proto.is_object_like() {
            proto.drop_with_heap(&mut self.heap);
            return Err(RunError::type_error("Object prototype may only be an Object or null"));
        }
        self.heap.alloc_value(HeapData::Object(JsObject::new(proto)))
    }

    /// Allocates an array from its elements.
    pub fn array(&mut self, elements: Vec<Value>) -> RunResult<Value> {
        let proto = self.realm.array_proto.clone_with_heap(&self.heap);
        self.heap
            .alloc_value(HeapData::Array(crate::types::JsArray::from_dense(proto, elements)))
    }

    /// Allocates a unique symbol.
    pub fn symbol(&mut self, description: Option<&str>) -> RunResult<Value> {
        self.realm.symbol_serial += 1;
        let key_text = match description {
            Some(d) => format!("@@sym{}:{d}", self.realm.symbol_serial),
            None => format!("@@sym{}", self.realm.symbol_serial),
        };
        let key = self.interns.intern(&key_text);
        self.heap
            .alloc_value(HeapData::Symbol(JsSymbol::new(description.map(Into::into), key)))
    }

    /// The most common function kind: a plain method without a `prototype`
    /// object (built-ins, callbacks).
    pub fn method<F>(&mut self, name: &str, f: F) -> RunResult<Value>
    where
        F: Fn(&mut Self, Value, Args) -> RunResult<Value> + 'static,
    {
        let callable = Callable::Plain(std::rc::Rc::new(f));
        self.alloc_function(name, callable, Vec::new(), false, false)
    }

    /// A full function: carries a `prototype` object whose `constructor`
    /// points back at the function, making it usable with `new`.
    pub fn function<F>(&mut self, name: &str, f: F) -> RunResult<Value>
    where
        F: Fn(&mut Self, Value, Args) -> RunResult<Value> + 'static,
    {
        let callable = Callable::Plain(std::rc::Rc::new(f));
        self.alloc_function(name, callable, Vec::new(), true, false)
    }

    /// A closure: like [`Runtime::function`] but keeps the given variable
    /// cells alive for the captures of `f`.
    pub fn closure<F>(&mut self, name: &str, captures: Vec<HeapId>, f: F) -> RunResult<Value>
    where
        F: Fn(&mut Self, Value, Args) -> RunResult<Value> + 'static,
    {
        let callable = Callable::Plain(std::rc::Rc::new(f));
        self.alloc_function(name, callable, captures, false, false)
    }

    /// A class constructor: rejects plain calls, renders as `[class Name]`.
    pub fn class_constructor<F>(&mut self, name: &str, f: F) -> RunResult<Value>
    where
        F: Fn(&mut Self, Value, Args) -> RunResult<Value> + 'static,
    {
        let callable = Callable::Plain(std::rc::Rc::new(f));
        self.alloc_function(name, callable, Vec::new(), true, true)
    }

    /// A generator function: each call produces a fresh iterator backed by
    /// the body the factory builds.
    pub fn generator<F>(&mut self, name: &str, factory: F) -> RunResult<Value>
    where
        F: Fn(&mut Self, Value, Args) -> RunResult<Box<dyn crate::types::iterator::GenBody>> + 'static,
    {
        let callable = Callable::Generator(std::rc::Rc::new(factory));
        self.alloc_function(name, callable, Vec::new(), false, false)
    }

    /// An async function: each call produces a promise for the body's result.
    pub fn async_function<F>(&mut self, name: &str, factory: F) -> RunResult<Value>
    where
        F: Fn(&mut Self, Value, Args) -> RunResult<Box<dyn crate::types::iterator::GenBody>> + 'static,
    {
        let callable = Callable::Async(std::rc::Rc::new(factory));
        self.alloc_function(name, callable, Vec::new(), false, false)
    }

    /// An async generator function.
    pub fn async_generator<F>(&mut self, name: &str, factory: F) -> RunResult<Value>
    where
        F: Fn(&mut Self, Value, Args) -> RunResult<Box<dyn crate::types::iterator::GenBody>> + 'static,
    {
        let callable = Callable::AsyncGenerator(std::rc::Rc::new(factory));
        self.alloc_function(name, callable, Vec::new(), false, false)
    }

    fn alloc_function(
        &mut self,
        name: &str,
        callable: Callable,
        captures: Vec<HeapId>,
        with_prototype: bool,
        is_class_ctor: bool,
    ) -> RunResult<Value> {
        let fn_proto = self.realm.function_proto.clone_with_heap(&self.heap);
        let mut func = JsFunction::new(name, callable, fn_proto);
        func.captures = captures;
        func.is_class_ctor = is_class_ctor;
        let func_value = self.heap.alloc_value(HeapData::Function(func))?;

        if with_prototype {
            // The associated prototype object, with its constructor
            // back-reference. This pair intentionally forms a cycle.
            let proto_obj = self.object()?;
            let ctor_ref = func_value.clone_with_heap(&self.heap);
            self.define_data_property_flags(&proto_obj, "constructor", ctor_ref, true, false, true)?;
            let func_id = func_value.heap_id().expect("function value is heap backed");
            match self.heap.get_mut(func_id) {
                HeapData::Function(f) => {
                    f.props.insert(statics::PROTOTYPE, proto_obj);
                }
                _ => unreachable!("function cell expected"),
            }
        }
        Ok(func_value)
    }

    // --- variable cells ---------------------------------------------------

    /// Allocates a shared variable cell (a closure-captured binding).
    pub fn new_cell(&mut self, value: Value) -> RunResult<HeapId> {
        self.heap.new_cell(value)
    }

    /// Reads a variable cell, raising a ReferenceError when the binding is
    /// still in its temporal dead zone.
    pub fn cell_read(&mut self, cell: HeapId, name: &str) -> RunResult<Value> {
        let value = self.heap.cell_get(cell);
        if value.is_uninitialized() {
            return Err(RunError::dead_zone(name));
        }
        Ok(value)
    }

    /// Writes a variable cell, releasing the previous value.
    pub fn cell_write(&mut self, cell: HeapId, value: Value) {
        self.heap.cell_set(cell, value);
    }

    /// Takes an extra reference on a cell, for handing it to another closure.
    pub fn cell_share(&self, cell: HeapId) -> HeapId {
        self.heap.inc_ref(cell);
        cell
    }

    /// Releases a cell reference owned by a scope that is going away.
    pub fn cell_release(&mut self, cell: HeapId) {
        self.heap.dec_ref(cell);
    }

    /// Raises a ReferenceError when a stack-resident binding is read before
    /// its first assignment.
    pub fn tdz_check(&self, value: &Value, name: &str) -> RunResult<()> {
        if value.is_uninitialized() {
            return Err(RunError::dead_zone(name));
        }
        Ok(())
    }

    // --- value plumbing ---------------------------------------------------

    /// Clones a value, taking a new reference when heap-backed.
    #[must_use]
    pub fn clone_value(&self, value: &Value) -> Value {
        value.clone_with_heap(&self.heap)
    }

    /// Releases a value's reference.
    pub fn release(&mut self, value: Value) {
        value.drop_with_heap(&mut self.heap);
    }

    /// Releases a whole argument pack.
    pub fn release_args(&mut self, args: Args) {
        args.drop_with_heap(&mut self.heap);
    }

    /// Heap occupancy snapshot.
    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// Current reference count of a heap-backed value's cell (0 for
    /// immediates). Test support for the lifetime invariants.
    #[must_use]
    pub fn value_refcount(&self, value: &Value) -> u32 {
        value.heap_id().map_or(0, |id| self.heap.refcount(id))
    }

    /// Direct access to the heap, for coroutine bodies releasing saved
    /// locals.
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    // --- globals ----------------------------------------------------------

    /// The global object.
    #[must_use]
    pub fn global(&self) -> Value {
        self.realm.global.clone_with_heap(&self.heap)
    }

    /// Reads a binding off the global object, raising a ReferenceError for
    /// names that were never defined.
    pub fn global_get(&mut self, name: &str) -> RunResult<Value> {
        let global = self.global();
        let has = self.has_property_named(&global, name)?;
        if !has {
            global.drop_with_heap(&mut self.heap);
            return Err(RunError::reference_error(format!("{name} is not defined")));
        }
        let value = self.get(&global, name);
        global.drop_with_heap(&mut self.heap);
        value
    }

    /// Writes a binding on the global object.
    pub fn global_set(&mut self, name: &str, value: Value) -> RunResult<()> {
        let global = self.global();
        let result = self.set(&global, name, value);
        global.drop_with_heap(&mut self.heap);
        result
    }

    // --- internal helpers -------------------------------------------------

    /// Wraps a raw heap id in a value, taking a new reference.
    pub(crate) fn value_from_id(&self, tag: Tag, id: HeapId) -> Value {
        self.heap.inc_ref(id);
        Value::from_heap(tag, id)
    }

    /// Builds a native-function value without prototype wiring, used
    /// internally by builtins that need explicit captures.
    pub(crate) fn native_with_captures(&mut self, name: &str, captures: Vec<HeapId>, f: NativeFn) -> RunResult<Value> {
        self.alloc_function(name, Callable::Plain(f), captures, false, false)
    }

    /// Materializes a raised error into a value (building an Error cell for
    /// native exceptions). Infallible: if the Error cell cannot be allocated
    /// the plain message string is used, and failing that, undefined.
    pub(crate) fn error_value(&mut self, err: RunError) -> Value {
        match err {
            RunError::Thrown(value) => value,
            RunError::Exc(exc) => match self.new_error(exc.exc_type, &exc.message) {
                Ok(value) => value,
                Err(inner) => {
                    inner.drop_with_heap(&mut self.heap);
                    Value::undefined()
                }
            },
        }
    }

    /// Builds an Error cell: an ordinary object on the right error prototype
    /// with own `message` and `stack`.
    pub(crate) fn new_error(&mut self, exc_type: ExcType, message: &str) -> Result<Value, RunError> {
        let proto = self.realm.error_protos[exc_type as usize].clone_with_heap(&self.heap);
        let error = self.object_with_proto(proto)?;
        let msg_value = self.string(message)?;
        self.set(&error, "message", msg_value)?;
        let stack_text = if message.is_empty() {
            exc_type.to_string()
        } else {
            format!("{exc_type}: {message}")
        };
        let stack_value = self.string(stack_text.as_str())?;
        self.set(&error, "stack", stack_value)?;
        Ok(error)
    }

    /// Builds and raises an Error cell as a thrown value, so user-visible
    /// errors carry the full Error shape. This is how translated `throw new
    /// TypeError(...)` forms reach the runtime.
    pub fn throw(&mut self, exc_type: ExcType, message: &str) -> RunError {
        match self.new_error(exc_type, message) {
            Ok(value) => RunError::Thrown(value),
            Err(err) => err,
        }
    }

    fn teardown(&mut self) {
        // Pending work first: tasks hold references into the realm.
        let (micro, timers) = self.scheduler.drain_all();
        for task in micro {
            task.drop_with_heap(&mut self.heap);
        }
        for timer in timers {
            timer.drop_with_heap(&mut self.heap);
        }
        self.console_timers.clear();

        let realm = std::mem::take(&mut self.realm);
        let Realm {
            global,
            object_proto,
            array_proto,
            function_proto,
            string_proto,
            number_proto,
            boolean_proto,
            symbol_proto,
            iterator_proto,
            async_iterator_proto,
            promise_proto,
            error_protos,
            well_known,
            symbol_registry,
            symbol_serial: _,
        } = realm;
        for value in [
            global,
            object_proto,
            array_proto,
            function_proto,
            string_proto,
            number_proto,
            boolean_proto,
            symbol_proto,
            iterator_proto,
            async_iterator_proto,
            promise_proto,
        ] {
            value.drop_with_heap(&mut self.heap);
        }
        for value in error_protos {
            value.drop_with_heap(&mut self.heap);
        }
        let WellKnown {
            iterator,
            async_iterator,
            has_instance,
            is_concat_spreadable,
            match_sym,
            match_all,
            replace,
            search,
            species,
            split,
            to_primitive,
            to_string_tag,
            unscopables,
        } = well_known;
        for value in [
            iterator,
            async_iterator,
            has_instance,
            is_concat_spreadable,
            match_sym,
            match_all,
            replace,
            search,
            species,
            split,
            to_primitive,
            to_string_tag,
            unscopables,
        ] {
            value.drop_with_heap(&mut self.heap);
        }
        for (_, value) in symbol_registry {
            value.drop_with_heap(&mut self.heap);
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl ExcType {
    pub(crate) const COUNT: usize = 6;
}

/// Convenience for a `main` that hosts a single translation unit: builds a
/// runtime, runs the container, and returns the exit code.
pub fn run_main<F>(container: F) -> i32
where
    F: FnOnce(&mut Runtime) -> RunResult<Value>,
{
    let mut rt = Runtime::new();
    let code = rt.run_program(container);
    rt.shutdown();
    code
}
