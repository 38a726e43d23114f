//! Replay of code that existed before a listener was attached
//!
//! The runtime heap is an external collaborator: it exposes what it holds
//! through the [`CodeHeap`] visitor interface, and [`ExistingCodeLogger`]
//! turns that into ordinary creation events, sent either to one listener
//! (a late-attached external handler) or to every registered listener.

use crate::domain::{Address, CodeKind, CodeObject, CodeTag, Name, SharedInfo};
use crate::events::{CodeOrigin, EventRecord, LogClock, LogEvent, LogEventListener, Logger};

/// A code object found in the heap.
#[derive(Debug, Clone, Copy)]
pub struct HeapCode<'a> {
    pub code: CodeObject<'a>,
    /// Builtin or bytecode handler name, for those kinds
    pub builtin_name: Option<&'a str>,
    /// Per-function copy of the interpreter entry trampoline; logged with
    /// its function instead
    pub is_interpreter_trampoline_copy: bool,
}

/// Entry point of a native API function.
#[derive(Debug, Clone, Copy)]
pub struct ApiCallback<'a> {
    pub entry_point: Address,
    /// Fast C entry points of the same function
    pub c_functions: &'a [Address],
}

/// A function with compiled code.
#[derive(Debug, Clone, Copy)]
pub struct CompiledFunction<'a> {
    pub shared: SharedInfo<'a>,
    pub code: CodeObject<'a>,
    /// 1-based position of the function start in its script
    pub line: i32,
    pub column: i32,
    pub is_toplevel: bool,
    pub interpreter_trampoline: Option<CodeObject<'a>>,
    pub baseline_code: Option<CodeObject<'a>>,
    /// `code` is the lazy-compilation stub, not the function's own code
    pub is_compile_lazy: bool,
    pub api_callback: Option<ApiCallback<'a>>,
}

/// Getter and setter entry points of a native accessor.
#[derive(Debug, Clone, Copy)]
pub struct AccessorCallbacks<'a> {
    pub name: Name<'a>,
    pub getter: Option<Address>,
    pub setter: Option<Address>,
}

/// Read-only view of the runtime heap.
pub trait CodeHeap {
    fn for_each_code_object(&self, visit: &mut dyn FnMut(&HeapCode<'_>));

    fn for_each_compiled_function(&self, visit: &mut dyn FnMut(&CompiledFunction<'_>));

    fn for_each_accessor(&self, _visit: &mut dyn FnMut(&AccessorCallbacks<'_>)) {}
}

enum Target<'a> {
    Listener { listener: &'a dyn LogEventListener, clock: &'a LogClock },
    Broadcast(&'a Logger),
}

pub struct ExistingCodeLogger<'a> {
    heap: &'a dyn CodeHeap,
    target: Target<'a>,
}

impl<'a> ExistingCodeLogger<'a> {
    /// Send replayed events to one listener only.
    #[must_use]
    pub fn to_listener(heap: &'a dyn CodeHeap, listener: &'a dyn LogEventListener, clock: &'a LogClock) -> Self {
        Self { heap, target: Target::Listener { listener, clock } }
    }

    /// Send replayed events to every registered listener.
    #[must_use]
    pub fn broadcast(heap: &'a dyn CodeHeap, logger: &'a Logger) -> Self {
        Self { heap, target: Target::Broadcast(logger) }
    }

    fn emit(&self, event: LogEvent<'_>) {
        match &self.target {
            Target::Listener { listener, clock } => {
                listener.handle(&EventRecord { time_us: clock.now_us(), event });
            }
            Target::Broadcast(logger) => logger.dispatch(event),
        }
    }

    /// Code objects, then compiled functions.
    pub fn log_all(&self) {
        self.log_code_objects();
        self.log_compiled_functions();
    }

    pub fn log_code_objects(&self) {
        self.heap.for_each_code_object(&mut |heap_code: &HeapCode<'_>| {
            self.log_code_object(heap_code);
        });
    }

    fn log_code_object(&self, heap_code: &HeapCode<'_>) {
        let builtin_name = heap_code.builtin_name.unwrap_or("Unknown code from before profiling");
        let (tag, description) = match heap_code.code.kind {
            // Logged with their functions.
            CodeKind::InterpretedFunction | CodeKind::Baseline | CodeKind::Maglev | CodeKind::Turbofan => {
                return;
            }
            CodeKind::ForTesting => (CodeTag::Stub, "STUB code"),
            CodeKind::RegExp => (CodeTag::RegExp, "Regular expression code"),
            CodeKind::BytecodeHandler => (CodeTag::BytecodeHandler, builtin_name),
            CodeKind::Builtin => {
                if heap_code.is_interpreter_trampoline_copy {
                    return;
                }
                (CodeTag::Builtin, builtin_name)
            }
            CodeKind::WasmFunction => (CodeTag::Function, "A Wasm function"),
        };
        self.emit(LogEvent::CodeCreate {
            tag,
            code: heap_code.code,
            origin: CodeOrigin::Comment(description),
        });
    }

    pub fn log_compiled_functions(&self) {
        self.heap.for_each_compiled_function(&mut |function: &CompiledFunction<'_>| {
            if let Some(trampoline) = function.interpreter_trampoline {
                self.log_existing_function(function, trampoline, CodeTag::Function);
            }
            if let Some(baseline) = function.baseline_code {
                self.log_existing_function(function, baseline, CodeTag::Function);
            }
            if !function.is_compile_lazy {
                self.log_existing_function(function, function.code, CodeTag::Function);
            }
        });
    }

    /// Creation event for one function's code, shaped by what is known
    /// about its script.
    pub fn log_existing_function(&self, function: &CompiledFunction<'_>, code: CodeObject<'_>, tag: CodeTag) {
        let shared = function.shared;
        if let Some(script) = shared.script {
            let (tag, origin) = match script.name {
                Some(name) if function.is_toplevel => (
                    // Eval and script code look the same here.
                    CodeTag::Script,
                    CodeOrigin::Script { shared, script_name: Name::String(name) },
                ),
                Some(name) => (
                    tag,
                    CodeOrigin::Function {
                        shared,
                        script_name: Name::String(name),
                        line: function.line,
                        column: function.column,
                    },
                ),
                None => (
                    tag,
                    CodeOrigin::Function {
                        shared,
                        script_name: Name::String(""),
                        line: function.line,
                        column: function.column,
                    },
                ),
            };
            let tag = tag.to_native_by_script(script.is_native);
            self.emit(LogEvent::CodeCreate { tag, code, origin });
        } else if let Some(callback) = function.api_callback {
            let name = Name::String(shared.debug_name);
            let entry_points = std::iter::once(callback.entry_point).chain(callback.c_functions.iter().copied());
            for entry_point in entry_points {
                self.emit(LogEvent::Callback {
                    kind: crate::domain::CallbackKind::Plain,
                    name,
                    entry_point,
                });
            }
        }
    }

    /// Getter and setter callback events for native accessors.
    pub fn log_accessor_callbacks(&self) {
        self.heap.for_each_accessor(&mut |accessor: &AccessorCallbacks<'_>| {
            if let Some(getter) = accessor.getter.filter(|a| !a.is_null()) {
                self.emit(LogEvent::Callback {
                    kind: crate::domain::CallbackKind::Getter,
                    name: accessor.name,
                    entry_point: getter,
                });
            }
            if let Some(setter) = accessor.setter.filter(|a| !a.is_null()) {
                self.emit(LogEvent::Callback {
                    kind: crate::domain::CallbackKind::Setter,
                    name: accessor.name,
                    entry_point: setter,
                });
            }
        });
    }
}
