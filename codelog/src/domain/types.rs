//! Domain types providing compile-time safety and self-documentation
//!
//! These types describe the runtime's code objects as the event subsystem
//! sees them. They are borrowed views handed in by the producer (compiler,
//! GC, interpreter); nothing here owns heap data of the runtime.

use std::fmt;

use serde::Deserialize;

/// Machine address of code or of a runtime object.
///
/// Rendered as `0x<lowercase hex>` wherever a pointer goes into a text log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub u64);

impl Address {
    pub const NULL: Address = Address(0);

    #[must_use]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for Address {
    fn from(addr: u64) -> Self {
        Address(addr)
    }
}

/// Classification of a code-creation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum CodeTag {
    Builtin,
    Callback,
    Eval,
    Function,
    Handler,
    BytecodeHandler,
    RegExp,
    Script,
    Stub,
    NativeFunction,
    NativeScript,
}

impl CodeTag {
    /// Number of tags (the length sentinel of the tag enumeration).
    pub const COUNT: usize = 11;

    pub const ALL: [CodeTag; Self::COUNT] = [
        CodeTag::Builtin,
        CodeTag::Callback,
        CodeTag::Eval,
        CodeTag::Function,
        CodeTag::Handler,
        CodeTag::BytecodeHandler,
        CodeTag::RegExp,
        CodeTag::Script,
        CodeTag::Stub,
        CodeTag::NativeFunction,
        CodeTag::NativeScript,
    ];

    /// Name written into logs and name buffers.
    ///
    /// Native variants share the name of their non-native counterpart.
    #[must_use]
    pub fn log_name(self) -> &'static str {
        match self {
            CodeTag::Builtin => "Builtin",
            CodeTag::Callback => "Callback",
            CodeTag::Eval => "Eval",
            CodeTag::Function | CodeTag::NativeFunction => "JS",
            CodeTag::Handler => "Handler",
            CodeTag::BytecodeHandler => "BytecodeHandler",
            CodeTag::RegExp => "RegExp",
            CodeTag::Script | CodeTag::NativeScript => "Script",
            CodeTag::Stub => "Stub",
        }
    }

    /// Coarse event type reported to external API consumers.
    #[must_use]
    pub fn event_type(self) -> CodeEventType {
        match self {
            CodeTag::Builtin => CodeEventType::Builtin,
            CodeTag::Callback => CodeEventType::Callback,
            CodeTag::Eval => CodeEventType::Eval,
            CodeTag::Function | CodeTag::NativeFunction => CodeEventType::Function,
            CodeTag::Handler => CodeEventType::Handler,
            CodeTag::BytecodeHandler => CodeEventType::BytecodeHandler,
            CodeTag::RegExp => CodeEventType::RegExp,
            CodeTag::Script | CodeTag::NativeScript => CodeEventType::Script,
            CodeTag::Stub => CodeEventType::Stub,
        }
    }

    /// Switch function/script tags to their native variants for code that
    /// belongs to a native (extension) script.
    #[must_use]
    pub fn to_native_by_script(self, is_native_script: bool) -> CodeTag {
        if !is_native_script {
            return self;
        }
        match self {
            CodeTag::Function => CodeTag::NativeFunction,
            CodeTag::Script => CodeTag::NativeScript,
            other => other,
        }
    }
}

impl fmt::Display for CodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.log_name())
    }
}

/// Code event type exposed through the external code-event API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeEventType {
    Unknown,
    Builtin,
    Callback,
    Eval,
    Function,
    Handler,
    BytecodeHandler,
    RegExp,
    Script,
    Stub,
    Relocation,
}

/// Kind of a code object, as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum CodeKind {
    BytecodeHandler,
    ForTesting,
    Builtin,
    RegExp,
    WasmFunction,
    InterpretedFunction,
    Baseline,
    Maglev,
    Turbofan,
}

impl CodeKind {
    /// Integer written in the kind field of `code-creation` records.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            CodeKind::BytecodeHandler => 0,
            CodeKind::ForTesting => 1,
            CodeKind::Builtin => 2,
            CodeKind::RegExp => 3,
            CodeKind::WasmFunction => 4,
            CodeKind::InterpretedFunction => 5,
            CodeKind::Baseline => 6,
            CodeKind::Maglev => 7,
            CodeKind::Turbofan => 8,
        }
    }

    /// Optimization-tier marker appended to function names.
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            CodeKind::InterpretedFunction => "~",
            CodeKind::Baseline => "^",
            CodeKind::Maglev => "+",
            CodeKind::Turbofan => "*",
            _ => "",
        }
    }

    #[must_use]
    pub fn is_js_function(self) -> bool {
        matches!(
            self,
            CodeKind::InterpretedFunction
                | CodeKind::Baseline
                | CodeKind::Maglev
                | CodeKind::Turbofan
        )
    }

    #[must_use]
    pub fn is_builtin_or_js_function(self) -> bool {
        self == CodeKind::Builtin || self.is_js_function()
    }

    /// Bytecode arrays are the only non-machine-code objects.
    #[must_use]
    pub fn is_bytecode(self) -> bool {
        self == CodeKind::InterpretedFunction
    }

    /// Human-readable kind name (used by `code-disassemble`-style consumers).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CodeKind::BytecodeHandler => "BYTECODE_HANDLER",
            CodeKind::ForTesting => "FOR_TESTING",
            CodeKind::Builtin => "BUILTIN",
            CodeKind::RegExp => "REGEXP",
            CodeKind::WasmFunction => "WASM_FUNCTION",
            CodeKind::InterpretedFunction => "INTERPRETED_FUNCTION",
            CodeKind::Baseline => "BASELINE",
            CodeKind::Maglev => "MAGLEV",
            CodeKind::Turbofan => "TURBOFAN",
        }
    }
}

/// A runtime name: either a plain string or a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Name<'a> {
    String(&'a str),
    Symbol { description: Option<&'a str>, hash: u32 },
}

impl Name<'_> {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Name::String(s) => Some(s),
            Name::Symbol { .. } => None,
        }
    }
}

impl fmt::Display for Name<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::String(s) => f.write_str(s),
            Name::Symbol { description, hash } => {
                f.write_str("symbol(")?;
                if let Some(description) = description {
                    write!(f, "\"{description}\" ")?;
                }
                write!(f, "hash {hash:x})")
            }
        }
    }
}

impl<'a> From<&'a str> for Name<'a> {
    fn from(s: &'a str) -> Self {
        Name::String(s)
    }
}

/// One entry of a code object's source position table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePositionEntry {
    pub code_offset: i32,
    pub script_offset: i32,
    pub inlining_id: Option<i32>,
    pub is_statement: bool,
}

/// One entry of an optimized code object's inlining table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InliningPosition {
    /// Index into the shared info's inlined function table
    pub function_id: Option<i32>,
    pub script_offset: i32,
    pub inlining_id: Option<i32>,
}

/// Borrowed view of a code object.
#[derive(Debug, Clone, Copy)]
pub struct CodeObject<'a> {
    pub start: Address,
    pub size: u32,
    pub kind: CodeKind,
    /// Raw instruction bytes, when the producer can hand them out
    pub instructions: &'a [u8],
    pub source_positions: &'a [SourcePositionEntry],
    pub inlining_positions: &'a [InliningPosition],
}

impl<'a> CodeObject<'a> {
    #[must_use]
    pub fn new(start: Address, size: u32, kind: CodeKind) -> Self {
        Self {
            start,
            size,
            kind,
            instructions: &[],
            source_positions: &[],
            inlining_positions: &[],
        }
    }

    #[must_use]
    pub fn with_instructions(mut self, instructions: &'a [u8]) -> Self {
        self.instructions = instructions;
        self
    }

    #[must_use]
    pub fn with_source_positions(mut self, positions: &'a [SourcePositionEntry]) -> Self {
        self.source_positions = positions;
        self
    }

    #[must_use]
    pub fn with_inlining_positions(mut self, inlining: &'a [InliningPosition]) -> Self {
        self.inlining_positions = inlining;
        self
    }
}

/// Script a function was compiled from.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptInfo<'a> {
    pub id: i32,
    pub name: Option<&'a str>,
    pub source: Option<&'a str>,
    pub line_offset: i32,
    pub column_offset: i32,
    pub source_mapping_url: Option<&'a str>,
    /// Native (extension) scripts get the `Native*` tags
    pub is_native: bool,
}

/// Borrowed view of a function's shared information.
#[derive(Debug, Clone, Copy)]
pub struct SharedInfo<'a> {
    pub address: Address,
    pub debug_name: &'a str,
    pub optimization_disabled: bool,
    pub disabled_reason: &'a str,
    pub script: Option<ScriptInfo<'a>>,
    pub start_position: i32,
    pub end_position: i32,
    /// Addresses of functions inlined into optimized code, by function id
    pub inlined_functions: &'a [Address],
}

impl<'a> SharedInfo<'a> {
    #[must_use]
    pub fn new(address: Address, debug_name: &'a str) -> Self {
        Self {
            address,
            debug_name,
            optimization_disabled: false,
            disabled_reason: "",
            script: None,
            start_position: 0,
            end_position: 0,
            inlined_functions: &[],
        }
    }

    #[must_use]
    pub fn with_script(mut self, script: ScriptInfo<'a>) -> Self {
        self.script = Some(script);
        self
    }

    #[must_use]
    pub fn with_disabled_optimization(mut self, reason: &'a str) -> Self {
        self.optimization_disabled = true;
        self.disabled_reason = reason;
        self
    }
}

/// Marker for a function's code: tier marker, or nothing for interpreted
/// code whose optimization is disabled.
#[must_use]
pub fn compute_marker(shared: &SharedInfo<'_>, code: &CodeObject<'_>) -> &'static str {
    if shared.optimization_disabled && code.kind == CodeKind::InterpretedFunction {
        return "";
    }
    code.kind.marker()
}

/// Borrowed view of a compiled WebAssembly function.
#[derive(Debug, Clone, Copy)]
pub struct WasmCode<'a> {
    pub start: Address,
    pub size: u32,
    /// Function index, `None` for anonymous wrappers
    pub index: Option<u32>,
    pub tier: &'a str,
    pub is_liftoff: bool,
    /// Identity of the owning module, used to group recompilations
    pub module_id: u64,
    pub instructions: &'a [u8],
}

impl WasmCode<'_> {
    #[must_use]
    pub fn marker(&self) -> &'static str {
        if self.is_liftoff {
            ""
        } else {
            "*"
        }
    }
}

/// Prefix of accessor callback creations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    Plain,
    Getter,
    Setter,
}

impl CallbackKind {
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            CallbackKind::Plain => "",
            CallbackKind::Getter => "get ",
            CallbackKind::Setter => "set ",
        }
    }
}

/// Source location of a deoptimization point.
#[derive(Debug, Clone, Copy)]
pub struct DeoptPosition<'a> {
    pub inlining_id: i32,
    pub script_offset: i32,
    /// Pre-rendered `<script>:<line>:<column>` location
    pub location: &'a str,
}

/// Why and where a code object was deoptimized.
#[derive(Debug, Clone, Copy)]
pub struct DeoptInfo<'a> {
    /// Deoptimization kind, e.g. `deopt-eager` or `dependency-change`
    pub kind: &'a str,
    pub reason: &'a str,
    pub position: Option<DeoptPosition<'a>>,
}
