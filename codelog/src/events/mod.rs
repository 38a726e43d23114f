//! Code lifecycle events and the listener capability
//!
//! Producers (compiler, GC, interpreter, the profiler's consumer thread)
//! describe what happened as a [`LogEvent`]; the [`Logger`] registry stamps
//! it into an [`EventRecord`] and hands the same record to every registered
//! [`LogEventListener`]. Records borrow from the producer's stack and are
//! never retained past the dispatch call.

pub mod clock;
pub mod registry;

pub use clock::LogClock;
pub use registry::Logger;

use crate::domain::{
    Address, CallbackKind, CodeObject, CodeTag, DeoptInfo, Name, SharedInfo, WasmCode,
};
use crate::profiling::TickSample;

/// Where a freshly created code object came from.
#[derive(Debug, Clone, Copy)]
pub enum CodeOrigin<'a> {
    /// Builtins, stubs and handlers described by a fixed comment
    Comment(&'a str),
    /// Code identified by a runtime name
    Name(Name<'a>),
    /// Top-level script code
    Script { shared: SharedInfo<'a>, script_name: Name<'a> },
    /// Function code with its position inside the script
    Function { shared: SharedInfo<'a>, script_name: Name<'a>, line: i32, column: i32 },
}

impl<'a> CodeOrigin<'a> {
    /// Shared function info, for the origins that have one.
    #[must_use]
    pub fn shared(&self) -> Option<&SharedInfo<'a>> {
        match self {
            CodeOrigin::Script { shared, .. } | CodeOrigin::Function { shared, .. } => {
                Some(shared)
            }
            CodeOrigin::Comment(_) | CodeOrigin::Name(_) => None,
        }
    }
}

/// One code lifecycle or sampling event.
#[derive(Debug, Clone, Copy)]
pub enum LogEvent<'a> {
    CodeCreate {
        tag: CodeTag,
        code: CodeObject<'a>,
        origin: CodeOrigin<'a>,
    },
    WasmCodeCreate {
        tag: CodeTag,
        code: WasmCode<'a>,
        name: &'a str,
        source_url: Option<&'a str>,
        code_offset: i32,
        script_id: i32,
    },
    RegExpCodeCreate {
        code: CodeObject<'a>,
        source: &'a str,
    },
    /// Native accessor or API callback entry point
    Callback {
        kind: CallbackKind,
        name: Name<'a>,
        entry_point: Address,
    },
    /// Code relocated by the GC; `to` describes the code at its new address
    CodeMove {
        from: Address,
        to: CodeObject<'a>,
    },
    SharedFunctionInfoMove {
        from: Address,
        to: Address,
    },
    CodeDisableOpt {
        code: CodeObject<'a>,
        shared: SharedInfo<'a>,
    },
    CodeDeopt {
        code: CodeObject<'a>,
        info: DeoptInfo<'a>,
    },
    /// A GC that may move code is about to run
    CodeMovingGc,
    /// Name of a code object restored from a snapshot
    SnapshotCodeName {
        address: Address,
        position: i32,
        name: &'a str,
    },
    Tick {
        sample: &'a TickSample,
        overflow: bool,
    },
}

impl LogEvent<'_> {
    /// Short event name, used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            LogEvent::CodeCreate { .. }
            | LogEvent::WasmCodeCreate { .. }
            | LogEvent::RegExpCodeCreate { .. }
            | LogEvent::Callback { .. } => "code-creation",
            LogEvent::CodeMove { .. } => "code-move",
            LogEvent::SharedFunctionInfoMove { .. } => "sfi-move",
            LogEvent::CodeDisableOpt { .. } => "code-disable-optimization",
            LogEvent::CodeDeopt { .. } => "code-deopt",
            LogEvent::CodeMovingGc => "code-moving-gc",
            LogEvent::SnapshotCodeName { .. } => "snapshot-code-name",
            LogEvent::Tick { .. } => "tick",
        }
    }

    /// Everything except ticks describes code.
    #[must_use]
    pub fn is_code_event(&self) -> bool {
        !matches!(self, LogEvent::Tick { .. })
    }
}

/// A timestamped event, as seen by listeners.
#[derive(Debug, Clone, Copy)]
pub struct EventRecord<'a> {
    /// Microseconds since logging started (or the predictable clock)
    pub time_us: u64,
    pub event: LogEvent<'a>,
}

/// Capability shared by every encoder.
///
/// `handle` runs synchronously on the producer's thread (or on the profiler
/// consumer thread for ticks). It must not block for long and must never
/// panic or report failure to the caller: unavailable destinations degrade
/// to dropped writes.
///
/// The registry's listener list is read-locked for the duration of the
/// call, so `handle` must not add or remove listeners on, shut down, or
/// dispatch through the registry that invoked it. Doing so can deadlock
/// once a writer is waiting.
pub trait LogEventListener: Send + Sync {
    fn handle(&self, record: &EventRecord<'_>);

    /// Whether this listener wants code events. Producers skip building
    /// names entirely when no registered listener does.
    fn is_listening_to_code_events(&self) -> bool {
        true
    }
}
