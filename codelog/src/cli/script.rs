//! JSON-lines event scripts
//!
//! Each non-empty line not starting with `#` is one event, tagged by its
//! `event` field:
//!
//! ```text
//! {"event":"code-create","tag":"Builtin","kind":"Builtin","address":4096,"size":64,"comment":"Abort"}
//! {"event":"code-create","tag":"Function","kind":"Turbofan","address":8192,"size":32,
//!  "function":{"shared":80,"debug_name":"add","script_id":1,"script_name":"a.js","line":3,"column":1}}
//! {"event":"code-move","from":8192,"to":12288,"size":32,"kind":"Turbofan"}
//! {"event":"tick","pc":12300,"state":"Js","frames":[4100]}
//! ```

use serde::Deserialize;

use crate::domain::{
    Address, CodeKind, CodeObject, CodeTag, DeoptInfo, Name, ScriptInfo, SharedInfo,
};
use crate::events::{CodeOrigin, Logger};
use crate::profiling::{TickSample, VmState};

/// Function and script a code object belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptFunction {
    pub shared: u64,
    pub debug_name: String,
    pub script_id: i32,
    pub script_name: String,
    #[serde(default)]
    pub source: Option<String>,
    /// Absent for top-level script code
    #[serde(default)]
    pub line: Option<i32>,
    #[serde(default)]
    pub column: Option<i32>,
    #[serde(default)]
    pub native: bool,
}

impl ScriptFunction {
    fn shared_info(&self) -> SharedInfo<'_> {
        SharedInfo::new(Address(self.shared), &self.debug_name).with_script(ScriptInfo {
            id: self.script_id,
            name: Some(&self.script_name),
            source: self.source.as_deref(),
            is_native: self.native,
            ..ScriptInfo::default()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accessor {
    Get,
    Set,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ScriptEvent {
    CodeCreate {
        tag: CodeTag,
        kind: CodeKind,
        address: u64,
        size: u32,
        #[serde(default)]
        comment: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        function: Option<ScriptFunction>,
        #[serde(default)]
        instructions: Vec<u8>,
    },
    Regexp {
        address: u64,
        size: u32,
        source: String,
    },
    Callback {
        name: String,
        entry: u64,
        #[serde(default)]
        accessor: Option<Accessor>,
    },
    CodeMove {
        from: u64,
        to: u64,
        size: u32,
        kind: CodeKind,
    },
    SfiMove {
        from: u64,
        to: u64,
    },
    DisableOpt {
        address: u64,
        size: u32,
        kind: CodeKind,
        function: ScriptFunction,
        reason: String,
    },
    Deopt {
        address: u64,
        size: u32,
        kind: CodeKind,
        deopt_kind: String,
        reason: String,
    },
    MovingGc,
    SnapshotName {
        address: u64,
        position: i32,
        name: String,
    },
    Tick {
        pc: u64,
        #[serde(default)]
        state: VmState,
        #[serde(default)]
        frames: Vec<u64>,
    },
}

impl ScriptEvent {
    /// Parse one script line; blank lines and `#` comments yield `None`.
    ///
    /// # Errors
    /// Returns the JSON error for a malformed event.
    pub fn parse_line(line: &str) -> serde_json::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        serde_json::from_str(line).map(Some)
    }

    /// Address of the code this event leaves running, for the synthetic
    /// sampler.
    #[must_use]
    pub fn code_address(&self) -> Option<u64> {
        match self {
            ScriptEvent::CodeCreate { address, .. } | ScriptEvent::Regexp { address, .. } => Some(*address),
            ScriptEvent::CodeMove { to, .. } => Some(*to),
            _ => None,
        }
    }

    /// Issue the event through the registry.
    pub fn replay(&self, logger: &Logger) {
        match self {
            ScriptEvent::CodeCreate { tag, kind, address, size, comment, name, function, instructions } => {
                let code = CodeObject::new(Address(*address), *size, *kind).with_instructions(instructions);
                let origin = match (function, name) {
                    (Some(function), _) => {
                        let shared = function.shared_info();
                        let script_name = Name::String(&function.script_name);
                        match function.line {
                            Some(line) => CodeOrigin::Function {
                                shared,
                                script_name,
                                line,
                                column: function.column.unwrap_or(0),
                            },
                            None => CodeOrigin::Script { shared, script_name },
                        }
                    }
                    (None, Some(name)) => CodeOrigin::Name(Name::String(name)),
                    (None, None) => CodeOrigin::Comment(comment.as_deref().unwrap_or("")),
                };
                let is_native = function.as_ref().is_some_and(|f| f.native);
                logger.code_create_event(tag.to_native_by_script(is_native), code, origin);
            }
            ScriptEvent::Regexp { address, size, source } => {
                logger.regexp_code_create_event(CodeObject::new(Address(*address), *size, CodeKind::RegExp), source);
            }
            ScriptEvent::Callback { name, entry, accessor } => {
                let name = Name::String(name);
                let entry = Address(*entry);
                match accessor {
                    None => logger.callback_event(name, entry),
                    Some(Accessor::Get) => logger.getter_callback_event(name, entry),
                    Some(Accessor::Set) => logger.setter_callback_event(name, entry),
                }
            }
            ScriptEvent::CodeMove { from, to, size, kind } => {
                logger.code_move_event(Address(*from), CodeObject::new(Address(*to), *size, *kind));
            }
            ScriptEvent::SfiMove { from, to } => {
                logger.shared_function_info_move_event(Address(*from), Address(*to));
            }
            ScriptEvent::DisableOpt { address, size, kind, function, reason } => {
                let shared = function.shared_info().with_disabled_optimization(reason);
                logger.code_disable_opt_event(CodeObject::new(Address(*address), *size, *kind), shared);
            }
            ScriptEvent::Deopt { address, size, kind, deopt_kind, reason } => {
                let info = DeoptInfo { kind: deopt_kind, reason, position: None };
                logger.code_deopt_event(CodeObject::new(Address(*address), *size, *kind), info);
            }
            ScriptEvent::MovingGc => logger.code_moving_gc_event(),
            ScriptEvent::SnapshotName { address, position, name } => {
                logger.snapshot_code_name_event(Address(*address), *position, name);
            }
            ScriptEvent::Tick { pc, state, frames } => {
                let mut sample = TickSample::new();
                sample.pc = Address(*pc);
                sample.state = *state;
                for frame in frames {
                    if !sample.push_frame(Address(*frame)) {
                        break;
                    }
                }
                logger.tick_event(&sample, false);
            }
        }
    }
}
