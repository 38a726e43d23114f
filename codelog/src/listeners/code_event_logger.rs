//! Shared base of the name-based encoders
//!
//! The low-level, perf-map and JIT encoders all want the same thing: one
//! human-readable name per code object. [`CodeEventLogger`] composes it into
//! its own [`NameBuffer`] and hands the bytes to a format-specific
//! [`CodeEventRecorder`].
//!
//! Name shapes:
//!
//! ```text
//! Builtin:Abort                     comment
//! Handler:foo                       name (symbols: symbol("desc" hash 2a))
//! Script:~ app.js                   script: marker, space, script name
//! JS:*compute app.js:12:3           function: marker, debug name, position
//! JS:add-3-liftoff                  wasm: name, index, tier
//! RegExp:a+b                        regexp source
//! ```

use std::sync::{Mutex, PoisonError};

use super::name_buffer::NameBuffer;
use crate::domain::{compute_marker, Address, CodeObject, CodeTag, Name, SharedInfo, WasmCode};
use crate::events::{CodeOrigin, EventRecord, LogEvent, LogEventListener};

/// Format-specific half of a name-based encoder.
///
/// Only creations are mandatory; relocation and GC notifications are
/// ignored unless the format cares about them.
pub trait CodeEventRecorder: Send + Sync {
    fn log_recorded_buffer(&self, code: &CodeObject<'_>, shared: Option<&SharedInfo<'_>>, name: &[u8]);

    fn log_recorded_wasm_buffer(&self, code: &WasmCode<'_>, name: &[u8]);

    fn code_move_event(&self, _from: Address, _to: &CodeObject<'_>) {}

    fn code_moving_gc_event(&self) {}

    fn is_listening_to_code_events(&self) -> bool {
        true
    }
}

/// Listener composing names for a [`CodeEventRecorder`].
pub struct CodeEventLogger<R> {
    recorder: R,
    name_buffer: Mutex<Box<NameBuffer>>,
}

impl<R: CodeEventRecorder> CodeEventLogger<R> {
    pub fn new(recorder: R) -> Self {
        Self { recorder, name_buffer: Mutex::new(Box::new(NameBuffer::new())) }
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    fn with_name_buffer(&self, f: impl FnOnce(&mut NameBuffer)) {
        let mut buffer = self.name_buffer.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut buffer);
    }
}

impl<R: CodeEventRecorder> LogEventListener for CodeEventLogger<R> {
    fn handle(&self, record: &EventRecord<'_>) {
        match &record.event {
            LogEvent::CodeCreate { tag, code, origin } => self.with_name_buffer(|buffer| {
                compose_code_name(buffer, *tag, code, origin);
                self.recorder.log_recorded_buffer(code, origin.shared(), buffer.as_bytes());
            }),
            LogEvent::WasmCodeCreate { tag, code, name, .. } => self.with_name_buffer(|buffer| {
                compose_wasm_name(buffer, *tag, code, name);
                self.recorder.log_recorded_wasm_buffer(code, buffer.as_bytes());
            }),
            LogEvent::RegExpCodeCreate { code, source } => self.with_name_buffer(|buffer| {
                buffer.init(CodeTag::RegExp);
                buffer.append_str(source);
                self.recorder.log_recorded_buffer(code, None, buffer.as_bytes());
            }),
            LogEvent::CodeMove { from, to } => self.recorder.code_move_event(*from, to),
            LogEvent::CodeMovingGc => self.recorder.code_moving_gc_event(),
            LogEvent::Callback { .. }
            | LogEvent::SharedFunctionInfoMove { .. }
            | LogEvent::CodeDisableOpt { .. }
            | LogEvent::CodeDeopt { .. }
            | LogEvent::SnapshotCodeName { .. }
            | LogEvent::Tick { .. } => {}
        }
    }

    fn is_listening_to_code_events(&self) -> bool {
        self.recorder.is_listening_to_code_events()
    }
}

/// Compose the name of a code creation into `buffer`.
pub fn compose_code_name(
    buffer: &mut NameBuffer,
    tag: CodeTag,
    code: &CodeObject<'_>,
    origin: &CodeOrigin<'_>,
) {
    buffer.init(tag);
    match origin {
        CodeOrigin::Comment(comment) => {
            buffer.append_str(comment);
        }
        CodeOrigin::Name(name) => {
            buffer.append_name(name);
        }
        CodeOrigin::Script { shared, script_name } => {
            buffer.append_str(compute_marker(shared, code));
            buffer.append_byte(b' ');
            buffer.append_name(script_name);
        }
        CodeOrigin::Function { shared, script_name, line, column } => {
            buffer.append_str(compute_marker(shared, code));
            buffer.append_str(shared.debug_name);
            buffer.append_byte(b' ');
            match script_name {
                Name::String(s) => {
                    buffer.append_str(s);
                }
                // Only the hash: descriptions of script-name symbols are
                // never meaningful here.
                Name::Symbol { hash, .. } => {
                    buffer.append_str("symbol(hash ");
                    buffer.append_hex(*hash);
                    buffer.append_byte(b')');
                }
            }
            buffer.append_byte(b':');
            buffer.append_int(i64::from(*line));
            buffer.append_byte(b':');
            buffer.append_int(i64::from(*column));
        }
    }
}

/// Compose `<tag>:<name>-<index>-<tier>` for WebAssembly code.
pub fn compose_wasm_name(buffer: &mut NameBuffer, tag: CodeTag, code: &WasmCode<'_>, name: &str) {
    buffer.init(tag);
    buffer.append_str(name);
    buffer.append_byte(b'-');
    match code.index {
        Some(index) => buffer.append_int(i64::from(index)),
        None => buffer.append_str("<anonymous>"),
    };
    buffer.append_byte(b'-');
    buffer.append_str(code.tier);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CodeKind, ScriptInfo};
    use crate::events::{LogClock, Logger};
    use std::sync::Arc;

    fn composed(tag: CodeTag, code: &CodeObject<'_>, origin: &CodeOrigin<'_>) -> String {
        let mut buffer = NameBuffer::new();
        compose_code_name(&mut buffer, tag, code, origin);
        String::from_utf8(buffer.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_comment_and_name_shapes() {
        let code = CodeObject::new(Address(0x10), 8, CodeKind::Builtin);
        assert_eq!(composed(CodeTag::Builtin, &code, &CodeOrigin::Comment("Abort")), "Builtin:Abort");
        let symbol = Name::Symbol { description: Some("key"), hash: 0x2a };
        assert_eq!(
            composed(CodeTag::Handler, &code, &CodeOrigin::Name(symbol)),
            "Handler:symbol(\"key\" hash 2a)"
        );
    }

    #[test]
    fn test_script_shape() {
        let code = CodeObject::new(Address(0x10), 8, CodeKind::InterpretedFunction);
        let shared = SharedInfo::new(Address(0x20), "");
        let origin = CodeOrigin::Script { shared, script_name: Name::from("app.js") };
        assert_eq!(composed(CodeTag::Script, &code, &origin), "Script:~ app.js");
    }

    #[test]
    fn test_function_shape() {
        let code = CodeObject::new(Address(0x10), 8, CodeKind::Turbofan);
        let shared = SharedInfo::new(Address(0x20), "compute")
            .with_script(ScriptInfo { id: 3, name: Some("app.js"), ..ScriptInfo::default() });
        let origin = CodeOrigin::Function {
            shared,
            script_name: Name::from("app.js"),
            line: 12,
            column: 3,
        };
        assert_eq!(composed(CodeTag::Function, &code, &origin), "JS:*compute app.js:12:3");

        let symbolic = CodeOrigin::Function {
            shared,
            script_name: Name::Symbol { description: Some("ignored"), hash: 0xff },
            line: 1,
            column: 1,
        };
        assert_eq!(composed(CodeTag::Function, &code, &symbolic), "JS:*compute symbol(hash ff):1:1");
    }

    #[test]
    fn test_wasm_shape() {
        let mut code = WasmCode {
            start: Address(0x100),
            size: 16,
            index: Some(3),
            tier: "liftoff",
            is_liftoff: true,
            module_id: 0x7000,
            instructions: &[],
        };
        let mut buffer = NameBuffer::new();
        compose_wasm_name(&mut buffer, CodeTag::Function, &code, "add");
        assert_eq!(buffer.as_bytes(), b"JS:add-3-liftoff");

        code.index = None;
        code.tier = "turbofan";
        compose_wasm_name(&mut buffer, CodeTag::Function, &code, "wrapper");
        assert_eq!(buffer.as_bytes(), b"JS:wrapper-<anonymous>-turbofan");
    }

    #[derive(Default)]
    struct Names {
        seen: Mutex<Vec<(u64, String, bool)>>,
        moves: Mutex<Vec<(u64, u64)>>,
    }

    impl CodeEventRecorder for Names {
        fn log_recorded_buffer(&self, code: &CodeObject<'_>, shared: Option<&SharedInfo<'_>>, name: &[u8]) {
            let name = String::from_utf8(name.to_vec()).unwrap();
            self.seen.lock().unwrap().push((code.start.0, name, shared.is_some()));
        }

        fn log_recorded_wasm_buffer(&self, code: &WasmCode<'_>, name: &[u8]) {
            let name = String::from_utf8(name.to_vec()).unwrap();
            self.seen.lock().unwrap().push((code.start.0, name, false));
        }

        fn code_move_event(&self, from: Address, to: &CodeObject<'_>) {
            self.moves.lock().unwrap().push((from.0, to.start.0));
        }
    }

    #[test]
    fn test_dispatch_through_registry() {
        let logger = Logger::new(Arc::new(LogClock::new(true)));
        let names = Arc::new(CodeEventLogger::new(Names::default()));
        assert!(logger.add_listener(names.clone()));

        let code = CodeObject::new(Address(0x1000), 32, CodeKind::RegExp);
        logger.regexp_code_create_event(code, "a+b");
        let shared = SharedInfo::new(Address(0x20), "f");
        logger.code_create_script_event(
            CodeTag::Script,
            CodeObject::new(Address(0x2000), 8, CodeKind::Baseline),
            shared,
            Name::from("x.js"),
        );
        logger.code_move_event(Address(0x1000), CodeObject::new(Address(0x3000), 32, CodeKind::RegExp));
        logger.code_disable_opt_event(code, shared);

        let seen = names.recorder().seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (0x1000, "RegExp:a+b".to_string(), false),
                (0x2000, "Script:^ x.js".to_string(), true),
            ]
        );
        assert_eq!(*names.recorder().moves.lock().unwrap(), vec![(0x1000, 0x3000)]);
    }
}
