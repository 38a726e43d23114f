//! Text log encoder
//!
//! One comma-separated line per event in the shared [`LogFile`]:
//!
//! ```text
//! code-creation,<tag>,<kind>,<time>,<address>,<size>,<name fields...>
//! code-source-info,<address>,<script>,<start>,<end>,<positions>,<inlining>,<fns>
//! code-move,<from>,<to>
//! code-deopt,<time>,<size>,<address>,<inlining id>,<offset>,<kind>,<location>,<reason>
//! tick,<pc>,<time>,<is external>,<tos or callback>,<state>[,overflow],<frames...>
//! ```
//!
//! Every entry point checks the logging flag (through
//! [`LogFile::new_message_builder`]) on every call. Name, comment and
//! source fields of code records are capped like a [`NameBuffer`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::LogConfig;
use crate::domain::{
    compute_marker, Address, CallbackKind, CodeKind, CodeObject, CodeTag, DeoptInfo, Name,
    ScriptInfo, SharedInfo, WasmCode,
};
use crate::events::{CodeOrigin, EventRecord, LogClock, LogEvent, LogEventListener};
use super::name_buffer::NameBuffer;
use crate::log_file::{LogFile, MessageBuilder};
use crate::profiling::TickSample;

/// Kind field of callback `code-creation` records.
const CALLBACK_KIND: i32 = -2;

/// Which record families the text encoder writes.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileLoggerOptions {
    pub log_code: bool,
    pub log_deopt: bool,
    /// Ticks, shared-library records
    pub prof: bool,
    /// Timer and other internal events
    pub log_internal: bool,
}

impl From<&LogConfig> for FileLoggerOptions {
    fn from(config: &LogConfig) -> Self {
        Self {
            log_code: config.log_code,
            log_deopt: config.log_deopt,
            prof: config.prof,
            log_internal: config.log,
        }
    }
}

/// Start, end or single-point timer records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEventStatus {
    Start,
    End,
    Stamp,
}

pub struct FileLogger {
    log: Arc<LogFile>,
    clock: Arc<LogClock>,
    options: FileLoggerOptions,
    /// Scripts whose source has been written already
    logged_scripts: Mutex<HashSet<i32>>,
}

impl FileLogger {
    #[must_use]
    pub fn new(log: Arc<LogFile>, clock: Arc<LogClock>, options: FileLoggerOptions) -> Self {
        Self { log, clock, options, logged_scripts: Mutex::new(HashSet::new()) }
    }

    #[must_use]
    pub fn log_file(&self) -> &Arc<LogFile> {
        &self.log
    }

    #[must_use]
    pub fn options(&self) -> FileLoggerOptions {
        self.options
    }

    // ------------------------------------------------------------------
    // Code records
    // ------------------------------------------------------------------

    fn code_create_event(&self, time_us: u64, tag: CodeTag, code: &CodeObject<'_>, origin: &CodeOrigin<'_>) {
        if !self.options.log_code {
            return;
        }
        {
            let Some(mut msg) = self.log.new_message_builder() else { return };
            append_code_create_header(&mut msg, tag, code.kind, code.start, code.size, time_us);
            match origin {
                CodeOrigin::Comment(comment) => {
                    msg.append_bounded_str(comment);
                }
                CodeOrigin::Name(name) => {
                    msg.append_bounded_bytes(compose_name(|buffer| buffer.append_name(name)).as_bytes());
                }
                CodeOrigin::Script { shared, script_name } => {
                    msg.append_bounded_bytes(compose_name(|buffer| buffer.append_name(script_name)).as_bytes())
                        .separator()
                        .append_address(shared.address)
                        .separator()
                        .append_raw(compute_marker(shared, code));
                }
                CodeOrigin::Function { shared, script_name, line, column } => {
                    let name = compose_name(|buffer| {
                        buffer.append_str(shared.debug_name)
                            + buffer.append_byte(b' ')
                            + buffer.append_name(script_name)
                            + buffer.append_byte(b':')
                            + buffer.append_int(i64::from(*line))
                            + buffer.append_byte(b':')
                            + buffer.append_int(i64::from(*column))
                    });
                    msg.append_bounded_bytes(name.as_bytes())
                        .separator()
                        .append_address(shared.address)
                        .separator()
                        .append_raw(compute_marker(shared, code));
                }
            }
            msg.write_to_log_file();
        }
        if let Some(shared) = origin.shared() {
            self.log_source_code_information(code, shared);
        }
    }

    fn wasm_code_create_event(&self, time_us: u64, tag: CodeTag, code: &WasmCode<'_>, name: &str) {
        if !self.options.log_code {
            return;
        }
        let Some(mut msg) = self.log.new_message_builder() else { return };
        append_code_create_header(&mut msg, tag, CodeKind::WasmFunction, code.start, code.size, time_us);
        // Module identity plus function index groups recompilations of the
        // same function.
        let group = Address(code.module_id.wrapping_add(u64::from(code.index.unwrap_or(0))));
        msg.append_bounded_str(name)
            .separator()
            .append_address(group)
            .separator()
            .append_raw(code.marker());
        msg.write_to_log_file();
    }

    fn regexp_code_create_event(&self, time_us: u64, code: &CodeObject<'_>, source: &str) {
        if !self.options.log_code {
            return;
        }
        let Some(mut msg) = self.log.new_message_builder() else { return };
        append_code_create_header(&mut msg, CodeTag::RegExp, code.kind, code.start, code.size, time_us);
        msg.append_bounded_str(source);
        msg.write_to_log_file();
    }

    fn callback_event(&self, time_us: u64, kind: CallbackKind, name: &Name<'_>, entry_point: Address) {
        if !self.options.log_code {
            return;
        }
        let Some(mut msg) = self.log.new_message_builder() else { return };
        msg.append_raw("code-creation")
            .separator()
            .append_raw(CodeTag::Callback.log_name())
            .separator()
            .append_value(CALLBACK_KIND)
            .separator()
            .append_value(time_us)
            .separator()
            .append_address(entry_point)
            .separator()
            .append_value(1)
            .separator()
            .append_bounded_bytes(
                compose_name(|buffer| buffer.append_str(kind.prefix()) + buffer.append_name(name)).as_bytes(),
            );
        msg.write_to_log_file();
    }

    fn move_event(&self, event: &str, from: Address, to: Address) {
        if !self.options.log_code {
            return;
        }
        let Some(mut msg) = self.log.new_message_builder() else { return };
        msg.append_raw(event).separator().append_address(from).separator().append_address(to);
        msg.write_to_log_file();
    }

    fn code_disable_opt_event(&self, shared: &SharedInfo<'_>) {
        if !self.options.log_code {
            return;
        }
        let Some(mut msg) = self.log.new_message_builder() else { return };
        msg.append_raw("code-disable-optimization")
            .separator()
            .append_bounded_str(shared.debug_name)
            .separator()
            .append_str(shared.disabled_reason);
        msg.write_to_log_file();
    }

    fn code_deopt_event(&self, time_us: u64, code: &CodeObject<'_>, info: &DeoptInfo<'_>) {
        if !self.options.log_deopt {
            return;
        }
        let Some(mut msg) = self.log.new_message_builder() else { return };
        let (inlining_id, script_offset, location) = match &info.position {
            Some(position) => (position.inlining_id, position.script_offset, position.location),
            None => (-1, -1, "<unknown>"),
        };
        msg.append_raw("code-deopt")
            .separator()
            .append_value(time_us)
            .separator()
            .append_value(code.size)
            .separator()
            .append_address(code.start)
            .separator()
            .append_value(inlining_id)
            .separator()
            .append_value(script_offset)
            .separator()
            .append_str(info.kind)
            .separator()
            .append_str(location)
            .separator()
            .append_str(info.reason);
        msg.write_to_log_file();
    }

    fn snapshot_code_name_event(&self, position: i32, name: &str) {
        if !self.options.log_code {
            return;
        }
        let Some(mut msg) = self.log.new_message_builder() else { return };
        msg.append_raw("snapshot-code-name").separator().append_value(position).separator().append_bounded_str(name);
        msg.write_to_log_file();
    }

    fn tick_event(&self, time_us: u64, sample: &TickSample, overflow: bool) {
        if !self.options.prof {
            return;
        }
        let Some(mut msg) = self.log.new_message_builder() else { return };
        msg.append_raw("tick").separator().append_address(sample.pc).separator().append_value(time_us);
        if sample.has_external_callback {
            msg.separator().append_value(1).separator().append_address(sample.external_callback_entry);
        } else {
            msg.separator().append_value(0).separator().append_address(sample.tos);
        }
        msg.separator().append_value(sample.state.as_i32());
        if overflow {
            msg.separator().append_raw("overflow");
        }
        for frame in sample.frames() {
            msg.separator().append_address(*frame);
        }
        msg.write_to_log_file();
    }

    // ------------------------------------------------------------------
    // Source position side records
    // ------------------------------------------------------------------

    /// `code-source-info` for code with a script, preceded by the script's
    /// details and source the first time the script shows up.
    fn log_source_code_information(&self, code: &CodeObject<'_>, shared: &SharedInfo<'_>) {
        let Some(script) = shared.script else { return };
        self.ensure_log_script_source(&script);

        let Some(mut msg) = self.log.new_message_builder() else { return };
        msg.append_raw("code-source-info")
            .separator()
            .append_address(code.start)
            .separator()
            .append_value(script.id)
            .separator()
            .append_value(shared.start_position)
            .separator()
            .append_value(shared.end_position)
            .separator();

        let mut has_inlined = false;
        // Baseline code shares the bytecode's table; its offsets do not
        // describe machine code.
        if code.kind != CodeKind::Baseline {
            for entry in code.source_positions {
                msg.append_raw("C")
                    .append_value(entry.code_offset)
                    .append_raw("O")
                    .append_value(entry.script_offset);
                if let Some(inlining_id) = entry.inlining_id {
                    msg.append_raw("I").append_value(inlining_id);
                    has_inlined = true;
                }
            }
        }
        msg.separator();

        let mut max_function_id: Option<usize> = None;
        if has_inlined {
            for inlined in code.inlining_positions {
                msg.append_raw("F");
                if let Some(function_id) = inlined.function_id {
                    msg.append_value(function_id);
                    if let Ok(id) = usize::try_from(function_id) {
                        max_function_id = max_function_id.max(Some(id));
                    }
                }
                msg.append_raw("O").append_value(inlined.script_offset);
                if let Some(inlining_id) = inlined.inlining_id {
                    msg.append_raw("I").append_value(inlining_id);
                }
            }
        }
        msg.separator();

        if let Some(max) = max_function_id {
            for function in shared.inlined_functions.iter().take(max + 1) {
                msg.append_raw("S").append_address(*function);
            }
        }
        msg.write_to_log_file();
    }

    /// Write `script-details` and `script-source` once per script id.
    ///
    /// Returns false if the script has no source to write.
    fn ensure_log_script_source(&self, script: &ScriptInfo<'_>) -> bool {
        {
            let mut logged = self.logged_scripts.lock().unwrap_or_else(PoisonError::into_inner);
            if !logged.insert(script.id) {
                return true;
            }
        }
        let Some(source) = script.source else { return false };
        let name = script.name.unwrap_or("<unknown>");

        if let Some(mut msg) = self.log.new_message_builder() {
            msg.append_raw("script-details")
                .separator()
                .append_value(script.id)
                .separator()
                .append_str(script.name.unwrap_or(""))
                .separator()
                .append_value(script.line_offset)
                .separator()
                .append_value(script.column_offset)
                .separator()
                .append_str(script.source_mapping_url.unwrap_or(""));
            msg.write_to_log_file();
        }

        let Some(mut msg) = self.log.new_message_builder() else { return false };
        msg.append_raw("script-source")
            .separator()
            .append_value(script.id)
            .separator()
            .append_str(name)
            .separator()
            .append_str(source);
        msg.write_to_log_file();
        true
    }

    // ------------------------------------------------------------------
    // Direct records (not routed through the registry)
    // ------------------------------------------------------------------

    pub fn profiler_begin_event(&self, interval_us: u64) {
        let Some(mut msg) = self.log.new_message_builder() else { return };
        msg.append_raw("profiler").separator().append_raw("begin").separator().append_value(interval_us);
        msg.write_to_log_file();
    }

    pub fn profiler_end_event(&self) {
        self.unchecked_string_event("profiler", "end");
    }

    pub fn shared_library_event(&self, path: &str, start: Address, end: Address, aslr_slide: i64) {
        if !self.options.prof {
            return;
        }
        let Some(mut msg) = self.log.new_message_builder() else { return };
        msg.append_raw("shared-library")
            .separator()
            .append_str(path)
            .separator()
            .append_address(start)
            .separator()
            .append_address(end)
            .separator()
            .append_value(aslr_slide);
        msg.write_to_log_file();
    }

    pub fn shared_library_end(&self) {
        if !self.options.prof {
            return;
        }
        let Some(mut msg) = self.log.new_message_builder() else { return };
        msg.append_raw("shared-library-end");
        msg.write_to_log_file();
    }

    pub fn current_time_event(&self) {
        let Some(mut msg) = self.log.new_message_builder() else { return };
        msg.append_raw("current-time").separator().append_value(self.clock.now_us());
        msg.write_to_log_file();
    }

    pub fn timer_event(&self, status: TimerEventStatus, name: &str) {
        let Some(mut msg) = self.log.new_message_builder() else { return };
        msg.append_raw(match status {
            TimerEventStatus::Start => "timer-event-start",
            TimerEventStatus::End => "timer-event-end",
            TimerEventStatus::Stamp => "timer-event",
        })
        .separator()
        .append_str(name)
        .separator()
        .append_value(self.clock.now_us());
        msg.write_to_log_file();
    }

    pub fn string_event(&self, name: &str, value: &str) {
        if self.options.log_internal {
            self.unchecked_string_event(name, value);
        }
    }

    fn unchecked_string_event(&self, name: &str, value: &str) {
        let Some(mut msg) = self.log.new_message_builder() else { return };
        msg.append_str(name).separator().append_str(value);
        msg.write_to_log_file();
    }

    pub fn int_event(&self, name: &str, value: i64) {
        if !self.options.log_internal {
            return;
        }
        let Some(mut msg) = self.log.new_message_builder() else { return };
        msg.append_str(name).separator().append_value(value);
        msg.write_to_log_file();
    }

    /// Allocation of a runtime-internal object.
    pub fn new_event(&self, name: &str, object: Address, size: u32) {
        if !self.options.log_internal {
            return;
        }
        let Some(mut msg) = self.log.new_message_builder() else { return };
        msg.append_raw("new")
            .separator()
            .append_str(name)
            .separator()
            .append_address(object)
            .separator()
            .append_value(size);
        msg.write_to_log_file();
    }

    pub fn delete_event(&self, name: &str, object: Address) {
        if !self.options.log_internal {
            return;
        }
        let Some(mut msg) = self.log.new_message_builder() else { return };
        msg.append_raw("delete").separator().append_str(name).separator().append_address(object);
        msg.write_to_log_file();
    }
}

/// Render a name field into a fresh [`NameBuffer`], truncating at its
/// capacity.
fn compose_name(compose: impl FnOnce(&mut NameBuffer) -> usize) -> NameBuffer {
    let mut buffer = NameBuffer::new();
    compose(&mut buffer);
    buffer
}

fn append_code_create_header(
    msg: &mut MessageBuilder<'_>,
    tag: CodeTag,
    kind: CodeKind,
    address: Address,
    size: u32,
    time_us: u64,
) {
    msg.append_raw("code-creation")
        .separator()
        .append_raw(tag.log_name())
        .separator()
        .append_value(kind.as_i32())
        .separator()
        .append_value(time_us)
        .separator()
        .append_address(address)
        .separator()
        .append_value(size)
        .separator();
}

impl LogEventListener for FileLogger {
    fn handle(&self, record: &EventRecord<'_>) {
        let time_us = record.time_us;
        match &record.event {
            LogEvent::CodeCreate { tag, code, origin } => {
                self.code_create_event(time_us, *tag, code, origin);
            }
            LogEvent::WasmCodeCreate { tag, code, name, .. } => {
                self.wasm_code_create_event(time_us, *tag, code, name);
            }
            LogEvent::RegExpCodeCreate { code, source } => {
                self.regexp_code_create_event(time_us, code, source);
            }
            LogEvent::Callback { kind, name, entry_point } => {
                self.callback_event(time_us, *kind, name, *entry_point);
            }
            LogEvent::CodeMove { from, to } => self.move_event("code-move", *from, to.start),
            LogEvent::SharedFunctionInfoMove { from, to } => self.move_event("sfi-move", *from, *to),
            LogEvent::CodeDisableOpt { shared, .. } => self.code_disable_opt_event(shared),
            LogEvent::CodeDeopt { code, info } => self.code_deopt_event(time_us, code, info),
            // Only meaningful to the low-level log.
            LogEvent::CodeMovingGc => {}
            LogEvent::SnapshotCodeName { position, name, .. } => {
                self.snapshot_code_name_event(*position, name);
            }
            LogEvent::Tick { sample, overflow } => self.tick_event(time_us, sample, *overflow),
        }
    }

    fn is_listening_to_code_events(&self) -> bool {
        self.options.log_code || self.options.log_deopt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeoptPosition, InliningPosition, SourcePositionEntry};
    use crate::listeners::name_buffer::NAME_BUFFER_CAPACITY;
    use crate::events::Logger;
    use crate::profiling::VmState;
    use crate::test_support::{memory_log, MemorySink};

    fn all_options() -> FileLoggerOptions {
        FileLoggerOptions { log_code: true, log_deopt: true, prof: true, log_internal: true }
    }

    fn setup(options: FileLoggerOptions) -> (Logger, Arc<FileLogger>, MemorySink) {
        let clock = Arc::new(LogClock::new(true));
        let (log, sink) = memory_log();
        let file_logger = Arc::new(FileLogger::new(log, clock.clone(), options));
        let logger = Logger::new(clock);
        assert!(logger.add_listener(file_logger.clone()));
        (logger, file_logger, sink)
    }

    #[test]
    fn test_builtin_creation() {
        let (logger, _file, sink) = setup(all_options());
        let code = CodeObject::new(Address(0x1000), 64, CodeKind::Builtin);
        logger.code_create_comment_event(CodeTag::Builtin, code, "Abort");
        assert_eq!(sink.lines(), vec!["code-creation,Builtin,2,1000,0x1000,64,Abort"]);
    }

    #[test]
    fn test_function_creation_with_source_info() {
        let (logger, _file, sink) = setup(all_options());
        let positions = [
            SourcePositionEntry { code_offset: 0, script_offset: 10, inlining_id: None, is_statement: true },
            SourcePositionEntry { code_offset: 8, script_offset: 42, inlining_id: Some(0), is_statement: false },
        ];
        let inlining = [InliningPosition { function_id: Some(0), script_offset: 40, inlining_id: None }];
        let inlined = [Address(0xabc)];
        let code = CodeObject::new(Address(0x2000), 128, CodeKind::Turbofan)
            .with_source_positions(&positions)
            .with_inlining_positions(&inlining);
        let script = ScriptInfo { id: 7, name: Some("app.js"), source: Some("function f(){}"), ..ScriptInfo::default() };
        let mut shared = SharedInfo::new(Address(0x30), "f").with_script(script);
        shared.start_position = 0;
        shared.end_position = 14;
        shared.inlined_functions = &inlined;

        logger.code_create_function_event(CodeTag::Function, code, shared, Name::from("app.js"), 1, 10);

        assert_eq!(
            sink.lines(),
            vec![
                "code-creation,JS,8,1000,0x2000,128,f app.js:1:10,0x30,*",
                "script-details,7,app.js,0,0,",
                "script-source,7,app.js,function f(){}",
                "code-source-info,0x2000,7,0,14,C0O10C8O42I0,F0O40,S0xabc",
            ]
        );
    }

    #[test]
    fn test_script_source_written_once() {
        let (logger, _file, sink) = setup(all_options());
        let script = ScriptInfo { id: 1, name: Some("a.js"), source: Some("1"), ..ScriptInfo::default() };
        let shared = SharedInfo::new(Address(0x40), "").with_script(script);
        for start in [0x100, 0x200] {
            let code = CodeObject::new(Address(start), 4, CodeKind::InterpretedFunction);
            logger.code_create_script_event(CodeTag::Script, code, shared, Name::from("a.js"));
        }
        let lines = sink.lines();
        assert_eq!(lines.iter().filter(|l| l.starts_with("script-source")).count(), 1);
        assert_eq!(lines.iter().filter(|l| l.starts_with("code-source-info")).count(), 2);
        assert_eq!(lines[0], "code-creation,Script,5,1000,0x100,4,a.js,0x40,~");
    }

    #[test]
    fn test_moves_callbacks_and_disable_opt() {
        let (logger, _file, sink) = setup(all_options());
        logger.code_move_event(Address(0x1000), CodeObject::new(Address(0x2000), 8, CodeKind::Builtin));
        logger.shared_function_info_move_event(Address(0x10), Address(0x20));
        logger.getter_callback_event(Name::from("length"), Address(0x5000));
        let shared = SharedInfo::new(Address(0x30), "g").with_disabled_optimization("TryCatchStatement");
        logger.code_disable_opt_event(CodeObject::new(Address(0x1), 1, CodeKind::InterpretedFunction), shared);
        logger.code_moving_gc_event();

        assert_eq!(
            sink.lines(),
            vec![
                "code-move,0x1000,0x2000",
                "sfi-move,0x10,0x20",
                "code-creation,Callback,-2,3000,0x5000,1,get length",
                "code-disable-optimization,g,TryCatchStatement",
            ]
        );
    }

    #[test]
    fn test_deopt_with_and_without_position() {
        let (logger, _file, sink) = setup(all_options());
        let code = CodeObject::new(Address(0x2000), 96, CodeKind::Turbofan);
        logger.code_deopt_event(
            code,
            DeoptInfo {
                kind: "deopt-eager",
                reason: "wrong map",
                position: Some(DeoptPosition { inlining_id: -1, script_offset: 25, location: "<app.js:2:5>" }),
            },
        );
        logger.code_deopt_event(code, DeoptInfo { kind: "dependency-change", reason: "field-owner", position: None });
        assert_eq!(
            sink.lines(),
            vec![
                "code-deopt,1000,96,0x2000,-1,25,deopt-eager,<app.js:2:5>,wrong map",
                "code-deopt,2000,96,0x2000,-1,-1,dependency-change,<unknown>,field-owner",
            ]
        );
    }

    #[test]
    fn test_tick_records() {
        let (logger, _file, sink) = setup(all_options());
        let mut sample = TickSample::new();
        sample.pc = Address(0x1234);
        sample.tos = Address(0x7ff0);
        sample.state = VmState::Js;
        sample.push_frame(Address(0x1000));
        sample.push_frame(Address(0x2000));
        logger.tick_event(&sample, false);

        sample.has_external_callback = true;
        sample.external_callback_entry = Address(0x9000);
        sample.state = VmState::External;
        logger.tick_event(&sample, true);

        assert_eq!(
            sink.lines(),
            vec![
                "tick,0x1234,1000,0,0x7ff0,0,0x1000,0x2000",
                "tick,0x1234,2000,1,0x9000,6,overflow,0x1000,0x2000",
            ]
        );
    }

    #[test]
    fn test_option_gating() {
        let options = FileLoggerOptions { log_code: false, log_deopt: true, prof: false, log_internal: false };
        let (logger, file, sink) = setup(options);
        let code = CodeObject::new(Address(0x1000), 8, CodeKind::Builtin);
        logger.code_create_comment_event(CodeTag::Builtin, code, "Abort");
        let sample = TickSample::new();
        logger.tick_event(&sample, false);
        file.shared_library_event("/lib/libc.so", Address(1), Address(2), 0);
        file.string_event("k", "v");
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_disabled_log_drops_everything() {
        let (logger, file, sink) = setup(all_options());
        file.log_file().set_logging(false);
        logger.regexp_code_create_event(CodeObject::new(Address(0x1), 1, CodeKind::RegExp), "a");
        file.profiler_begin_event(1000);
        assert!(sink.contents().is_empty());
    }

    #[test]
    fn test_direct_records() {
        let (_logger, file, sink) = setup(all_options());
        file.profiler_begin_event(500);
        file.shared_library_event("/usr/lib/libc,6.so", Address(0x7000), Address(0x8000), 0);
        file.shared_library_end();
        file.timer_event(TimerEventStatus::Start, "V8.GC");
        file.timer_event(TimerEventStatus::Stamp, "V8.Compile");
        file.int_event("heap-capacity", 4096);
        file.new_event("Isolate", Address(0xbeef), 64);
        file.delete_event("Isolate", Address(0xbeef));
        file.profiler_end_event();

        assert_eq!(
            sink.lines(),
            vec![
                "profiler,begin,500",
                "shared-library,/usr/lib/libc\\x2C6.so,0x7000,0x8000,0",
                "shared-library-end",
                "timer-event-start,V8.GC,1000",
                "timer-event,V8.Compile,2000",
                "heap-capacity,4096",
                "new,Isolate,0xbeef,64",
                "delete,Isolate,0xbeef",
                "profiler,end",
            ]
        );
    }

    #[test]
    fn test_wasm_creation() {
        let (logger, _file, sink) = setup(all_options());
        let code = WasmCode {
            start: Address(0x9000),
            size: 32,
            index: Some(2),
            tier: "turbofan",
            is_liftoff: false,
            module_id: 0x100,
            instructions: &[],
        };
        logger.wasm_code_create_event(CodeTag::Function, code, "add", None, 0, 3);
        assert_eq!(sink.lines(), vec!["code-creation,JS,4,1000,0x9000,32,add,0x102,*"]);
    }

    #[test]
    fn test_long_names_are_capped() {
        let (logger, _file, sink) = setup(all_options());
        let huge = "f".repeat(10_000);
        let code = CodeObject::new(Address(0x1000), 8, CodeKind::Maglev);
        let shared = SharedInfo::new(Address(0x30), &huge);
        logger.code_create_function_event(CodeTag::Function, code, shared, Name::from("a.js"), 1, 1);

        let commas = ",".repeat(10_000);
        let stub = CodeObject::new(Address(0x2000), 8, CodeKind::ForTesting);
        logger.code_create_comment_event(CodeTag::Stub, stub, &commas);
        logger.regexp_code_create_event(CodeObject::new(Address(0x3000), 8, CodeKind::RegExp), &huge);

        let lines = sink.lines();
        assert_eq!(lines.len(), 3);

        let function: Vec<&str> = lines[0].split(',').collect();
        assert_eq!(function.len(), 9);
        assert_eq!(function[6], "f".repeat(NAME_BUFFER_CAPACITY));
        assert_eq!(function[7], "0x30");

        let comment: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(comment.len(), 7);
        assert_eq!(comment[6], "\\x2C".repeat(NAME_BUFFER_CAPACITY / 4));

        let regexp: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(regexp[6].len(), NAME_BUFFER_CAPACITY);
    }
}
