//! JIT code event callback encoder
//!
//! Translates code events into [`JitCodeEvent`] values and passes them to a
//! caller-supplied handler on the producer's thread. Line-position tables
//! are delivered incrementally: a start call (where the handler may hand
//! back an opaque `user_data` token), one add call per table entry, and an
//! end call carrying the code start address and the same token.

use std::sync::{Mutex, PoisonError};

use super::code_event_logger::{CodeEventLogger, CodeEventRecorder};
use crate::domain::{Address, CodeObject, SharedInfo, SourcePositionEntry, WasmCode};

/// Registered form of the JIT encoder.
pub type JitListener = CodeEventLogger<JitLogger>;

/// Handler invoked for every JIT code event.
pub type JitCodeEventHandler = Box<dyn Fn(&mut JitCodeEvent<'_>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitCodeEventType {
    CodeAdded,
    CodeMoved,
    CodeAddLinePosInfo,
    CodeStartLineInfoRecording,
    CodeEndLineInfoRecording,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitCodeType {
    JitCode,
    ByteCode,
    WasmCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionType {
    Position,
    StatementPosition,
}

/// One source position annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInfo {
    /// Offset into the code
    pub offset: i32,
    /// Offset into the script
    pub pos: i32,
    pub position_type: PositionType,
}

#[derive(Debug, Clone)]
pub struct JitCodeEvent<'a> {
    pub event_type: JitCodeEventType,
    pub code_type: JitCodeType,
    pub code_start: Address,
    pub code_len: u32,
    /// Destination of a move
    pub new_code_start: Address,
    /// Composed name, empty for non-creation events
    pub name: &'a [u8],
    /// Script the code belongs to, when known
    pub script_id: Option<i32>,
    /// Token handed back by the handler on the start call
    pub user_data: Option<u64>,
    pub line_info: Option<LineInfo>,
}

impl<'a> JitCodeEvent<'a> {
    fn new(event_type: JitCodeEventType, code_type: JitCodeType) -> Self {
        Self {
            event_type,
            code_type,
            code_start: Address::NULL,
            code_len: 0,
            new_code_start: Address::NULL,
            name: &[],
            script_id: None,
            user_data: None,
            line_info: None,
        }
    }
}

pub struct JitLogger {
    handler: JitCodeEventHandler,
    /// Serializes moves, which can arrive from a concurrent GC
    move_lock: Mutex<()>,
}

impl JitLogger {
    #[must_use]
    pub fn new(handler: JitCodeEventHandler) -> Self {
        Self { handler, move_lock: Mutex::new(()) }
    }

    /// Begin a line-position table; returns the handler's token.
    pub fn start_code_pos_info_event(&self, code_type: JitCodeType) -> Option<u64> {
        let mut event = JitCodeEvent::new(JitCodeEventType::CodeStartLineInfoRecording, code_type);
        (self.handler)(&mut event);
        event.user_data
    }

    pub fn add_code_line_pos_info_event(
        &self,
        user_data: Option<u64>,
        pc_offset: i32,
        position: i32,
        position_type: PositionType,
        code_type: JitCodeType,
    ) {
        let mut event = JitCodeEvent::new(JitCodeEventType::CodeAddLinePosInfo, code_type);
        event.user_data = user_data;
        event.line_info = Some(LineInfo { offset: pc_offset, pos: position, position_type });
        (self.handler)(&mut event);
    }

    pub fn end_code_pos_info_event(&self, code_start: Address, user_data: Option<u64>, code_type: JitCodeType) {
        let mut event = JitCodeEvent::new(JitCodeEventType::CodeEndLineInfoRecording, code_type);
        event.code_start = code_start;
        event.user_data = user_data;
        (self.handler)(&mut event);
    }

    /// Deliver a whole source position table. Statement positions are
    /// reported twice: as a statement position, then as a plain position.
    pub fn code_line_pos_info_record_event(
        &self,
        code_start: Address,
        positions: &[SourcePositionEntry],
        code_type: JitCodeType,
    ) {
        let user_data = self.start_code_pos_info_event(code_type);
        for entry in positions {
            if entry.is_statement {
                self.add_code_line_pos_info_event(
                    user_data,
                    entry.code_offset,
                    entry.script_offset,
                    PositionType::StatementPosition,
                    code_type,
                );
            }
            self.add_code_line_pos_info_event(
                user_data,
                entry.code_offset,
                entry.script_offset,
                PositionType::Position,
                code_type,
            );
        }
        self.end_code_pos_info_event(code_start, user_data, code_type);
    }
}

fn code_type_of(code: &CodeObject<'_>) -> JitCodeType {
    if code.kind.is_bytecode() {
        JitCodeType::ByteCode
    } else {
        JitCodeType::JitCode
    }
}

impl CodeEventRecorder for JitLogger {
    fn log_recorded_buffer(&self, code: &CodeObject<'_>, shared: Option<&SharedInfo<'_>>, name: &[u8]) {
        let mut event = JitCodeEvent::new(JitCodeEventType::CodeAdded, code_type_of(code));
        event.code_start = code.start;
        event.code_len = code.size;
        event.name = name;
        event.script_id = shared.and_then(|shared| shared.script).map(|script| script.id);
        (self.handler)(&mut event);
    }

    fn log_recorded_wasm_buffer(&self, code: &WasmCode<'_>, name: &[u8]) {
        let mut event = JitCodeEvent::new(JitCodeEventType::CodeAdded, JitCodeType::WasmCode);
        event.code_start = code.start;
        event.code_len = code.size;
        event.name = name;
        (self.handler)(&mut event);
    }

    fn code_move_event(&self, from: Address, to: &CodeObject<'_>) {
        let _guard = self.move_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut event = JitCodeEvent::new(JitCodeEventType::CodeMoved, code_type_of(to));
        event.code_start = from;
        event.code_len = to.size;
        event.new_code_start = to.start;
        (self.handler)(&mut event);
    }
}
