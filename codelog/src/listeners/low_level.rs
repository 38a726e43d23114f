//! Binary low-level code log (`<logfile>.ll`)
//!
//! Layout is defined in `codelog-common`. Each record is written and flushed
//! under one lock, so a reader never sees half a record from this writer.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use codelog_common::{
    target_arch_name, CodeCreateStruct, CodeMoveStruct, CODE_CREATE_TAG, CODE_MOVE_TAG,
    CODE_MOVING_GC_TAG, LOW_LEVEL_LOG_EXTENSION,
};
use log::{debug, warn};

use super::code_event_logger::{CodeEventLogger, CodeEventRecorder};
use crate::domain::{Address, CodeObject, LogError, SharedInfo, WasmCode};

/// Registered form of the low-level encoder.
pub type LowLevelListener = CodeEventLogger<LowLevelLogger>;

pub struct LowLevelLogger {
    path: PathBuf,
    output: Mutex<Box<dyn Write + Send>>,
}

impl LowLevelLogger {
    /// Create `<log_name>.ll` and write the architecture header.
    pub fn open(log_name: &str) -> Result<Self, LogError> {
        let path = PathBuf::from(format!("{log_name}{LOW_LEVEL_LOG_EXTENSION}"));
        let file = File::create(&path)
            .map_err(|source| LogError::OpenFailed { path: path.clone(), source })?;
        let logger = Self::with_writer(path, Box::new(BufWriter::new(file)))?;
        debug!("Opened low-level log {}", logger.path.display());
        Ok(logger)
    }

    /// Wrap an arbitrary writer; the architecture header is written
    /// immediately.
    pub fn with_writer(path: PathBuf, mut output: Box<dyn Write + Send>) -> Result<Self, LogError> {
        output.write_all(target_arch_name().as_bytes())?;
        output.write_all(&[0])?;
        output.flush()?;
        Ok(Self { path, output: Mutex::new(output) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(&self, record: impl FnOnce(&mut dyn Write) -> io::Result<()>) {
        let mut output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = record(&mut **output).and_then(|()| output.flush()) {
            warn!("Dropped low-level log record in {}: {e}", self.path.display());
        }
    }

    fn write_code_create(&self, start: Address, size: u32, instructions: &[u8], name: &[u8]) {
        let code_size = i32::try_from(size).unwrap_or(i32::MAX);
        let event = CodeCreateStruct {
            name_size: i32::try_from(name.len()).unwrap_or(i32::MAX),
            code_address: start.0,
            code_size,
        };
        self.write_record(|out| {
            out.write_all(&[CODE_CREATE_TAG])?;
            out.write_all(&event.to_ne_bytes())?;
            out.write_all(name)?;
            write_code_bytes(out, instructions, usize::try_from(code_size).unwrap_or(0))
        });
    }
}

/// Write exactly `size` bytes of code: the instructions, truncated or padded
/// with zeros.
fn write_code_bytes(out: &mut dyn Write, instructions: &[u8], size: usize) -> io::Result<()> {
    let available = instructions.len().min(size);
    out.write_all(&instructions[..available])?;
    let padding = (size - available) as u64;
    if padding > 0 {
        io::copy(&mut io::repeat(0).take(padding), out)?;
    }
    Ok(())
}

impl CodeEventRecorder for LowLevelLogger {
    fn log_recorded_buffer(&self, code: &CodeObject<'_>, _shared: Option<&SharedInfo<'_>>, name: &[u8]) {
        self.write_code_create(code.start, code.size, code.instructions, name);
    }

    fn log_recorded_wasm_buffer(&self, code: &WasmCode<'_>, name: &[u8]) {
        self.write_code_create(code.start, code.size, code.instructions, name);
    }

    fn code_move_event(&self, from: Address, to: &CodeObject<'_>) {
        let event = CodeMoveStruct { from_address: from.0, to_address: to.start.0 };
        self.write_record(|out| {
            out.write_all(&[CODE_MOVE_TAG])?;
            out.write_all(&event.to_ne_bytes())
        });
    }

    fn code_moving_gc_event(&self) {
        self.write_record(|out| out.write_all(&[CODE_MOVING_GC_TAG]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CodeKind, CodeTag};
    use crate::events::{LogClock, Logger};
    use codelog_common::{CODE_CREATE_STRUCT_SIZE, CODE_MOVE_STRUCT_SIZE};
    use std::sync::Arc;

    fn header_len() -> usize {
        target_arch_name().len() + 1
    }

    #[test]
    fn test_header_is_nul_terminated_arch() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("codelog.log");
        let logger = LowLevelLogger::open(base.to_str().unwrap()).unwrap();
        assert!(logger.path().to_string_lossy().ends_with("codelog.log.ll"));
        drop(logger);

        let bytes = std::fs::read(dir.path().join("codelog.log.ll")).unwrap();
        assert_eq!(&bytes[..header_len() - 1], target_arch_name().as_bytes());
        assert_eq!(bytes[header_len() - 1], 0);
    }

    #[test]
    fn test_code_bytes_are_padded_to_declared_size() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("pad.log");
        let listener = Arc::new(LowLevelListener::new(LowLevelLogger::open(base.to_str().unwrap()).unwrap()));
        let logger = Logger::new(Arc::new(LogClock::new(true)));
        logger.add_listener(listener.clone());

        let code = CodeObject::new(Address(0x1000), 8, CodeKind::Builtin).with_instructions(&[0x90, 0xc3]);
        logger.code_create_comment_event(CodeTag::Builtin, code, "Nop");
        logger.code_moving_gc_event();

        let bytes = std::fs::read(listener.recorder().path()).unwrap();
        let record = &bytes[header_len()..];
        assert_eq!(record[0], CODE_CREATE_TAG);
        let header: [u8; CODE_CREATE_STRUCT_SIZE] =
            record[1..=CODE_CREATE_STRUCT_SIZE].try_into().unwrap();
        let event = CodeCreateStruct::from_ne_bytes(&header);
        assert_eq!(event.name_size, "Builtin:Nop".len() as i32);
        assert_eq!(event.code_size, 8);

        let name_start = 1 + CODE_CREATE_STRUCT_SIZE;
        let code_start = name_start + "Builtin:Nop".len();
        assert_eq!(&record[name_start..code_start], b"Builtin:Nop");
        assert_eq!(&record[code_start..code_start + 8], &[0x90, 0xc3, 0, 0, 0, 0, 0, 0]);
        assert_eq!(record[code_start + 8], CODE_MOVING_GC_TAG);
        assert_eq!(record.len(), code_start + 9);
    }

    #[test]
    fn test_oversized_instructions_are_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("trunc.log");
        let recorder = LowLevelLogger::open(base.to_str().unwrap()).unwrap();
        recorder.write_code_create(Address(0x10), 2, &[1, 2, 3, 4], b"x");
        recorder.code_move_event(Address(0x10), &CodeObject::new(Address(0x20), 2, CodeKind::ForTesting));

        let bytes = std::fs::read(recorder.path()).unwrap();
        let record = &bytes[header_len()..];
        let code_start = 1 + CODE_CREATE_STRUCT_SIZE + 1;
        assert_eq!(&record[code_start..code_start + 2], &[1, 2]);
        assert_eq!(record[code_start + 2], CODE_MOVE_TAG);
        assert_eq!(record.len(), code_start + 3 + CODE_MOVE_STRUCT_SIZE);
    }

    #[test]
    fn test_open_failure() {
        assert!(matches!(
            LowLevelLogger::open("/nonexistent-dir/codelog.log"),
            Err(LogError::OpenFailed { .. })
        ));
    }
}
