//! perf map encoder
//!
//! Appends `<hex address> <hex size> <name>` lines to a map file that the
//! Linux `perf` tool reads to symbolize JIT code. All encoders in a process
//! share one [`PerfMapFile`]: the first [`PerfMapFile::acquire`] opens it,
//! dropping the last [`PerfMapHandle`] closes it.

use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use super::code_event_logger::{CodeEventLogger, CodeEventRecorder};
use crate::domain::{Address, CodeObject, LogError, SharedInfo, WasmCode};

/// Registered form of the perf map encoder.
pub type PerfBasicListener = CodeEventLogger<PerfBasicLogger>;

#[derive(Default)]
struct PerfMapState {
    ref_count: usize,
    output: Option<LineWriter<File>>,
}

/// Reference-counted shared perf map file.
pub struct PerfMapFile {
    path: PathBuf,
    state: Mutex<PerfMapState>,
}

impl PerfMapFile {
    /// The map `perf` looks for: `/tmp/perf-<pid>.map`.
    #[must_use]
    pub fn for_current_process() -> Arc<Self> {
        Self::at(format!("/tmp/perf-{}.map", std::process::id()))
    }

    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self { path: path.into(), state: Mutex::new(PerfMapState::default()) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, PerfMapState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a reference, opening (and truncating) the file if this is the
    /// first one.
    pub fn acquire(self: &Arc<Self>) -> Result<PerfMapHandle, LogError> {
        let mut state = self.lock();
        if state.ref_count == 0 {
            let file = File::create(&self.path)
                .map_err(|source| LogError::OpenFailed { path: self.path.clone(), source })?;
            state.output = Some(LineWriter::new(file));
            debug!("Opened perf map {}", self.path.display());
        }
        state.ref_count += 1;
        Ok(PerfMapHandle { file: Arc::clone(self) })
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().output.is_some()
    }

    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.lock().ref_count
    }

    fn write_entry(&self, address: Address, size: u32, name: &[u8]) {
        let mut state = self.lock();
        let Some(output) = state.output.as_mut() else { return };
        // perf wants bare hex, no 0x prefix.
        let mut line = format!("{address:x} {size:x} ").into_bytes();
        line.extend_from_slice(name);
        line.push(b'\n');
        if let Err(e) = output.write_all(&line) {
            warn!("Dropped perf map entry in {}: {e}", self.path.display());
        }
    }

    fn release(&self) {
        let mut state = self.lock();
        state.ref_count = state.ref_count.saturating_sub(1);
        if state.ref_count > 0 {
            return;
        }
        if let Some(mut output) = state.output.take() {
            if let Err(e) = output.flush() {
                warn!("Failed to flush perf map {}: {e}", self.path.display());
            }
            debug!("Closed perf map {}", self.path.display());
        }
    }
}

/// One reference to a [`PerfMapFile`].
pub struct PerfMapHandle {
    file: Arc<PerfMapFile>,
}

impl PerfMapHandle {
    #[must_use]
    pub fn file(&self) -> &Arc<PerfMapFile> {
        &self.file
    }
}

impl Drop for PerfMapHandle {
    fn drop(&mut self) {
        self.file.release();
    }
}

/// perf map recorder.
///
/// With `only_functions`, entries other than builtins and function code
/// are skipped.
pub struct PerfBasicLogger {
    map: PerfMapHandle,
    only_functions: bool,
}

impl PerfBasicLogger {
    pub fn new(file: &Arc<PerfMapFile>, only_functions: bool) -> Result<Self, LogError> {
        Ok(Self { map: file.acquire()?, only_functions })
    }

    #[must_use]
    pub fn map_file(&self) -> &Arc<PerfMapFile> {
        self.map.file()
    }
}

impl CodeEventRecorder for PerfBasicLogger {
    fn log_recorded_buffer(&self, code: &CodeObject<'_>, _shared: Option<&SharedInfo<'_>>, name: &[u8]) {
        if self.only_functions && !code.kind.is_builtin_or_js_function() {
            return;
        }
        self.map.file.write_entry(code.start, code.size, name);
    }

    fn log_recorded_wasm_buffer(&self, code: &WasmCode<'_>, name: &[u8]) {
        self.map.file.write_entry(code.start, code.size, name);
    }
}
