//! File-backed text log
//!
//! One append-only destination shared by every text encoder. Writers obtain
//! a [`MessageBuilder`], which holds the destination lock until the record
//! is written, so fields of two records never interleave.
//!
//! Logging can be switched off at any time with [`LogFile::set_logging`];
//! builders are refused while it is off, which turns every text encoder into
//! a no-op without unregistering it.

pub mod file_name;
pub mod message_builder;

pub use file_name::{expand_log_file_name, prepare_log_file_name, LOG_TO_CONSOLE};
pub use message_builder::MessageBuilder;

use std::fs::File;
use std::io::{self, LineWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use log::{debug, warn};

use crate::domain::LogError;

struct Destination {
    output: Option<Box<dyn Write + Send>>,
    /// Reused record buffer, so steady-state logging does not allocate
    scratch: Vec<u8>,
}

pub struct LogFile {
    name: String,
    enabled: AtomicBool,
    destination: Mutex<Destination>,
}

impl LogFile {
    /// Open the destination named `name` (already expanded; see
    /// [`prepare_log_file_name`]) and write the header records.
    ///
    /// `"-"` logs to stdout. Any other name is created or truncated.
    pub fn open(name: &str) -> Result<Self, LogError> {
        let output: Box<dyn Write + Send> = if name == LOG_TO_CONSOLE {
            Box::new(LineWriter::new(io::stdout()))
        } else {
            let file = File::create(name).map_err(|source| LogError::OpenFailed {
                path: PathBuf::from(name),
                source,
            })?;
            Box::new(LineWriter::new(file))
        };
        let log = Self::with_writer(name, output);
        log.write_header();
        debug!("Opened text log {name}");
        Ok(log)
    }

    /// Wrap an arbitrary writer. No header is written.
    #[must_use]
    pub fn with_writer(name: &str, output: Box<dyn Write + Send>) -> Self {
        Self {
            name: name.to_string(),
            enabled: AtomicBool::new(true),
            destination: Mutex::new(Destination { output: Some(output), scratch: Vec::with_capacity(256) }),
        }
    }

    fn write_header(&self) {
        if let Some(mut msg) = self.new_message_builder() {
            msg.append_raw("codelog-version")
                .separator()
                .append_raw(env!("CARGO_PKG_VERSION_MAJOR"))
                .separator()
                .append_raw(env!("CARGO_PKG_VERSION_MINOR"))
                .separator()
                .append_raw(env!("CARGO_PKG_VERSION_PATCH"));
            msg.write_to_log_file();
        }
        if let Some(mut msg) = self.new_message_builder() {
            msg.append_raw("codelog-platform")
                .separator()
                .append_raw(std::env::consts::OS)
                .separator()
                .append_raw(std::env::consts::ARCH);
            msg.write_to_log_file();
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_logging(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Enable or disable logging. Waits for an in-flight record to finish.
    pub fn set_logging(&self, enabled: bool) {
        let _guard = self.destination.lock().unwrap_or_else(PoisonError::into_inner);
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Start a record, or `None` while logging is disabled or the
    /// destination is closed.
    #[must_use]
    pub fn new_message_builder(&self) -> Option<MessageBuilder<'_>> {
        if !self.is_logging() {
            return None;
        }
        let guard = self.destination.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.output.is_none() {
            return None;
        }
        Some(MessageBuilder::new(guard))
    }

    /// Flush and release the destination. Later builders are refused.
    pub fn close(&self) -> Result<(), LogError> {
        let mut destination = self.destination.lock().unwrap_or_else(PoisonError::into_inner);
        self.enabled.store(false, Ordering::Relaxed);
        match destination.output.take() {
            Some(mut output) => {
                output.flush()?;
                debug!("Closed text log {}", self.name);
                Ok(())
            }
            None => Err(LogError::Closed(self.name.clone())),
        }
    }
}

impl Drop for LogFile {
    fn drop(&mut self) {
        let destination = self.destination.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(output) = destination.output.as_mut() {
            if let Err(e) = output.flush() {
                warn!("Failed to flush text log {}: {e}", self.name);
            }
        }
    }
}
