//! Structured error types for codelog
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! None of these ever cross a broadcast call: encoders log and drop instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Failed to open log destination {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Log file {0} is already closed")]
    Closed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("A profiler is already engaged on this ticker")]
    AlreadyEngaged,

    #[error("Failed to spawn {thread} thread: {source}")]
    ThreadSpawnFailed {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum LowLevelParseError {
    #[error("Missing NUL-terminated architecture header")]
    MissingHeader,

    #[error("Unknown record tag 0x{tag:02x} at offset {offset}")]
    UnknownTag { tag: u8, offset: usize },

    #[error("Truncated {record} record at offset {offset}")]
    Truncated { record: &'static str, offset: usize },

    #[error("Negative {field} ({value}) in code creation record at offset {offset}")]
    NegativeLength { field: &'static str, value: i32, offset: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_failed_display() {
        let err = LogError::OpenFailed {
            path: PathBuf::from("/nonexistent/codelog.log"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/nonexistent/codelog.log"));
    }

    #[test]
    fn test_unknown_tag_display() {
        let err = LowLevelParseError::UnknownTag { tag: b'X', offset: 12 };
        assert_eq!(err.to_string(), "Unknown record tag 0x58 at offset 12");
    }

    #[test]
    fn test_thread_spawn_display() {
        let err = ProfilerError::ThreadSpawnFailed {
            thread: "SamplingThread",
            source: std::io::Error::from(std::io::ErrorKind::OutOfMemory),
        };
        assert!(err.to_string().starts_with("Failed to spawn SamplingThread thread"));
    }
}
