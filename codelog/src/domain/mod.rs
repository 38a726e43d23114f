//! Domain model for codelog
//!
//! This module contains core domain types and errors that provide:
//! - Borrowed views of runtime code objects (no ownership of runtime heap data)
//! - Self-documenting event signatures
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{
    compute_marker, Address, CallbackKind, CodeEventType, CodeKind, CodeObject, CodeTag,
    DeoptInfo, DeoptPosition, InliningPosition, Name, ScriptInfo, SharedInfo,
    SourcePositionEntry, WasmCode,
};

pub use errors::{LogError, LowLevelParseError, ProfilerError};
