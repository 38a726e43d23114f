//! Encoders subscribed to the event registry
//!
//! - [`file_logger`]: the comma-separated text log
//! - [`low_level`]: binary `.ll` records with raw instruction bytes
//! - [`perf_map`]: `/tmp/perf-<pid>.map` symbol lines for perf
//! - [`jit`]: callbacks into an embedder-supplied JIT handler
//! - [`external`]: plain API events for an embedder-supplied handler
//!
//! The name-based encoders share [`code_event_logger::CodeEventLogger`],
//! which composes names into a bounded [`name_buffer::NameBuffer`] and then
//! hands the bytes to a [`code_event_logger::CodeEventRecorder`].

pub mod code_event_logger;
pub mod existing_code;
pub mod external;
pub mod file_logger;
pub mod jit;
pub mod low_level;
pub mod name_buffer;
pub mod perf_map;

// Re-export common types
pub use code_event_logger::{CodeEventLogger, CodeEventRecorder};
pub use existing_code::{CodeHeap, ExistingCodeLogger};
pub use external::{ApiCodeEvent, CodeEventHandler, ExternalLogEventListener};
pub use file_logger::{FileLogger, FileLoggerOptions, TimerEventStatus};
pub use jit::{JitCodeEvent, JitCodeEventHandler, JitListener, JitLogger};
pub use low_level::{LowLevelListener, LowLevelLogger};
pub use name_buffer::NameBuffer;
pub use perf_map::{PerfBasicListener, PerfBasicLogger, PerfMapFile};
