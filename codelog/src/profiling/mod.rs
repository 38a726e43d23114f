//! Statistical sampling pipeline
//!
//! ```text
//! TickSource ──▶ Ticker (SamplingThread) ──try_insert──▶ SampleRing
//!                                                            │ remove
//!                                                            ▼
//!                              Logger::tick_event ◀── Profiler (consumer)
//! ```

pub mod profiler;
pub mod ring;
pub mod shared_libraries;
pub mod tick_sample;
pub mod ticker;

// Re-export common types
pub use profiler::Profiler;
pub use ring::SampleRing;
pub use shared_libraries::SharedLibrary;
pub use tick_sample::{TickSample, VmState, MAX_FRAMES_COUNT};
pub use ticker::{TickSource, Ticker};
