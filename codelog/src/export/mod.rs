//! Offline readers for the logs this crate writes
//!
//! Currently the binary low-level log: [`low_level::LowLevelLog`] parses a
//! `.ll` file back into records and serializes them to JSON.

pub mod low_level;

pub use low_level::{parse_low_level_log, read_low_level_log, LowLevelLog, LowLevelRecord};
