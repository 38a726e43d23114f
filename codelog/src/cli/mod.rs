//! Command-line interface: argument parsing and replay scripts

pub mod args;
pub mod script;

// Re-export common types
pub use args::{Args, Command, RecordArgs};
pub use script::ScriptEvent;
