//! Logging configuration
//!
//! A plain set of named options. The binary fills it from command-line
//! flags; embedders construct it directly.

use crate::log_file::LOG_TO_CONSOLE;

/// Default sampling interval of the tick profiler, in microseconds.
pub const DEFAULT_SAMPLING_INTERVAL_US: u64 = 1000;

/// Default text log name.
pub const DEFAULT_LOGFILE: &str = "codelog.log";

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Write the text log at all
    pub log: bool,
    /// Code creation, relocation and disable-optimization records
    pub log_code: bool,
    /// Deoptimization records
    pub log_deopt: bool,
    /// Sample the observed thread and log ticks
    pub prof: bool,
    pub prof_sampling_interval_us: u64,
    /// Binary low-level log next to the text log (`<logfile>.ll`)
    pub ll_prof: bool,
    /// perf map file (`/tmp/perf-<pid>.map`)
    pub perf_basic_prof: bool,
    /// Keep only builtin and function code in the perf map
    pub perf_basic_prof_only_functions: bool,
    /// Deterministic timestamps
    pub predictable: bool,
    /// Text log name template (`%p`, `%t`); `-` for stdout
    pub logfile: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log: false,
            log_code: false,
            log_deopt: false,
            prof: false,
            prof_sampling_interval_us: DEFAULT_SAMPLING_INTERVAL_US,
            ll_prof: false,
            perf_basic_prof: false,
            perf_basic_prof_only_functions: false,
            predictable: false,
            logfile: DEFAULT_LOGFILE.to_string(),
        }
    }
}

impl LogConfig {
    /// Apply the implications between options: profiling needs code
    /// records, any record kind needs the text log, and the functions-only
    /// perf filter needs the perf map.
    #[must_use]
    pub fn with_implications(mut self) -> Self {
        if self.prof {
            self.log_code = true;
        }
        if self.log_code || self.log_deopt || self.prof {
            self.log = true;
        }
        if self.perf_basic_prof_only_functions {
            self.perf_basic_prof = true;
        }
        self
    }

    #[must_use]
    pub fn logs_to_console(&self) -> bool {
        self.logfile == LOG_TO_CONSOLE
    }
}
