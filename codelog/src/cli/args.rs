//! CLI argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{LogConfig, DEFAULT_LOGFILE, DEFAULT_SAMPLING_INTERVAL_US};

#[derive(Parser)]
#[command(
    name = "codelog",
    about = "Record and inspect code event logs",
    after_help = "\
EXAMPLES:
    codelog record events.jsonl --log-code             Text log to codelog.log
    codelog record events.jsonl --prof --logfile -     Ticks and code to stdout
    codelog record events.jsonl --ll-prof              Also write codelog.log.ll
    codelog dump-ll codelog.log.ll --pretty            Decode a low-level log"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay a JSON-lines event script through a logging session
    Record(RecordArgs),

    /// Print a low-level (.ll) log as JSON
    DumpLl {
        /// Low-level log to decode
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[allow(clippy::struct_excessive_bools)]
#[derive(clap::Args)]
pub struct RecordArgs {
    /// Event script, one JSON object per line
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Text log name (%p = pid, %t = time in ms, - = stdout)
    #[arg(long, default_value = DEFAULT_LOGFILE)]
    pub logfile: String,

    /// Log code creation and relocation
    #[arg(long)]
    pub log_code: bool,

    /// Log deoptimizations
    #[arg(long)]
    pub log_deopt: bool,

    /// Sample the replay thread and log ticks
    #[arg(long)]
    pub prof: bool,

    /// Sampling interval in microseconds
    #[arg(long, default_value_t = DEFAULT_SAMPLING_INTERVAL_US)]
    pub prof_sampling_interval: u64,

    /// Write the binary low-level log next to the text log
    #[arg(long)]
    pub ll_prof: bool,

    /// Write /tmp/perf-<pid>.map
    #[arg(long)]
    pub perf_basic_prof: bool,

    /// Keep only builtins and functions in the perf map
    #[arg(long)]
    pub perf_basic_prof_only_functions: bool,

    /// Deterministic timestamps
    #[arg(long)]
    pub predictable: bool,
}

impl RecordArgs {
    #[must_use]
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            log: true,
            log_code: self.log_code,
            log_deopt: self.log_deopt,
            prof: self.prof,
            prof_sampling_interval_us: self.prof_sampling_interval,
            ll_prof: self.ll_prof,
            perf_basic_prof: self.perf_basic_prof,
            perf_basic_prof_only_functions: self.perf_basic_prof_only_functions,
            predictable: self.predictable,
            logfile: self.logfile.clone(),
        }
        .with_implications()
    }
}
