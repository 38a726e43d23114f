//! # codelog - Main Entry Point
//!
//! Two subcommands:
//! - **record**: replay a JSON-lines event script through a logging session
//!   configured from flags (text log, `.ll`, perf map, optional sampling)
//! - **dump-ll**: decode a low-level log and print it as JSON

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use codelog::cli::{Args, Command, RecordArgs, ScriptEvent};
use codelog::domain::{Address, LowLevelParseError};
use codelog::export::read_low_level_log;
use codelog::profiling::{TickSample, VmState};
use codelog::session::{LogSession, SessionResources};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_DATAERR: i32 = 65;
const EXIT_NOINPUT: i32 = 66;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        if io_err.kind() == io::ErrorKind::NotFound {
            return EXIT_NOINPUT;
        }
    }
    if err.downcast_ref::<serde_json::Error>().is_some() {
        return EXIT_DATAERR;
    }
    match err.downcast_ref::<LowLevelParseError>() {
        Some(LowLevelParseError::Io(io_err)) if io_err.kind() == io::ErrorKind::NotFound => EXIT_NOINPUT,
        Some(LowLevelParseError::Io(_)) | None => EXIT_ERROR,
        Some(_) => EXIT_DATAERR,
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    match args.command {
        Command::Record(record) => record_script(&record),
        Command::DumpLl { path, pretty } => {
            let log = read_low_level_log(&path)
                .with_context(|| format!("Failed to decode {}", path.display()))?;
            let stdout = io::stdout();
            log.write_json(stdout.lock(), pretty).context("Failed to write JSON")?;
            println!();
            Ok(())
        }
    }
}

/// Replay `record.script` through a session built from the flags.
///
/// With `--prof`, the sampler reports the code most recently created or
/// moved by the script as the running pc.
fn record_script(record: &RecordArgs) -> Result<()> {
    let config = record.to_config();
    let running_pc = Arc::new(AtomicU64::new(0));

    let mut resources = SessionResources::default();
    if config.prof {
        let pc = Arc::clone(&running_pc);
        resources.tick_source = Some(Box::new(move |sample: &mut TickSample| {
            let current = pc.load(Ordering::Relaxed);
            if current == 0 {
                return false;
            }
            sample.pc = Address(current);
            sample.state = VmState::Js;
            true
        }));
    }

    let script = File::open(&record.script)
        .with_context(|| format!("Failed to open script {}", record.script.display()))?;
    let mut session = LogSession::set_up(config, resources);

    let mut replayed = 0usize;
    for (index, line) in BufReader::new(script).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", record.script.display()))?;
        let event = ScriptEvent::parse_line(&line)
            .with_context(|| format!("{}:{}: malformed event", record.script.display(), index + 1))?;
        if let Some(event) = event {
            event.replay(session.logger());
            if let Some(address) = event.code_address() {
                running_pc.store(address, Ordering::Relaxed);
            }
            replayed += 1;
        }
    }

    session.tear_down().context("Failed to close the text log")?;
    info!("Replayed {replayed} events into {}", record.logfile);
    Ok(())
}
