//! Session coordinator
//!
//! Builds the registry and every configured encoder from a [`LogConfig`],
//! keeps them alive for the lifetime of the session and tears them down in
//! an order that makes late events harmless: logging is switched off, the
//! profiler is drained and joined, every listener is unregistered, and only
//! then are destinations released.

use std::sync::Arc;

use log::{info, warn};

use crate::config::LogConfig;
use crate::domain::{Address, LogError, SourcePositionEntry};
use crate::events::{LogClock, LogEventListener, Logger};
use crate::listeners::existing_code::{CodeHeap, ExistingCodeLogger};
use crate::listeners::jit::JitCodeType;
use crate::listeners::{
    CodeEventLogger, FileLogger, FileLoggerOptions, JitCodeEventHandler, JitListener, JitLogger,
    LowLevelListener, LowLevelLogger, PerfBasicListener, PerfBasicLogger, PerfMapFile,
};
use crate::log_file::{prepare_log_file_name, LogFile};
use crate::profiling::{Profiler, TickSource, Ticker};

/// Collaborators a session cannot create on its own.
#[derive(Default)]
pub struct SessionResources {
    /// Sampler of the observed thread; profiling is skipped without one
    pub tick_source: Option<Box<dyn TickSource>>,
    /// Shared perf map; the per-process `/tmp` map when absent
    pub perf_map: Option<Arc<PerfMapFile>>,
    /// Already-open text log, used instead of opening `config.logfile`
    pub log_file: Option<Arc<LogFile>>,
}

pub struct LogSession {
    config: LogConfig,
    logger: Arc<Logger>,
    log: Option<Arc<LogFile>>,
    file_logger: Option<Arc<FileLogger>>,
    low_level: Option<Arc<LowLevelListener>>,
    perf_basic: Option<Arc<PerfBasicListener>>,
    jit: Option<Arc<JitListener>>,
    profiler: Option<Profiler>,
    torn_down: bool,
}

impl LogSession {
    /// Create and register every encoder `config` asks for.
    ///
    /// A destination that cannot be opened disables its own encoder only;
    /// the failure is reported through the `log` facade.
    #[must_use]
    pub fn set_up(config: LogConfig, resources: SessionResources) -> Self {
        let config = config.with_implications();
        let clock = Arc::new(LogClock::new(config.predictable));
        let logger = Arc::new(Logger::new(Arc::clone(&clock)));

        let log_name = prepare_log_file_name(&config.logfile);
        let log = if config.log {
            match resources.log_file {
                Some(log) => Some(log),
                None => match LogFile::open(&log_name) {
                    Ok(log) => Some(Arc::new(log)),
                    Err(err) => {
                        warn!("Text log disabled: {err}");
                        None
                    }
                },
            }
        } else {
            None
        };

        let file_logger = log.as_ref().map(|log| {
            let options = FileLoggerOptions::from(&config);
            let file_logger = Arc::new(FileLogger::new(Arc::clone(log), Arc::clone(&clock), options));
            logger.add_listener(file_logger.clone());
            file_logger
        });

        let perf_basic = if config.perf_basic_prof {
            let map = resources.perf_map.unwrap_or_else(PerfMapFile::for_current_process);
            match PerfBasicLogger::new(&map, config.perf_basic_prof_only_functions) {
                Ok(recorder) => {
                    let listener = Arc::new(CodeEventLogger::new(recorder));
                    logger.add_listener(listener.clone());
                    Some(listener)
                }
                Err(err) => {
                    warn!("perf map disabled: {err}");
                    None
                }
            }
        } else {
            None
        };

        let low_level = if config.ll_prof {
            match LowLevelLogger::open(&log_name) {
                Ok(recorder) => {
                    let listener = Arc::new(CodeEventLogger::new(recorder));
                    logger.add_listener(listener.clone());
                    Some(listener)
                }
                Err(err) => {
                    warn!("Low-level log disabled: {err}");
                    None
                }
            }
        } else {
            None
        };

        let profiler = if config.prof {
            match resources.tick_source {
                Some(source) => {
                    let ticker = Arc::new(Ticker::new(source, config.prof_sampling_interval_us));
                    let profiler = Profiler::new(Arc::clone(&logger), file_logger.clone(), ticker);
                    match profiler.engage() {
                        Ok(()) => Some(profiler),
                        Err(err) => {
                            warn!("Profiler disabled: {err}");
                            None
                        }
                    }
                }
                None => {
                    warn!("Profiling requested without a tick source");
                    None
                }
            }
        } else {
            None
        };

        info!(
            "Log session ready: {} listener(s), text log {}",
            logger.listener_count(),
            log.as_ref().map_or("off", |log| log.name())
        );

        Self {
            config,
            logger,
            log,
            file_logger,
            low_level,
            perf_basic,
            jit: None,
            profiler,
            torn_down: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    #[must_use]
    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    #[must_use]
    pub fn log_file(&self) -> Option<&Arc<LogFile>> {
        self.log.as_ref()
    }

    #[must_use]
    pub fn file_logger(&self) -> Option<&Arc<FileLogger>> {
        self.file_logger.as_ref()
    }

    #[must_use]
    pub fn low_level_listener(&self) -> Option<&Arc<LowLevelListener>> {
        self.low_level.as_ref()
    }

    #[must_use]
    pub fn perf_basic_listener(&self) -> Option<&Arc<PerfBasicListener>> {
        self.perf_basic.as_ref()
    }

    #[must_use]
    pub fn profiler(&self) -> Option<&Profiler> {
        self.profiler.as_ref()
    }

    #[must_use]
    pub fn is_logging(&self) -> bool {
        self.log.as_ref().is_some_and(|log| log.is_logging())
    }

    /// Install, replace or (with `None`) remove the JIT code event handler.
    ///
    /// With `existing`, code already in the heap is replayed to the new
    /// handler before live events start.
    pub fn set_code_event_handler(&mut self, handler: Option<JitCodeEventHandler>, existing: Option<&dyn CodeHeap>) {
        if let Some(old) = self.jit.take() {
            let old: Arc<dyn LogEventListener> = old;
            self.logger.remove_listener(&old);
        }
        let Some(handler) = handler else { return };

        let listener = Arc::new(CodeEventLogger::new(JitLogger::new(handler)));
        if let Some(heap) = existing {
            let clock: &LogClock = self.logger.clock();
            ExistingCodeLogger::to_listener(heap, listener.as_ref(), clock).log_all();
        }
        if self.logger.add_listener(listener.clone()) {
            self.jit = Some(listener);
        }
    }

    /// Forward a source position table to the JIT handler, if one is
    /// installed.
    pub fn code_line_pos_info_record_event(
        &self,
        code_start: Address,
        positions: &[SourcePositionEntry],
        code_type: JitCodeType,
    ) {
        if let Some(jit) = &self.jit {
            jit.recorder().code_line_pos_info_record_event(code_start, positions, code_type);
        }
    }

    /// Replay code that predates the session to every listener.
    pub fn log_existing_code(&self, heap: &dyn CodeHeap) {
        let existing = ExistingCodeLogger::broadcast(heap, &self.logger);
        existing.log_all();
        existing.log_accessor_callbacks();
    }

    /// Stop everything and release every destination.
    ///
    /// # Errors
    /// Returns the text log's flush error, if any. Calling it again is a
    /// no-op.
    pub fn tear_down(&mut self) -> Result<(), LogError> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;

        if let Some(log) = &self.log {
            log.set_logging(false);
        }
        if let Some(profiler) = self.profiler.take() {
            profiler.disengage();
        }
        self.logger.shut_down();

        self.jit = None;
        self.low_level = None;
        self.perf_basic = None;
        self.file_logger = None;
        match self.log.take() {
            Some(log) => log.close(),
            None => Ok(()),
        }
    }
}

impl Drop for LogSession {
    fn drop(&mut self) {
        if let Err(err) = self.tear_down() {
            warn!("Log session teardown: {err}");
        }
    }
}
