//! Sample consumer: turns queued samples into tick events
//!
//! `engage` starts the consumer thread and attaches the ring to the
//! [`Ticker`]; `disengage` detaches, queues the shutdown sentinel behind any
//! pending samples and joins the consumer, so every sample captured before
//! shutdown still reaches the listeners.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use super::shared_libraries::read_shared_libraries;
use super::{SampleRing, Ticker};
use crate::domain::ProfilerError;
use crate::events::Logger;
use crate::listeners::FileLogger;

/// Name of the consumer thread.
pub const PROFILER_THREAD_NAME: &str = "codelog:Profiler";

pub struct Profiler {
    logger: Arc<Logger>,
    /// Destination of `profiler` and `shared-library` records, if any
    file_logger: Option<Arc<FileLogger>>,
    ticker: Arc<Ticker>,
    ring: Arc<SampleRing>,
    running: Arc<AtomicBool>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl Profiler {
    #[must_use]
    pub fn new(logger: Arc<Logger>, file_logger: Option<Arc<FileLogger>>, ticker: Arc<Ticker>) -> Self {
        Self {
            logger,
            file_logger,
            ticker,
            ring: Arc::new(SampleRing::new()),
            running: Arc::new(AtomicBool::new(false)),
            consumer: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn is_engaged(&self) -> bool {
        self.consumer.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    #[must_use]
    pub fn ring(&self) -> &Arc<SampleRing> {
        &self.ring
    }

    /// Start consuming samples and attach to the ticker.
    ///
    /// # Errors
    /// `AlreadyEngaged` if this profiler (or another one on the same ticker)
    /// is running; `ThreadSpawnFailed` if the consumer cannot start.
    pub fn engage(&self) -> Result<(), ProfilerError> {
        let mut consumer = self.consumer.lock().unwrap_or_else(PoisonError::into_inner);
        if consumer.is_some() || self.ticker.is_active() {
            return Err(ProfilerError::AlreadyEngaged);
        }

        self.log_shared_libraries();

        self.running.store(true, Ordering::Release);
        let logger = Arc::clone(&self.logger);
        let ring = Arc::clone(&self.ring);
        let running = Arc::clone(&self.running);
        let handle = thread::Builder::new()
            .name(PROFILER_THREAD_NAME.into())
            .spawn(move || loop {
                match ring.remove() {
                    Some((sample, overflow)) => logger.tick_event(&sample, overflow),
                    None if !running.load(Ordering::Acquire) => break,
                    None => {}
                }
            })
            .map_err(|source| {
                self.running.store(false, Ordering::Release);
                ProfilerError::ThreadSpawnFailed { thread: PROFILER_THREAD_NAME, source }
            })?;

        if let Err(err) = self.ticker.set_profiler(Arc::clone(&self.ring)) {
            self.stop_consumer(handle);
            return Err(err);
        }
        *consumer = Some(handle);

        let interval_us = u64::try_from(self.ticker.interval().as_micros()).unwrap_or(u64::MAX);
        if let Some(file_logger) = &self.file_logger {
            file_logger.profiler_begin_event(interval_us);
        }
        log::info!("Profiler engaged ({interval_us} us interval)");
        Ok(())
    }

    /// Detach from the ticker, drain pending samples and stop the consumer.
    /// Does nothing when not engaged.
    pub fn disengage(&self) {
        let handle = self.consumer.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(handle) = handle else { return };

        self.ticker.clear_profiler();
        self.stop_consumer(handle);

        if let Some(file_logger) = &self.file_logger {
            file_logger.profiler_end_event();
        }
        log::info!("Profiler disengaged");
    }

    fn stop_consumer(&self, handle: JoinHandle<()>) {
        self.running.store(false, Ordering::Release);
        self.ring.insert_shutdown();
        if handle.join().is_err() {
            log::warn!("{PROFILER_THREAD_NAME} panicked");
        }
    }

    fn log_shared_libraries(&self) {
        let Some(file_logger) = &self.file_logger else { return };
        match read_shared_libraries(std::process::id()) {
            Ok(libraries) => {
                for library in &libraries {
                    file_logger.shared_library_event(&library.path, library.start, library.end, library.aslr_slide);
                }
            }
            Err(err) => log::warn!("Cannot read shared library addresses: {err}"),
        }
        file_logger.shared_library_end();
    }
}

impl Drop for Profiler {
    fn drop(&mut self) {
        self.disengage();
    }
}
