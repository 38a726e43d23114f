//! Periodic sampler driving the sample ring
//!
//! The signal or timer machinery that interrupts the observed thread is
//! outside this crate: a [`TickSource`] fills a [`TickSample`] from whatever
//! state it can reach. The [`Ticker`] runs it on a dedicated
//! `SamplingThread` at the configured interval and pushes the result into
//! the engaged profiler's ring without ever blocking.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};

use super::{SampleRing, TickSample};
use crate::domain::ProfilerError;

/// Name of the sampling thread.
pub const SAMPLING_THREAD_NAME: &str = "SamplingThread";

/// Stack size of the sampling thread.
pub const SAMPLING_THREAD_STACK_SIZE: usize = 64 * 1024;

/// Captures the observed thread's state.
pub trait TickSource: Send {
    /// Fill `sample`; return false when the thread could not be sampled
    /// (the sample is then discarded).
    fn sample(&mut self, sample: &mut TickSample) -> bool;
}

impl<F> TickSource for F
where
    F: FnMut(&mut TickSample) -> bool + Send,
{
    fn sample(&mut self, sample: &mut TickSample) -> bool {
        self(sample)
    }
}

struct SamplerThread {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct Ticker {
    source: Arc<Mutex<Box<dyn TickSource>>>,
    interval: Duration,
    active: Mutex<Option<SamplerThread>>,
}

impl Ticker {
    #[must_use]
    pub fn new(source: Box<dyn TickSource>, interval_us: u64) -> Self {
        Self {
            source: Arc::new(Mutex::new(source)),
            interval: Duration::from_micros(interval_us.max(1)),
            active: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Start sampling into `ring`.
    ///
    /// # Errors
    /// `AlreadyEngaged` when another profiler is attached, or
    /// `ThreadSpawnFailed` when the sampling thread cannot start.
    pub fn set_profiler(&self, ring: Arc<SampleRing>) -> Result<(), ProfilerError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            return Err(ProfilerError::AlreadyEngaged);
        }

        let (stop, stopped) = bounded::<()>(1);
        let source = Arc::clone(&self.source);
        let ticks = tick(self.interval);
        let handle = thread::Builder::new()
            .name(SAMPLING_THREAD_NAME.into())
            .stack_size(SAMPLING_THREAD_STACK_SIZE)
            .spawn(move || {
                let mut sample = TickSample::new();
                loop {
                    select! {
                        recv(stopped) -> _ => break,
                        recv(ticks) -> _ => {
                            sample.reset();
                            let captured = source
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .sample(&mut sample);
                            if captured {
                                ring.try_insert(sample.clone());
                            }
                        }
                    }
                }
            })
            .map_err(|source| ProfilerError::ThreadSpawnFailed {
                thread: SAMPLING_THREAD_NAME,
                source,
            })?;

        log::debug!("Sampling every {:?}", self.interval);
        *active = Some(SamplerThread { stop, handle });
        Ok(())
    }

    /// Stop sampling and wait for the sampling thread to exit.
    pub fn clear_profiler(&self) {
        let thread = self.active.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(SamplerThread { stop, handle }) = thread {
            drop(stop);
            if handle.join().is_err() {
                log::warn!("{SAMPLING_THREAD_NAME} panicked");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.clear_profiler();
    }
}
