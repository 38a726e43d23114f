//! Bounded hand-off between the sampler and the profiler consumer
//!
//! A `crossbeam-channel` bounded queue stands in for the classic
//! single-producer/single-consumer ring: `try_insert` never blocks (a full
//! ring drops the sample and raises the overflow flag), `remove` blocks until
//! a slot is available. The shutdown sentinel is a distinct slot so it can
//! never be confused with a sample.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use super::TickSample;

/// Number of slots in the ring.
pub const SAMPLE_RING_CAPACITY: usize = 128;

#[allow(clippy::large_enum_variant)]
enum Slot {
    Sample(TickSample),
    Shutdown,
}

pub struct SampleRing {
    tx: Sender<Slot>,
    rx: Receiver<Slot>,
    /// Raised by a dropped insert, reported (and cleared) by the next remove
    overflow: AtomicBool,
}

impl Default for SampleRing {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleRing {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(SAMPLE_RING_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, overflow: AtomicBool::new(false) }
    }

    /// Push a sample without blocking. Returns false (and records the
    /// overflow) when the ring is full.
    pub fn try_insert(&self, sample: TickSample) -> bool {
        match self.tx.try_send(Slot::Sample(sample)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.overflow.store(true, Ordering::Release);
                false
            }
            // Both ends live in `self`.
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Push the shutdown sentinel behind every pending sample. Waits for a
    /// free slot rather than dropping it.
    pub fn insert_shutdown(&self) {
        if self.tx.send(Slot::Shutdown).is_err() {
            log::warn!("Sample ring disconnected before shutdown");
        }
    }

    /// Block for the next slot.
    ///
    /// Returns the sample and whether an insert was dropped since the
    /// previous remove, or `None` for the shutdown sentinel.
    #[must_use]
    pub fn remove(&self) -> Option<(TickSample, bool)> {
        match self.rx.recv() {
            Ok(Slot::Sample(sample)) => {
                let overflow = self.overflow.swap(false, Ordering::AcqRel);
                Some((sample, overflow))
            }
            Ok(Slot::Shutdown) | Err(_) => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(SAMPLE_RING_CAPACITY)
    }
}
