//! Timestamps for log records

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Fixed step of the predictable clock, in microseconds.
pub const PREDICTABLE_STEP_US: u64 = 1000;

/// Microsecond clock shared by the registry and the text log.
///
/// In predictable mode every reading advances a counter by
/// [`PREDICTABLE_STEP_US`] so repeated runs produce identical logs.
#[derive(Debug)]
pub struct LogClock {
    start: Instant,
    predictable: Option<AtomicU64>,
}

impl LogClock {
    #[must_use]
    pub fn new(predictable: bool) -> Self {
        Self {
            start: Instant::now(),
            predictable: predictable.then(|| AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn is_predictable(&self) -> bool {
        self.predictable.is_some()
    }

    /// Microseconds since the clock was created.
    #[allow(clippy::cast_possible_truncation)]
    pub fn now_us(&self) -> u64 {
        match &self.predictable {
            Some(counter) => {
                counter.fetch_add(PREDICTABLE_STEP_US, Ordering::Relaxed) + PREDICTABLE_STEP_US
            }
            None => self.start.elapsed().as_micros() as u64,
        }
    }
}
