//! Captured execution state of the observed thread

use serde::Deserialize;

use crate::domain::Address;

/// Maximum number of stack frames recorded per sample.
pub const MAX_FRAMES_COUNT: usize = 255;

/// What the observed thread was doing when it was sampled.
///
/// The integer codes are written into `tick` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum VmState {
    Js,
    Gc,
    Parser,
    BytecodeCompiler,
    Compiler,
    #[default]
    Other,
    External,
    AtomicsWait,
    Idle,
    Logging,
}

impl VmState {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            VmState::Js => 0,
            VmState::Gc => 1,
            VmState::Parser => 2,
            VmState::BytecodeCompiler => 3,
            VmState::Compiler => 4,
            VmState::Other => 5,
            VmState::External => 6,
            VmState::AtomicsWait => 7,
            VmState::Idle => 8,
            VmState::Logging => 9,
        }
    }
}

/// One snapshot of the observed thread: registers, state and a bounded
/// stack of return addresses.
///
/// Produced by the sampling thread, consumed exactly once by the profiler's
/// consumer thread.
#[derive(Debug, Clone)]
pub struct TickSample {
    pub pc: Address,
    /// Top of stack, reported when not inside an external callback
    pub tos: Address,
    pub fp: Address,
    /// Entry point of the native callback being executed, if any
    pub external_callback_entry: Address,
    pub has_external_callback: bool,
    pub state: VmState,
    frames: [Address; MAX_FRAMES_COUNT],
    frames_count: usize,
}

impl Default for TickSample {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSample {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pc: Address::NULL,
            tos: Address::NULL,
            fp: Address::NULL,
            external_callback_entry: Address::NULL,
            has_external_callback: false,
            state: VmState::Other,
            frames: [Address::NULL; MAX_FRAMES_COUNT],
            frames_count: 0,
        }
    }

    /// Clear everything so the sample can be refilled.
    pub fn reset(&mut self) {
        self.pc = Address::NULL;
        self.tos = Address::NULL;
        self.fp = Address::NULL;
        self.external_callback_entry = Address::NULL;
        self.has_external_callback = false;
        self.state = VmState::Other;
        self.frames_count = 0;
    }

    /// Record one more frame; returns false once the frame array is full.
    pub fn push_frame(&mut self, frame: Address) -> bool {
        if self.frames_count >= MAX_FRAMES_COUNT {
            return false;
        }
        self.frames[self.frames_count] = frame;
        self.frames_count += 1;
        true
    }

    #[must_use]
    pub fn frames(&self) -> &[Address] {
        &self.frames[..self.frames_count]
    }

    #[must_use]
    pub fn frames_count(&self) -> usize {
        self.frames_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_frame_stops_at_capacity() {
        let mut sample = TickSample::new();
        for i in 0..MAX_FRAMES_COUNT as u64 {
            assert!(sample.push_frame(Address(i)));
        }
        assert!(!sample.push_frame(Address(0xdead)));
        assert_eq!(sample.frames_count(), MAX_FRAMES_COUNT);
        assert_eq!(sample.frames()[10], Address(10));
    }

    #[test]
    fn test_reset_clears_frames() {
        let mut sample = TickSample::new();
        sample.pc = Address(0x42);
        sample.push_frame(Address(0x1));
        sample.reset();
        assert!(sample.frames().is_empty());
        assert!(sample.pc.is_null());
        assert_eq!(sample.state, VmState::Other);
    }

    #[test]
    fn test_state_codes() {
        assert_eq!(VmState::Js.as_i32(), 0);
        assert_eq!(VmState::External.as_i32(), 6);
        assert_eq!(VmState::default().as_i32(), 5);
    }
}
