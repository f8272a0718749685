// Encoder tick counters shared with the interrupt side
//
// The tick source (an ISR on hardware, the wheel simulator task here) only ever
// increments. The control loop reads and resets. Resets swap the value out
// atomically so a tick landing in between is never lost or double counted.

use std::sync::atomic::{AtomicU32, Ordering};

/// Cumulative and speed-window tick counts for one wheel
#[derive(Debug, Default)]
pub struct EncoderCounter {
    total: AtomicU32,
    window: AtomicU32,
}

impl EncoderCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one encoder tick. Safe to call from any thread.
    pub fn increment(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.window.fetch_add(1, Ordering::Relaxed);
    }

    /// Ticks since the last `reset`
    pub fn count(&self) -> u32 {
        self.total.load(Ordering::Relaxed)
    }

    /// Ticks since the last `reset_window`
    pub fn window_count(&self) -> u32 {
        self.window.load(Ordering::Relaxed)
    }

    /// Zero the cumulative count, returning what it held
    pub fn reset(&self) -> u32 {
        self.total.swap(0, Ordering::Relaxed)
    }

    /// Zero the speed-window count, returning what it held
    pub fn reset_window(&self) -> u32 {
        self.window.swap(0, Ordering::Relaxed)
    }
}
