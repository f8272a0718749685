// Simulated hardware for the runtime and tests
//
// - SimClock: shared, manually advanced millisecond clock
// - SimBoard: records duty writes and holds digital input levels
// - SimWheel: turns the duty on a motor's pin pair into encoder ticks

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::hal::{Clock, DUTY_MAX, DigitalInput, PwmOutput};
use crate::motor::EncoderCounter;

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: Arc<AtomicU64>,
}

impl SimClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct BoardState {
    duties: HashMap<u8, u16>,
    inputs: HashMap<u8, bool>,
    writes: usize,
}

/// In-memory stand-in for the motor/IO board. Clones are handles to the same board.
#[derive(Debug, Clone, Default)]
pub struct SimBoard {
    state: Arc<Mutex<BoardState>>,
}

impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock leaves plain data behind, keep using it
    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Last duty written to `pin`, `None` if never written
    pub fn duty(&self, pin: u8) -> Option<u16> {
        self.lock().duties.get(&pin).copied()
    }

    /// Total number of duty writes seen
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Set the level read back from a digital input
    pub fn set_input(&self, pin: u8, high: bool) {
        self.lock().inputs.insert(pin, high);
    }

    /// Signed throttle currently applied to a slow-decay pin pair
    pub fn applied_throttle(&self, pins: (u8, u8)) -> f32 {
        let state = self.lock();
        let a = state.duties.get(&pins.0).copied().unwrap_or(DUTY_MAX);
        let b = state.duties.get(&pins.1).copied().unwrap_or(DUTY_MAX);
        decode_slow_decay(a, b)
    }
}

impl PwmOutput for SimBoard {
    fn write_duty(&mut self, pin: u8, duty: u16) {
        let mut state = self.lock();
        state.duties.insert(pin, duty);
        state.writes += 1;
    }
}

impl DigitalInput for SimBoard {
    fn read_pin(&mut self, pin: u8) -> bool {
        self.lock().inputs.get(&pin).copied().unwrap_or(false)
    }
}

/// Inverse of the slow-decay encoding done by `Motor::throttle`
fn decode_slow_decay(a: u16, b: u16) -> f32 {
    let max = DUTY_MAX as f32;
    if a == DUTY_MAX {
        -((DUTY_MAX - b) as f32) / max
    } else {
        (DUTY_MAX - a) as f32 / max
    }
}

/// Wheel physics knobs for the simulator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Encoder ticks per second at full throttle
    pub max_counts_per_second: f32,
    /// Relative strength of the left motor (1.0 = nominal)
    pub left_gain: f32,
    /// Relative strength of the right motor
    pub right_gain: f32,
    /// Physics step in milliseconds
    pub step_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_counts_per_second: 1500.0,
            left_gain: 1.0,
            right_gain: 0.9, // a slightly weaker right motor gives the balancer something to do
            step_ms: 5,
        }
    }
}

/// One simulated wheel: reads its pins, produces encoder ticks
#[derive(Debug)]
pub struct SimWheel {
    pins: (u8, u8),
    encoder: Arc<EncoderCounter>,
    counts_per_second: f32,
    residual: f32,
}

impl SimWheel {
    pub fn new(
        pins: (u8, u8),
        encoder: Arc<EncoderCounter>,
        max_counts_per_second: f32,
        gain: f32,
    ) -> Self {
        Self {
            pins,
            encoder,
            counts_per_second: max_counts_per_second * gain,
            residual: 0.0,
        }
    }

    /// Advance the wheel by `dt_ms`, returns the ticks produced
    ///
    /// The encoder is single-channel, so ticks are counted regardless of direction.
    pub fn step(&mut self, board: &SimBoard, dt_ms: u64) -> u32 {
        let throttle = board.applied_throttle(self.pins).abs();
        self.residual += throttle * self.counts_per_second * dt_ms as f32 / 1000.0;

        let ticks = self.residual.floor();
        self.residual -= ticks;

        let ticks = ticks as u32;
        for _ in 0..ticks {
            self.encoder.increment();
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_clock_shared_between_clones() {
        let clock = SimClock::new(100);
        let other = clock.clone();
        other.advance(50);
        assert_eq!(clock.now_ms(), 150);
        clock.set(10);
        assert_eq!(other.now_ms(), 10);
    }

    #[test]
    fn test_board_records_writes_and_inputs() {
        let mut board = SimBoard::new();
        assert_eq!(board.duty(3), None);
        board.write_duty(3, 0x1234);
        assert_eq!(board.duty(3), Some(0x1234));
        assert_eq!(board.write_count(), 1);

        assert!(!board.read_pin(4));
        board.set_input(4, true);
        assert!(board.read_pin(4));
    }

    #[test]
    fn test_decode_slow_decay() {
        assert_eq!(decode_slow_decay(DUTY_MAX, DUTY_MAX), 0.0);
        assert_eq!(decode_slow_decay(0, DUTY_MAX), 1.0);
        assert_eq!(decode_slow_decay(DUTY_MAX, 0), -1.0);
        assert!((decode_slow_decay(0xC000, DUTY_MAX) - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_unwritten_pins_read_as_stopped() {
        let board = SimBoard::new();
        assert_eq!(board.applied_throttle((1, 2)), 0.0);
    }

    #[test]
    fn test_wheel_produces_ticks_proportional_to_throttle() {
        let mut board = SimBoard::new();
        // half throttle forward
        board.write_duty(1, DUTY_MAX - DUTY_MAX / 2);
        board.write_duty(2, DUTY_MAX);

        let encoder = Arc::new(EncoderCounter::new());
        let mut wheel = SimWheel::new((1, 2), encoder.clone(), 1000.0, 1.0);

        let mut total = 0;
        for _ in 0..100 {
            total += wheel.step(&board, 10);
        }
        // 1 second at ~0.5 throttle and 1000 ticks/s
        assert!((499..=500).contains(&total), "got {}", total);
        assert_eq!(encoder.count(), total);
    }
}
