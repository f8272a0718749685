// Hardware ports consumed by the motion core
//
// The controller never touches hardware directly. It is handed a clock, a
// digital input and duty-cycle outputs at construction, so tests can drive it
// with `sim` and a board binding only has to implement these three traits.

use std::time::Instant;

/// Maximum duty value (pin fully high)
pub const DUTY_MAX: u16 = 0xFFFF;

/// Monotonic millisecond clock
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin, never decreasing
    fn now_ms(&self) -> u64;
}

/// Single digital input line reader
pub trait DigitalInput {
    /// Read the current pin level (`true` = 1)
    fn read_pin(&mut self, pin: u8) -> bool;
}

/// Duty-cycle output (PWM / analog write)
pub trait PwmOutput {
    /// Drive `pin` with a 16-bit duty value, `DUTY_MAX` being fully high
    fn write_duty(&mut self, pin: u8, duty: u16);
}

/// Wall clock measured from construction
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}
