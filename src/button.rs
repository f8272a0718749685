// Debounced push button
//
// Reports a press on a rising edge (0 -> 1) only if more than the debounce
// period has passed since the last accepted press. Suppressed edges are
// silently dropped.

use tracing::debug;

use crate::hal::{Clock, DigitalInput};

pub struct Button<C: Clock, I: DigitalInput> {
    clock: C,
    input: I,
    pin: u8,
    debounce_period_ms: u64,
    last_value: bool,
    last_press_time_ms: u64,
}

impl<C: Clock, I: DigitalInput> Button<C, I> {
    pub fn new(clock: C, input: I, pin: u8, debounce_period_ms: u64) -> Self {
        Self {
            clock,
            input,
            pin,
            debounce_period_ms,
            last_value: false,
            last_press_time_ms: 0,
        }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Poll the pin once; true if this poll saw a new accepted press
    pub fn is_pressed(&mut self) -> bool {
        let mut pressed = false;
        let value = self.input.read_pin(self.pin);

        if value && !self.last_value {
            let now = self.clock.now_ms();
            if now.saturating_sub(self.last_press_time_ms) > self.debounce_period_ms {
                pressed = true;
                self.last_press_time_ms = now;
            } else {
                debug!("Button edge on pin {} ignored (bounce)", self.pin);
            }
        }

        self.last_value = value;
        pressed
    }
}
