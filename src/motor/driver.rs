// One wheel: two slow-decay PWM pins plus its encoder
//
// Owns the calibration state learned by the balancer (throttle factor), the
// tick-to-distance scale (encoder factor) and the speed sample window.

use std::sync::Arc;

use tracing::debug;

use super::encoder::EncoderCounter;
use crate::hal::{DUTY_MAX, PwmOutput};
use crate::math::clamp;

/// A single drive motor
#[derive(Debug)]
pub struct Motor<P: PwmOutput> {
    output: P,
    pins: Option<(u8, u8)>, // (A, B), None until attached
    encoder: Arc<EncoderCounter>,
    encoder_factor: f32,
    throttle_factor: f32,
    min_throttle: f32,
    speed_sample_period_ms: u64,
    speed_window_start_ms: u64,
    encoder_counts_per_second: f32,
}

impl<P: PwmOutput> Motor<P> {
    /// Create an unattached motor with unity encoder and throttle factors
    pub fn new(output: P, min_throttle: f32, speed_sample_period_ms: u64) -> Self {
        Self {
            output,
            pins: None,
            encoder: Arc::new(EncoderCounter::new()),
            encoder_factor: 1.0,
            throttle_factor: 1.0,
            min_throttle,
            speed_sample_period_ms,
            speed_window_start_ms: 0,
            encoder_counts_per_second: 0.0,
        }
    }

    /// Set the tick-to-distance scale applied to encoder counts
    pub fn with_encoder_factor(mut self, encoder_factor: f32) -> Self {
        self.encoder_factor = encoder_factor;
        self
    }

    pub fn attach(&mut self, pin_a: u8, pin_b: u8) {
        debug!("Attaching motor to pins {} / {}", pin_a, pin_b);
        self.pins = Some((pin_a, pin_b));
    }

    pub fn pins(&self) -> Option<(u8, u8)> {
        self.pins
    }

    pub fn set_throttle_factor(&mut self, throttle_factor: f32) {
        self.throttle_factor = throttle_factor;
    }

    pub fn throttle_factor(&self) -> f32 {
        self.throttle_factor
    }

    pub fn set_encoder_factor(&mut self, encoder_factor: f32) {
        self.encoder_factor = encoder_factor;
    }

    pub fn encoder_factor(&self) -> f32 {
        self.encoder_factor
    }

    pub fn min_throttle(&self) -> f32 {
        self.min_throttle
    }

    /// Drive the motor at `value` in [-1, 1] (out of range values are clamped)
    ///
    /// Does nothing until the motor has been attached.
    pub fn throttle(&mut self, value: f32) {
        let Some((pin_a, pin_b)) = self.pins else {
            return;
        };

        let (duty_a, duty_b) =
            slow_decay_duties(value * self.throttle_factor, self.min_throttle);
        self.output.write_duty(pin_a, duty_a);
        self.output.write_duty(pin_b, duty_b);
    }

    /// Shared handle for whatever produces encoder ticks
    pub fn encoder(&self) -> Arc<EncoderCounter> {
        self.encoder.clone()
    }

    pub fn encoder_count(&self) -> u32 {
        self.encoder.count()
    }

    pub fn scaled_encoder_count(&self) -> f32 {
        self.encoder_factor * self.encoder.count() as f32
    }

    pub fn increment_encoder_count(&self) {
        self.encoder.increment();
    }

    pub fn reset_encoder_count(&mut self) {
        self.encoder.reset();
    }

    pub fn speed_encoder_count(&self) -> u32 {
        self.encoder.window_count()
    }

    pub fn scaled_speed_encoder_count(&self) -> f32 {
        self.encoder_factor * self.encoder.window_count() as f32
    }

    /// Clear the speed-window count and start a new window at `now_ms`
    pub fn reset_speed_encoder_count(&mut self, now_ms: u64) {
        self.encoder.reset_window();
        self.speed_window_start_ms = now_ms;
    }

    /// Scaled window count, taken in the same atomic step that starts a new
    /// window at `now_ms`
    pub fn take_speed_encoder_count(&mut self, now_ms: u64) -> f32 {
        let ticks = self.encoder.reset_window();
        self.speed_window_start_ms = now_ms;
        self.encoder_factor * ticks as f32
    }

    /// Latest speed estimate in ticks per second
    ///
    /// Recomputed only when the sample window has run its full length, which
    /// also starts the next window. Within a window the previous estimate is
    /// returned unchanged.
    pub fn measure_speed(&mut self, now_ms: u64) -> f32 {
        if now_ms >= self.speed_window_start_ms + self.speed_sample_period_ms {
            let elapsed_ms = now_ms - self.speed_window_start_ms;
            let ticks = self.encoder.reset_window();
            if elapsed_ms > 0 {
                self.encoder_counts_per_second = 1000.0 * ticks as f32 / elapsed_ms as f32;
            }
            self.speed_window_start_ms = now_ms;
        }

        self.encoder_counts_per_second
    }

    /// Last latched speed estimate, without sampling
    pub fn encoder_counts_per_second(&self) -> f32 {
        self.encoder_counts_per_second
    }
}

/// Duty pair for a slow-decay H-bridge drive
///
/// The pin opposite the direction of travel is held fully high and the other
/// gets `DUTY_MAX - magnitude`, so zero throttle leaves both pins high (brake).
/// Nonzero magnitudes below `min_throttle` are raised to it; the motor would
/// only stall below that.
pub fn slow_decay_duties(value: f32, min_throttle: f32) -> (u16, u16) {
    let value = clamp(value, -1.0, 1.0);

    let mut absolute = value.abs();
    if absolute > 0.0 && absolute < min_throttle {
        absolute = min_throttle;
    }

    let scaled = (absolute * DUTY_MAX as f32) as u16;

    if value < 0.0 {
        (DUTY_MAX, DUTY_MAX - scaled)
    } else {
        (DUTY_MAX - scaled, DUTY_MAX)
    }
}
