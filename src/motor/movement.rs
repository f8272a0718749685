// Per-wheel throttle profile for a single movement
//
// Trapezoid shaped: linear ramp up over time, cruise at full throttle, then a
// linear ramp down driven by encoder progress (distance) rather than time so the
// wheel stops in the same place no matter how fast it got there.

/// Errors for movement profiles that would make the ramp math undefined
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum MotionError {
    #[error("ramp-up time must be greater than zero")]
    ZeroRampUp,

    #[error("ramp-down count {ramp_down} must be below the goal count {goal}")]
    EmptyRampDown { ramp_down: u32, goal: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorMovement {
    start_time_ms: u64,
    ramp_up_time_ms: u64,
    throttle: f32,
    ramp_down_count: u32,
    count_goal: u32,
    end_throttle: f32,
}

impl MotorMovement {
    /// Build a profile. Rejects a zero ramp-up time and a ramp-down window that
    /// doesn't end strictly after it starts.
    pub fn new(
        start_time_ms: u64,
        ramp_up_time_ms: u64,
        throttle: f32,
        ramp_down_count: u32,
        count_goal: u32,
        end_throttle: f32,
    ) -> Result<Self, MotionError> {
        if ramp_up_time_ms == 0 {
            return Err(MotionError::ZeroRampUp);
        }
        if ramp_down_count >= count_goal {
            return Err(MotionError::EmptyRampDown {
                ramp_down: ramp_down_count,
                goal: count_goal,
            });
        }

        Ok(Self {
            start_time_ms,
            ramp_up_time_ms,
            throttle,
            ramp_down_count,
            count_goal,
            end_throttle,
        })
    }

    pub fn start_time_ms(&self) -> u64 {
        self.start_time_ms
    }

    pub fn ramp_up_time_ms(&self) -> u64 {
        self.ramp_up_time_ms
    }

    /// Target (cruise) throttle
    pub fn throttle(&self) -> f32 {
        self.throttle
    }

    pub fn ramp_down_count(&self) -> u32 {
        self.ramp_down_count
    }

    pub fn count_goal(&self) -> u32 {
        self.count_goal
    }

    pub fn end_throttle(&self) -> f32 {
        self.end_throttle
    }

    /// True once `encoder_count` has reached the goal
    pub fn is_complete(&self, encoder_count: f32) -> bool {
        encoder_count >= self.count_goal as f32
    }

    /// Throttle prescribed at `time_ms` with `encoder_count` ticks of progress
    pub fn get_throttle(&self, time_ms: u64, encoder_count: f32) -> f32 {
        if time_ms < self.start_time_ms {
            return 0.0;
        }

        let elapsed = time_ms - self.start_time_ms;
        if self.ramp_up_time_ms > 0 && elapsed <= self.ramp_up_time_ms {
            // Ramp up phase
            return (self.throttle * elapsed as f32) / self.ramp_up_time_ms as f32;
        }

        if encoder_count > self.count_goal as f32 {
            return 0.0;
        }

        let ramp_down = self.ramp_down_count as f32;
        if encoder_count <= ramp_down {
            // Full throttle phase
            self.throttle
        } else {
            // Ramp down phase, count_goal > ramp_down_count here
            self.throttle
                + ((self.end_throttle - self.throttle) * (encoder_count - ramp_down))
                    / (self.count_goal as f32 - ramp_down)
        }
    }

    /// Past the ramp up and not yet ramping down
    pub fn at_full_throttle(&self, time_ms: u64, encoder_count: f32) -> bool {
        time_ms > self.start_time_ms + self.ramp_up_time_ms
            && encoder_count < self.ramp_down_count as f32
    }
}
