// Motor control for the two-wheel base
//
// Provides:
// - Encoder tick counters shared with the interrupt side
// - Per-wheel slow-decay motor driver with calibration
// - Trapezoidal per-wheel movement profiles
// - Dual-wheel orchestration with speed balancing

mod driver;
mod encoder;
mod movement;
mod robot;

pub use driver::{Motor, slow_decay_duties};
pub use encoder::EncoderCounter;
pub use movement::{MotionError, MotorMovement};
pub use robot::{BalanceMode, MAX_THROTTLE_FACTOR, RobotMotors, RobotMotorsState};
