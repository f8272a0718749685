// Motion control runtime for a two-wheel differential robot
//
// Ramp profiles, encoder feedback, speed balancing and a debounced run button,
// all driven through injected clock/pin ports so the same code runs against
// real hardware bindings or the simulator in `sim`.

pub mod button;
pub mod config;
pub mod hal;
pub mod math;
pub mod messages;
pub mod motor;
pub mod runtime;
pub mod sim;
