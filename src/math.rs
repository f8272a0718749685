// Small numeric helpers shared by the motor code

/// Bound `value` to `[lower, upper]`.
pub fn clamp(value: f32, lower: f32, upper: f32) -> f32 {
    if value < lower {
        lower
    } else if value > upper {
        upper
    } else {
        value
    }
}
