use std::f64::consts::PI;

pub struct AngleHelper;

impl AngleHelper {
    pub fn to_degrees(radians: f64) -> f64 {
        radians * 180.0 / PI
    }

    /// Inclusive band check on the magnitude of an angle.
    pub fn magnitude_within(angle: f64, min: f64, max: f64) -> bool {
        let magnitude = angle.abs();
        magnitude >= min && magnitude <= max
    }
}
