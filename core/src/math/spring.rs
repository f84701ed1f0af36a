//! Critically damped spring used to smooth values for presentation.
//!
//! The step is the closed-form solution of `x'' = -w^2 (x - target) - 2 w x'`,
//! so it stays stable for any step length and never overshoots the target.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriticallyDampedSpring {
    omega: f64,
    value: f64,
    velocity: f64,
}

impl CriticallyDampedSpring {
    pub fn new(omega: f64) -> Self {
        Self {
            omega,
            value: 0.0,
            velocity: 0.0,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn step(&mut self, target: f64, dt: f64) -> f64 {
        if dt <= 0.0 {
            return self.value;
        }
        let delta = self.value - target;
        let c2 = self.velocity + self.omega * delta;
        let decay = (-self.omega * dt).exp();
        self.value = target + (delta + c2 * dt) * decay;
        self.velocity = (self.velocity - self.omega * c2 * dt) * decay;
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
        self.velocity = 0.0;
    }
}
