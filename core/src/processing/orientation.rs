use crate::device_interface::{OrientationSample, Viewport};
use crate::math::{AngleHelper, CriticallyDampedSpring};
use crate::prelude::{CaptureConfig, ProcessingStage, StageError, StageResult};
use crate::telemetry::log::LogManager;
use serde::{Deserialize, Serialize};

/// How the operator is physically holding the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceOrientation {
    Portrait,
    Landscape,
}

impl DeviceOrientation {
    /// Startup guess before any sensor sample has arrived.
    pub fn from_viewport(viewport: &Viewport) -> Self {
        if viewport.width > viewport.height {
            DeviceOrientation::Landscape
        } else {
            DeviceOrientation::Portrait
        }
    }
}

/// Pitch and roll in degrees, already remapped into the holding frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttitudeState {
    pub pitch: f64,
    pub roll: f64,
}

/// Output of one filter step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationUpdate {
    pub attitude: AttitudeState,
    pub orientation: DeviceOrientation,
    pub flipped: bool,
    /// Spring-smoothed pitch deviation from target and roll, for display only.
    pub smoothed: AttitudeState,
}

/// Converts raw samples into stabilized pitch/roll and tracks holding orientation.
pub struct OrientationFilter {
    config: Option<CaptureConfig>,
    orientation: DeviceOrientation,
    pitch_spring: CriticallyDampedSpring,
    roll_spring: CriticallyDampedSpring,
    logger: LogManager,
}

impl OrientationFilter {
    pub fn new(initial: DeviceOrientation) -> Self {
        Self {
            config: None,
            orientation: initial,
            pitch_spring: CriticallyDampedSpring::new(1.0),
            roll_spring: CriticallyDampedSpring::new(1.0),
            logger: LogManager::new("orientation"),
        }
    }

    pub fn orientation(&self) -> DeviceOrientation {
        self.orientation
    }

    /// Pure step: decides this sample's orientation, then remaps with it.
    pub fn update(
        sample: &OrientationSample,
        current: DeviceOrientation,
        config: &CaptureConfig,
    ) -> StageResult<(AttitudeState, DeviceOrientation)> {
        let (beta_rad, gamma_rad) = sample
            .components()
            .ok_or_else(|| StageError::InvalidInput("orientation sample missing angles".into()))?;
        let beta = AngleHelper::to_degrees(beta_rad);
        let gamma = AngleHelper::to_degrees(gamma_rad);

        let orientation = Self::classify(gamma, current, config);
        Ok((Self::remap(beta, gamma, orientation), orientation))
    }

    /// Hysteresis: enter landscape above the high threshold, leave below the low one.
    pub fn classify(
        gamma_deg: f64,
        current: DeviceOrientation,
        config: &CaptureConfig,
    ) -> DeviceOrientation {
        let magnitude = gamma_deg.abs();
        match current {
            DeviceOrientation::Portrait if magnitude > config.landscape_enter_deg => {
                DeviceOrientation::Landscape
            }
            DeviceOrientation::Landscape if magnitude < config.landscape_exit_deg => {
                DeviceOrientation::Portrait
            }
            unchanged => unchanged,
        }
    }

    pub fn remap(beta_deg: f64, gamma_deg: f64, orientation: DeviceOrientation) -> AttitudeState {
        match orientation {
            DeviceOrientation::Portrait => AttitudeState {
                pitch: beta_deg,
                roll: gamma_deg,
            },
            DeviceOrientation::Landscape => AttitudeState {
                pitch: -gamma_deg,
                roll: -beta_deg,
            },
        }
    }

    /// Forgets smoothing history and adopts a new starting orientation.
    pub fn reset(&mut self, orientation: DeviceOrientation) {
        self.orientation = orientation;
        self.pitch_spring.reset();
        self.roll_spring.reset();
    }
}

impl ProcessingStage for OrientationFilter {
    type Input = OrientationSample;
    type Output = OrientationUpdate;

    fn initialize(&mut self, config: &CaptureConfig) -> StageResult<()> {
        self.pitch_spring = CriticallyDampedSpring::new(config.smoothing_omega);
        self.roll_spring = CriticallyDampedSpring::new(config.smoothing_omega);
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, input: OrientationSample) -> StageResult<OrientationUpdate> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| StageError::Internal("stage not initialized".into()))?;

        let (attitude, orientation) = Self::update(&input, self.orientation, config)?;
        let flipped = orientation != self.orientation;
        if flipped {
            self.logger
                .record(&format!("orientation {:?} -> {:?}", self.orientation, orientation));
        }
        self.orientation = orientation;

        let dt = config.sample_interval_secs();
        let smoothed = AttitudeState {
            pitch: self
                .pitch_spring
                .step(attitude.pitch - config.pitch_target_deg, dt),
            roll: self.roll_spring.step(attitude.roll, dt),
        };

        Ok(OrientationUpdate {
            attitude,
            orientation,
            flipped,
            smoothed,
        })
    }

    fn cleanup(&mut self) {
        self.pitch_spring.reset();
        self.roll_spring.reset();
        self.config = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initialized(initial: DeviceOrientation) -> OrientationFilter {
        let mut filter = OrientationFilter::new(initial);
        filter.initialize(&CaptureConfig::default()).unwrap();
        filter
    }

    #[test]
    fn radians_are_converted_before_remap() {
        let config = CaptureConfig::default();
        let sample = OrientationSample::new(std::f64::consts::FRAC_PI_2, 0.0);
        let (attitude, orientation) =
            OrientationFilter::update(&sample, DeviceOrientation::Portrait, &config).unwrap();
        assert_eq!(orientation, DeviceOrientation::Portrait);
        assert!((attitude.pitch - 90.0).abs() < 1e-9);
        assert_eq!(attitude.roll, 0.0);
    }

    #[test]
    fn monotonic_gamma_sweep_flips_once_above_enter_threshold() {
        let mut filter = initialized(DeviceOrientation::Portrait);
        let config = CaptureConfig::default();
        let mut flips = Vec::new();
        for step in 0..90 {
            let gamma = step as f64 + 0.5;
            let update = filter
                .execute(OrientationSample::from_degrees(0.0, gamma))
                .unwrap();
            if update.flipped {
                flips.push(step);
            }
            if gamma < config.landscape_enter_deg {
                assert_eq!(update.orientation, DeviceOrientation::Portrait);
            } else {
                assert_eq!(update.orientation, DeviceOrientation::Landscape);
            }
        }
        assert_eq!(flips, vec![60]);
    }

    #[test]
    fn landscape_holds_inside_the_band() {
        let config = CaptureConfig::default();
        let mid = (config.landscape_enter_deg + config.landscape_exit_deg) / 2.0;
        assert_eq!(
            OrientationFilter::classify(mid, DeviceOrientation::Landscape, &config),
            DeviceOrientation::Landscape
        );
        assert_eq!(
            OrientationFilter::classify(mid, DeviceOrientation::Portrait, &config),
            DeviceOrientation::Portrait
        );
        assert_eq!(
            OrientationFilter::classify(config.landscape_exit_deg - 1.0, DeviceOrientation::Landscape, &config),
            DeviceOrientation::Portrait
        );
    }

    #[test]
    fn flipping_sample_is_remapped_with_the_new_orientation() {
        let mut filter = initialized(DeviceOrientation::Portrait);
        let update = filter
            .execute(OrientationSample::from_degrees(2.0, -70.0))
            .unwrap();
        assert!(update.flipped);
        assert!((update.attitude.pitch - 70.0).abs() < 1e-9);
        assert!((update.attitude.roll + 2.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_sample_leaves_state_untouched() {
        let mut filter = initialized(DeviceOrientation::Landscape);
        let result = filter.execute(OrientationSample {
            beta_rad: None,
            gamma_rad: Some(0.0),
        });
        assert!(matches!(result, Err(StageError::InvalidInput(_))));
        assert_eq!(filter.orientation(), DeviceOrientation::Landscape);
    }

    #[test]
    fn execute_requires_initialization() {
        let mut filter = OrientationFilter::new(DeviceOrientation::Portrait);
        let result = filter.execute(OrientationSample::new(0.0, 0.0));
        assert!(matches!(result, Err(StageError::Internal(_))));
    }

    #[test]
    fn viewport_guess_uses_aspect_ratio() {
        assert_eq!(
            DeviceOrientation::from_viewport(&Viewport::new(800.0, 400.0)),
            DeviceOrientation::Landscape
        );
        assert_eq!(
            DeviceOrientation::from_viewport(&Viewport::new(390.0, 844.0)),
            DeviceOrientation::Portrait
        );
    }
}
