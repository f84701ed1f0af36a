use crate::math::AngleHelper;
use crate::prelude::{CaptureConfig, ProcessingStage, StageError, StageResult};
use crate::processing::orientation::AttitudeState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadinessFlags {
    pub leveled: bool,
    pub tilted: bool,
}

impl ReadinessFlags {
    /// Both pose conditions hold.
    pub fn pose_ok(&self) -> bool {
        self.leveled && self.tilted
    }
}

/// Applies the fixed roll tolerance and pitch band to raw attitude.
///
/// Pitch is accepted as a band rather than target plus tolerance: the task is
/// holding the camera at a downward angle, and the band bounds both sides
/// without requiring symmetry around the target.
#[derive(Default)]
pub struct ReadinessEvaluator {
    config: Option<CaptureConfig>,
}

impl ReadinessEvaluator {
    pub fn new() -> Self {
        Self { config: None }
    }

    pub fn evaluate(pitch: f64, roll: f64, config: &CaptureConfig) -> ReadinessFlags {
        ReadinessFlags {
            leveled: roll.abs() <= config.roll_tolerance_deg,
            tilted: AngleHelper::magnitude_within(pitch, config.pitch_min_deg, config.pitch_max_deg),
        }
    }
}

impl ProcessingStage for ReadinessEvaluator {
    type Input = AttitudeState;
    type Output = ReadinessFlags;

    fn initialize(&mut self, config: &CaptureConfig) -> StageResult<()> {
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, input: AttitudeState) -> StageResult<ReadinessFlags> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| StageError::Internal("stage not initialized".into()))?;
        Ok(Self::evaluate(input.pitch, input.roll, config))
    }

    fn cleanup(&mut self) {
        self.config = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_tolerance_is_inclusive() {
        let config = CaptureConfig::default();
        let tol = config.roll_tolerance_deg;
        for roll in [0.0, tol / 2.0, tol, -tol] {
            assert!(ReadinessEvaluator::evaluate(65.0, roll, &config).leveled, "roll {}", roll);
        }
        for roll in [tol + 1e-6, -(tol + 0.5), 45.0] {
            assert!(!ReadinessEvaluator::evaluate(65.0, roll, &config).leveled, "roll {}", roll);
        }
    }

    #[test]
    fn pitch_band_is_inclusive_on_both_ends() {
        let config = CaptureConfig::default();
        for pitch in [config.pitch_min_deg, 65.0, config.pitch_max_deg, -config.pitch_max_deg] {
            assert!(ReadinessEvaluator::evaluate(pitch, 0.0, &config).tilted, "pitch {}", pitch);
        }
        for pitch in [config.pitch_min_deg - 0.01, config.pitch_max_deg + 0.01, 0.0, 90.0] {
            assert!(!ReadinessEvaluator::evaluate(pitch, 0.0, &config).tilted, "pitch {}", pitch);
        }
    }

    #[test]
    fn stage_uses_initialized_thresholds() {
        let mut evaluator = ReadinessEvaluator::new();
        let config = CaptureConfig {
            pitch_min_deg: 65.0,
            pitch_max_deg: 75.0,
            pitch_target_deg: 70.0,
            roll_tolerance_deg: 3.0,
            ..Default::default()
        };
        evaluator.initialize(&config).unwrap();
        let flags = evaluator
            .execute(AttitudeState { pitch: 74.0, roll: 3.5 })
            .unwrap();
        assert!(flags.tilted);
        assert!(!flags.leveled);
        assert!(!flags.pose_ok());
    }
}
