use crate::devices::DeviceProfile;
use crate::generator::profile::ScenarioConfig;
use anyhow::Context;
use capturecore::CaptureConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub capture: CaptureConfig,
    pub scenario: ScenarioConfig,
    pub devices: DeviceProfile,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config
            .capture
            .validate()
            .with_context(|| format!("validating workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(pitch_min: f64, pitch_max: f64, hold_samples: usize, seed: u64) -> Self {
        let capture = CaptureConfig {
            pitch_min_deg: pitch_min,
            pitch_max_deg: pitch_max,
            pitch_target_deg: (pitch_min + pitch_max) / 2.0,
            ..Default::default()
        };
        let scenario = ScenarioConfig {
            hold_samples,
            hold_pitch_deg: capture.pitch_target_deg,
            seed,
            ..Default::default()
        };
        Self {
            capture,
            scenario,
            devices: DeviceProfile::default(),
        }
    }
}
