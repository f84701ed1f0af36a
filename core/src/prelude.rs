use serde::{Deserialize, Serialize};

/// Single source of truth for every gating threshold and session tunable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum absolute roll, inclusive, for the device to count as leveled.
    pub roll_tolerance_deg: f64,
    pub pitch_min_deg: f64,
    pub pitch_max_deg: f64,
    /// Centre of the pitch band; only drives the deviation shown to the operator.
    pub pitch_target_deg: f64,
    pub landscape_enter_deg: f64,
    pub landscape_exit_deg: f64,
    /// ROI width as a fraction of the viewport width while in portrait.
    pub roi_width_pct: f64,
    /// ROI height as a fraction of the viewport height while in portrait.
    pub roi_height_pct: f64,
    pub position_timeout_ms: u64,
    pub sample_interval_ms: u64,
    /// Natural frequency (rad/s) of the presentation springs.
    pub smoothing_omega: f64,
    /// When false the shutter only needs a valid pose; the marker is recorded but not enforced.
    pub require_marker: bool,
    pub export_prefix: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            roll_tolerance_deg: 4.0,
            pitch_min_deg: 60.0,
            pitch_max_deg: 70.0,
            pitch_target_deg: 65.0,
            landscape_enter_deg: 60.0,
            landscape_exit_deg: 30.0,
            roi_width_pct: 0.4,
            roi_height_pct: 0.2,
            position_timeout_ms: 5_000,
            sample_interval_ms: 200,
            smoothing_omega: 8.0,
            require_marker: true,
            export_prefix: "Sargazo".to_string(),
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.roll_tolerance_deg >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "roll tolerance must be non-negative, got {}",
                self.roll_tolerance_deg
            )));
        }
        if !(self.pitch_min_deg <= self.pitch_max_deg) {
            return Err(ConfigError::Invalid(format!(
                "pitch band [{}, {}] is empty",
                self.pitch_min_deg, self.pitch_max_deg
            )));
        }
        if !(self.pitch_min_deg..=self.pitch_max_deg).contains(&self.pitch_target_deg) {
            return Err(ConfigError::Invalid(format!(
                "pitch target {} lies outside [{}, {}]",
                self.pitch_target_deg, self.pitch_min_deg, self.pitch_max_deg
            )));
        }
        if !(self.landscape_exit_deg < self.landscape_enter_deg) {
            return Err(ConfigError::Invalid(format!(
                "landscape exit {} must be below enter {}",
                self.landscape_exit_deg, self.landscape_enter_deg
            )));
        }
        for (name, pct) in [
            ("roi_width_pct", self.roi_width_pct),
            ("roi_height_pct", self.roi_height_pct),
        ] {
            if !(pct > 0.0 && pct <= 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be in (0, 1], got {}",
                    name, pct
                )));
            }
        }
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::Invalid("sample interval must be positive".into()));
        }
        if !(self.smoothing_omega > 0.0) {
            return Err(ConfigError::Invalid("smoothing omega must be positive".into()));
        }
        Ok(())
    }

    pub fn sample_interval_secs(&self) -> f64 {
        self.sample_interval_ms as f64 / 1000.0
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid capture config: {0}")]
    Invalid(String),
}

/// Common error type for stage execution.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type StageResult<T> = Result<T, StageError>;

/// Synchronous stages of the per-event update chain.
pub trait ProcessingStage {
    type Input;
    type Output;

    fn initialize(&mut self, config: &CaptureConfig) -> StageResult<()>;
    fn execute(&mut self, input: Self::Input) -> StageResult<Self::Output>;
    fn cleanup(&mut self);
}
