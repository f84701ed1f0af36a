use crate::prelude::{CaptureConfig, ProcessingStage, StageResult};
use crate::processing::readiness::ReadinessFlags;
use crate::telemetry::log::LogManager;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GateState {
    #[default]
    Idle,
    /// Pose holds, marker not (yet) inside the ROI.
    PartiallyReady,
    Ready,
}

/// Haptic latch for the current readiness window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DebounceState {
    pub haptic_fired: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateInput {
    Pose(ReadinessFlags),
    Marker(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateOutput {
    pub state: GateState,
    pub marker_in_frame: bool,
    pub ready_to_capture: bool,
    /// Set only on the update that should fire the one-shot pulse.
    pub haptic_pulse: bool,
}

/// First failing sub-condition, in the order an operator fixes them.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnmetCondition {
    #[error("device is not level")]
    Unleveled,
    #[error("device is not tilted into the pitch band")]
    Untilted,
    #[error("marker is not inside the frame")]
    MarkerNotVisible,
}

/// Combines pose flags and marker presence into the shutter signal.
pub struct CaptureGate {
    flags: ReadinessFlags,
    marker_in_frame: bool,
    state: GateState,
    debounce: DebounceState,
    require_marker: bool,
    logger: LogManager,
}

impl Default for CaptureGate {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureGate {
    pub fn new() -> Self {
        Self {
            flags: ReadinessFlags::default(),
            marker_in_frame: false,
            state: GateState::Idle,
            debounce: DebounceState::default(),
            require_marker: true,
            logger: LogManager::new("gate"),
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn flags(&self) -> ReadinessFlags {
        self.flags
    }

    pub fn marker_in_frame(&self) -> bool {
        self.marker_in_frame
    }

    pub fn debounce(&self) -> DebounceState {
        self.debounce
    }

    pub fn ready_to_capture(&self) -> bool {
        self.flags.leveled && self.flags.tilted && self.marker_in_frame
    }

    /// Ok when the shutter may fire; otherwise the first unmet condition.
    pub fn check_ready(&self) -> Result<(), UnmetCondition> {
        if !self.flags.leveled {
            return Err(UnmetCondition::Unleveled);
        }
        if !self.flags.tilted {
            return Err(UnmetCondition::Untilted);
        }
        if self.require_marker && !self.marker_in_frame {
            return Err(UnmetCondition::MarkerNotVisible);
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.flags = ReadinessFlags::default();
        self.marker_in_frame = false;
        self.state = GateState::Idle;
        self.debounce = DebounceState::default();
    }

    fn apply_pose(&mut self, flags: ReadinessFlags) -> bool {
        let was_posed = self.flags.pose_ok();
        self.flags = flags;

        if !flags.pose_ok() {
            // Either flag dropping closes the readiness window.
            if self.state != GateState::Idle {
                self.logger.trace("pose lost, gate idle");
            }
            self.state = GateState::Idle;
            self.marker_in_frame = false;
            self.debounce.haptic_fired = false;
            return false;
        }

        if was_posed {
            return false;
        }

        // Marker is always false here: it is cleared whenever the pose drops.
        self.state = GateState::PartiallyReady;
        if self.debounce.haptic_fired {
            return false;
        }
        self.debounce.haptic_fired = true;
        self.logger.trace("pose reached, haptic pulse");
        true
    }

    fn apply_marker(&mut self, in_roi: bool) {
        if !self.flags.pose_ok() {
            self.marker_in_frame = false;
            return;
        }
        self.marker_in_frame = in_roi;
        let next = if in_roi {
            GateState::Ready
        } else {
            GateState::PartiallyReady
        };
        if next != self.state {
            self.logger.trace(&format!("gate {:?} -> {:?}", self.state, next));
        }
        self.state = next;
    }
}

impl ProcessingStage for CaptureGate {
    type Input = GateInput;
    type Output = GateOutput;

    fn initialize(&mut self, config: &CaptureConfig) -> StageResult<()> {
        self.require_marker = config.require_marker;
        Ok(())
    }

    fn execute(&mut self, input: GateInput) -> StageResult<GateOutput> {
        let haptic_pulse = match input {
            GateInput::Pose(flags) => self.apply_pose(flags),
            GateInput::Marker(in_roi) => {
                self.apply_marker(in_roi);
                false
            }
        };
        Ok(GateOutput {
            state: self.state,
            marker_in_frame: self.marker_in_frame,
            ready_to_capture: self.ready_to_capture(),
            haptic_pulse,
        })
    }

    fn cleanup(&mut self) {
        self.reset();
    }
}
