use super::SessionError;
use crate::device_interface::{HapticDevice, MarkerEvent, OrientationSample, Viewport};
use crate::prelude::{CaptureConfig, ProcessingStage, StageError, StageResult};
use crate::processing::gate::{CaptureGate, GateInput, GateState};
use crate::processing::marker::{MarkerLocator, Roi};
use crate::processing::orientation::{AttitudeState, DeviceOrientation, OrientationFilter};
use crate::processing::readiness::{ReadinessEvaluator, ReadinessFlags};
use crate::telemetry::{LogManager, MetricsRecorder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Sensors and detector feed the gate.
    Scanning,
    /// A photo was taken; sensor and detector input is suspended until reset.
    Reviewing,
}

/// Read-only view of the derived state, published after every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub orientation: DeviceOrientation,
    pub attitude: AttitudeState,
    /// Smoothed pitch deviation from target and smoothed roll.
    pub smoothed: AttitudeState,
    pub flags: ReadinessFlags,
    pub marker_in_frame: bool,
    pub gate_state: GateState,
    pub ready_to_capture: bool,
    pub viewport: Viewport,
    pub roi: Roi,
}

/// Owns all per-session derived state and runs the update chain per event.
pub struct CaptureSession {
    config: CaptureConfig,
    viewport: Viewport,
    roi: Roi,
    phase: SessionPhase,
    attitude: AttitudeState,
    smoothed: AttitudeState,
    filter: OrientationFilter,
    evaluator: ReadinessEvaluator,
    locator: MarkerLocator,
    gate: CaptureGate,
    haptics: Arc<dyn HapticDevice>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl CaptureSession {
    pub fn new(
        config: CaptureConfig,
        viewport: Viewport,
        haptics: Arc<dyn HapticDevice>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        if !viewport.is_valid() {
            return Err(SessionError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }

        let orientation = DeviceOrientation::from_viewport(&viewport);
        let roi = Roi::for_viewport(&viewport, orientation, &config);
        let mut filter = OrientationFilter::new(orientation);
        let mut evaluator = ReadinessEvaluator::new();
        let mut locator = MarkerLocator::new();
        let mut gate = CaptureGate::new();
        filter.initialize(&config)?;
        evaluator.initialize(&config)?;
        locator.initialize(&config)?;
        gate.initialize(&config)?;
        locator.set_roi(roi);

        let logger = LogManager::new("session");
        logger.record(&format!(
            "session started {:?} viewport {}x{}",
            orientation, viewport.width, viewport.height
        ));

        Ok(Self {
            config,
            viewport,
            roi,
            phase: SessionPhase::Scanning,
            attitude: AttitudeState::default(),
            smoothed: AttitudeState::default(),
            filter,
            evaluator,
            locator,
            gate,
            haptics,
            metrics: Arc::new(MetricsRecorder::new()),
            logger,
        })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn gate(&self) -> &CaptureGate {
        &self.gate
    }

    pub fn orientation(&self) -> DeviceOrientation {
        self.filter.orientation()
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    /// Orientation → attitude → readiness → gate, all before returning.
    pub fn on_orientation(&mut self, sample: OrientationSample) -> StageResult<SessionSnapshot> {
        if self.phase == SessionPhase::Reviewing {
            return Ok(self.snapshot());
        }

        let update = match self.filter.execute(sample) {
            Ok(update) => update,
            Err(err) => {
                self.metrics.record_skipped();
                self.logger.trace(&format!("skipping sample: {}", err));
                return Err(err);
            }
        };
        if update.flipped {
            self.recompute_roi()?;
        }
        self.attitude = update.attitude;
        self.smoothed = update.smoothed;

        let flags = self.evaluator.execute(update.attitude)?;
        let output = self.gate.execute(GateInput::Pose(flags))?;
        self.forget_marker_without_pose();
        if output.haptic_pulse {
            self.haptics.pulse(true);
            self.metrics.record_haptic();
        }
        self.metrics.record_sample();
        Ok(self.snapshot())
    }

    pub fn on_marker(&mut self, event: MarkerEvent) -> StageResult<SessionSnapshot> {
        if self.phase == SessionPhase::Reviewing {
            return Ok(self.snapshot());
        }
        let in_roi = self.locator.execute(event).inspect_err(|err| {
            self.logger.trace(&format!("skipping detection: {}", err));
        })?;
        self.gate.execute(GateInput::Marker(in_roi))?;
        self.forget_marker_without_pose();
        Ok(self.snapshot())
    }

    pub fn on_viewport(&mut self, viewport: Viewport) -> StageResult<SessionSnapshot> {
        if !viewport.is_valid() {
            return Err(StageError::InvalidInput(format!(
                "viewport {}x{}",
                viewport.width, viewport.height
            )));
        }
        self.viewport = viewport;
        self.recompute_roi()?;
        Ok(self.snapshot())
    }

    /// Retake: discards derived state and resumes scanning.
    pub fn reset(&mut self) {
        let orientation = self.filter.orientation();
        self.filter.reset(orientation);
        self.gate.reset();
        self.locator.forget();
        self.attitude = AttitudeState::default();
        self.smoothed = AttitudeState::default();
        self.phase = SessionPhase::Scanning;
        self.refresh_roi();
        self.logger.record("session reset");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            orientation: self.filter.orientation(),
            attitude: self.attitude,
            smoothed: self.smoothed,
            flags: self.gate.flags(),
            marker_in_frame: self.gate.marker_in_frame(),
            gate_state: self.gate.state(),
            ready_to_capture: self.gate.ready_to_capture(),
            viewport: self.viewport,
            roi: self.roi,
        }
    }

    pub(crate) fn mark_captured(&mut self) {
        self.phase = SessionPhase::Reviewing;
    }

    /// Releases stage state; the session must not be fed afterwards.
    pub(crate) fn teardown(&mut self) {
        self.filter.cleanup();
        self.evaluator.cleanup();
        self.locator.cleanup();
        self.gate.cleanup();
        self.logger.record("session torn down");
    }

    fn refresh_roi(&mut self) {
        self.roi = Roi::for_viewport(&self.viewport, self.filter.orientation(), &self.config);
        self.locator.set_roi(self.roi);
    }

    /// Moves the ROI and re-runs the last detection through the gate.
    fn recompute_roi(&mut self) -> StageResult<()> {
        self.refresh_roi();
        let in_roi = self.locator.relocate();
        self.gate.execute(GateInput::Marker(in_roi))?;
        Ok(())
    }

    /// A detection only counts within the pose window it was seen in.
    fn forget_marker_without_pose(&mut self) {
        if !self.gate.flags().pose_ok() {
            self.locator.forget();
        }
    }
}
