use crate::device_interface::{BoundingBox, MarkerEvent, Viewport};
use crate::prelude::{CaptureConfig, ProcessingStage, StageError, StageResult};
use crate::processing::orientation::DeviceOrientation;
use serde::{Deserialize, Serialize};

/// Region of interest in viewport coordinates; bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    pub x_start: f64,
    pub x_end: f64,
    pub y_start: f64,
    pub y_end: f64,
}

impl Roi {
    /// Centered ROI; percentages swap in landscape so the marker geometry
    /// stays the same relative to how the device is held.
    pub fn for_viewport(
        viewport: &Viewport,
        orientation: DeviceOrientation,
        config: &CaptureConfig,
    ) -> Self {
        let (width_pct, height_pct) = match orientation {
            DeviceOrientation::Portrait => (config.roi_width_pct, config.roi_height_pct),
            DeviceOrientation::Landscape => (config.roi_height_pct, config.roi_width_pct),
        };
        let half_width = viewport.width * width_pct / 2.0;
        let half_height = viewport.height * height_pct / 2.0;
        let x_center = viewport.width / 2.0;
        let y_center = viewport.height / 2.0;
        Self {
            x_start: x_center - half_width,
            x_end: x_center + half_width,
            y_start: y_center - half_height,
            y_end: y_center + half_height,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_start && x <= self.x_end && y >= self.y_start && y <= self.y_end
    }
}

/// Decides whether a detected marker sits inside the ROI.
///
/// The last detected bounds are kept so the decision can be repeated when the
/// ROI moves without a new detection.
#[derive(Default)]
pub struct MarkerLocator {
    roi: Option<Roi>,
    last_bounds: Option<BoundingBox>,
}

impl MarkerLocator {
    pub fn new() -> Self {
        Self {
            roi: None,
            last_bounds: None,
        }
    }

    pub fn locate(bounds: &BoundingBox, roi: &Roi) -> bool {
        let center = bounds.centroid();
        roi.contains(center.x, center.y)
    }

    pub fn set_roi(&mut self, roi: Roi) {
        self.roi = Some(roi);
    }

    pub fn roi(&self) -> Option<Roi> {
        self.roi
    }

    /// Re-evaluates the last detection against the current ROI; false when
    /// nothing has been detected.
    pub fn relocate(&self) -> bool {
        match (self.last_bounds.as_ref(), self.roi.as_ref()) {
            (Some(bounds), Some(roi)) => Self::locate(bounds, roi),
            _ => false,
        }
    }

    pub fn forget(&mut self) {
        self.last_bounds = None;
    }
}

impl ProcessingStage for MarkerLocator {
    type Input = MarkerEvent;
    type Output = bool;

    fn initialize(&mut self, _config: &CaptureConfig) -> StageResult<()> {
        Ok(())
    }

    fn execute(&mut self, input: MarkerEvent) -> StageResult<bool> {
        let roi = self
            .roi
            .as_ref()
            .ok_or_else(|| StageError::Internal("ROI not computed".into()))?;
        if !input.bounds.is_valid() {
            return Err(StageError::InvalidInput(format!(
                "malformed marker bounds {:?}",
                input.bounds
            )));
        }
        let in_roi = Self::locate(&input.bounds, roi);
        self.last_bounds = Some(input.bounds);
        Ok(in_roi)
    }

    fn cleanup(&mut self) {
        self.roi = None;
        self.last_bounds = None;
    }
}
