use capturecore::device_interface::{CaptureMetadata, SavedRecord};
use capturecore::telemetry::SessionMetrics;
use capturecore::SessionSnapshot;
use serde::{Deserialize, Serialize};

/// Everything an operator screen needs to render the current session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusModel {
    pub session: SessionSnapshot,
    pub metrics: SessionMetrics,
    /// Metadata of the photo awaiting a label, if any.
    pub pending: Option<CaptureMetadata>,
    pub last_saved: Option<SavedRecord>,
}
