//! Contracts of the platform collaborators the core drives.
//!
//! Async operations return `Send` futures so implementations can be awaited
//! from the session driver task.

use super::capture::{Abundance, CaptureMetadata, CaptureOptions, CapturedPhoto, GeoPosition, SavedRecord};
use std::future::Future;
use std::time::Duration;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("device failure: {0}")]
    Failed(String),
}

/// Device-orientation stream whose cadence the core sets explicitly.
pub trait SensorSource {
    fn set_update_interval(&mut self, interval: Duration);
}

pub trait CameraDevice: Send + Sync {
    fn capture(
        &self,
        options: CaptureOptions,
    ) -> impl Future<Output = Result<CapturedPhoto, DeviceError>> + Send;
}

pub trait LocationProvider: Send + Sync {
    fn current_position(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<GeoPosition, DeviceError>> + Send;
}

/// Fire-and-forget haptic feedback.
pub trait HapticDevice: Send + Sync {
    fn pulse(&self, success: bool);
}

pub trait PersistenceSink: Send + Sync {
    fn save(
        &self,
        photo: &CapturedPhoto,
        metadata: &CaptureMetadata,
        label: Abundance,
    ) -> impl Future<Output = Result<SavedRecord, DeviceError>> + Send;
}

/// Haptic device for contexts without a vibration motor.
pub struct NoHaptics;

impl HapticDevice for NoHaptics {
    fn pulse(&self, _success: bool) {}
}
