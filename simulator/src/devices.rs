use capturecore::device_interface::{
    CameraDevice, CaptureOptions, CapturedPhoto, DeviceError, GeoPosition, HapticDevice,
    LocationProvider, SensorSource,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Behaviour of the simulated camera and location primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    pub latitude: f64,
    pub longitude: f64,
    pub location_available: bool,
    pub location_delay_ms: u64,
    pub focal_length_mm: Option<f64>,
    pub camera_fails: bool,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            latitude: 21.161908,
            longitude: -86.851528,
            location_available: true,
            location_delay_ms: 20,
            focal_length_mm: Some(4.25),
            camera_fails: false,
        }
    }
}

/// Produces a tiny JPEG-framed payload instead of a real photo.
pub struct SimulatedCamera {
    focal_length: Option<f64>,
    fails: bool,
}

impl SimulatedCamera {
    pub fn from_profile(profile: &DeviceProfile) -> Self {
        Self {
            focal_length: profile.focal_length_mm,
            fails: profile.camera_fails,
        }
    }
}

impl CameraDevice for SimulatedCamera {
    async fn capture(&self, options: CaptureOptions) -> Result<CapturedPhoto, DeviceError> {
        if self.fails {
            return Err(DeviceError::Failed("simulated shutter failure".into()));
        }
        let quality = (options.quality.clamp(0.0, 1.0) * 100.0) as u8;
        debug!("simulated capture at quality {}", quality);
        Ok(CapturedPhoto {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, quality, 0xFF, 0xD9],
            uri: None,
            focal_length: if options.exif_requested {
                self.focal_length
            } else {
                None
            },
        })
    }
}

pub struct SimulatedLocation {
    position: Option<GeoPosition>,
    delay: Duration,
}

impl SimulatedLocation {
    pub fn from_profile(profile: &DeviceProfile) -> Self {
        let position = profile.location_available.then_some(GeoPosition {
            latitude: profile.latitude,
            longitude: profile.longitude,
        });
        Self {
            position,
            delay: Duration::from_millis(profile.location_delay_ms),
        }
    }
}

impl LocationProvider for SimulatedLocation {
    async fn current_position(&self, _timeout: Duration) -> Result<GeoPosition, DeviceError> {
        tokio::time::sleep(self.delay).await;
        self.position
            .ok_or_else(|| DeviceError::Unavailable("no simulated fix".into()))
    }
}

#[derive(Default)]
pub struct CountingHaptics {
    pulses: AtomicUsize,
}

impl CountingHaptics {
    pub fn pulses(&self) -> usize {
        self.pulses.load(Ordering::SeqCst)
    }
}

impl HapticDevice for CountingHaptics {
    fn pulse(&self, success: bool) {
        let count = self.pulses.fetch_add(1, Ordering::SeqCst) + 1;
        info!("haptic pulse #{} (success={})", count, success);
    }
}

/// Scripted orientation source; records the cadence the session asked for.
#[derive(Default)]
pub struct ScriptedSensor {
    interval: Option<Duration>,
}

impl ScriptedSensor {
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}

impl SensorSource for ScriptedSensor {
    fn set_update_interval(&mut self, interval: Duration) {
        self.interval = Some(interval);
    }
}
