pub mod capture;
pub mod primitives;
pub mod sensor;

pub use capture::{
    Abundance, CaptureMetadata, CaptureOptions, CapturedPhoto, GeoPosition, SavedRecord,
    UNAVAILABLE,
};
pub use primitives::{
    CameraDevice, DeviceError, HapticDevice, LocationProvider, NoHaptics, PersistenceSink,
    SensorSource,
};
pub use sensor::{BoundingBox, MarkerEvent, OrientationSample, Point, Size, Viewport};
