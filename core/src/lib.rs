//! Capture-readiness core for guided field photography.
//!
//! Orientation samples, marker detections and viewport changes flow through a
//! chain of synchronous stages into a capture gate; the shutter is only
//! allowed once the device is leveled, tilted into the pitch band and the
//! reference marker sits inside the region of interest.

pub mod device_interface;
pub mod export;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod session;
pub mod telemetry;

pub use prelude::{CaptureConfig, ProcessingStage, StageError, StageResult};
pub use session::{CaptureSession, SessionDriver, SessionHandle, SessionSnapshot};
