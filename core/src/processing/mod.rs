pub mod gate;
pub mod marker;
pub mod orchestrator;
pub mod orientation;
pub mod readiness;

pub use gate::{CaptureGate, DebounceState, GateInput, GateOutput, GateState, UnmetCondition};
pub use marker::{MarkerLocator, Roi};
pub use orchestrator::{CaptureError, CaptureOrchestrator, CaptureOutcome};
pub use orientation::{AttitudeState, DeviceOrientation, OrientationFilter, OrientationUpdate};
pub use readiness::{ReadinessEvaluator, ReadinessFlags};
