pub mod driver;
pub mod state;

pub use driver::{SessionDriver, SessionHandle};
pub use state::{CaptureSession, SessionPhase, SessionSnapshot};

use crate::prelude::{ConfigError, StageError};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
    #[error("session has been shut down")]
    Closed,
}
