use log::{debug, info, warn};

/// Thin scoped wrapper over the `log` facade so every stage tags its output.
pub struct LogManager {
    scope: &'static str,
}

impl LogManager {
    pub fn new(scope: &'static str) -> Self {
        Self { scope }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.scope, message);
    }

    pub fn trace(&self, message: &str) {
        debug!("[{}] {}", self.scope, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.scope, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("capture")
    }
}
