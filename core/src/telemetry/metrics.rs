use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Counters shared between the update chain and whoever reports on it.
pub struct MetricsRecorder {
    inner: Mutex<SessionMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub samples_processed: usize,
    pub samples_skipped: usize,
    pub haptic_pulses: usize,
    pub captures: usize,
    pub capture_failures: usize,
    pub location_fallbacks: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SessionMetrics::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut SessionMetrics)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_sample(&self) {
        self.update(|m| m.samples_processed += 1);
    }

    pub fn record_skipped(&self) {
        self.update(|m| m.samples_skipped += 1);
    }

    pub fn record_haptic(&self) {
        self.update(|m| m.haptic_pulses += 1);
    }

    pub fn record_capture(&self) {
        self.update(|m| m.captures += 1);
    }

    pub fn record_capture_failure(&self) {
        self.update(|m| m.capture_failures += 1);
    }

    pub fn record_location_fallback(&self) {
        self.update(|m| m.location_fallbacks += 1);
    }

    pub fn snapshot(&self) -> SessionMetrics {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            SessionMetrics::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
