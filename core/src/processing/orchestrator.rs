use crate::device_interface::{
    CameraDevice, CaptureMetadata, CaptureOptions, CapturedPhoto, DeviceError, GeoPosition,
    LocationProvider,
};
use crate::processing::gate::UnmetCondition;
use crate::session::{CaptureSession, SessionPhase};
use crate::telemetry::log::LogManager;
use chrono::Utc;
use std::time::Duration;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("not ready to capture: {0}")]
    NotReady(#[from] UnmetCondition),
    #[error("a captured photo is awaiting review")]
    PhotoPending,
    #[error("capture failed: {0}")]
    CaptureFailure(String),
    #[error("persistence failed: {0}")]
    PersistenceFailure(String),
    #[error("session has been shut down")]
    SessionClosed,
}

/// Image plus metadata handed back to the caller for labeling and persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOutcome {
    pub photo: CapturedPhoto,
    pub metadata: CaptureMetadata,
}

/// Guards, runs and records a single shutter action.
pub struct CaptureOrchestrator {
    options: CaptureOptions,
    logger: LogManager,
}

impl Default for CaptureOrchestrator {
    fn default() -> Self {
        Self::new(CaptureOptions::default())
    }
}

impl CaptureOrchestrator {
    pub fn new(options: CaptureOptions) -> Self {
        Self {
            options,
            logger: LogManager::new("orchestrator"),
        }
    }

    /// Fails without touching the session unless the gate allows capture and
    /// the camera returns an image. Location is best-effort.
    pub async fn attempt<C, L>(
        &self,
        session: &mut CaptureSession,
        camera: &C,
        location: &L,
    ) -> Result<CaptureOutcome, CaptureError>
    where
        C: CameraDevice,
        L: LocationProvider,
    {
        if session.phase() == SessionPhase::Reviewing {
            return Err(CaptureError::PhotoPending);
        }
        if let Err(unmet) = session.gate().check_ready() {
            self.logger.trace(&format!("capture refused: {}", unmet));
            return Err(CaptureError::NotReady(unmet));
        }

        let timestamp = Utc::now();
        let marker_confirmed = session.gate().marker_in_frame();
        let timeout = Duration::from_millis(session.config().position_timeout_ms);
        let metrics = session.metrics().clone();

        let (position, photo) = tokio::join!(
            self.locate(location, timeout),
            camera.capture(self.options)
        );

        let photo = match photo {
            Ok(photo) if photo.has_image() => photo,
            Ok(_) => {
                metrics.record_capture_failure();
                self.logger.warn("camera returned no image");
                return Err(CaptureError::CaptureFailure("no image returned".into()));
            }
            Err(err) => {
                metrics.record_capture_failure();
                self.logger.warn(&format!("camera failed: {}", err));
                return Err(CaptureError::CaptureFailure(err.to_string()));
            }
        };

        if position.is_none() {
            metrics.record_location_fallback();
        }
        let focal_length = if self.options.exif_requested {
            photo.focal_length.filter(|f| f.is_finite())
        } else {
            None
        };

        let metadata = CaptureMetadata {
            timestamp,
            location: position,
            focal_length,
            marker_confirmed,
        };
        session.mark_captured();
        metrics.record_capture();
        self.logger.record(&format!(
            "captured at {} lat {} lon {} marker {}",
            metadata.timestamp.to_rfc3339(),
            metadata.latitude_label(),
            metadata.longitude_label(),
            metadata.marker_confirmed
        ));

        Ok(CaptureOutcome { photo, metadata })
    }

    async fn locate<L: LocationProvider>(
        &self,
        location: &L,
        timeout: Duration,
    ) -> Option<GeoPosition> {
        let result = match tokio::time::timeout(timeout, location.current_position(timeout)).await {
            Ok(result) => result,
            Err(_) => Err(DeviceError::Timeout(timeout)),
        };
        match result {
            Ok(position) if position.latitude.is_finite() && position.longitude.is_finite() => {
                Some(position)
            }
            Ok(position) => {
                self.logger
                    .warn(&format!("discarding non-finite position {:?}", position));
                None
            }
            Err(err) => {
                self.logger
                    .warn(&format!("location unavailable, using sentinel: {}", err));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_interface::{BoundingBox, MarkerEvent, NoHaptics, OrientationSample, Viewport};
    use crate::prelude::CaptureConfig;
    use std::sync::Arc;

    struct FixedCamera {
        result: Result<CapturedPhoto, DeviceError>,
    }

    impl CameraDevice for FixedCamera {
        async fn capture(&self, _options: CaptureOptions) -> Result<CapturedPhoto, DeviceError> {
            self.result.clone()
        }
    }

    struct SlowLocation {
        delay: Duration,
        result: Result<GeoPosition, DeviceError>,
    }

    impl LocationProvider for SlowLocation {
        async fn current_position(&self, _timeout: Duration) -> Result<GeoPosition, DeviceError> {
            tokio::time::sleep(self.delay).await;
            self.result.clone()
        }
    }

    fn photo() -> CapturedPhoto {
        CapturedPhoto {
            bytes: vec![0xFF, 0xD8, 0xFF],
            uri: None,
            focal_length: Some(4.25),
        }
    }

    fn camera_ok() -> FixedCamera {
        FixedCamera { result: Ok(photo()) }
    }

    fn location_at(lat: f64, lon: f64) -> SlowLocation {
        SlowLocation {
            delay: Duration::from_millis(0),
            result: Ok(GeoPosition {
                latitude: lat,
                longitude: lon,
            }),
        }
    }

    fn ready_session(config: CaptureConfig) -> CaptureSession {
        let mut session =
            CaptureSession::new(config, Viewport::new(400.0, 800.0), Arc::new(NoHaptics)).unwrap();
        session
            .on_orientation(OrientationSample::from_degrees(65.0, 0.0))
            .unwrap();
        session
            .on_marker(MarkerEvent::qr(BoundingBox::new(190.0, 390.0, 20.0, 20.0)))
            .unwrap();
        session
    }

    #[tokio::test]
    async fn successful_capture_assembles_metadata_and_suspends_scanning() {
        let mut session = ready_session(CaptureConfig::default());
        let outcome = CaptureOrchestrator::default()
            .attempt(&mut session, &camera_ok(), &location_at(21.1619, -86.8515))
            .await
            .unwrap();

        assert_eq!(outcome.metadata.location.unwrap().latitude, 21.1619);
        assert_eq!(outcome.metadata.focal_length, Some(4.25));
        assert!(outcome.metadata.marker_confirmed);
        assert_eq!(session.phase(), SessionPhase::Reviewing);
        assert_eq!(session.metrics().snapshot().captures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn location_timeout_falls_back_to_sentinel() {
        let mut session = ready_session(CaptureConfig {
            position_timeout_ms: 100,
            ..Default::default()
        });
        let slow = SlowLocation {
            delay: Duration::from_secs(30),
            result: Ok(GeoPosition {
                latitude: 1.0,
                longitude: 1.0,
            }),
        };
        let outcome = CaptureOrchestrator::default()
            .attempt(&mut session, &camera_ok(), &slow)
            .await
            .unwrap();
        assert!(outcome.metadata.location.is_none());
        assert_eq!(session.metrics().snapshot().location_fallbacks, 1);
    }

    #[tokio::test]
    async fn permission_denied_location_does_not_block_capture() {
        let mut session = ready_session(CaptureConfig::default());
        let denied = SlowLocation {
            delay: Duration::from_millis(0),
            result: Err(DeviceError::PermissionDenied("location".into())),
        };
        let outcome = CaptureOrchestrator::default()
            .attempt(&mut session, &camera_ok(), &denied)
            .await
            .unwrap();
        assert_eq!(outcome.metadata.latitude_label(), crate::device_interface::UNAVAILABLE);
    }

    #[tokio::test]
    async fn camera_failure_leaves_session_untouched() {
        let mut session = ready_session(CaptureConfig::default());
        let before = session.snapshot();
        let broken = FixedCamera {
            result: Err(DeviceError::Failed("shutter jammed".into())),
        };
        let err = CaptureOrchestrator::default()
            .attempt(&mut session, &broken, &location_at(0.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::CaptureFailure(_)));
        assert_eq!(session.snapshot(), before);
        assert_eq!(session.metrics().snapshot().capture_failures, 1);

        let empty = FixedCamera {
            result: Ok(CapturedPhoto {
                bytes: Vec::new(),
                uri: None,
                focal_length: None,
            }),
        };
        let err = CaptureOrchestrator::default()
            .attempt(&mut session, &empty, &location_at(0.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::CaptureFailure(_)));
        assert_eq!(session.phase(), SessionPhase::Scanning);
    }

    #[tokio::test]
    async fn not_ready_reports_unleveled_before_untilted_before_marker() {
        let mut session =
            CaptureSession::new(CaptureConfig::default(), Viewport::new(400.0, 800.0), Arc::new(NoHaptics))
                .unwrap();
        let orchestrator = CaptureOrchestrator::default();

        session
            .on_orientation(OrientationSample::from_degrees(10.0, 20.0))
            .unwrap();
        let err = orchestrator
            .attempt(&mut session, &camera_ok(), &location_at(0.0, 0.0))
            .await
            .unwrap_err();
        assert_eq!(err, CaptureError::NotReady(UnmetCondition::Unleveled));

        session
            .on_orientation(OrientationSample::from_degrees(10.0, 0.0))
            .unwrap();
        let err = orchestrator
            .attempt(&mut session, &camera_ok(), &location_at(0.0, 0.0))
            .await
            .unwrap_err();
        assert_eq!(err, CaptureError::NotReady(UnmetCondition::Untilted));

        session
            .on_orientation(OrientationSample::from_degrees(65.0, 0.0))
            .unwrap();
        let err = orchestrator
            .attempt(&mut session, &camera_ok(), &location_at(0.0, 0.0))
            .await
            .unwrap_err();
        assert_eq!(err, CaptureError::NotReady(UnmetCondition::MarkerNotVisible));
    }

    #[tokio::test]
    async fn second_capture_requires_reset() {
        let mut session = ready_session(CaptureConfig::default());
        let orchestrator = CaptureOrchestrator::default();
        orchestrator
            .attempt(&mut session, &camera_ok(), &location_at(0.0, 0.0))
            .await
            .unwrap();
        let err = orchestrator
            .attempt(&mut session, &camera_ok(), &location_at(0.0, 0.0))
            .await
            .unwrap_err();
        assert_eq!(err, CaptureError::PhotoPending);
    }

    #[tokio::test]
    async fn relaxed_marker_requirement_records_unconfirmed_marker() {
        let mut session = CaptureSession::new(
            CaptureConfig {
                require_marker: false,
                ..Default::default()
            },
            Viewport::new(400.0, 800.0),
            Arc::new(NoHaptics),
        )
        .unwrap();
        session
            .on_orientation(OrientationSample::from_degrees(65.0, 0.0))
            .unwrap();
        let outcome = CaptureOrchestrator::default()
            .attempt(&mut session, &camera_ok(), &location_at(0.0, 0.0))
            .await
            .unwrap();
        assert!(!outcome.metadata.marker_confirmed);
    }
}
