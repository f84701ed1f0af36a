use crate::devices::{CountingHaptics, ScriptedSensor, SimulatedCamera, SimulatedLocation};
use crate::generator::profile::{build_event_stream, ScenarioEvent};
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use capturecore::device_interface::{Abundance, CaptureMetadata, PersistenceSink, SavedRecord};
use capturecore::processing::CaptureError;
use capturecore::telemetry::SessionMetrics;
use capturecore::{CaptureSession, SessionDriver, SessionSnapshot};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

pub struct WorkflowResult {
    pub events_sent: usize,
    pub orientation_flips: usize,
    pub haptic_pulses: usize,
    /// Times the gate opened; capture ends the scan so this is at most one.
    pub ready_transitions: usize,
    /// Index of the first orientation sample after which capture was allowed.
    pub first_ready_sample: Option<usize>,
    pub metadata: Option<CaptureMetadata>,
    pub saved: Option<SavedRecord>,
    pub metrics: SessionMetrics,
    pub final_snapshot: SessionSnapshot,
    pub sensor_interval: Option<Duration>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    realtime: bool,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            realtime: false,
        }
    }

    /// Sleep one sensor interval between samples instead of replaying instantly.
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub async fn execute<S: PersistenceSink>(
        &self,
        sink: &S,
        label: Abundance,
    ) -> anyhow::Result<WorkflowResult> {
        let haptics = Arc::new(CountingHaptics::default());
        let session = CaptureSession::new(
            self.config.capture.clone(),
            self.config.scenario.viewport(),
            haptics.clone(),
        )
        .context("creating capture session")?;
        let handle = SessionDriver::new(
            session,
            Arc::new(SimulatedCamera::from_profile(&self.config.devices)),
            Arc::new(SimulatedLocation::from_profile(&self.config.devices)),
        )
        .spawn();

        let mut sensor = ScriptedSensor::default();
        handle.attach_sensor(&mut sensor);
        let pace = sensor
            .interval()
            .unwrap_or(Duration::from_millis(self.config.capture.sample_interval_ms));

        let events = build_event_stream(&self.config.scenario, &self.config.capture);
        let mut orientation = handle.snapshot().orientation;
        let mut orientation_flips = 0;
        let mut first_ready_sample = None;
        let mut ready_transitions = 0;
        let mut was_ready = false;
        let mut sample_index = 0;
        let mut captured = None;

        for event in &events {
            match event {
                ScenarioEvent::Orientation(sample) => {
                    handle.send_orientation(*sample)?;
                    sample_index += 1;
                    if self.realtime {
                        tokio::time::sleep(pace).await;
                    }
                }
                ScenarioEvent::Marker(marker) => handle.send_marker(marker.clone())?,
            }

            let snapshot = handle.flush().await?;
            if snapshot.orientation != orientation {
                orientation_flips += 1;
                orientation = snapshot.orientation;
            }
            if snapshot.ready_to_capture && !was_ready {
                ready_transitions += 1;
            }
            was_ready = snapshot.ready_to_capture;
            if !snapshot.ready_to_capture || captured.is_some() {
                continue;
            }
            first_ready_sample.get_or_insert(sample_index);
            match handle.capture().await {
                Ok(outcome) => captured = Some(outcome),
                Err(CaptureError::NotReady(unmet)) => {
                    warn!("gate closed before shutter: {}", unmet);
                }
                Err(err) => {
                    handle.shutdown().await.ok();
                    return Err(err).context("capturing photo");
                }
            }
        }

        let saved = match &captured {
            Some(outcome) => {
                let record = sink
                    .save(&outcome.photo, &outcome.metadata, label)
                    .await
                    .map_err(|err| CaptureError::PersistenceFailure(err.to_string()))
                    .context("persisting capture")?;
                info!("capture saved to {}", record.location);
                Some(record)
            }
            None => {
                warn!("scenario ended without reaching capture readiness");
                None
            }
        };

        let final_snapshot = handle.flush().await?;
        handle.shutdown().await?;

        Ok(WorkflowResult {
            events_sent: events.len(),
            orientation_flips,
            haptic_pulses: haptics.pulses(),
            ready_transitions,
            first_ready_sample,
            metadata: captured.map(|outcome| outcome.metadata),
            saved,
            metrics: handle.metrics().snapshot(),
            final_snapshot,
            sensor_interval: sensor.interval(),
        })
    }
}
