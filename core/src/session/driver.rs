//! Serializes every producer onto one consumer task that owns the session.
//!
//! Sensor, detector, viewport and operator events may come from any thread;
//! they are queued in arrival order and each is fully processed before the
//! next. Readers only ever see published snapshots.

use super::state::{CaptureSession, SessionSnapshot};
use super::SessionError;
use crate::device_interface::{
    CameraDevice, LocationProvider, MarkerEvent, OrientationSample, SensorSource, Viewport,
};
use crate::processing::orchestrator::{CaptureError, CaptureOrchestrator, CaptureOutcome};
use crate::telemetry::{LogManager, MetricsRecorder};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;

enum SessionCommand {
    Orientation(OrientationSample),
    Marker(MarkerEvent),
    Viewport(Viewport),
    Reset,
    Capture(oneshot::Sender<Result<CaptureOutcome, CaptureError>>),
    Flush(oneshot::Sender<SessionSnapshot>),
    Shutdown,
}

/// Owns the session plus the capture collaborators until spawned.
pub struct SessionDriver<C, L> {
    session: CaptureSession,
    camera: Arc<C>,
    location: Arc<L>,
    orchestrator: CaptureOrchestrator,
}

impl<C, L> SessionDriver<C, L>
where
    C: CameraDevice + 'static,
    L: LocationProvider + 'static,
{
    pub fn new(session: CaptureSession, camera: Arc<C>, location: Arc<L>) -> Self {
        Self {
            session,
            camera,
            location,
            orchestrator: CaptureOrchestrator::default(),
        }
    }

    pub fn with_orchestrator(mut self, orchestrator: CaptureOrchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Starts the consumer task on the current tokio runtime.
    pub fn spawn(self) -> SessionHandle {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (snapshots, snapshot_rx) = watch::channel(self.session.snapshot());
        let metrics = self.session.metrics().clone();
        let interval = Duration::from_millis(self.session.config().sample_interval_ms);
        let task = tokio::spawn(self.run(receiver, snapshots));

        SessionHandle {
            commands,
            snapshots: snapshot_rx,
            metrics,
            sample_interval: interval,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    async fn run(
        mut self,
        mut receiver: mpsc::UnboundedReceiver<SessionCommand>,
        snapshots: watch::Sender<SessionSnapshot>,
    ) {
        let logger = LogManager::new("driver");
        while let Some(command) = receiver.recv().await {
            match command {
                SessionCommand::Orientation(sample) => {
                    // A bad sample is skipped; the loop keeps going.
                    let _ = self.session.on_orientation(sample);
                }
                SessionCommand::Marker(event) => {
                    let _ = self.session.on_marker(event);
                }
                SessionCommand::Viewport(viewport) => {
                    if let Err(err) = self.session.on_viewport(viewport) {
                        logger.warn(&format!("ignoring viewport: {}", err));
                    }
                }
                SessionCommand::Reset => self.session.reset(),
                SessionCommand::Capture(reply) => {
                    let result = self
                        .orchestrator
                        .attempt(&mut self.session, self.camera.as_ref(), self.location.as_ref())
                        .await;
                    if reply.send(result).is_err() {
                        logger.warn("capture requester went away");
                    }
                }
                SessionCommand::Flush(reply) => {
                    let _ = reply.send(self.session.snapshot());
                }
                SessionCommand::Shutdown => break,
            }
            snapshots.send_replace(self.session.snapshot());
        }
        receiver.close();
        self.session.teardown();
    }
}

/// Cloneable producer/reader handle onto a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
    metrics: Arc<MetricsRecorder>,
    sample_interval: Duration,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionHandle {
    fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::Closed)
    }

    /// Requests the configured cadence from the orientation source.
    pub fn attach_sensor<S: SensorSource>(&self, source: &mut S) {
        source.set_update_interval(self.sample_interval);
    }

    pub fn send_orientation(&self, sample: OrientationSample) -> Result<(), SessionError> {
        self.send(SessionCommand::Orientation(sample))
    }

    pub fn send_marker(&self, event: MarkerEvent) -> Result<(), SessionError> {
        self.send(SessionCommand::Marker(event))
    }

    pub fn send_viewport(&self, viewport: Viewport) -> Result<(), SessionError> {
        self.send(SessionCommand::Viewport(viewport))
    }

    pub fn reset(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Reset)
    }

    /// Queued behind every event sent before it.
    pub async fn capture(&self) -> Result<CaptureOutcome, CaptureError> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::Capture(reply))
            .map_err(|_| CaptureError::SessionClosed)?;
        response.await.map_err(|_| CaptureError::SessionClosed)?
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    /// Resolves once every event queued before it has been processed.
    pub async fn flush(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::Flush(reply))?;
        response.await.map_err(|_| SessionError::Closed)
    }

    /// Stops the consumer after it drains queued events. Once this returns no
    /// callback can reach the session.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let task = self.task.lock().await.take();
        let Some(task) = task else {
            return Ok(());
        };
        let _ = self.commands.send(SessionCommand::Shutdown);
        task.await.map_err(|_| SessionError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}
