use anyhow::Context;
use capturecore::device_interface::{Abundance, PersistenceSink};
use capturecore::{CaptureSession, SessionDriver};
use clap::Parser;
use devices::{CountingHaptics, SimulatedCamera, SimulatedLocation};
use gui_bridge::bridge::GuiBridge;
use log::{info, warn};
use persistence::{LocalExportSink, RemoteSink};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::runner::{Runner, WorkflowResult};

mod devices;
mod generator;
mod gui_bridge;
mod persistence;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Scenario driver for the capture-readiness core")]
struct Args {
    /// Replay one scenario end to end and append a summary report
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 60.0)]
    pitch_min: f64,
    #[arg(long, default_value_t = 70.0)]
    pitch_max: f64,
    /// Samples to hold the target pose for
    #[arg(long, default_value_t = 30)]
    samples: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Abundance label attached to the saved capture
    #[arg(long, default_value_t = Abundance::Some)]
    label: Abundance,
    #[arg(long, default_value = "captures")]
    output_dir: PathBuf,
    /// Upload to a remote record store instead of writing locally
    #[arg(long)]
    upload_url: Option<String>,
    /// Pace samples at the configured sensor interval
    #[arg(long, default_value_t = false)]
    realtime: bool,
    /// Keep an HTTP bridge open for live events
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long, default_value = "127.0.0.1:9000")]
    bind: SocketAddr,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow.as_ref() {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.pitch_min, args.pitch_max, args.samples, args.seed)
    };
    workflow_config
        .capture
        .validate()
        .context("validating capture thresholds")?;
    if let Some(description) = workflow_config.scenario.description.as_deref() {
        info!("scenario: {}", description);
    }

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating tokio runtime")?;

    runtime.block_on(async {
        let prefix = workflow_config.capture.export_prefix.clone();
        if args.offline {
            let runner = Runner::new(workflow_config.clone()).realtime(args.realtime);
            let result = match args.upload_url.as_deref() {
                Some(url) => runner.execute(&RemoteSink::new(url), args.label).await?,
                None => {
                    let sink = LocalExportSink::new(&args.output_dir, prefix.as_str());
                    runner.execute(&sink, args.label).await?
                }
            };
            report(&result, args.label)?;
        }
        if args.serve {
            match args.upload_url.as_deref() {
                Some(url) => serve(&workflow_config, RemoteSink::new(url), args.bind).await?,
                None => {
                    let sink = LocalExportSink::new(&args.output_dir, prefix.as_str());
                    serve(&workflow_config, sink, args.bind).await?
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}

fn report(result: &WorkflowResult, label: Abundance) -> anyhow::Result<()> {
    println!(
        "Offline run -> events {}, flips {}, haptic pulses {}, ready at {:?}, final {:?}/{:?}, sensor every {:?}, saved {}",
        result.events_sent,
        result.orientation_flips,
        result.haptic_pulses,
        result.first_ready_sample,
        result.final_snapshot.phase,
        result.final_snapshot.orientation,
        result.sensor_interval,
        result
            .saved
            .as_ref()
            .map(|record| record.location.as_str())
            .unwrap_or("nothing"),
    );

    let metrics = serde_json::to_string(&result.metrics).context("encoding metrics")?;
    let report = format!(
        "label={} events={} flips={} pulses={} ready_transitions={} captured={} metrics={}\n",
        label,
        result.events_sent,
        result.orientation_flips,
        result.haptic_pulses,
        result.ready_transitions,
        result.metadata.is_some(),
        metrics
    );
    let report_path = PathBuf::from("tools/data/offline_capture.log");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&report_path)
        .with_context(|| format!("opening {}", report_path.display()))?;
    file.write_all(report.as_bytes())?;
    Ok(())
}

async fn serve<S>(config: &WorkflowConfig, sink: S, bind: SocketAddr) -> anyhow::Result<()>
where
    S: PersistenceSink + 'static,
{
    let session = CaptureSession::new(
        config.capture.clone(),
        config.scenario.viewport(),
        Arc::new(CountingHaptics::default()),
    )
    .context("creating capture session")?;
    let handle = SessionDriver::new(
        session,
        Arc::new(SimulatedCamera::from_profile(&config.devices)),
        Arc::new(SimulatedLocation::from_profile(&config.devices)),
    )
    .spawn();

    let bridge = GuiBridge::new(handle.clone(), sink);
    info!("HTTP bridge running (Ctrl+C to stop)...");
    bridge
        .serve(bind, async {
            if let Err(err) = signal::ctrl_c().await {
                warn!("failed to await Ctrl+C: {}", err);
            }
        })
        .await?;

    handle.shutdown().await.context("stopping session")?;
    let metrics = handle.metrics().snapshot();
    info!(
        "session closed after {} samples, {} captures",
        metrics.samples_processed, metrics.captures
    );
    Ok(())
}
