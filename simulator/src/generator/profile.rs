use capturecore::device_interface::{BoundingBox, MarkerEvent, OrientationSample, Viewport};
use capturecore::processing::{DeviceOrientation, OrientationFilter};
use capturecore::CaptureConfig;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Describes a synthetic capture attempt: a gamma sweep followed by a held pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Samples spent sweeping gamma from `sweep_start_deg` to `sweep_end_deg`.
    pub sweep_samples: usize,
    pub sweep_start_deg: f64,
    pub sweep_end_deg: f64,
    /// Beta held while sweeping, so the sweep can stay outside the capture pose.
    pub sweep_beta_deg: f64,
    /// Samples spent holding the target pose after the sweep.
    pub hold_samples: usize,
    pub hold_pitch_deg: f64,
    pub hold_roll_deg: f64,
    pub jitter_deg: f64,
    /// Fraction of samples delivered without angles.
    pub dropout_rate: f64,
    /// Marker centre offset from the viewport centre.
    pub marker_offset_x: f64,
    pub marker_offset_y: f64,
    pub marker_size: f64,
    /// Emit one detector callback every N orientation samples; 0 disables the marker.
    pub marker_every: usize,
    /// First sample index after which the detector reports the marker.
    pub marker_from_sample: usize,
    pub seed: u64,
    pub description: Option<String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            viewport_width: 390.0,
            viewport_height: 844.0,
            sweep_samples: 0,
            sweep_start_deg: 0.0,
            sweep_end_deg: 0.0,
            sweep_beta_deg: 0.0,
            hold_samples: 30,
            hold_pitch_deg: 65.0,
            hold_roll_deg: 0.0,
            jitter_deg: 0.5,
            dropout_rate: 0.0,
            marker_offset_x: 0.0,
            marker_offset_y: 0.0,
            marker_size: 40.0,
            marker_every: 1,
            marker_from_sample: 0,
            seed: 0,
            description: None,
        }
    }
}

impl ScenarioConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height)
    }

    fn marker_event(&self) -> MarkerEvent {
        let center_x = self.viewport_width / 2.0 + self.marker_offset_x;
        let center_y = self.viewport_height / 2.0 + self.marker_offset_y;
        let half = self.marker_size / 2.0;
        MarkerEvent::qr(BoundingBox::new(
            center_x - half,
            center_y - half,
            self.marker_size,
            self.marker_size,
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioEvent {
    Orientation(OrientationSample),
    Marker(MarkerEvent),
}

fn jitter(rng: &mut StdRng, amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        rng.gen_range(-amplitude..amplitude)
    } else {
        0.0
    }
}

/// Deterministic event stream for a scenario.
///
/// Raw angles for the held pose are derived from the orientation the device
/// would be in after the sweep, so the pose reads back as requested.
pub fn build_event_stream(
    scenario: &ScenarioConfig,
    capture: &CaptureConfig,
) -> Vec<ScenarioEvent> {
    let mut rng = StdRng::seed_from_u64(scenario.seed);
    let mut orientation = DeviceOrientation::from_viewport(&scenario.viewport());
    let total = scenario.sweep_samples + scenario.hold_samples;
    let mut events = Vec::with_capacity(total * 2);

    for index in 0..total {
        let (beta, gamma) = if index < scenario.sweep_samples {
            let progress = if scenario.sweep_samples > 1 {
                index as f64 / (scenario.sweep_samples - 1) as f64
            } else {
                1.0
            };
            let gamma = scenario.sweep_start_deg
                + (scenario.sweep_end_deg - scenario.sweep_start_deg) * progress;
            (scenario.sweep_beta_deg, gamma)
        } else {
            let pitch = scenario.hold_pitch_deg + jitter(&mut rng, scenario.jitter_deg);
            let roll = scenario.hold_roll_deg + jitter(&mut rng, scenario.jitter_deg);
            match orientation {
                DeviceOrientation::Portrait => (pitch, roll),
                DeviceOrientation::Landscape => (-roll, -pitch),
            }
        };
        let dropped = scenario.dropout_rate > 0.0 && rng.gen_bool(scenario.dropout_rate.min(1.0));
        // The session skips dropped samples, so they must not move the tracked orientation.
        if !dropped {
            orientation = OrientationFilter::classify(gamma, orientation, capture);
        }
        let sample = if dropped {
            OrientationSample {
                beta_rad: Some(beta.to_radians()),
                gamma_rad: None,
            }
        } else {
            OrientationSample::from_degrees(beta, gamma)
        };
        events.push(ScenarioEvent::Orientation(sample));

        let marker_due = index >= scenario.marker_from_sample
            && scenario.marker_every > 0
            && (index - scenario.marker_from_sample) % scenario.marker_every == 0;
        if marker_due {
            events.push(ScenarioEvent::Marker(scenario.marker_event()));
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orientation_samples(events: &[ScenarioEvent]) -> Vec<OrientationSample> {
        events
            .iter()
            .filter_map(|event| match event {
                ScenarioEvent::Orientation(sample) => Some(*sample),
                ScenarioEvent::Marker(_) => None,
            })
            .collect()
    }

    #[test]
    fn stream_has_one_sample_per_step_and_markers_on_cadence() {
        let scenario = ScenarioConfig {
            sweep_samples: 10,
            hold_samples: 20,
            marker_every: 5,
            ..Default::default()
        };
        let events = build_event_stream(&scenario, &CaptureConfig::default());
        assert_eq!(orientation_samples(&events).len(), 30);
        let markers = events
            .iter()
            .filter(|e| matches!(e, ScenarioEvent::Marker(_)))
            .count();
        assert_eq!(markers, 6);
    }

    #[test]
    fn same_seed_gives_same_stream() {
        let scenario = ScenarioConfig {
            seed: 9,
            jitter_deg: 2.0,
            ..Default::default()
        };
        let config = CaptureConfig::default();
        assert_eq!(
            build_event_stream(&scenario, &config),
            build_event_stream(&scenario, &config)
        );
    }

    #[test]
    fn held_pose_after_landscape_sweep_reads_back_as_requested() {
        let config = CaptureConfig::default();
        let scenario = ScenarioConfig {
            sweep_samples: 9,
            sweep_start_deg: 0.0,
            sweep_end_deg: 80.0,
            hold_samples: 5,
            jitter_deg: 0.0,
            marker_every: 0,
            ..Default::default()
        };
        let samples = orientation_samples(&build_event_stream(&scenario, &config));

        let mut orientation = DeviceOrientation::Portrait;
        let mut last = None;
        for sample in &samples {
            let (attitude, next) = OrientationFilter::update(sample, orientation, &config).unwrap();
            orientation = next;
            last = Some(attitude);
        }
        let attitude = last.unwrap();
        assert_eq!(orientation, DeviceOrientation::Landscape);
        assert!((attitude.pitch - 65.0).abs() < 1e-9);
        assert!(attitude.roll.abs() < 1e-9);
    }

    #[test]
    fn dropout_produces_partial_samples() {
        let scenario = ScenarioConfig {
            dropout_rate: 1.0,
            hold_samples: 3,
            ..Default::default()
        };
        let samples = orientation_samples(&build_event_stream(&scenario, &CaptureConfig::default()));
        assert!(samples.iter().all(|s| s.components().is_none()));
    }

    #[test]
    fn markers_start_at_configured_sample() {
        let scenario = ScenarioConfig {
            hold_samples: 10,
            marker_every: 3,
            marker_from_sample: 4,
            ..Default::default()
        };
        let events = build_event_stream(&scenario, &CaptureConfig::default());
        let mut marker_after = Vec::new();
        let mut sample_index = 0;
        for event in &events {
            match event {
                ScenarioEvent::Orientation(_) => sample_index += 1,
                ScenarioEvent::Marker(_) => marker_after.push(sample_index - 1),
            }
        }
        assert_eq!(marker_after, vec![4, 7]);
    }

    #[test]
    fn dropped_sample_does_not_flip_tracked_orientation() {
        let config = CaptureConfig::default();
        let scenario = ScenarioConfig {
            sweep_samples: 1,
            sweep_start_deg: 80.0,
            sweep_end_deg: 80.0,
            hold_samples: 1,
            hold_pitch_deg: 65.0,
            jitter_deg: 0.0,
            dropout_rate: 1.0,
            marker_every: 0,
            ..Default::default()
        };
        let samples = orientation_samples(&build_event_stream(&scenario, &config));
        assert_eq!(samples.len(), 2);
        // Still portrait, so the held pitch is written straight into beta.
        assert!((samples[1].beta_rad.unwrap().to_degrees() - 65.0).abs() < 1e-9);
    }
}
