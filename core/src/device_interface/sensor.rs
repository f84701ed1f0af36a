use serde::{Deserialize, Serialize};

/// Raw attitude reading from the device-orientation stream, in radians.
///
/// Components are optional because platform callbacks may deliver partial
/// readings; such samples are skipped rather than treated as zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationSample {
    pub beta_rad: Option<f64>,
    pub gamma_rad: Option<f64>,
}

impl OrientationSample {
    pub fn new(beta_rad: f64, gamma_rad: f64) -> Self {
        Self {
            beta_rad: Some(beta_rad),
            gamma_rad: Some(gamma_rad),
        }
    }

    pub fn from_degrees(beta_deg: f64, gamma_deg: f64) -> Self {
        Self::new(beta_deg.to_radians(), gamma_deg.to_radians())
    }

    /// Both components, if present and finite.
    pub fn components(&self) -> Option<(f64, f64)> {
        match (self.beta_rad, self.gamma_rad) {
            (Some(beta), Some(gamma)) if beta.is_finite() && gamma.is_finite() => {
                Some((beta, gamma))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Axis-aligned box in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub origin: Point,
    pub size: Size,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point { x, y },
            size: Size { width, height },
        }
    }

    pub fn centroid(&self) -> Point {
        Point {
            x: self.origin.x + self.size.width / 2.0,
            y: self.origin.y + self.size.height / 2.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.origin.x, self.origin.y, self.size.width, self.size.height]
            .iter()
            .all(|v| v.is_finite())
            && self.size.width >= 0.0
            && self.size.height >= 0.0
    }
}

/// Detector callback payload for one scan frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerEvent {
    #[serde(rename = "type", default = "default_marker_kind")]
    pub kind: String,
    #[serde(rename = "boundingBox", alias = "bounds")]
    pub bounds: BoundingBox,
}

fn default_marker_kind() -> String {
    "qr".to_string()
}

impl MarkerEvent {
    pub fn qr(bounds: BoundingBox) -> Self {
        Self {
            kind: default_marker_kind(),
            bounds,
        }
    }
}
