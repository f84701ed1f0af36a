use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rendering of a best-effort value that could not be obtained.
pub const UNAVAILABLE: &str = "unavailable";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

/// Options forwarded to the capture primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureOptions {
    pub quality: f32,
    pub exif_requested: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            quality: 0.5,
            exif_requested: true,
        }
    }
}

/// Image returned by the capture primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPhoto {
    pub bytes: Vec<u8>,
    pub uri: Option<String>,
    /// Focal length from the embedded EXIF block, when the camera reported one.
    pub focal_length: Option<f64>,
}

impl CapturedPhoto {
    pub fn has_image(&self) -> bool {
        !self.bytes.is_empty() || self.uri.as_deref().is_some_and(|uri| !uri.is_empty())
    }
}

/// Assembled once per successful capture; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub timestamp: DateTime<Utc>,
    pub location: Option<GeoPosition>,
    pub focal_length: Option<f64>,
    pub marker_confirmed: bool,
}

impl CaptureMetadata {
    pub fn latitude_label(&self) -> String {
        self.location
            .map(|p| p.latitude.to_string())
            .unwrap_or_else(|| UNAVAILABLE.to_string())
    }

    pub fn longitude_label(&self) -> String {
        self.location
            .map(|p| p.longitude.to_string())
            .unwrap_or_else(|| UNAVAILABLE.to_string())
    }

    pub fn focal_length_label(&self) -> String {
        self.focal_length
            .map(|f| f.to_string())
            .unwrap_or_else(|| UNAVAILABLE.to_string())
    }
}

/// Categorical observation attached to a capture by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Abundance {
    None,
    Little,
    Some,
    Much,
}

impl Abundance {
    pub const ALL: [Abundance; 4] = [
        Abundance::None,
        Abundance::Little,
        Abundance::Some,
        Abundance::Much,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Abundance::None => "None",
            Abundance::Little => "Little",
            Abundance::Some => "Some",
            Abundance::Much => "Much",
        }
    }
}

impl fmt::Display for Abundance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Abundance {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Abundance::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("unknown abundance label '{}'", value))
    }
}

/// Where a persistence sink put the capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecord {
    pub location: String,
    pub label: Abundance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_render_as_sentinel() {
        let metadata = CaptureMetadata {
            timestamp: Utc::now(),
            location: None,
            focal_length: None,
            marker_confirmed: true,
        };
        assert_eq!(metadata.latitude_label(), UNAVAILABLE);
        assert_eq!(metadata.focal_length_label(), UNAVAILABLE);
    }

    #[test]
    fn abundance_parses_case_insensitively() {
        assert_eq!("much".parse::<Abundance>().unwrap(), Abundance::Much);
        assert!("plenty".parse::<Abundance>().is_err());
    }

    #[test]
    fn photo_without_bytes_or_uri_has_no_image() {
        let photo = CapturedPhoto {
            bytes: Vec::new(),
            uri: Some(String::new()),
            focal_length: None,
        };
        assert!(!photo.has_image());
    }
}
