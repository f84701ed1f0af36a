//! File-name encoding used by the local export collaborator.
//!
//! `{prefix}_{label}__Lat_{lat}__Lon_{lon}__QR_{SI|NO}__Time_{YYYY-MM-DD_HHMMSS}__ID_{token}.jpg`

use crate::device_interface::{Abundance, CaptureMetadata};
use chrono::{DateTime, Utc};
use rand::Rng;

pub const FIELD_DELIMITER: &str = "__";
pub const IMAGE_EXTENSION: &str = "jpg";
pub const MISSING_COORDINATE: &str = "ND";
const TOKEN_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const TOKEN_LENGTH: usize = 5;

pub struct ExportRecord;

impl ExportRecord {
    pub fn file_name<R: Rng + ?Sized>(
        prefix: &str,
        label: Abundance,
        metadata: &CaptureMetadata,
        rng: &mut R,
    ) -> String {
        let fields = [
            format!("{}_{}", prefix, label),
            format!(
                "Lat_{}",
                Self::coordinate(metadata.location.map(|p| p.latitude))
            ),
            format!(
                "Lon_{}",
                Self::coordinate(metadata.location.map(|p| p.longitude))
            ),
            format!("QR_{}", Self::marker_flag(metadata.marker_confirmed)),
            format!("Time_{}", Self::timestamp(&metadata.timestamp)),
            format!("ID_{}", Self::short_id(rng)),
        ];
        format!("{}.{}", fields.join(FIELD_DELIMITER), IMAGE_EXTENSION)
    }

    pub fn coordinate(value: Option<f64>) -> String {
        match value {
            Some(v) if v.is_finite() => format!("{:.6}", v),
            _ => MISSING_COORDINATE.to_string(),
        }
    }

    pub fn marker_flag(confirmed: bool) -> &'static str {
        if confirmed {
            "SI"
        } else {
            "NO"
        }
    }

    pub fn timestamp(timestamp: &DateTime<Utc>) -> String {
        timestamp.format("%Y-%m-%d_%H%M%S").to_string()
    }

    /// Short disambiguating token; not meant to be globally unique.
    pub fn short_id<R: Rng + ?Sized>(rng: &mut R) -> String {
        (0..TOKEN_LENGTH)
            .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_interface::GeoPosition;
    use chrono::TimeZone;
    use rand::{rngs::StdRng, SeedableRng};

    fn metadata(location: Option<GeoPosition>, marker_confirmed: bool) -> CaptureMetadata {
        CaptureMetadata {
            timestamp: Utc.with_ymd_and_hms(2025, 7, 4, 9, 5, 3).unwrap(),
            location,
            focal_length: None,
            marker_confirmed,
        }
    }

    #[test]
    fn file_name_embeds_every_field() {
        let mut rng = StdRng::seed_from_u64(7);
        let name = ExportRecord::file_name(
            "Sargazo",
            Abundance::Much,
            &metadata(
                Some(GeoPosition {
                    latitude: 21.16192,
                    longitude: -86.8515,
                }),
                true,
            ),
            &mut rng,
        );
        assert!(name.starts_with(
            "Sargazo_Much__Lat_21.161920__Lon_-86.851500__QR_SI__Time_2025-07-04_090503__ID_"
        ));
        assert!(name.ends_with(".jpg"));
        let token = name
            .trim_end_matches(".jpg")
            .rsplit("ID_")
            .next()
            .unwrap();
        assert_eq!(token.len(), 5);
        assert!(token.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn missing_location_uses_nd_sentinel() {
        let mut rng = StdRng::seed_from_u64(1);
        let name = ExportRecord::file_name("Sargazo", Abundance::None, &metadata(None, false), &mut rng);
        assert!(name.contains("__Lat_ND__Lon_ND__QR_NO__"));
    }

    #[test]
    fn tokens_vary_between_draws() {
        let mut rng = StdRng::seed_from_u64(42);
        let first = ExportRecord::short_id(&mut rng);
        let second = ExportRecord::short_id(&mut rng);
        assert_ne!(first, second);
    }
}
