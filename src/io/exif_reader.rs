use crate::core::geodesy::dms_to_decimal;
use crate::types::{FlightResult, ImageDetails};
use chrono::NaiveDateTime;
use exif::{Exif, In, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Capture-time format of the DateTimeOriginal tag
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Raw tag values of one image, as found in its metadata block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageTags {
    pub datetime_original: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub exposure_time: Option<String>,
    /// Primary ISO tag (ISOSpeedRatings / PhotographicSensitivity)
    pub iso_speed: Option<u32>,
    /// Secondary sensitivity tag (ISOSpeed)
    pub sensitivity: Option<u32>,
    pub gps_latitude: Option<[f64; 3]>,
    pub gps_latitude_ref: Option<String>,
    pub gps_longitude: Option<[f64; 3]>,
    pub gps_longitude_ref: Option<String>,
    pub gps_altitude: Option<f64>,
}

/// GPS fix decoded from the tags
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

impl ImageTags {
    /// Embedded capture time, if present and well formed
    pub fn capture_time(&self) -> Option<NaiveDateTime> {
        let raw = self.datetime_original.as_deref()?.trim();
        match NaiveDateTime::parse_from_str(raw, EXIF_DATETIME_FORMAT) {
            Ok(timestamp) => Some(timestamp),
            Err(e) => {
                log::debug!("Ignoring capture time '{}': {}", raw, e);
                None
            }
        }
    }

    /// Camera label: the model alone when it already names the make, else "make - model"
    pub fn camera(&self) -> Option<String> {
        match (self.make.as_deref(), self.model.as_deref()) {
            (Some(make), Some(model)) if model.starts_with(make) => Some(model.to_string()),
            (Some(make), Some(model)) => Some(format!("{} - {}", make, model)),
            (Some(make), None) => Some(make.to_string()),
            (None, Some(model)) => Some(model.to_string()),
            (None, None) => None,
        }
    }

    pub fn iso(&self) -> Option<u32> {
        self.iso_speed.or(self.sensitivity)
    }

    /// Signed decimal coordinates. Requires latitude and longitude; altitude is optional.
    pub fn gps_fix(&self) -> Option<GpsFix> {
        let latitude = self.gps_latitude?;
        let Some(longitude) = self.gps_longitude else {
            log::warn!("GPS latitude without longitude, ignoring position");
            return None;
        };
        Some(GpsFix {
            latitude: dms_to_decimal(latitude, self.gps_latitude_ref.as_deref().unwrap_or("N")),
            longitude: dms_to_decimal(longitude, self.gps_longitude_ref.as_deref().unwrap_or("E")),
            altitude: self.gps_altitude,
        })
    }

    pub fn details(&self) -> ImageDetails {
        ImageDetails {
            camera: self.camera(),
            exposure: self.exposure_time.clone(),
            iso: self.iso(),
        }
    }
}

/// Source of image metadata tags
pub trait ImageTagReader {
    /// `Ok(None)` when the file carries no readable metadata block
    fn read_tags(&self, path: &Path) -> FlightResult<Option<ImageTags>>;
}

/// EXIF reader backed by kamadak-exif
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifReader;

impl ExifReader {
    fn ascii(exif: &Exif, tag: Tag) -> Option<String> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        match &field.value {
            Value::Ascii(parts) => parts
                .first()
                .map(|bytes| String::from_utf8_lossy(bytes).trim_matches('\0').trim().to_string())
                .filter(|s| !s.is_empty()),
            _ => None,
        }
    }

    fn uint(exif: &Exif, tag: Tag) -> Option<u32> {
        exif.get_field(tag, In::PRIMARY)?.value.get_uint(0)
    }

    fn rationals(exif: &Exif, tag: Tag) -> Option<[f64; 3]> {
        match &exif.get_field(tag, In::PRIMARY)?.value {
            Value::Rational(v) if v.len() >= 3 => Some([v[0].to_f64(), v[1].to_f64(), v[2].to_f64()]),
            _ => None,
        }
    }

    fn rational(exif: &Exif, tag: Tag) -> Option<f64> {
        match &exif.get_field(tag, In::PRIMARY)?.value {
            Value::Rational(v) if !v.is_empty() => Some(v[0].to_f64()),
            _ => None,
        }
    }

    fn collect(exif: &Exif) -> ImageTags {
        ImageTags {
            datetime_original: Self::ascii(exif, Tag::DateTimeOriginal),
            make: Self::ascii(exif, Tag::Make),
            model: Self::ascii(exif, Tag::Model),
            exposure_time: exif
                .get_field(Tag::ExposureTime, In::PRIMARY)
                .map(|f| f.display_value().to_string()),
            iso_speed: Self::uint(exif, Tag::PhotographicSensitivity),
            sensitivity: Self::uint(exif, Tag::ISOSpeed),
            gps_latitude: Self::rationals(exif, Tag::GPSLatitude),
            gps_latitude_ref: Self::ascii(exif, Tag::GPSLatitudeRef),
            gps_longitude: Self::rationals(exif, Tag::GPSLongitude),
            gps_longitude_ref: Self::ascii(exif, Tag::GPSLongitudeRef),
            gps_altitude: Self::rational(exif, Tag::GPSAltitude),
        }
    }
}

impl ImageTagReader for ExifReader {
    fn read_tags(&self, path: &Path) -> FlightResult<Option<ImageTags>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif) => Ok(Some(Self::collect(&exif))),
            Err(exif::Error::Io(e)) => Err(e.into()),
            Err(e) => {
                log::debug!("No EXIF metadata in {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }
}
