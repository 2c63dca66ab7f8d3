use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Format version written into every persisted summary
pub const RECORD_VERSION: &str = "0.6";

/// File categories, declared in classification priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Image,
    Telemetry,
    Polygon,
    FlightPlan,
    Raster,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Image,
        Category::Telemetry,
        Category::Polygon,
        Category::FlightPlan,
        Category::Raster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::Telemetry => "telemetry",
            Category::Polygon => "polygon",
            Category::FlightPlan => "flight-plan",
            Category::Raster => "raster",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 3-D geographic position (degrees, metres)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
    pub alt: f64,
}

impl Position {
    pub fn new(lon: f64, lat: f64, alt: f64) -> Self {
        Self { lon, lat, alt }
    }
}

/// 2-D boundary vertex (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub lon: f64,
    pub lat: f64,
}

impl Vertex {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Geometry attached to a catalog element. Polygons are not auto-closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Position),
    Path(Vec<Position>),
    Polygon(Vec<Vertex>),
}

impl Geometry {
    /// (lon, lat) pairs in declaration order
    pub fn lon_lat(&self) -> Vec<(f64, f64)> {
        match self {
            Geometry::Point(p) => vec![(p.lon, p.lat)],
            Geometry::Path(points) => points.iter().map(|p| (p.lon, p.lat)).collect(),
            Geometry::Polygon(vertices) => vertices.iter().map(|v| (v.lon, v.lat)).collect(),
        }
    }
}

/// Camera and exposure fields of an image element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageDetails {
    pub camera: Option<String>,
    pub exposure: Option<String>,
    pub iso: Option<u32>,
}

/// Mission-derived fields of a flight-plan element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightPlanDetails {
    pub home_altitude: f64,
    pub mean_altitude: Option<f64>,
    pub speed: Option<f64>,
}

/// Category-specific fields of an element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ElementDetails {
    #[default]
    None,
    Image(ImageDetails),
    FlightPlan(FlightPlanDetails),
}

/// One classified file of a flight. `(filename, subfolder)` is the identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementEntry {
    pub filename: String,
    /// Parent directory relative to the flight folder ("." for the folder itself)
    pub subfolder: String,
    pub category: Category,
    pub size: u64,
    pub timestamp: Option<NaiveDateTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub geometry: Option<Geometry>,
    pub details: ElementDetails,
}

impl ElementEntry {
    pub fn new(
        filename: impl Into<String>,
        subfolder: impl Into<String>,
        category: Category,
        size: u64,
        timestamp: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            filename: filename.into(),
            subfolder: subfolder.into(),
            category,
            size,
            timestamp,
            latitude: None,
            longitude: None,
            altitude: None,
            geometry: None,
            details: ElementDetails::None,
        }
    }

    pub fn same_identity(&self, filename: &str, subfolder: &str) -> bool {
        self.filename == filename && self.subfolder == subfolder
    }

    /// Both latitude and longitude are known
    pub fn is_georeferenced(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    pub fn image_details(&self) -> Option<&ImageDetails> {
        match &self.details {
            ElementDetails::Image(details) => Some(details),
            _ => None,
        }
    }

    pub fn flight_plan_details(&self) -> Option<&FlightPlanDetails> {
        match &self.details {
            ElementDetails::FlightPlan(details) => Some(details),
            _ => None,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.timestamp.map(|t| t.date())
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.timestamp.map(|t| t.time())
    }

    /// Absolute location of the file below `root`
    pub fn path_in(&self, root: &Path) -> PathBuf {
        if self.subfolder == "." {
            root.join(&self.filename)
        } else {
            root.join(&self.subfolder).join(&self.filename)
        }
    }
}

/// Semantic keys of the flight summary, in persisted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SummaryKey {
    Name,
    Description,
    Place,
    Folder,
    Date,
    Time,
    TelemetryLogs,
    Polygons,
    FlightPlans,
    FlightAltitude,
    FlightSpeed,
    Images,
    ImageCount,
    CoveredArea,
    Camera,
    Iso,
    Exposure,
    Mosaics,
    ElevationModels,
    Latitude,
    Longitude,
    Altitude,
    Language,
    Version,
}

impl SummaryKey {
    pub const ALL: [SummaryKey; 24] = [
        SummaryKey::Name,
        SummaryKey::Description,
        SummaryKey::Place,
        SummaryKey::Folder,
        SummaryKey::Date,
        SummaryKey::Time,
        SummaryKey::TelemetryLogs,
        SummaryKey::Polygons,
        SummaryKey::FlightPlans,
        SummaryKey::FlightAltitude,
        SummaryKey::FlightSpeed,
        SummaryKey::Images,
        SummaryKey::ImageCount,
        SummaryKey::CoveredArea,
        SummaryKey::Camera,
        SummaryKey::Iso,
        SummaryKey::Exposure,
        SummaryKey::Mosaics,
        SummaryKey::ElevationModels,
        SummaryKey::Latitude,
        SummaryKey::Longitude,
        SummaryKey::Altitude,
        SummaryKey::Language,
        SummaryKey::Version,
    ];

    /// Stable numeric id used as the first column of the tabular summary
    pub fn id(&self) -> u32 {
        Self::ALL.iter().position(|k| k == self).map_or(0, |i| i as u32 + 1)
    }

    pub fn from_id(id: u32) -> Option<Self> {
        id.checked_sub(1)
            .and_then(|i| Self::ALL.get(i as usize))
            .copied()
    }

    /// Variable name, used as the label of last resort
    pub fn variable(&self) -> &'static str {
        match self {
            SummaryKey::Name => "name",
            SummaryKey::Description => "description",
            SummaryKey::Place => "place",
            SummaryKey::Folder => "folder",
            SummaryKey::Date => "date",
            SummaryKey::Time => "time",
            SummaryKey::TelemetryLogs => "telemetry_logs",
            SummaryKey::Polygons => "polygons",
            SummaryKey::FlightPlans => "flight_plans",
            SummaryKey::FlightAltitude => "flight_altitude",
            SummaryKey::FlightSpeed => "flight_speed",
            SummaryKey::Images => "images",
            SummaryKey::ImageCount => "image_count",
            SummaryKey::CoveredArea => "covered_area",
            SummaryKey::Camera => "camera",
            SummaryKey::Iso => "iso",
            SummaryKey::Exposure => "exposure",
            SummaryKey::Mosaics => "mosaics",
            SummaryKey::ElevationModels => "elevation_models",
            SummaryKey::Latitude => "latitude",
            SummaryKey::Longitude => "longitude",
            SummaryKey::Altitude => "altitude",
            SummaryKey::Language => "language",
            SummaryKey::Version => "version",
        }
    }

    pub fn from_variable(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.variable() == name)
    }
}

/// Derived description of a flight as a whole. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightSummary {
    pub name: Option<String>,
    pub description: Option<String>,
    pub place: Option<String>,
    pub folder: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub telemetry_logs: Vec<String>,
    pub polygons: Vec<String>,
    pub flight_plans: Vec<String>,
    /// Mean planned altitude above home (m)
    pub flight_altitude: Option<f64>,
    /// Planned speed (m/s)
    pub flight_speed: Option<f64>,
    /// "first - last" image label
    pub images: Option<String>,
    pub image_count: Option<usize>,
    /// Convex hull area of the photo locations (m²)
    pub covered_area: Option<f64>,
    pub camera: Option<String>,
    pub iso: Option<u32>,
    pub exposure: Option<String>,
    pub mosaics: Vec<String>,
    pub elevation_models: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub language: Option<String>,
    pub version: Option<String>,
}

/// Joins filename lists in the summary table. A filename that itself
/// contains ", " comes back split in two when the table is read.
const LIST_SEPARATOR: &str = ", ";

fn join_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(items.join(LIST_SEPARATOR))
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_field<T: std::str::FromStr>(key: SummaryKey, raw: &str) -> Result<T, String> {
    raw.parse::<T>()
        .map_err(|_| format!("invalid value '{}' for {}", raw, key.variable()))
}

impl FlightSummary {
    /// Scalar rendering of one key; `None` when the value is absent or an empty list
    pub fn value(&self, key: SummaryKey) -> Option<String> {
        match key {
            SummaryKey::Name => self.name.clone(),
            SummaryKey::Description => self.description.clone(),
            SummaryKey::Place => self.place.clone(),
            SummaryKey::Folder => self.folder.clone(),
            SummaryKey::Date => self.date.map(|d| d.format("%Y-%m-%d").to_string()),
            SummaryKey::Time => self.time.map(|t| t.format("%H:%M:%S").to_string()),
            SummaryKey::TelemetryLogs => join_list(&self.telemetry_logs),
            SummaryKey::Polygons => join_list(&self.polygons),
            SummaryKey::FlightPlans => join_list(&self.flight_plans),
            SummaryKey::FlightAltitude => self.flight_altitude.map(|v| v.to_string()),
            SummaryKey::FlightSpeed => self.flight_speed.map(|v| v.to_string()),
            SummaryKey::Images => self.images.clone(),
            SummaryKey::ImageCount => self.image_count.map(|v| v.to_string()),
            SummaryKey::CoveredArea => self.covered_area.map(|v| v.to_string()),
            SummaryKey::Camera => self.camera.clone(),
            SummaryKey::Iso => self.iso.map(|v| v.to_string()),
            SummaryKey::Exposure => self.exposure.clone(),
            SummaryKey::Mosaics => join_list(&self.mosaics),
            SummaryKey::ElevationModels => join_list(&self.elevation_models),
            SummaryKey::Latitude => self.latitude.map(|v| v.to_string()),
            SummaryKey::Longitude => self.longitude.map(|v| v.to_string()),
            SummaryKey::Altitude => self.altitude.map(|v| v.to_string()),
            SummaryKey::Language => self.language.clone(),
            SummaryKey::Version => self.version.clone(),
        }
    }

    /// Inverse of [`FlightSummary::value`]. An empty string clears the field.
    pub fn set_value(&mut self, key: SummaryKey, raw: &str) -> Result<(), String> {
        let raw = raw.trim();
        let text = if raw.is_empty() { None } else { Some(raw.to_string()) };

        macro_rules! parsed {
            ($t:ty) => {
                match &text {
                    Some(s) => Some(parse_field::<$t>(key, s)?),
                    None => None,
                }
            };
        }

        match key {
            SummaryKey::Name => self.name = text,
            SummaryKey::Description => self.description = text,
            SummaryKey::Place => self.place = text,
            SummaryKey::Folder => self.folder = text,
            SummaryKey::Date => {
                self.date = match &text {
                    Some(s) => Some(
                        NaiveDate::parse_from_str(s, "%Y-%m-%d")
                            .map_err(|e| format!("invalid date '{}': {}", s, e))?,
                    ),
                    None => None,
                }
            }
            SummaryKey::Time => {
                self.time = match &text {
                    Some(s) => Some(
                        NaiveTime::parse_from_str(s, "%H:%M:%S")
                            .map_err(|e| format!("invalid time '{}': {}", s, e))?,
                    ),
                    None => None,
                }
            }
            SummaryKey::TelemetryLogs => self.telemetry_logs = split_list(raw),
            SummaryKey::Polygons => self.polygons = split_list(raw),
            SummaryKey::FlightPlans => self.flight_plans = split_list(raw),
            SummaryKey::FlightAltitude => self.flight_altitude = parsed!(f64),
            SummaryKey::FlightSpeed => self.flight_speed = parsed!(f64),
            SummaryKey::Images => self.images = text,
            SummaryKey::ImageCount => self.image_count = parsed!(usize),
            SummaryKey::CoveredArea => self.covered_area = parsed!(f64),
            SummaryKey::Camera => self.camera = text,
            SummaryKey::Iso => self.iso = parsed!(u32),
            SummaryKey::Exposure => self.exposure = text,
            SummaryKey::Mosaics => self.mosaics = split_list(raw),
            SummaryKey::ElevationModels => self.elevation_models = split_list(raw),
            SummaryKey::Latitude => self.latitude = parsed!(f64),
            SummaryKey::Longitude => self.longitude = parsed!(f64),
            SummaryKey::Altitude => self.altitude = parsed!(f64),
            SummaryKey::Language => self.language = text,
            SummaryKey::Version => self.version = text,
        }
        Ok(())
    }
}

/// Error types for flight record processing
#[derive(Debug, thiserror::Error)]
pub enum FlightError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {}:{line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("EXIF error: {0}")]
    Exif(String),

    #[error("Raster error: {0}")]
    Raster(String),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("XML writing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Geocoding error: {0}")]
    Geocoding(String),

    #[error("Rendering error: {0}")]
    Render(String),
}

impl FlightError {
    pub fn parse(path: &Path, line: usize, message: impl Into<String>) -> Self {
        FlightError::Parse {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}

/// Result type for flight record operations
pub type FlightResult<T> = Result<T, FlightError>;
