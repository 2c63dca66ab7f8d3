//! I/O modules: file classification, metadata readers, collaborators and report writers

pub mod classifier;
pub mod exif_reader;
pub mod telemetry;
pub mod mission;
pub mod polygon;
pub mod raster;
pub mod geocoder;
pub mod labels;
pub mod tabular;
pub mod kml;

pub use classifier::FileClassifier;
pub use exif_reader::{ExifReader, ImageTagReader, ImageTags};
pub use mission::{FlightPlan, MissionParser};
pub use polygon::PolygonReader;
pub use raster::{default_raster_reader, ImageRasterReader, RasterBand, RasterKind, RasterReader};
#[cfg(feature = "gdal")]
pub use raster::GdalRasterReader;
pub use geocoder::{Geocoder, NoGeocoder, Place, PlaceTable};
pub use labels::{LabelLookup, LabelTable};
pub use tabular::{SummaryRow, SummaryTable};
pub use kml::KmlWriter;
