//! flightlog: turns the raw output of a drone survey into a flight record
//!
//! A folder of photos, telemetry logs, flight plans, boundary polygons and
//! orthophoto/elevation rasters is classified into a catalog, summarised,
//! rendered into a preview map and exported as CSV and KML reports.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    Category, ElementDetails, ElementEntry, FlightError, FlightResult, FlightSummary, Geometry,
    Position, SummaryKey, Vertex, RECORD_VERSION,
};

pub use crate::core::{
    ElementCatalog, FlightConfig, FlightRecord, ImportMode, ImportReport, MapParams,
};
pub use io::{Geocoder, LabelTable, PlaceTable};
