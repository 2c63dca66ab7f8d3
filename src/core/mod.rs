//! Core flight record modules

pub mod geodesy;
pub mod catalog;
pub mod importer;
pub mod aggregate;
pub mod compositor;
pub mod record;

// Re-export main types
pub use catalog::{ElementCatalog, UpsertOutcome};
pub use importer::{ImportMode, ImportReport, Importer};
pub use aggregate::{Aggregator, RecordIdentity};
pub use compositor::{MapCompositor, MapLayers, MapParams};
pub use record::{FlightConfig, FlightRecord};
