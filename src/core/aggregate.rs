use crate::core::catalog::ElementCatalog;
use crate::core::geodesy::{centroid, covered_area};
use crate::io::geocoder::Geocoder;
use crate::io::mission::MissionParser;
use crate::io::raster::RasterKind;
use crate::types::{Category, ElementEntry, FlightPlanDetails, FlightSummary, RECORD_VERSION};
use std::path::Path;

/// Summary fields owned by the flight record rather than derived from its files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordIdentity {
    pub name: Option<String>,
    pub description: Option<String>,
    pub folder: Option<String>,
    pub language: Option<String>,
}

/// Separator of the "first - last" image label
const RANGE_SEPARATOR: &str = " - ";

/// Derives a [`FlightSummary`] from a catalog snapshot
pub struct Aggregator<'a> {
    root: &'a Path,
    geocoder: &'a dyn Geocoder,
}

impl<'a> Aggregator<'a> {
    /// `root` locates flight-plan files for re-parsing
    pub fn new(root: &'a Path, geocoder: &'a dyn Geocoder) -> Self {
        Self { root, geocoder }
    }

    /// Recompute the whole summary. The result depends only on the catalog,
    /// the files it points to and the geocoder's answers.
    pub fn aggregate(&self, catalog: &ElementCatalog, identity: &RecordIdentity) -> FlightSummary {
        log::info!("Aggregating {} catalog entries", catalog.len());

        let mut summary = FlightSummary {
            name: identity.name.clone(),
            description: identity.description.clone(),
            folder: identity.folder.clone(),
            language: identity.language.clone(),
            version: Some(RECORD_VERSION.to_string()),
            telemetry_logs: filenames(catalog.by_category(Category::Telemetry)),
            polygons: filenames(catalog.by_category(Category::Polygon)),
            flight_plans: filenames(catalog.by_category(Category::FlightPlan)),
            ..Default::default()
        };

        self.apply_polygons(catalog, &mut summary);
        self.apply_flight_plans(catalog, &mut summary);
        self.apply_telemetry(catalog, &mut summary);
        self.apply_images(catalog, &mut summary);
        self.apply_rasters(catalog, &mut summary);
        self.apply_place(&mut summary);

        summary
    }

    fn apply_polygons(&self, catalog: &ElementCatalog, summary: &mut FlightSummary) {
        let newest = catalog.newest_first(Category::Polygon);
        let Some(latest) = newest.first() else { return };
        log::debug!("Representative polygon: {}", latest.filename);
        if let Some((lon, lat)) = representative_lon_lat(latest) {
            summary.longitude = Some(lon);
            summary.latitude = Some(lat);
        }
    }

    fn apply_flight_plans(&self, catalog: &ElementCatalog, summary: &mut FlightSummary) {
        let newest = catalog.newest_first(Category::FlightPlan);
        let Some(latest) = newest.first() else { return };
        log::debug!("Representative flight plan: {}", latest.filename);

        let Some((details, position)) = self.flight_plan_state(latest) else { return };
        summary.flight_altitude = details.mean_altitude.map(|mean| mean - details.home_altitude);
        summary.flight_speed = details.speed;
        summary.altitude = Some(details.home_altitude);
        if let Some((lon, lat)) = position {
            summary.longitude = Some(lon);
            summary.latitude = Some(lat);
        }
    }

    /// Mission values and centroid fresh from disk, the imported ones if the
    /// file is gone or broken
    fn flight_plan_state(&self, entry: &ElementEntry) -> Option<(FlightPlanDetails, Option<(f64, f64)>)> {
        let stored = entry.flight_plan_details()?;
        match MissionParser::read_file(entry.path_in(self.root)) {
            Ok(plan) => Some((plan.details(), centroid(&plan.geometry()))),
            Err(e) => {
                log::warn!("Cannot re-read flight plan {}: {}", entry.filename, e);
                Some((stored.clone(), representative_lon_lat(entry)))
            }
        }
    }

    fn apply_telemetry(&self, catalog: &ElementCatalog, summary: &mut FlightSummary) {
        let oldest = catalog.oldest_first(Category::Telemetry);
        if let Some(first) = oldest.first() {
            summary.date = first.date();
            summary.time = first.time();
        }
    }

    fn apply_images(&self, catalog: &ElementCatalog, summary: &mut FlightSummary) {
        let ordered = catalog.oldest_first(Category::Image);
        if ordered.is_empty() {
            return;
        }
        let georeferenced: Vec<&ElementEntry> =
            ordered.iter().copied().filter(|e| e.is_georeferenced()).collect();
        let selected = if georeferenced.is_empty() {
            ordered
        } else {
            georeferenced.clone()
        };

        summary.image_count = Some(selected.len());
        let first = selected[0];
        let last = selected[selected.len() - 1];
        summary.images = Some(if selected.len() > 1 {
            format!("{}{}{}", first.filename, RANGE_SEPARATOR, last.filename)
        } else {
            first.filename.clone()
        });

        if let Some(details) = first.image_details() {
            summary.camera = details.camera.clone();
            summary.exposure = details.exposure.clone();
            summary.iso = details.iso;
        }
        if first.timestamp.is_some() {
            summary.date = first.date();
            summary.time = first.time();
        }

        let lon_lat: Vec<(f64, f64)> = georeferenced
            .iter()
            .filter_map(|e| Some((e.longitude?, e.latitude?)))
            .collect();
        if lon_lat.is_empty() {
            return;
        }
        let n = lon_lat.len() as f64;
        summary.longitude = Some(lon_lat.iter().map(|p| p.0).sum::<f64>() / n);
        summary.latitude = Some(lon_lat.iter().map(|p| p.1).sum::<f64>() / n);
        summary.altitude = georeferenced.iter().filter_map(|e| e.altitude).reduce(f64::max);
        summary.covered_area = covered_area(&lon_lat);
    }

    fn apply_rasters(&self, catalog: &ElementCatalog, summary: &mut FlightSummary) {
        let newest = catalog.newest_first(Category::Raster);
        let mut mosaics = raster_names(&newest, |k| k == RasterKind::Orthophoto);
        mosaics.extend(raster_names(&newest, |k| k == RasterKind::Other));
        summary.mosaics = mosaics;
        summary.elevation_models = raster_names(&newest, |k| k.is_elevation());
    }

    fn apply_place(&self, summary: &mut FlightSummary) {
        let (Some(lat), Some(lon)) = (summary.latitude, summary.longitude) else {
            return;
        };
        match self.geocoder.reverse(lat, lon) {
            Ok(Some(place)) => {
                let label = place.label();
                if !label.is_empty() {
                    summary.place = Some(label);
                }
            }
            Ok(None) => log::debug!("No place known near ({:.5}, {:.5})", lat, lon),
            Err(e) => log::warn!("Reverse geocoding failed, place left unknown: {}", e),
        }
    }
}

fn filenames(entries: Vec<&ElementEntry>) -> Vec<String> {
    entries.into_iter().map(|e| e.filename.clone()).collect()
}

fn raster_names(entries: &[&ElementEntry], wanted: impl Fn(RasterKind) -> bool) -> Vec<String> {
    entries
        .iter()
        .filter(|e| wanted(RasterKind::of(&e.filename)))
        .map(|e| e.filename.clone())
        .collect()
}

/// Stored coordinates, else the centroid of the stored geometry
fn representative_lon_lat(entry: &ElementEntry) -> Option<(f64, f64)> {
    match (entry.longitude, entry.latitude) {
        (Some(lon), Some(lat)) => Some((lon, lat)),
        _ => entry.geometry.as_ref().and_then(centroid),
    }
}
