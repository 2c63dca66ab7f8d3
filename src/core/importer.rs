use crate::core::catalog::{ElementCatalog, UpsertOutcome};
use crate::core::geodesy::centroid;
use crate::io::classifier::FileClassifier;
use crate::io::exif_reader::{ExifReader, ImageTagReader};
use crate::io::mission::MissionParser;
use crate::io::polygon::PolygonReader;
use crate::io::telemetry::timestamp_from_filename;
use crate::types::{
    Category, ElementDetails, ElementEntry, FlightError, FlightResult, Geometry, ImageDetails,
    Position,
};
use chrono::{DateTime, Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Behaviour when a file with the same identity is already catalogued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// Leave the existing row untouched
    #[default]
    Skip,
    /// Overwrite the existing row in place
    Replace,
}

/// Outcome of importing a file or a directory tree
#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<PathBuf>,
    /// Unclassified files and already-catalogued duplicates
    pub skipped: Vec<PathBuf>,
    /// Files whose metadata could not be extracted; the catalog is unchanged for them
    pub failed: Vec<(PathBuf, FlightError)>,
}

impl ImportReport {
    /// True iff at least one file entered the catalog
    pub fn any_imported(&self) -> bool {
        !self.imported.is_empty()
    }
}

/// Walks paths below a flight folder, classifies files and upserts them into a catalog
pub struct Importer {
    root: PathBuf,
    classifier: FileClassifier,
    tag_reader: Box<dyn ImageTagReader>,
}

impl Importer {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            classifier: FileClassifier::default(),
            tag_reader: Box::new(ExifReader),
        }
    }

    pub fn with_classifier(mut self, classifier: FileClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_tag_reader(mut self, tag_reader: Box<dyn ImageTagReader>) -> Self {
        self.tag_reader = tag_reader;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Regular files below `path` in visitation order: depth-first,
    /// siblings sorted by name. A file path yields itself.
    pub fn visit_order<P: AsRef<Path>>(path: P) -> FlightResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(path.as_ref()).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Import a file or a whole directory tree.
    ///
    /// A missing path imports nothing. Inside a directory, per-file failures are
    /// collected in the report and the walk continues.
    pub fn import<P: AsRef<Path>>(
        &self,
        catalog: &mut ElementCatalog,
        path: P,
        mode: ImportMode,
    ) -> FlightResult<ImportReport> {
        let path = path.as_ref();
        let mut report = ImportReport::default();

        if !path.exists() {
            log::warn!("Nothing to import, path does not exist: {}", path.display());
            return Ok(report);
        }
        if path.is_dir() {
            log::info!("Importing directory: {}", path.display());
        }

        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let failed_path = e.path().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf());
                    log::warn!("Cannot visit {}: {}", failed_path.display(), e);
                    report.failed.push((failed_path, e.into()));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let file = entry.into_path();
            match self.import_file(catalog, &file, mode) {
                Ok(true) => report.imported.push(file),
                Ok(false) => report.skipped.push(file),
                Err(e) => {
                    log::warn!("Failed to import {}: {}", file.display(), e);
                    report.failed.push((file, e));
                }
            }
        }

        log::info!(
            "Import finished: {} imported, {} skipped, {} failed",
            report.imported.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Import one regular file.
    ///
    /// `Ok(false)` for missing, unclassified, or duplicate files (without replace);
    /// `Err` when a classified file cannot be parsed. The catalog is only touched on success.
    pub fn import_file<P: AsRef<Path>>(
        &self,
        catalog: &mut ElementCatalog,
        path: P,
        mode: ImportMode,
    ) -> FlightResult<bool> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(false);
        }

        let Some(filename) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Ok(false);
        };
        let Some(category) = self.classifier.classify(&filename) else {
            log::debug!("Not classified: {}", path.display());
            return Ok(false);
        };

        let subfolder = self.subfolder_of(path);
        if mode == ImportMode::Skip && catalog.contains(&filename, &subfolder) {
            log::debug!("Already catalogued: {}", path.display());
            return Ok(false);
        }

        let metadata = std::fs::metadata(path)?;
        let modified = metadata.modified().ok().map(local_time);
        let mut entry = ElementEntry::new(filename, subfolder, category, metadata.len(), modified);
        self.extract(&mut entry, path)?;

        let outcome = catalog.upsert(entry, mode == ImportMode::Replace);
        log::info!("{:?} {} ({})", outcome, path.display(), category);
        Ok(outcome != UpsertOutcome::Skipped)
    }

    /// Parent directory of `path` relative to the flight folder, "/"-separated
    fn subfolder_of(&self, path: &Path) -> String {
        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        let relative = parent.strip_prefix(&self.root).map(Path::to_path_buf).or_else(|_| {
            let parent = parent.canonicalize()?;
            let root = self.root.canonicalize()?;
            parent
                .strip_prefix(&root)
                .map(Path::to_path_buf)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
        });

        match relative {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => {
                log::debug!("{} lies outside {}", parent.display(), self.root.display());
                parent.to_string_lossy().into_owned()
            }
        }
    }

    /// Refine timestamp, position, geometry and category fields
    fn extract(&self, entry: &mut ElementEntry, path: &Path) -> FlightResult<()> {
        match entry.category {
            Category::Image => self.extract_image(entry, path),
            Category::Telemetry => {
                match timestamp_from_filename(&entry.filename) {
                    Some(timestamp) => entry.timestamp = Some(timestamp),
                    None => log::warn!(
                        "Telemetry log {} is not named by date, keeping file time",
                        entry.filename
                    ),
                }
                Ok(())
            }
            Category::FlightPlan => {
                if !entry.filename.to_lowercase().ends_with(".waypoints") {
                    return Ok(());
                }
                let plan = MissionParser::read_file(path)?;
                let geometry = plan.geometry();
                if let Some((lon, lat)) = centroid(&geometry) {
                    entry.longitude = Some(lon);
                    entry.latitude = Some(lat);
                }
                entry.altitude = Some(plan.home_altitude);
                entry.geometry = Some(geometry);
                entry.details = ElementDetails::FlightPlan(plan.details());
                Ok(())
            }
            Category::Polygon => {
                let geometry = PolygonReader::read_file(path)?;
                if let Some((lon, lat)) = centroid(&geometry) {
                    entry.longitude = Some(lon);
                    entry.latitude = Some(lat);
                }
                entry.geometry = Some(geometry);
                Ok(())
            }
            Category::Raster => Ok(()),
        }
    }

    fn extract_image(&self, entry: &mut ElementEntry, path: &Path) -> FlightResult<()> {
        let Some(tags) = self.tag_reader.read_tags(path)? else {
            entry.details = ElementDetails::Image(ImageDetails::default());
            return Ok(());
        };

        if let Some(timestamp) = tags.capture_time() {
            entry.timestamp = Some(timestamp);
        }
        entry.details = ElementDetails::Image(tags.details());

        if let Some(fix) = tags.gps_fix() {
            entry.latitude = Some(fix.latitude);
            entry.longitude = Some(fix.longitude);
            entry.altitude = fix.altitude;
            entry.geometry = Some(Geometry::Point(Position::new(
                fix.longitude,
                fix.latitude,
                fix.altitude.unwrap_or(0.0),
            )));
        }
        Ok(())
    }
}

fn local_time(time: std::time::SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::exif_reader::ImageTags;
    use std::fs;
    use tempfile::TempDir;

    /// Tag reader that serves fixed tags for files whose name contains "gps"
    struct FakeTags;

    impl ImageTagReader for FakeTags {
        fn read_tags(&self, path: &Path) -> FlightResult<Option<ImageTags>> {
            let name = path.file_name().unwrap().to_string_lossy();
            if !name.contains("gps") {
                return Ok(None);
            }
            Ok(Some(ImageTags {
                datetime_original: Some("2022:03:14 09:26:53".into()),
                make: Some("DJI".into()),
                model: Some("FC3170".into()),
                gps_latitude: Some([10.0, 30.0, 0.0]),
                gps_latitude_ref: Some("S".into()),
                gps_longitude: Some([20.0, 0.0, 0.0]),
                gps_longitude_ref: Some("E".into()),
                gps_altitude: Some(50.0),
                ..Default::default()
            }))
        }
    }

    #[test]
    fn test_subfolder_is_relative_to_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        let importer = Importer::new(dir.path());
        assert_eq!(importer.subfolder_of(&dir.path().join("x.jpg")), ".");
        assert_eq!(importer.subfolder_of(&dir.path().join("a/b/x.jpg")), "a/b");
    }

    #[test]
    fn test_image_with_gps_tags() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("gps_0001.jpg"), b"jpeg").unwrap();
        let importer = Importer::new(dir.path()).with_tag_reader(Box::new(FakeTags));
        let mut catalog = ElementCatalog::new();

        assert!(importer
            .import_file(&mut catalog, dir.path().join("gps_0001.jpg"), ImportMode::Skip)
            .unwrap());
        let entry = catalog.get("gps_0001.jpg", ".").unwrap();
        assert_eq!(entry.latitude, Some(-10.5));
        assert_eq!(entry.longitude, Some(20.0));
        assert_eq!(entry.altitude, Some(50.0));
        assert_eq!(entry.geometry, Some(Geometry::Point(Position::new(20.0, -10.5, 50.0))));
        assert_eq!(entry.image_details().unwrap().camera.as_deref(), Some("DJI - FC3170"));
        assert_eq!(entry.timestamp.unwrap().to_string(), "2022-03-14 09:26:53");
    }

    #[test]
    fn test_malformed_polygon_leaves_catalog_unchanged() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.poly"), "# header\n1.0 2.0 3.0\n").unwrap();
        let importer = Importer::new(dir.path());
        let mut catalog = ElementCatalog::new();

        let result = importer.import_file(&mut catalog, dir.path().join("bad.poly"), ImportMode::Skip);
        assert!(matches!(result, Err(FlightError::Parse { .. })));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_telemetry_timestamp_from_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("2021-06-01 10-15-42.tlog"), b"\x00\x01").unwrap();
        let importer = Importer::new(dir.path());
        let mut catalog = ElementCatalog::new();
        importer.import(&mut catalog, dir.path(), ImportMode::Skip).unwrap();

        let entry = catalog.get("2021-06-01 10-15-42.tlog", ".").unwrap();
        assert_eq!(entry.timestamp.unwrap().to_string(), "2021-06-01 10:15:42");
        assert_eq!(entry.size, 2);
        assert!(entry.geometry.is_none());
    }
}
