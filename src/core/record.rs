use crate::core::aggregate::{Aggregator, RecordIdentity};
use crate::core::catalog::ElementCatalog;
use crate::core::compositor::{MapCompositor, MapParams};
use crate::core::importer::{ImportMode, ImportReport, Importer};
use crate::io::exif_reader::ImageTagReader;
use crate::io::geocoder::Geocoder;
use crate::io::kml::KmlWriter;
use crate::io::labels::LabelLookup;
use crate::io::tabular::SummaryTable;
use crate::types::{FlightError, FlightResult, FlightSummary};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tiny_skia::Pixmap;

/// Output names and defaults of a flight record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    pub summary_file: String,
    pub kml_file: String,
    pub kmz_file: String,
    pub map_file: String,
    /// Language code for summary labels of new records
    pub language: String,
    pub map: MapParams,
    pub write_kmz: bool,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            summary_file: "flightlog.csv".to_string(),
            kml_file: "flightlog.kml".to_string(),
            kmz_file: "flightlog.kmz".to_string(),
            map_file: "flightlog.png".to_string(),
            language: "es".to_string(),
            map: MapParams::default(),
            write_kmz: false,
        }
    }
}

/// One survey project rooted at a folder: catalog, summary and preview map
pub struct FlightRecord {
    folder: PathBuf,
    config: FlightConfig,
    identity: RecordIdentity,
    summary: FlightSummary,
    catalog: ElementCatalog,
    preview: Option<Pixmap>,
    importer: Importer,
}

impl FlightRecord {
    pub fn new<P: AsRef<Path>>(folder: P, config: FlightConfig) -> Self {
        let folder = folder.as_ref().to_path_buf();
        let identity = RecordIdentity {
            folder: Some(folder.display().to_string()),
            language: Some(config.language.clone()),
            ..Default::default()
        };
        let summary = FlightSummary {
            name: identity.name.clone(),
            folder: identity.folder.clone(),
            language: identity.language.clone(),
            ..Default::default()
        };
        Self {
            importer: Importer::new(&folder),
            folder,
            config,
            identity,
            summary,
            catalog: ElementCatalog::new(),
            preview: None,
        }
    }

    /// Load the summary table and preview map saved in `folder`, when present.
    /// The catalog starts empty.
    pub fn open<P: AsRef<Path>>(folder: P, config: FlightConfig) -> FlightResult<Self> {
        let mut record = Self::new(folder, config);

        let summary_path = record.output_path(&record.config.summary_file);
        if summary_path.is_file() {
            let saved = SummaryTable::read_file(&summary_path)?;
            record.identity.name = saved.name.clone();
            record.identity.description = saved.description.clone();
            if saved.language.is_some() {
                record.identity.language = saved.language.clone();
            }
            record.summary = FlightSummary {
                folder: record.identity.folder.clone(),
                language: record.identity.language.clone(),
                ..saved
            };
        } else {
            log::info!("No saved summary in {}", record.folder.display());
        }

        let map_path = record.output_path(&record.config.map_file);
        if map_path.is_file() {
            let pixmap = Pixmap::load_png(&map_path)
                .map_err(|e| FlightError::Render(format!("{}: {}", map_path.display(), e)))?;
            record.preview = Some(pixmap);
        }
        Ok(record)
    }

    /// Replace the image metadata reader used by later imports
    pub fn with_tag_reader(mut self, tag_reader: Box<dyn ImageTagReader>) -> Self {
        self.importer = Importer::new(&self.folder).with_tag_reader(tag_reader);
        self
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    pub fn summary(&self) -> &FlightSummary {
        &self.summary
    }

    pub fn catalog(&self) -> &ElementCatalog {
        &self.catalog
    }

    pub fn preview(&self) -> Option<&Pixmap> {
        self.preview.as_ref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = Some(name.into()).filter(|s| !s.is_empty());
        self.identity.name = name.clone();
        self.summary.name = name;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        let description = Some(description.into()).filter(|s| !s.is_empty());
        self.identity.description = description.clone();
        self.summary.description = description;
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        let language = Some(language.into());
        self.identity.language = language.clone();
        self.summary.language = language;
    }

    /// Import a file or folder into the catalog
    pub fn import<P: AsRef<Path>>(&mut self, path: P, mode: ImportMode) -> FlightResult<ImportReport> {
        self.importer.import(&mut self.catalog, path, mode)
    }

    /// Recompute the summary from the current catalog
    pub fn aggregate(&mut self, geocoder: &dyn Geocoder) -> &FlightSummary {
        self.summary = Aggregator::new(&self.folder, geocoder).aggregate(&self.catalog, &self.identity);
        &self.summary
    }

    /// Render the preview map with the configured parameters
    pub fn render_map(&mut self) -> FlightResult<&Pixmap> {
        let params = self.config.map;
        self.render_map_with(&MapCompositor::new(&self.folder, params))
    }

    pub fn render_map_with(&mut self, compositor: &MapCompositor) -> FlightResult<&Pixmap> {
        let pixmap: &Pixmap = self.preview.insert(compositor.render(&self.catalog)?);
        Ok(pixmap)
    }

    /// "date, HH:MM, city" from the current summary, skipping unknown parts
    pub fn suggested_description(&self) -> String {
        let date = self.summary.date.map(|d| d.format("%Y-%m-%d").to_string());
        let time = self.summary.time.map(|t| t.format("%H:%M").to_string());
        let city = self
            .summary
            .place
            .as_deref()
            .and_then(|p| p.split(',').next())
            .map(|c| c.trim().to_string());
        [date, time, city]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Write preview PNG, summary CSV, KML and optionally KMZ into the folder.
    /// Returns the written paths.
    pub fn save(&self, labels: &dyn LabelLookup) -> FlightResult<Vec<PathBuf>> {
        let mut written = Vec::new();

        match &self.preview {
            Some(pixmap) => {
                let path = self.output_path(&self.config.map_file);
                log::info!("Writing preview map: {}", path.display());
                pixmap
                    .save_png(&path)
                    .map_err(|e| FlightError::Render(format!("{}: {}", path.display(), e)))?;
                written.push(path);
            }
            None => log::warn!("No preview map rendered, skipping {}", self.config.map_file),
        }

        let language = self
            .summary
            .language
            .clone()
            .unwrap_or_else(|| self.config.language.clone());
        let path = self.output_path(&self.config.summary_file);
        SummaryTable::write_file(&path, &self.summary, labels, &language)?;
        written.push(path);

        let document_name = self.document_name();
        let kml = KmlWriter::new(&self.folder);
        let path = self.output_path(&self.config.kml_file);
        kml.write_file(&path, &self.catalog, &document_name)?;
        written.push(path);

        if self.config.write_kmz {
            let path = self.output_path(&self.config.kmz_file);
            kml.write_kmz(&path, &self.catalog, &document_name)?;
            written.push(path);
        }
        Ok(written)
    }

    /// Drop catalog, derived summary and preview; identity fields are kept
    pub fn reset(&mut self) {
        log::info!("Resetting flight record {}", self.folder.display());
        self.catalog.clear();
        self.preview = None;
        self.summary = FlightSummary {
            name: self.identity.name.clone(),
            description: self.identity.description.clone(),
            folder: self.identity.folder.clone(),
            language: self.identity.language.clone(),
            ..Default::default()
        };
    }

    fn output_path(&self, name: &str) -> PathBuf {
        self.folder.join(name)
    }

    fn document_name(&self) -> String {
        self.summary.name.clone().unwrap_or_else(|| {
            self.folder
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.folder.display().to_string())
        })
    }
}
