use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueHint};
use flightlog::io::{Geocoder, LabelTable, NoGeocoder, PlaceTable};
use flightlog::{FlightConfig, FlightRecord, ImportMode, SummaryKey};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Build a flight record from a drone survey folder", long_about = None)]
struct Cli {
    /// Flight folder to catalogue
    #[arg(required = true, value_hint = ValueHint::DirPath)]
    folder: PathBuf,

    /// Flight name
    #[arg(short, long)]
    name: Option<String>,

    /// Flight description; defaults to "date, time, city"
    #[arg(short, long)]
    description: Option<String>,

    /// Language of the summary labels
    #[arg(short, long)]
    language: Option<String>,

    /// Populated places table for reverse geocoding (lat,lon,name,admin1,cc)
    #[arg(long, value_hint = ValueHint::FilePath)]
    places: Option<PathBuf>,

    /// Label translations table (variable,<lang>,...)
    #[arg(long, value_hint = ValueHint::FilePath)]
    labels: Option<PathBuf>,

    /// Start from the summary saved in the folder
    #[arg(long, action = ArgAction::SetTrue)]
    open: bool,

    /// Re-read files that are already catalogued
    #[arg(long, action = ArgAction::SetTrue)]
    replace: bool,

    /// Preview map size in pixels
    #[arg(long, default_value_t = 800)]
    size: u32,

    #[arg(long, action = ArgAction::SetTrue)]
    no_mosaic: bool,

    #[arg(long, action = ArgAction::SetTrue)]
    no_images: bool,

    #[arg(long, action = ArgAction::SetTrue)]
    no_polygon: bool,

    #[arg(long, action = ArgAction::SetTrue)]
    no_flight_plan: bool,

    /// Also write a KMZ archive
    #[arg(long, action = ArgAction::SetTrue)]
    kmz: bool,
}

impl Cli {
    fn config(&self) -> FlightConfig {
        let mut config = FlightConfig::default();
        if let Some(language) = &self.language {
            config.language = language.clone();
        }
        config.map.size = self.size;
        config.map.layers.mosaic = !self.no_mosaic;
        config.map.layers.images = !self.no_images;
        config.map.layers.polygon = !self.no_polygon;
        config.map.layers.flight_plan = !self.no_flight_plan;
        config.write_kmz = self.kmz;
        config
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = cli.config();
    let mut record = if cli.open {
        FlightRecord::open(&cli.folder, config)
            .with_context(|| format!("Failed to open flight record in {}", cli.folder.display()))?
    } else {
        FlightRecord::new(&cli.folder, config)
    };
    if let Some(name) = &cli.name {
        record.set_name(name.as_str());
    }
    if let Some(language) = &cli.language {
        record.set_language(language.as_str());
    }

    let mode = if cli.replace { ImportMode::Replace } else { ImportMode::Skip };
    let report = record
        .import(&cli.folder, mode)
        .with_context(|| format!("Failed to import {}", cli.folder.display()))?;
    for (path, error) in &report.failed {
        log::warn!("Skipped {}: {}", path.display(), error);
    }
    if !report.any_imported() && record.catalog().is_empty() {
        log::warn!("No survey files found in {}", cli.folder.display());
    }

    let geocoder: Box<dyn Geocoder> = match &cli.places {
        Some(path) => Box::new(
            PlaceTable::from_csv(path)
                .with_context(|| format!("Failed to load places from {}", path.display()))?,
        ),
        None => Box::new(NoGeocoder),
    };
    record.aggregate(geocoder.as_ref());

    match &cli.description {
        Some(description) => record.set_description(description.as_str()),
        None if record.summary().description.is_none() => {
            let suggested = record.suggested_description();
            record.set_description(suggested);
        }
        None => {}
    }

    record.render_map().context("Failed to render the preview map")?;

    let labels = match &cli.labels {
        Some(path) => LabelTable::from_csv(path)
            .with_context(|| format!("Failed to load labels from {}", path.display()))?,
        None => LabelTable::default(),
    };
    let written = record.save(&labels).context("Failed to save the flight record")?;

    let summary = record.summary();
    for key in SummaryKey::ALL {
        if let Some(value) = summary.value(key) {
            println!("{:<18} {}", key.variable(), value);
        }
    }
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(())
}
