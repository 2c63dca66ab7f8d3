use crate::types::{FlightResult, SummaryKey};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Human-readable label of a summary key in a given language
pub trait LabelLookup {
    fn label(&self, key: SummaryKey, language: &str) -> String;
}

const BUILTIN_LANGUAGES: [&str; 2] = ["es", "en"];

fn builtin_labels(key: SummaryKey) -> [&'static str; 2] {
    match key {
        SummaryKey::Name => ["Nombre", "Name"],
        SummaryKey::Description => ["Descripción", "Description"],
        SummaryKey::Place => ["Localidad", "Place"],
        SummaryKey::Folder => ["Carpeta", "Folder"],
        SummaryKey::Date => ["Fecha", "Date"],
        SummaryKey::Time => ["Hora", "Time"],
        SummaryKey::TelemetryLogs => ["Registro de telemetría", "Telemetry log"],
        SummaryKey::Polygons => ["Polígono", "Polygon"],
        SummaryKey::FlightPlans => ["Plan de vuelo", "Flight plan"],
        SummaryKey::FlightAltitude => ["Altitud de vuelo (m)", "Flight altitude (m)"],
        SummaryKey::FlightSpeed => ["Velocidad de vuelo (m/s)", "Flight speed (m/s)"],
        SummaryKey::Images => ["Imágenes", "Images"],
        SummaryKey::ImageCount => ["Cantidad de imágenes", "Image count"],
        SummaryKey::CoveredArea => ["Superficie cubierta (m²)", "Covered area (m²)"],
        SummaryKey::Camera => ["Cámara", "Camera"],
        SummaryKey::Iso => ["ISO", "ISO"],
        SummaryKey::Exposure => ["Exposición", "Exposure"],
        SummaryKey::Mosaics => ["Mosaico", "Mosaic"],
        SummaryKey::ElevationModels => ["Modelo de elevación", "Elevation model"],
        SummaryKey::Latitude => ["Latitud", "Latitude"],
        SummaryKey::Longitude => ["Longitud", "Longitude"],
        SummaryKey::Altitude => ["Altitud", "Altitude"],
        SummaryKey::Language => ["Idioma", "Language"],
        SummaryKey::Version => ["Versión", "Version"],
    }
}

/// Label table keyed by summary key, one column per language code
#[derive(Debug, Clone)]
pub struct LabelTable {
    languages: Vec<String>,
    labels: HashMap<SummaryKey, Vec<String>>,
}

impl Default for LabelTable {
    fn default() -> Self {
        let labels = SummaryKey::ALL
            .iter()
            .map(|&key| (key, builtin_labels(key).iter().map(|s| s.to_string()).collect()))
            .collect();
        Self {
            languages: BUILTIN_LANGUAGES.iter().map(|s| s.to_string()).collect(),
            labels,
        }
    }
}

impl LabelTable {
    /// Load a translation table: header `variable,<lang>,<lang>...`, one row per key.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> FlightResult<Self> {
        log::info!("Loading label table: {}", path.as_ref().display());
        Self::from_reader(std::fs::File::open(path.as_ref())?)
    }

    pub fn from_reader<R: Read>(reader: R) -> FlightResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let languages: Vec<String> = csv_reader
            .headers()?
            .iter()
            .skip(1)
            .map(|s| s.trim().to_string())
            .collect();

        let mut labels = HashMap::new();
        for record in csv_reader.records() {
            let record = record?;
            let Some(variable) = record.get(0) else { continue };
            match SummaryKey::from_variable(variable.trim()) {
                Some(key) => {
                    let row = (0..languages.len())
                        .map(|i| record.get(i + 1).unwrap_or("").trim().to_string())
                        .collect();
                    labels.insert(key, row);
                }
                None => log::debug!("Unknown variable '{}' in label table", variable),
            }
        }
        Ok(Self { languages, labels })
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }
}

impl LabelLookup for LabelTable {
    fn label(&self, key: SummaryKey, language: &str) -> String {
        self.languages
            .iter()
            .position(|l| l == language)
            .and_then(|i| self.labels.get(&key).and_then(|row| row.get(i)))
            .filter(|label| !label.is_empty())
            .cloned()
            .unwrap_or_else(|| key.variable().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_labels() {
        let table = LabelTable::default();
        assert_eq!(table.label(SummaryKey::Date, "es"), "Fecha");
        assert_eq!(table.label(SummaryKey::Date, "en"), "Date");
        assert_eq!(table.label(SummaryKey::Date, "fr"), "date");
    }

    #[test]
    fn test_table_from_csv_with_gaps() {
        let text = "variable,es,pt\nplace,Localidad,Localidade\ncamera,Cámara,\nbogus,x,y\n";
        let table = LabelTable::from_reader(text.as_bytes()).unwrap();
        assert_eq!(table.languages(), ["es", "pt"]);
        assert_eq!(table.label(SummaryKey::Place, "pt"), "Localidade");
        assert_eq!(table.label(SummaryKey::Camera, "pt"), "camera");
        assert_eq!(table.label(SummaryKey::Iso, "es"), "iso");
    }
}
