use crate::types::{FlightError, FlightResult, Geometry, Vertex};
use std::path::Path;

/// Reader for boundary polygon files: `#` comments, then one `latitude longitude` pair per line.
pub struct PolygonReader;

impl PolygonReader {
    pub fn read_file<P: AsRef<Path>>(path: P) -> FlightResult<Geometry> {
        let path = path.as_ref();
        log::debug!("Reading polygon: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Vertices are kept in file order, without deduplication or closing.
    pub fn parse(content: &str, source: &Path) -> FlightResult<Geometry> {
        let mut vertices = Vec::new();

        for (i, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            if fields.len() != 2 {
                return Err(FlightError::parse(
                    source,
                    i + 1,
                    format!("expected 'latitude longitude', found {} fields", fields.len()),
                ));
            }
            let coordinate = |s: &str| -> FlightResult<f64> {
                s.parse::<f64>().map_err(|_| {
                    FlightError::parse(source, i + 1, format!("'{}' is not a coordinate", s))
                })
            };
            let latitude = coordinate(fields[0])?;
            let longitude = coordinate(fields[1])?;
            vertices.push(Vertex::new(longitude, latitude));
        }

        Ok(Geometry::Polygon(vertices))
    }
}
