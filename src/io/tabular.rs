use crate::io::labels::LabelLookup;
use crate::types::{FlightError, FlightResult, FlightSummary, SummaryKey};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

/// One line of the persisted summary: `id, label, value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub id: u32,
    pub label: String,
    pub value: String,
}

/// Headerless three-column CSV form of a [`FlightSummary`]
pub struct SummaryTable;

impl SummaryTable {
    /// One row per summary key, in id order; absent values are empty strings
    pub fn rows(summary: &FlightSummary, labels: &dyn LabelLookup, language: &str) -> Vec<SummaryRow> {
        SummaryKey::ALL
            .iter()
            .map(|&key| SummaryRow {
                id: key.id(),
                label: labels.label(key, language),
                value: summary.value(key).unwrap_or_default(),
            })
            .collect()
    }

    pub fn write<W: Write>(
        writer: W,
        summary: &FlightSummary,
        labels: &dyn LabelLookup,
        language: &str,
    ) -> FlightResult<()> {
        let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        for row in Self::rows(summary, labels, language) {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_file<P: AsRef<Path>>(
        path: P,
        summary: &FlightSummary,
        labels: &dyn LabelLookup,
        language: &str,
    ) -> FlightResult<()> {
        log::info!("Writing summary table: {}", path.as_ref().display());
        let file = std::fs::File::create(path.as_ref())?;
        Self::write(file, summary, labels, language)
    }

    /// Rebuild a summary from its rows. Labels are ignored, unknown ids skipped.
    pub fn read<R: Read>(reader: R, source: &Path) -> FlightResult<FlightSummary> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut summary = FlightSummary::default();
        for record in csv_reader.records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line() as usize);
            let row: SummaryRow = record
                .deserialize(None)
                .map_err(|e| FlightError::parse(source, line, e.to_string()))?;
            match SummaryKey::from_id(row.id) {
                Some(key) => summary
                    .set_value(key, &row.value)
                    .map_err(|message| FlightError::parse(source, line, message))?,
                None => log::debug!("Skipping unknown summary id {} at line {}", row.id, line),
            }
        }
        Ok(summary)
    }

    pub fn read_file<P: AsRef<Path>>(path: P) -> FlightResult<FlightSummary> {
        let path = path.as_ref();
        log::info!("Reading summary table: {}", path.display());
        let file = std::fs::File::open(path)?;
        Self::read(file, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::labels::LabelTable;
    use chrono::NaiveDate;

    fn summary() -> FlightSummary {
        FlightSummary {
            name: Some("Lote 7".into()),
            place: Some("Cordoba, Cordoba, AR".into()),
            date: NaiveDate::from_ymd_opt(2021, 6, 1),
            polygons: vec!["a.poly".into(), "b.poly".into()],
            image_count: Some(212),
            covered_area: Some(10250.5),
            ..Default::default()
        }
    }

    #[test]
    fn test_rows_cover_every_key() {
        let rows = SummaryTable::rows(&summary(), &LabelTable::default(), "en");
        assert_eq!(rows.len(), SummaryKey::ALL.len());
        assert_eq!(rows[0], SummaryRow { id: 1, label: "Name".into(), value: "Lote 7".into() });
        assert_eq!(rows[1].value, "");
    }

    #[test]
    fn test_written_table_has_no_header_and_quotes_lists() {
        let mut buffer = Vec::new();
        SummaryTable::write(&mut buffer, &summary(), &LabelTable::default(), "es").unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("1,Nombre,Lote 7"));
        assert!(text.contains("8,Polígono,\"a.poly, b.poly\""));
        assert_eq!(text.lines().count(), 24);

        let back = SummaryTable::read(text.as_bytes(), Path::new("flightlog.csv")).unwrap();
        assert_eq!(back, summary());
    }

    #[test]
    fn test_bad_value_reports_line() {
        let text = "1,Name,x\n13,Image count,many\n";
        match SummaryTable::read(text.as_bytes(), Path::new("s.csv")) {
            Err(FlightError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
