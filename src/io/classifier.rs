use crate::types::Category;

/// Extension-based file classifier.
///
/// Categories are kept in an ordered table; the first category whose extension
/// set matches the filename (case-insensitive) wins.
#[derive(Debug, Clone)]
pub struct FileClassifier {
    table: Vec<(Category, Vec<String>)>,
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::with_table(vec![
            (Category::Image, vec!["jpg", "jpeg"]),
            (Category::Telemetry, vec!["tlog"]),
            (Category::Polygon, vec!["poly"]),
            (Category::FlightPlan, vec!["waypoints", "grid"]),
            (Category::Raster, vec!["tif", "tiff"]),
        ])
    }
}

impl FileClassifier {
    /// Build a classifier from an explicit priority-ordered table.
    /// Extensions are given without the leading dot.
    pub fn with_table(table: Vec<(Category, Vec<&str>)>) -> Self {
        let table = table
            .into_iter()
            .map(|(category, extensions)| {
                let extensions = extensions
                    .into_iter()
                    .map(|ext| format!(".{}", ext.trim_start_matches('.').to_lowercase()))
                    .collect();
                (category, extensions)
            })
            .collect();
        Self { table }
    }

    /// Category of a filename, or `None` when it matches no extension
    pub fn classify(&self, filename: &str) -> Option<Category> {
        let lower = filename.to_lowercase();
        self.table
            .iter()
            .find(|(_, extensions)| extensions.iter().any(|ext| lower.ends_with(ext.as_str())))
            .map(|(category, _)| *category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let classifier = FileClassifier::default();
        assert_eq!(classifier.classify("DJI_0001.JPG"), Some(Category::Image));
        assert_eq!(classifier.classify("photo.jpeg"), Some(Category::Image));
        assert_eq!(classifier.classify("2021-06-01 10-15-00.tlog"), Some(Category::Telemetry));
        assert_eq!(classifier.classify("field.poly"), Some(Category::Polygon));
        assert_eq!(classifier.classify("mission.waypoints"), Some(Category::FlightPlan));
        assert_eq!(classifier.classify("survey.grid"), Some(Category::FlightPlan));
        assert_eq!(classifier.classify("odm_orthophoto.tif"), Some(Category::Raster));
        assert_eq!(classifier.classify("dsm.TIFF"), Some(Category::Raster));
    }

    #[test]
    fn test_unmatched_files_are_not_classified() {
        let classifier = FileClassifier::default();
        assert_eq!(classifier.classify("notes.txt"), None);
        assert_eq!(classifier.classify("jpg"), None);
        assert_eq!(classifier.classify("archive.jpg.zip"), None);
        assert_eq!(classifier.classify(""), None);
    }

    #[test]
    fn test_earliest_declared_category_wins() {
        let classifier = FileClassifier::with_table(vec![
            (Category::Polygon, vec!["txt"]),
            (Category::FlightPlan, vec![".TXT", "plan"]),
        ]);
        assert_eq!(classifier.classify("boundary.txt"), Some(Category::Polygon));
        assert_eq!(classifier.classify("route.plan"), Some(Category::FlightPlan));
    }
}
