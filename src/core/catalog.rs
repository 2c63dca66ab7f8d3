use crate::types::{Category, ElementEntry};

/// What an upsert did to the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    /// Identity already present and replacement not requested
    Skipped,
}

/// Classified, metadata-enriched files of one flight, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementCatalog {
    entries: Vec<ElementEntry>,
}

impl ElementCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[ElementEntry] {
        &self.entries
    }

    pub fn contains(&self, filename: &str, subfolder: &str) -> bool {
        self.position(filename, subfolder).is_some()
    }

    pub fn get(&self, filename: &str, subfolder: &str) -> Option<&ElementEntry> {
        self.position(filename, subfolder).map(|i| &self.entries[i])
    }

    fn position(&self, filename: &str, subfolder: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.same_identity(filename, subfolder))
    }

    /// Insert a new row, or overwrite the existing row in place when `replace` is set.
    /// The row count only grows on first insertion.
    pub fn upsert(&mut self, entry: ElementEntry, replace: bool) -> UpsertOutcome {
        match self.position(&entry.filename, &entry.subfolder) {
            Some(i) if replace => {
                self.entries[i] = entry;
                UpsertOutcome::Replaced
            }
            Some(_) => UpsertOutcome::Skipped,
            None => {
                self.entries.push(entry);
                UpsertOutcome::Inserted
            }
        }
    }

    /// Entries of one category, in catalog order
    pub fn by_category(&self, category: Category) -> Vec<&ElementEntry> {
        self.entries.iter().filter(|e| e.category == category).collect()
    }

    /// Entries of one category, latest timestamp first.
    /// Ties and missing timestamps keep catalog order; untimed entries go last.
    pub fn newest_first(&self, category: Category) -> Vec<&ElementEntry> {
        let mut entries = self.by_category(category);
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }

    /// Entries of one category, earliest timestamp first; untimed entries go last.
    pub fn oldest_first(&self, category: Category) -> Vec<&ElementEntry> {
        let mut entries = self.by_category(category);
        entries.sort_by(|a, b| match (a.timestamp, b.timestamp) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> Option<chrono::NaiveDateTime> {
        NaiveDate::from_ymd_opt(2022, 1, 1).unwrap().and_hms_opt(hour, 0, 0)
    }

    #[test]
    fn test_upsert_identity_rules() {
        let mut catalog = ElementCatalog::new();
        let first = ElementEntry::new("a.jpg", ".", Category::Image, 10, at(1));
        assert_eq!(catalog.upsert(first.clone(), false), UpsertOutcome::Inserted);

        let mut changed = first.clone();
        changed.size = 99;
        assert_eq!(catalog.upsert(changed.clone(), false), UpsertOutcome::Skipped);
        assert_eq!(catalog.get("a.jpg", ".").unwrap().size, 10);

        assert_eq!(catalog.upsert(changed, true), UpsertOutcome::Replaced);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("a.jpg", ".").unwrap().size, 99);

        let other_folder = ElementEntry::new("a.jpg", "sub", Category::Image, 10, at(1));
        assert_eq!(catalog.upsert(other_folder, false), UpsertOutcome::Inserted);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_timestamp_orderings() {
        let mut catalog = ElementCatalog::new();
        catalog.upsert(ElementEntry::new("b.poly", ".", Category::Polygon, 1, at(5)), false);
        catalog.upsert(ElementEntry::new("c.poly", ".", Category::Polygon, 1, None), false);
        catalog.upsert(ElementEntry::new("a.poly", ".", Category::Polygon, 1, at(9)), false);
        catalog.upsert(ElementEntry::new("x.jpg", ".", Category::Image, 1, at(1)), false);

        let newest: Vec<&str> = catalog
            .newest_first(Category::Polygon)
            .iter()
            .map(|e| e.filename.as_str())
            .collect();
        assert_eq!(newest, ["a.poly", "b.poly", "c.poly"]);

        let oldest: Vec<&str> = catalog
            .oldest_first(Category::Polygon)
            .iter()
            .map(|e| e.filename.as_str())
            .collect();
        assert_eq!(oldest, ["b.poly", "a.poly", "c.poly"]);
    }
}
