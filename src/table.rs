use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use crate::error::LoadError;

/// Number of leading identifier columns (rank, country) that are not
/// chartable metrics.
pub const IDENTIFIER_COLUMNS: usize = 2;

/// Column index holding the entity identifier (country name).
pub const ENTITY_COLUMN: usize = 1;

/// The dataset, loaded once at startup and immutable afterwards.
///
/// Headers keep their source names and order exactly as given; every row
/// has one cell per header. Metric cells are stored as raw strings and
/// only parsed as numbers at derivation time.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Load the table from a CSV file with a header row.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut reader = csv::Reader::from_reader(file);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| LoadError::Malformed {
                path: path.to_path_buf(),
                source,
            })?
            .iter()
            .map(|h| h.to_string())
            .collect();

        if headers.is_empty() {
            return Err(LoadError::NoColumns {
                path: path.to_path_buf(),
            });
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| LoadError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
            rows.push(record.iter().map(|v| v.to_string()).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// All chartable columns: everything after the leading rank and
    /// country columns, source order preserved.
    pub fn metric_columns(&self) -> &[String] {
        if self.headers.len() <= IDENTIFIER_COLUMNS {
            &[]
        } else {
            &self.headers[IDENTIFIER_COLUMNS..]
        }
    }

    /// Distinct entity identifiers in first-seen order.
    pub fn distinct_entities(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();
        for row in &self.rows {
            if let Some(entity) = row.get(ENTITY_COLUMN) {
                if seen.insert(entity.clone()) {
                    entities.push(entity.clone());
                }
            }
        }
        entities
    }

    /// Index of a column by exact header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Entity identifier of a row, if present.
    pub fn entity_of<'a>(&self, row: &'a [String]) -> Option<&'a str> {
        row.get(ENTITY_COLUMN).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn make_table() -> Table {
        Table::new(
            vec![
                "Rank".to_string(),
                "Country".to_string(),
                "X".to_string(),
                "Y".to_string(),
            ],
            vec![
                vec!["1".into(), "A".into(), "10".into(), "5".into()],
                vec!["2".into(), "B".into(), "20".into(), "8".into()],
                vec!["3".into(), "A".into(), "30".into(), "9".into()],
            ],
        )
    }

    #[test]
    fn test_metric_columns_skip_identifiers() {
        let table = make_table();
        assert_eq!(table.metric_columns(), &["X".to_string(), "Y".to_string()]);
    }

    #[test]
    fn test_metric_columns_empty_when_only_identifiers() {
        let table = Table::new(vec!["Rank".into(), "Country".into()], vec![]);
        assert!(table.metric_columns().is_empty());
    }

    #[test]
    fn test_distinct_entities_first_seen_order() {
        let table = make_table();
        assert_eq!(table.distinct_entities(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_column_index() {
        let table = make_table();
        assert_eq!(table.column_index("Country"), Some(1));
        assert_eq!(table.column_index("Y"), Some(3));
        assert_eq!(table.column_index("nope"), None);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Table::load(Path::new("does/not/exist.csv"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_load_roundtrip() {
        let file = tempfile_with("Rank,Country,Cost\n1,Albania,47.8\n2,Norway,101.4\n");
        let table = Table::load(file.path()).unwrap();
        assert_eq!(table.headers(), &["Rank", "Country", "Cost"]);
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.rows()[1][1], "Norway");
    }

    #[test]
    fn test_load_preserves_header_order_and_names() {
        let file = tempfile_with("Rank,Country,Rent Index,Groceries Index\n");
        let table = Table::load(file.path()).unwrap();
        assert_eq!(
            table.metric_columns(),
            &["Rent Index".to_string(), "Groceries Index".to_string()]
        );
    }

    #[test]
    fn test_fixtures_of_equal_length_stay_distinct() {
        let a = tempfile_with("Rank,Country,Cost\n1,Albania,47.8\n");
        let b = tempfile_with("Rank,Country,Cost\n1,Armenia,39.9\n");
        assert_ne!(a.path(), b.path());
        assert_eq!(Table::load(a.path()).unwrap().rows()[0][1], "Albania");
        assert_eq!(Table::load(b.path()).unwrap().rows()[0][1], "Armenia");
    }

    fn tempfile_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }
}
