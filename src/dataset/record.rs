//! Dataset rows and cell values.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Name of the column every dataset must carry.
pub const KEY_COLUMN: &str = "ID";

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Integer(i64),
    Float(f64),
}

impl CellValue {
    /// Builds a numeric cell, folding integral floats into integers.
    #[must_use]
    pub fn number(value: f64) -> Self {
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
        if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
            #[allow(clippy::cast_possible_truncation)]
            Self::Integer(value as i64)
        } else {
            Self::Float(value)
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

/// One row of the uploaded table.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRecord {
    /// Normalized key (stringified and trimmed `ID` cell).
    pub id: String,

    /// Column name and value pairs in sheet order, `ID` included.
    pub fields: Vec<(String, CellValue)>,
}

impl DatasetRecord {
    /// Builds a record, deriving the key from the `ID` field.
    #[must_use]
    pub fn new(fields: Vec<(String, CellValue)>) -> Self {
        let id = fields
            .iter()
            .find(|(name, _)| name == KEY_COLUMN)
            .map(|(_, value)| normalize_key(&value.to_string()))
            .unwrap_or_default();
        Self { id, fields }
    }

    /// Returns the value of a column, if present.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Iterates over column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

/// Normalizes a lookup key the same way record keys are normalized.
#[must_use]
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_owned()
}

/// A fully parsed table together with where it came from.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Column names in sheet order.
    pub columns: Vec<String>,

    pub records: Vec<DatasetRecord>,

    /// File name as uploaded.
    pub file_name: String,

    /// File on disk backing this dataset, if it was persisted.
    pub source_path: Option<PathBuf>,

    pub loaded_at: DateTime<Utc>,
}

impl Dataset {
    /// Returns every record whose key equals the normalized query.
    #[must_use]
    pub fn find(&self, id: &str) -> Vec<DatasetRecord> {
        let key = normalize_key(id);
        if key.is_empty() {
            return Vec::new();
        }
        self.records
            .iter()
            .filter(|record| record.id == key)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns a short description for logs and admin replies.
    #[must_use]
    pub fn summary(&self) -> LoadSummary {
        LoadSummary {
            file_name: self.file_name.clone(),
            record_count: self.records.len(),
            column_count: self.columns.len(),
            loaded_at: self.loaded_at,
        }
    }
}

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub file_name: String,
    pub record_count: usize,
    pub column_count: usize,
    pub loaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: CellValue, name: &str) -> DatasetRecord {
        DatasetRecord::new(vec![
            (KEY_COLUMN.to_owned(), id),
            ("Name".to_owned(), CellValue::Text(name.to_owned())),
        ])
    }

    #[test]
    fn test_integral_float_becomes_integer() {
        assert_eq!(CellValue::number(7.0), CellValue::Integer(7));
        assert_eq!(CellValue::number(-3.0), CellValue::Integer(-3));
        assert_eq!(CellValue::number(2.5), CellValue::Float(2.5));
        assert_eq!(CellValue::number(2.5).to_string(), "2.5");
    }

    #[test]
    fn test_record_key_is_trimmed() {
        let r = record(CellValue::Text("  0042 ".to_owned()), "Ann");
        assert_eq!(r.id, "0042");
        assert_eq!(r.get("Name"), Some(&CellValue::Text("Ann".to_owned())));
        assert_eq!(r.columns().collect::<Vec<_>>(), vec!["ID", "Name"]);
    }

    #[test]
    fn test_numeric_key_is_stringified() {
        assert_eq!(record(CellValue::Integer(7), "Ann").id, "7");
        assert_eq!(record(CellValue::Empty, "Ann").id, "");
    }

    #[test]
    fn test_find_returns_duplicates_in_order() {
        let dataset = Dataset {
            columns: vec!["ID".to_owned(), "Name".to_owned()],
            records: vec![
                record(CellValue::Integer(1), "Ann"),
                record(CellValue::Integer(2), "Bob"),
                record(CellValue::Integer(1), "Cid"),
            ],
            file_name: "people.xlsx".to_owned(),
            source_path: None,
            loaded_at: Utc::now(),
        };

        let found = dataset.find(" 1 ");
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].get("Name"), Some(&CellValue::Text("Cid".to_owned())));
        assert!(dataset.find("3").is_empty());
        assert!(dataset.find("   ").is_empty());
    }
}
