//! Turns a worksheet grid into a keyed [`Dataset`].

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;

use super::record::{CellValue, Dataset, DatasetRecord, KEY_COLUMN};
use super::store::LoadError;
use super::xlsx::{self, SheetGrid};

/// Parses xlsx bytes into a dataset.
///
/// # Errors
///
/// Returns [`LoadError::ParseError`] for unreadable workbooks and
/// [`LoadError::MissingKeyColumn`] when the header has no `ID` column.
pub fn parse_dataset(
    bytes: &[u8],
    file_name: &str,
    source_path: Option<PathBuf>,
) -> Result<Dataset, LoadError> {
    let grid = xlsx::read_first_sheet(bytes)?;
    build_dataset(grid, file_name, source_path)
}

/// Builds a dataset from a grid whose first row is the header.
///
/// # Errors
///
/// Returns [`LoadError::MissingKeyColumn`] when no header cell is `ID`.
pub fn build_dataset(
    grid: SheetGrid,
    file_name: &str,
    source_path: Option<PathBuf>,
) -> Result<Dataset, LoadError> {
    let mut rows = grid.rows.into_iter();
    let header = rows.next().unwrap_or_default();
    let columns = header_names(&header);

    if !columns.iter().any(|c| c == KEY_COLUMN) {
        return Err(LoadError::MissingKeyColumn);
    }

    let records = rows
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .map(|row| {
            let mut cells = row.into_iter();
            let fields = columns
                .iter()
                .map(|name| (name.clone(), cells.next().unwrap_or(CellValue::Empty)))
                .collect();
            DatasetRecord::new(fields)
        })
        .collect();

    Ok(Dataset {
        columns,
        records,
        file_name: file_name.to_owned(),
        source_path,
        loaded_at: Utc::now(),
    })
}

/// Stringifies header cells, naming blanks and de-duplicating repeats.
fn header_names(header: &[CellValue]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            let base = match cell.to_string().trim() {
                "" => format!("Unnamed: {index}"),
                name => name.to_owned(),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}
