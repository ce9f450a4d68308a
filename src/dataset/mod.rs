//! Admin-uploaded lookup table.
//!
//! Parses `.xlsx` uploads into keyed records and keeps exactly one
//! active dataset that can be replaced or cleared while lookups run.

mod manifest;
mod record;
mod store;
mod table;
mod xlsx;

pub use manifest::DatasetManifest;
pub use record::{CellValue, Dataset, DatasetRecord, KEY_COLUMN, LoadSummary, normalize_key};
pub use store::{DatasetStore, LoadError, LookupError};
pub use table::parse_dataset;
pub use xlsx::SheetError;

#[cfg(test)]
pub(crate) use xlsx::tests::workbook_bytes;
