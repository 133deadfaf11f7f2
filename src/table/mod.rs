//! Table store adapters.
//!
//! Every backend exposes the same four operations over a sheet addressed by
//! [`TableRef`]: header read, full data read, single-cell write and batch
//! range write. Addressing is 1-based on both axes and row 1 is always the
//! header.
//!
//! Backends:
//! - [`MemoryStore`]: in-process workbook, with injectable write faults
//! - [`FileStore`]: JSON workbook file guarded by an exclusive lock
//! - [`CachedStore`]: TTL read cache in front of any other store

mod cache;
mod file;
mod memory;
mod workbook;

pub use cache::{CacheConfig, CachedStore};
pub use file::FileStore;
pub use memory::{FaultPlan, MemoryStore, WriteCounters};
pub use workbook::{Sheet, Workbook};

use crate::error::Result;
use crate::types::{CellRange, Header, TableRef, TableRow};
use serde::{Deserialize, Serialize};

/// Values for one contiguous range, row-major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeWrite {
    pub range: CellRange,
    pub values: Vec<Vec<String>>,
}

impl RangeWrite {
    /// Write one value into one cell.
    pub fn cell(row: usize, col: usize, value: impl Into<String>) -> Self {
        Self {
            range: CellRange::cell(row, col),
            values: vec![vec![value.into()]],
        }
    }

    /// Write `values` across one row starting at `col`.
    pub fn row_span(row: usize, col: usize, values: Vec<String>) -> Self {
        Self {
            range: CellRange::row_span(row, col, values.len()),
            values: vec![values],
        }
    }

    /// A1 label of the target range.
    pub fn label(&self) -> String {
        self.range.to_string()
    }
}

/// Uniform access to a remote tabular resource.
///
/// Implementations give no partial-application guarantee for
/// [`write_range`](TableStore::write_range); callers that need a fallback
/// must build it themselves.
pub trait TableStore {
    /// Row 1 of the sheet.
    ///
    /// Fails with `ResourceNotFound`/`SheetNotFound` when the table does not
    /// resolve and `EmptyHeader` when row 1 has no values.
    fn get_header(&self, table: &TableRef) -> Result<Header>;

    /// All data rows, row 1 excluded. An empty sheet yields an empty vector.
    fn read_all_rows(&self, table: &TableRef) -> Result<Vec<TableRow>>;

    /// Write a single cell.
    fn write_cell(&self, table: &TableRef, row: usize, col: usize, value: &str) -> Result<()>;

    /// Write several ranges as one batch.
    fn write_range(&self, table: &TableRef, updates: &[RangeWrite]) -> Result<()>;

    /// Write a single range on its own, outside any batch.
    fn write_one(&self, table: &TableRef, update: &RangeWrite) -> Result<()> {
        match update.values.as_slice() {
            [row] if update.range.is_cell() && row.len() == 1 => self.write_cell(
                table,
                update.range.start_row,
                update.range.start_col,
                &row[0],
            ),
            _ => self.write_range(table, std::slice::from_ref(update)),
        }
    }
}

impl<T: TableStore + ?Sized> TableStore for &T {
    fn get_header(&self, table: &TableRef) -> Result<Header> {
        (**self).get_header(table)
    }

    fn read_all_rows(&self, table: &TableRef) -> Result<Vec<TableRow>> {
        (**self).read_all_rows(table)
    }

    fn write_cell(&self, table: &TableRef, row: usize, col: usize, value: &str) -> Result<()> {
        (**self).write_cell(table, row, col, value)
    }

    fn write_range(&self, table: &TableRef, updates: &[RangeWrite]) -> Result<()> {
        (**self).write_range(table, updates)
    }

    fn write_one(&self, table: &TableRef, update: &RangeWrite) -> Result<()> {
        (**self).write_one(table, update)
    }
}
