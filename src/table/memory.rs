//! In-process table store.

use super::workbook::{resolve, resolve_mut};
use super::{RangeWrite, Sheet, TableStore, Workbook};
use crate::error::{Result, SyncError};
use crate::types::{Header, TableRef, TableRow};
use parking_lot::RwLock;
use std::collections::HashSet;

/// Injected failures for exercising the batch fallback path.
#[derive(Clone, Debug, Default)]
pub struct FaultPlan {
    /// Reject every batch write.
    pub fail_batch: bool,
    /// Reject individual writes targeting these A1 ranges.
    pub fail_ranges: HashSet<String>,
    /// Reject row reads.
    pub fail_reads: bool,
}

impl FaultPlan {
    pub fn failing_batch() -> Self {
        Self {
            fail_batch: true,
            ..Default::default()
        }
    }

    pub fn with_failing_range(mut self, range: impl Into<String>) -> Self {
        self.fail_ranges.insert(range.into());
        self
    }
}

/// Write call counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteCounters {
    /// Batch write calls, successful or not.
    pub batch_calls: u64,
    /// Individual write calls, successful or not.
    pub single_calls: u64,
    /// Ranges actually applied.
    pub applied: u64,
}

/// Workbooks held in memory behind a lock.
#[derive(Default)]
pub struct MemoryStore {
    books: RwLock<Vec<Workbook>>,
    faults: RwLock<FaultPlan>,
    counters: RwLock<WriteCounters>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one workbook.
    pub fn with_workbook(book: Workbook) -> Self {
        let store = Self::new();
        store.insert_workbook(book);
        store
    }

    pub fn insert_workbook(&self, book: Workbook) {
        let mut books = self.books.write();
        books.retain(|b| b.id != book.id);
        books.push(book);
    }

    pub fn set_faults(&self, faults: FaultPlan) {
        *self.faults.write() = faults;
    }

    pub fn counters(&self) -> WriteCounters {
        *self.counters.read()
    }

    /// Copy of a sheet's current contents.
    pub fn sheet(&self, table: &TableRef) -> Result<Sheet> {
        let books = self.books.read();
        Ok(resolve(&books, table)?.sheet(table)?.clone())
    }

    fn apply_single(&self, table: &TableRef, update: &RangeWrite) -> Result<()> {
        self.counters.write().single_calls += 1;

        let label = update.label();
        if self.faults.read().fail_ranges.contains(&label) {
            return Err(SyncError::write(label, "injected failure"));
        }

        let mut books = self.books.write();
        let sheet = resolve_mut(&mut books, table)?.sheet_mut(table)?;
        sheet.apply(update)?;
        self.counters.write().applied += 1;
        Ok(())
    }
}

impl TableStore for MemoryStore {
    fn get_header(&self, table: &TableRef) -> Result<Header> {
        let books = self.books.read();
        resolve(&books, table)?.sheet(table)?.header(table)
    }

    fn read_all_rows(&self, table: &TableRef) -> Result<Vec<TableRow>> {
        if self.faults.read().fail_reads {
            return Err(SyncError::RemoteRead(format!("{}: injected failure", table)));
        }
        let books = self.books.read();
        Ok(resolve(&books, table)?.sheet(table)?.rows())
    }

    fn write_cell(&self, table: &TableRef, row: usize, col: usize, value: &str) -> Result<()> {
        self.apply_single(table, &RangeWrite::cell(row, col, value))
    }

    fn write_range(&self, table: &TableRef, updates: &[RangeWrite]) -> Result<()> {
        self.counters.write().batch_calls += 1;

        if self.faults.read().fail_batch {
            return Err(SyncError::write(
                format!("batch of {}", updates.len()),
                "injected failure",
            ));
        }

        let mut books = self.books.write();
        let sheet = resolve_mut(&mut books, table)?.sheet_mut(table)?;

        // Validate everything first so a rejected batch leaves the sheet untouched.
        for update in updates {
            Sheet::validate(update)?;
        }
        for update in updates {
            sheet.apply(update)?;
        }

        self.counters.write().applied += updates.len() as u64;
        Ok(())
    }

    fn write_one(&self, table: &TableRef, update: &RangeWrite) -> Result<()> {
        self.apply_single(table, update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (MemoryStore, TableRef) {
        let book = Workbook::new("abc", "data gardu").with_sheet(Sheet::with_rows(
            0,
            "History",
            ["ID", "STATUS"],
            vec![vec!["G1".into(), "Proses".into()]],
        ));
        (MemoryStore::with_workbook(book), TableRef::named("data gardu", "History"))
    }

    #[test]
    fn test_read_excludes_header() {
        let (store, table) = store();
        assert_eq!(store.get_header(&table).unwrap().names(), ["ID", "STATUS"]);
        assert_eq!(store.read_all_rows(&table).unwrap(), vec![vec!["G1", "Proses"]]);
    }

    #[test]
    fn test_empty_sheet_reads_empty() {
        let store = MemoryStore::with_workbook(
            Workbook::new("abc", "data gardu").with_sheet(Sheet::new(0, "Log")),
        );
        let table = TableRef::named("data gardu", "Log");
        assert!(store.read_all_rows(&table).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_resource() {
        let (store, _) = store();
        let table = TableRef::named("other", "History");
        assert!(matches!(
            store.get_header(&table),
            Err(SyncError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn test_failing_batch_leaves_sheet_untouched() {
        let (store, table) = store();
        store.set_faults(FaultPlan::failing_batch());

        let result = store.write_range(&table, &[RangeWrite::cell(2, 2, "Selesai")]);
        assert!(result.is_err());
        assert_eq!(store.sheet(&table).unwrap().value(2, 2), "Proses");

        // Individual writes still go through.
        store.write_one(&table, &RangeWrite::cell(2, 2, "Selesai")).unwrap();
        assert_eq!(store.sheet(&table).unwrap().value(2, 2), "Selesai");
        assert_eq!(
            store.counters(),
            WriteCounters {
                batch_calls: 1,
                single_calls: 1,
                applied: 1
            }
        );
    }

    #[test]
    fn test_failing_range() {
        let (store, table) = store();
        store.set_faults(FaultPlan::default().with_failing_range("B2"));
        assert!(store.write_cell(&table, 2, 2, "x").is_err());
        store.write_cell(&table, 2, 1, "G9").unwrap();
        assert_eq!(store.sheet(&table).unwrap().value(2, 1), "G9");
    }
}
