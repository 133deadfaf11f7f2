//! JSON workbook file backend.
//!
//! The whole file is re-read on every call so that the file stays the only
//! source of truth, and rewritten atomically (temp file + rename) on every
//! write. An exclusive lock file keeps a second process out for the
//! lifetime of the store.

use super::workbook::{resolve, resolve_mut};
use super::{RangeWrite, Sheet, TableStore, Workbook};
use crate::error::{Result, SyncError};
use crate::types::{Header, TableRef, TableRow};
use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current workbook file format version.
const FILE_VERSION: u8 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct WorkbookFile {
    version: u8,
    workbooks: Vec<Workbook>,
}

/// Table store backed by a JSON file.
pub struct FileStore {
    path: PathBuf,
    _lock_file: File,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open an existing workbook file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(SyncError::ResourceNotFound(path.display().to_string()));
        }
        let lock_file = Self::acquire_lock(&path)?;
        let store = Self {
            path,
            _lock_file: lock_file,
            write_lock: Mutex::new(()),
        };
        store.load()?;
        Ok(store)
    }

    /// Create a new workbook file holding `workbooks`, replacing any existing file.
    pub fn create(path: impl AsRef<Path>, workbooks: Vec<Workbook>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock_file = Self::acquire_lock(&path)?;
        let store = Self {
            path,
            _lock_file: lock_file,
            write_lock: Mutex::new(()),
        };
        store.save(&WorkbookFile {
            version: FILE_VERSION,
            workbooks,
        })?;
        Ok(store)
    }

    /// Open the file if present, otherwise create an empty one.
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path, Vec::new())
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add or replace a workbook (matched by ID).
    pub fn insert_workbook(&self, book: Workbook) -> Result<()> {
        let _lock = self.write_lock.lock();
        let mut file = self.load()?;
        file.workbooks.retain(|b| b.id != book.id);
        file.workbooks.push(book);
        self.save(&file)
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let mut lock_path = path.as_os_str().to_owned();
        lock_path.push(".lock");
        let lock_file = File::create(PathBuf::from(lock_path))?;

        lock_file.try_lock_exclusive().map_err(|_| SyncError::Locked)?;

        Ok(lock_file)
    }

    fn load(&self) -> Result<WorkbookFile> {
        let bytes = fs::read(&self.path)?;
        let file: WorkbookFile = serde_json::from_slice(&bytes)?;
        if file.version != FILE_VERSION {
            return Err(SyncError::Serialization(format!(
                "unsupported workbook file version {}",
                file.version
            )));
        }
        Ok(file)
    }

    fn save(&self, file: &WorkbookFile) -> Result<()> {
        let mut tmp_path = self.path.as_os_str().to_owned();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&serde_json::to_vec_pretty(file)?)?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    fn modify(&self, table: &TableRef, updates: &[RangeWrite]) -> Result<()> {
        let _lock = self.write_lock.lock();
        let mut file = self.load()?;
        let sheet = resolve_mut(&mut file.workbooks, table)?.sheet_mut(table)?;

        for update in updates {
            Sheet::validate(update)?;
        }
        for update in updates {
            sheet.apply(update)?;
        }

        self.save(&file)
    }
}

impl TableStore for FileStore {
    fn get_header(&self, table: &TableRef) -> Result<Header> {
        let file = self.load()?;
        resolve(&file.workbooks, table)?.sheet(table)?.header(table)
    }

    fn read_all_rows(&self, table: &TableRef) -> Result<Vec<TableRow>> {
        let file = self
            .load()
            .map_err(|e| SyncError::RemoteRead(e.to_string()))?;
        Ok(resolve(&file.workbooks, table)?.sheet(table)?.rows())
    }

    fn write_cell(&self, table: &TableRef, row: usize, col: usize, value: &str) -> Result<()> {
        self.modify(table, &[RangeWrite::cell(row, col, value)])
            .map_err(|e| into_write_error(e, &crate::types::rowcol_to_a1(row, col)))
    }

    fn write_range(&self, table: &TableRef, updates: &[RangeWrite]) -> Result<()> {
        self.modify(table, updates)
            .map_err(|e| into_write_error(e, &format!("batch of {}", updates.len())))
    }
}

/// IO and encoding failures during a write surface as write errors.
fn into_write_error(e: SyncError, range: &str) -> SyncError {
    match e {
        SyncError::Io(_) | SyncError::Serialization(_) => SyncError::write(range, e.to_string()),
        other => other,
    }
}
