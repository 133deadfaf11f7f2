//! Change-log reconciliation.
//!
//! The change log is append-only and comes in two shapes:
//! - narrow: one row per field mutation (`FIELD_CHANGED`, `NEW_VALUE`)
//! - wide: one row per full unit state
//!
//! Both reconcile into a [`Snapshot`] of wide entries, which the date
//! filter then narrows to a single calendar day.

mod filter;
mod reconciler;

pub use filter::{filter_by_date, parse_timestamp, parse_timezone};
pub use reconciler::{detect_form, reconcile, LogForm};

use crate::types::{Header, TableRow};
use serde::{Deserialize, Serialize};

pub const TIMESTAMP: &str = "TIMESTAMP";
pub const PENGAWAS: &str = "PENGAWAS";
pub const PENYULANG: &str = "PENYULANG";
pub const ID: &str = "ID";
pub const SECTION: &str = "SECTION";
pub const STATUS: &str = "STATUS";
pub const JENIS_PEKERJAAN: &str = "JENIS_PEKERJAAN";
pub const WAKTU_MULAI: &str = "WAKTU_MULAI";
pub const WAKTU_SELESAI: &str = "WAKTU_SELESAI";
pub const PELAKSANA: &str = "PELAKSANA";

/// Narrow-form column naming the mutated field.
pub const FIELD_CHANGED: &str = "FIELD_CHANGED";
/// Narrow-form column holding the field's new value.
pub const NEW_VALUE: &str = "NEW_VALUE";

/// Columns identifying one unit at one point in time.
pub const KEY_COLUMNS: [&str; 5] = [TIMESTAMP, PENGAWAS, PENYULANG, ID, SECTION];

/// State columns carried by a wide entry.
pub const FIELD_COLUMNS: [&str; 5] = [STATUS, JENIS_PEKERJAAN, WAKTU_MULAI, WAKTU_SELESAI, PELAKSANA];

/// All snapshot columns, in output order.
pub const WIDE_COLUMNS: [&str; 10] = [
    TIMESTAMP,
    PENGAWAS,
    PENYULANG,
    ID,
    SECTION,
    STATUS,
    JENIS_PEKERJAAN,
    WAKTU_MULAI,
    WAKTU_SELESAI,
    PELAKSANA,
];

/// One unit's reconciled state at one point in time.
///
/// Values are positional over [`WIDE_COLUMNS`]; absent values are empty
/// strings, never missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotEntry {
    values: [String; 10],
}

impl SnapshotEntry {
    /// Build an entry by asking `value_of` for each wide column.
    pub fn from_fn(mut value_of: impl FnMut(&str) -> String) -> Self {
        Self {
            values: WIDE_COLUMNS.map(|col| value_of(col)),
        }
    }

    /// Value of a wide column, `None` for names outside the wide schema.
    pub fn get(&self, column: &str) -> Option<&str> {
        WIDE_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| self.values[i].as_str())
    }

    pub fn timestamp(&self) -> &str {
        &self.values[0]
    }

    pub fn id(&self) -> &str {
        &self.values[3]
    }

    pub fn status(&self) -> &str {
        &self.values[5]
    }

    pub fn to_row(&self) -> TableRow {
        self.values.to_vec()
    }
}

/// Reconciled wide-form view of a change log. Never written back.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn new(entries: Vec<SnapshotEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.entries.iter()
    }

    /// The wide header the snapshot is laid out against.
    pub fn header() -> Header {
        Header::new(WIDE_COLUMNS)
    }

    /// Entries as table rows aligned to [`Snapshot::header`].
    pub fn to_rows(&self) -> Vec<TableRow> {
        self.entries.iter().map(SnapshotEntry::to_row).collect()
    }
}

impl FromIterator<SnapshotEntry> for Snapshot {
    fn from_iter<I: IntoIterator<Item = SnapshotEntry>>(iter: I) -> Self {
        Snapshot {
            entries: iter.into_iter().collect(),
        }
    }
}
