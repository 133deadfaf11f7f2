//! Workbook model shared by the in-process and file backends.

use super::RangeWrite;
use crate::error::{Result, SyncError};
use crate::types::{Header, ResourceKey, SheetSelector, TableRef, TableRow};
use serde::{Deserialize, Serialize};

/// One sheet: a grid of string cells, row 1 being the header.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    pub gid: u64,
    pub name: String,
    #[serde(default)]
    pub cells: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(gid: u64, name: impl Into<String>) -> Self {
        Self {
            gid,
            name: name.into(),
            cells: Vec::new(),
        }
    }

    /// Build a sheet from a header and data rows.
    pub fn with_rows<H, R>(gid: u64, name: impl Into<String>, header: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = TableRow>,
    {
        let mut cells = vec![header.into_iter().map(Into::into).collect::<Vec<String>>()];
        cells.extend(rows);
        Self {
            gid,
            name: name.into(),
            cells,
        }
    }

    pub fn header(&self, table: &TableRef) -> Result<Header> {
        let header = self
            .cells
            .first()
            .map(|row| Header::new(row.iter().cloned()))
            .unwrap_or_default();
        if header.is_empty() {
            return Err(SyncError::EmptyHeader(table.to_string()));
        }
        Ok(header)
    }

    /// Data rows, header excluded.
    pub fn rows(&self) -> Vec<TableRow> {
        self.cells.iter().skip(1).cloned().collect()
    }

    /// Value at a 1-based position, `""` when outside the grid.
    pub fn value(&self, row: usize, col: usize) -> &str {
        row.checked_sub(1)
            .and_then(|r| self.cells.get(r))
            .map(|r| crate::types::cell(r, col))
            .unwrap_or("")
    }

    /// Check that `update` targets 1-based cells and carries exactly one
    /// value per target cell.
    pub fn validate(update: &RangeWrite) -> Result<()> {
        let range = update.range;
        if range.start_row == 0
            || range.start_col == 0
            || range.end_row < range.start_row
            || range.end_col < range.start_col
        {
            return Err(SyncError::InvalidRange(format!(
                "rows {}..={}, columns {}..={} (1-based)",
                range.start_row, range.end_row, range.start_col, range.end_col
            )));
        }
        let shape_ok = update.values.len() == range.height()
            && update.values.iter().all(|r| r.len() == range.width());
        if !shape_ok {
            return Err(SyncError::InvalidRange(format!(
                "{} expects {}x{} values",
                range,
                range.height(),
                range.width()
            )));
        }
        Ok(())
    }

    /// Apply one validated range write, growing the grid as needed.
    pub fn apply(&mut self, update: &RangeWrite) -> Result<()> {
        Self::validate(update)?;
        let range = update.range;

        if self.cells.len() < range.end_row {
            self.cells.resize_with(range.end_row, Vec::new);
        }

        for (offset, values) in update.values.iter().enumerate() {
            let row = &mut self.cells[range.start_row - 1 + offset];
            if row.len() < range.end_col {
                row.resize(range.end_col, String::new());
            }
            for (c, value) in values.iter().enumerate() {
                row[range.start_col - 1 + c] = value.clone();
            }
        }

        Ok(())
    }
}

/// A spreadsheet: an ID, a title and its sheets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workbook {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            sheets: Vec::new(),
        }
    }

    pub fn with_sheet(mut self, sheet: Sheet) -> Self {
        self.sheets.push(sheet);
        self
    }

    pub fn matches(&self, key: &ResourceKey) -> bool {
        match key {
            ResourceKey::Id(id) => &self.id == id,
            ResourceKey::Name(title) => &self.title == title,
        }
    }

    fn sheet_position(&self, table: &TableRef) -> Result<usize> {
        let pos = match &table.sheet {
            SheetSelector::First => (!self.sheets.is_empty()).then_some(0),
            SheetSelector::Name(name) => self.sheets.iter().position(|s| &s.name == name),
            SheetSelector::Gid(gid) => self.sheets.iter().position(|s| s.gid == *gid),
        };
        pos.ok_or_else(|| SyncError::SheetNotFound(table.to_string()))
    }

    pub fn sheet(&self, table: &TableRef) -> Result<&Sheet> {
        let pos = self.sheet_position(table)?;
        Ok(&self.sheets[pos])
    }

    pub fn sheet_mut(&mut self, table: &TableRef) -> Result<&mut Sheet> {
        let pos = self.sheet_position(table)?;
        Ok(&mut self.sheets[pos])
    }
}

/// Find the workbook `table` refers to.
pub(crate) fn resolve<'a>(books: &'a [Workbook], table: &TableRef) -> Result<&'a Workbook> {
    books
        .iter()
        .find(|b| b.matches(&table.resource))
        .ok_or_else(|| SyncError::ResourceNotFound(table.resource.to_string()))
}

pub(crate) fn resolve_mut<'a>(
    books: &'a mut [Workbook],
    table: &TableRef,
) -> Result<&'a mut Workbook> {
    books
        .iter_mut()
        .find(|b| b.matches(&table.resource))
        .ok_or_else(|| SyncError::ResourceNotFound(table.resource.to_string()))
}
