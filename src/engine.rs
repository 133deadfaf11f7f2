//! Request-level orchestration over a table store.
//!
//! Ties the pieces together for the two things callers do:
//! - push a status change to a set of identifiers
//! - build the reconciled audit view of the change log, optionally for one day
//!
//! Every call re-reads the header and rows it needs; nothing is kept
//! between calls.

use crate::config::ColumnConfig;
use crate::error::{Result, SyncError};
use crate::locate::locate_rows;
use crate::reconcile::{filter_by_date, reconcile, Snapshot};
use crate::table::TableStore;
use crate::types::{Header, IdentifierRequest, TableRef, TableRow};
use crate::update::{BatchUpdater, Clock, UpdatePlan, UpdateReport};
use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{debug, warn};

/// One status-change request.
#[derive(Clone, Debug)]
pub struct UpdateRequest {
    pub table: TableRef,
    pub columns: ColumnConfig,
    pub ids: IdentifierRequest,
    pub status_value: String,
    /// Extra values written on each row, starting at the named column.
    pub block: Option<(String, Vec<String>)>,
}

impl UpdateRequest {
    pub fn new(table: TableRef, ids: IdentifierRequest, status_value: impl Into<String>) -> Self {
        Self {
            table,
            columns: ColumnConfig::default(),
            ids,
            status_value: status_value.into(),
            block: None,
        }
    }

    pub fn with_columns(mut self, columns: ColumnConfig) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_block(mut self, start_column: impl Into<String>, values: Vec<String>) -> Self {
        self.block = Some((start_column.into(), values));
        self
    }
}

/// The first rows of a table, for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TablePreview {
    pub header: Header,
    pub rows: Vec<TableRow>,
    pub total_rows: usize,
}

/// Runs update and audit requests against one store.
pub struct Engine<S> {
    store: S,
    clock: Box<dyn Clock>,
}

impl<S: TableStore> Engine<S> {
    pub fn new(store: S, clock: Box<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Locate the requested identifiers and write the new status.
    ///
    /// Missing tables and columns fail before anything is written.
    /// Identifiers that are not in the table are reported, not raised, and
    /// a failed batch degrades into per-write fallback inside the report.
    pub fn update(&self, request: &UpdateRequest) -> Result<UpdateReport> {
        if request.ids.is_empty() {
            return Err(SyncError::Config("no identifiers requested".into()));
        }

        let header = self.store.get_header(&request.table)?;
        let columns = request.columns.bind(&header)?;

        let mut plan = UpdatePlan::new(columns.status, request.status_value.as_str());
        if let Some(col) = columns.timestamp {
            plan = plan.with_timestamp(col);
        }
        if let Some((start, values)) = &request.block {
            plan = plan.with_block(header.column_index(start)?, values.clone());
        }

        let rows = self.store.read_all_rows(&request.table)?;
        let located = locate_rows(&rows, columns.id, &request.ids);
        debug!(
            requested = request.ids.len(),
            found = located.found.len(),
            rows = rows.len(),
            "located identifiers"
        );

        if !located.not_found.is_empty() {
            warn!(ids = ?located.not_found, table = %request.table, "identifiers not found");
        }

        let outcome = BatchUpdater::new(&self.store, &request.table).apply(
            &located,
            &plan,
            self.clock.as_ref(),
        );

        Ok(UpdateReport::new(located, &outcome))
    }

    /// Reconcile the whole change log.
    pub fn snapshot(&self, log: &TableRef) -> Result<Snapshot> {
        let header = self.store.get_header(log)?;
        let rows = self.store.read_all_rows(log)?;
        let snapshot = reconcile(&header, &rows);
        debug!(rows = rows.len(), entries = snapshot.len(), table = %log, "reconciled change log");
        Ok(snapshot)
    }

    /// Reconciled change-log entries falling on `date` in `tz`.
    pub fn daily_activity(&self, log: &TableRef, date: NaiveDate, tz: Tz) -> Result<Snapshot> {
        let snapshot = self.snapshot(log)?;
        Ok(filter_by_date(&snapshot, date, tz))
    }

    /// Header plus the first `limit` rows.
    pub fn preview(&self, table: &TableRef, limit: usize) -> Result<TablePreview> {
        let header = self.store.get_header(table)?;
        let rows = self.store.read_all_rows(table)?;
        let total_rows = rows.len();
        Ok(TablePreview {
            header,
            rows: rows.into_iter().take(limit).collect(),
            total_rows,
        })
    }
}
