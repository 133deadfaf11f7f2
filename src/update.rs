//! Batch status updates with per-cell fallback.
//!
//! One update runs through a fixed sequence of phases:
//!
//! ```text
//! Idle -> Located -> BatchAttempted -> BatchSucceeded --------------------> Reported
//!                                   \-> BatchFailed -> PerCellFallback
//!                                                   -> FallbackComplete -> Reported
//! ```
//!
//! The batch is sent once. If it fails, every write in it is re-sent on its
//! own; each of those succeeds or fails independently and nothing is rolled
//! back. There is no further retry.

use crate::error::SyncError;
use crate::locate::Located;
use crate::table::{RangeWrite, TableStore};
use crate::types::TableRef;
use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Layout of the timestamp written alongside a status change.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of the batch timestamp.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Wall-clock time in a fixed zone.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    pub tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.tz).naive_local()
    }
}

/// Always returns the same instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Extra contiguous cells written on every updated row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockPayload {
    /// 1-based first column of the block.
    pub start_column: usize,
    /// Values for consecutive columns starting at `start_column`.
    pub values: Vec<String>,
}

/// What to write on each located row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdatePlan {
    /// 1-based status column.
    pub status_column: usize,
    /// 1-based timestamp column, if the table has one.
    pub timestamp_column: Option<usize>,
    /// Value written into the status column. Not validated.
    pub status_value: String,
    pub block: Option<BlockPayload>,
}

impl UpdatePlan {
    pub fn new(status_column: usize, status_value: impl Into<String>) -> Self {
        Self {
            status_column,
            timestamp_column: None,
            status_value: status_value.into(),
            block: None,
        }
    }

    pub fn with_timestamp(mut self, column: usize) -> Self {
        self.timestamp_column = Some(column);
        self
    }

    pub fn with_block(mut self, start_column: usize, values: Vec<String>) -> Self {
        self.block = Some(BlockPayload {
            start_column,
            values,
        });
        self
    }
}

/// Phases of a single update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdatePhase {
    Idle,
    Located,
    BatchAttempted,
    BatchSucceeded,
    BatchFailed,
    PerCellFallback,
    FallbackComplete,
    Reported,
}

impl UpdatePhase {
    fn can_advance_to(self, next: UpdatePhase) -> bool {
        use UpdatePhase::*;
        matches!(
            (self, next),
            (Idle, Located)
                | (Located, BatchAttempted)
                | (Located, Reported)
                | (BatchAttempted, BatchSucceeded)
                | (BatchAttempted, BatchFailed)
                | (BatchFailed, PerCellFallback)
                | (PerCellFallback, FallbackComplete)
                | (BatchSucceeded, Reported)
                | (FallbackComplete, Reported)
        )
    }
}

/// Result of the fallback pass after a failed batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FallbackReport {
    /// Why the batch was rejected.
    pub batch_error: String,
    /// Individual writes that went through.
    pub succeeded: usize,
    /// Individual writes that failed, as (range, reason).
    pub failed: Vec<(String, String)>,
}

/// Outcome of applying one batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Rows whose status write was attempted.
    pub applied_count: usize,
    /// Writes built for the batch.
    pub writes: usize,
    /// Present only when the batch failed.
    pub fallback: Option<FallbackReport>,
    /// Phases visited, in order.
    pub phases: Vec<UpdatePhase>,
}

/// Build the writes for every located row.
///
/// Rows are visited in physical order. `now` is rendered once and shared
/// by every timestamp write in the batch.
pub fn build_writes(located: &Located, plan: &UpdatePlan, now: NaiveDateTime) -> Vec<RangeWrite> {
    let stamp = now.format(TIMESTAMP_FORMAT).to_string();
    let mut writes = Vec::new();

    for (_, row) in located.by_row() {
        writes.push(RangeWrite::cell(row, plan.status_column, plan.status_value.as_str()));
        if let Some(col) = plan.timestamp_column {
            writes.push(RangeWrite::cell(row, col, stamp.as_str()));
        }
        if let Some(block) = plan.block.as_ref().filter(|b| !b.values.is_empty()) {
            writes.push(RangeWrite::row_span(row, block.start_column, block.values.clone()));
        }
    }

    writes
}

/// Applies located updates to one table.
pub struct BatchUpdater<'a, S: ?Sized> {
    store: &'a S,
    table: &'a TableRef,
    phase: UpdatePhase,
    phases: Vec<UpdatePhase>,
}

impl<'a, S: TableStore + ?Sized> BatchUpdater<'a, S> {
    pub fn new(store: &'a S, table: &'a TableRef) -> Self {
        Self {
            store,
            table,
            phase: UpdatePhase::Idle,
            phases: vec![UpdatePhase::Idle],
        }
    }

    pub fn phase(&self) -> UpdatePhase {
        self.phase
    }

    fn advance(&mut self, next: UpdatePhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "invalid update transition {:?} -> {:?}",
            self.phase,
            next
        );
        debug!(from = ?self.phase, to = ?next, table = %self.table, "update phase");
        self.phase = next;
        self.phases.push(next);
    }

    /// Write `plan` onto every located row.
    ///
    /// Never fails as a whole: a rejected batch turns into a per-write
    /// fallback whose failures are listed in the outcome.
    pub fn apply(mut self, located: &Located, plan: &UpdatePlan, clock: &dyn Clock) -> BatchOutcome {
        self.advance(UpdatePhase::Located);

        let writes = build_writes(located, plan, clock.now());
        if writes.is_empty() {
            self.advance(UpdatePhase::Reported);
            return BatchOutcome {
                applied_count: 0,
                writes: 0,
                fallback: None,
                phases: self.phases,
            };
        }

        self.advance(UpdatePhase::BatchAttempted);
        let fallback = match self.store.write_range(self.table, &writes) {
            Ok(()) => {
                self.advance(UpdatePhase::BatchSucceeded);
                None
            }
            Err(e) => {
                self.advance(UpdatePhase::BatchFailed);
                warn!(error = %e, writes = writes.len(), table = %self.table, "batch write failed, writing individually");
                Some(self.fallback(&writes, e))
            }
        };

        self.advance(UpdatePhase::Reported);
        info!(
            rows = located.found.len(),
            writes = writes.len(),
            degraded = fallback.as_ref().is_some_and(|f| !f.failed.is_empty()),
            table = %self.table,
            "status update applied"
        );

        BatchOutcome {
            applied_count: located.found.len(),
            writes: writes.len(),
            fallback,
            phases: self.phases,
        }
    }

    fn fallback(&mut self, writes: &[RangeWrite], batch_error: SyncError) -> FallbackReport {
        self.advance(UpdatePhase::PerCellFallback);

        let mut report = FallbackReport {
            batch_error: batch_error.to_string(),
            ..Default::default()
        };

        for write in writes {
            match self.store.write_one(self.table, write) {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    error!(range = %write.range, error = %e, "fallback write failed");
                    report.failed.push((write.label(), e.to_string()));
                }
            }
        }

        self.advance(UpdatePhase::FallbackComplete);
        report
    }
}

/// Everything reported back for one update request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Identifier to physical row.
    pub found: BTreeMap<String, usize>,
    /// Requested identifiers absent from the table, ascending.
    pub not_found: Vec<String>,
    /// Rows whose status write was attempted.
    pub applied_count: usize,
    /// Present only when the batch write failed.
    pub fallback: Option<FallbackReport>,
}

impl UpdateReport {
    pub fn new(located: Located, outcome: &BatchOutcome) -> Self {
        Self {
            found: located.found,
            not_found: located.not_found,
            applied_count: outcome.applied_count,
            fallback: outcome.fallback.clone(),
        }
    }

    /// True when some fallback writes failed.
    pub fn is_degraded(&self) -> bool {
        self.fallback.as_ref().is_some_and(|f| !f.failed.is_empty())
    }

    /// The degraded case as an error value, for callers that want one.
    pub fn partial_failure(&self) -> Option<SyncError> {
        let fallback = self.fallback.as_ref().filter(|f| !f.failed.is_empty())?;
        Some(SyncError::PartialUpdate {
            succeeded: fallback.succeeded,
            failed: fallback.failed.iter().map(|(range, _)| range.clone()).collect(),
        })
    }
}
