//! Narrow and wide change-log reconciliation.

use super::{Snapshot, SnapshotEntry, FIELD_CHANGED, KEY_COLUMNS, NEW_VALUE};
use crate::error::{Result, SyncError};
use crate::types::{cell, Header, TableRow};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Shape of a change log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogForm {
    /// One row per field mutation.
    Narrow,
    /// One row per full unit state.
    Wide,
}

/// A log is narrow when it carries both `FIELD_CHANGED` and `NEW_VALUE`.
pub fn detect_form(header: &Header) -> LogForm {
    if header.contains(FIELD_CHANGED) && header.contains(NEW_VALUE) {
        LogForm::Narrow
    } else {
        LogForm::Wide
    }
}

/// Reconcile raw log rows into a wide snapshot.
///
/// A narrow log that cannot be pivoted yields an empty snapshot; the cause
/// is logged, not returned.
pub fn reconcile(header: &Header, rows: &[TableRow]) -> Snapshot {
    match detect_form(header) {
        LogForm::Wide => project_wide(header, rows),
        LogForm::Narrow => match pivot_narrow(header, rows) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, rows = rows.len(), "change log pivot failed, using empty snapshot");
                Snapshot::default()
            }
        },
    }
}

/// Keep the wide columns, fill absent ones with empty strings, drop the rest.
fn project_wide(header: &Header, rows: &[TableRow]) -> Snapshot {
    rows.iter()
        .map(|row| {
            SnapshotEntry::from_fn(|col| {
                header
                    .position(col)
                    .map(|i| cell(row, i).to_string())
                    .unwrap_or_default()
            })
        })
        .collect()
}

/// Per-key accumulator holding the first value seen for each field.
struct Group {
    key: [String; 5],
    fields: HashMap<String, String>,
}

/// Group by the composite key and keep the first `NEW_VALUE` per field.
fn pivot_narrow(header: &Header, rows: &[TableRow]) -> Result<Snapshot> {
    let mut key_cols = [0usize; 5];
    for (slot, name) in key_cols.iter_mut().zip(KEY_COLUMNS) {
        *slot = header
            .position(name)
            .ok_or_else(|| SyncError::Pivot(format!("narrow log lacks key column {}", name)))?;
    }
    let field_col = header.column_index(FIELD_CHANGED)?;
    let value_col = header.column_index(NEW_VALUE)?;

    let mut groups: Vec<Group> = Vec::new();
    let mut by_key: HashMap<[String; 5], usize> = HashMap::new();

    for (line, row) in rows.iter().enumerate() {
        let key = key_cols.map(|col| cell(row, col).to_string());
        let field = cell(row, field_col).trim();

        if KEY_COLUMNS.contains(&field) {
            return Err(SyncError::Pivot(format!(
                "row {} changes key column {}",
                line + 2,
                field
            )));
        }

        let slot = *by_key.entry(key.clone()).or_insert_with(|| {
            groups.push(Group {
                key,
                fields: HashMap::new(),
            });
            groups.len() - 1
        });

        if !field.is_empty() {
            groups[slot]
                .fields
                .entry(field.to_string())
                .or_insert_with(|| cell(row, value_col).to_string());
        }
    }

    debug!(rows = rows.len(), groups = groups.len(), "pivoted narrow change log");

    Ok(groups
        .into_iter()
        .map(|group| {
            SnapshotEntry::from_fn(|col| match KEY_COLUMNS.iter().position(|k| *k == col) {
                Some(i) => group.key[i].clone(),
                None => group.fields.get(col).cloned().unwrap_or_default(),
            })
        })
        .collect())
}
