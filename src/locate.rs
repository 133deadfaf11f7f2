//! Row location by identifier.

use crate::types::{cell, IdentifierRequest, TableRow, FIRST_DATA_ROW};
use std::collections::BTreeMap;

/// Where each requested identifier lives.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Located {
    /// Identifier to physical row number.
    pub found: BTreeMap<String, usize>,
    /// Requested identifiers absent from the table, ascending.
    pub not_found: Vec<String>,
}

impl Located {
    /// Found (identifier, row) pairs in physical row order.
    pub fn by_row(&self) -> Vec<(&str, usize)> {
        let mut pairs: Vec<(&str, usize)> =
            self.found.iter().map(|(id, row)| (id.as_str(), *row)).collect();
        pairs.sort_by_key(|&(_, row)| row);
        pairs
    }
}

/// Scan `rows` for the identifiers in `targets`.
///
/// `rows` are data rows as returned by a full read, so `rows[i]` sits on
/// physical row `i + 2`. The identifier cell at the 1-based `id_column` is
/// trimmed and compared exactly. When an identifier appears on several rows
/// the earliest one is kept.
pub fn locate_rows(rows: &[TableRow], id_column: usize, targets: &IdentifierRequest) -> Located {
    let mut found = BTreeMap::new();

    for (i, row) in rows.iter().enumerate() {
        if found.len() == targets.len() {
            break;
        }
        let value = cell(row, id_column).trim();
        if targets.contains(value) && !found.contains_key(value) {
            found.insert(value.to_string(), i + FIRST_DATA_ROW);
        }
    }

    let not_found = targets
        .iter()
        .filter(|id| !found.contains_key(*id))
        .map(str::to_string)
        .collect();

    Located { found, not_found }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(ids: &[&str]) -> Vec<TableRow> {
        ids.iter()
            .map(|id| vec![id.to_string(), "Proses".to_string()])
            .collect()
    }

    #[test]
    fn test_row_numbers_start_after_header() {
        let table = rows(&["G0", "G1", "G2", "G3"]);
        let located = locate_rows(&table, 1, &IdentifierRequest::from_iter(["G0", "G3"]));

        assert_eq!(located.found["G0"], 2);
        assert_eq!(located.found["G3"], 5);
        assert!(located.not_found.is_empty());
    }

    #[test]
    fn test_earliest_duplicate_wins() {
        let table = rows(&["G1", "G2", "G1"]);
        let located = locate_rows(&table, 1, &IdentifierRequest::from_iter(["G1"]));
        assert_eq!(located.found["G1"], 2);
    }

    #[test]
    fn test_cells_are_trimmed() {
        let table = rows(&["  G1 ", "G2\t"]);
        let located = locate_rows(&table, 1, &IdentifierRequest::from_iter(["G1", "G2"]));
        assert_eq!(located.found.len(), 2);
    }

    #[test]
    fn test_not_found_sorted() {
        let table = rows(&["G1"]);
        let located = locate_rows(&table, 1, &IdentifierRequest::from_iter(["Z9", "G1", "A5"]));
        assert_eq!(located.not_found, vec!["A5", "Z9"]);
    }

    #[test]
    fn test_short_rows_do_not_match() {
        let table = vec![vec![], vec!["x".to_string()]];
        let located = locate_rows(&table, 3, &IdentifierRequest::from_iter(["x"]));
        assert!(located.found.is_empty());
        assert_eq!(located.not_found, vec!["x"]);
    }

    #[test]
    fn test_by_row_orders_physically() {
        let table = rows(&["B", "A", "C"]);
        let located = locate_rows(&table, 1, &IdentifierRequest::from_iter(["A", "B", "C"]));
        assert_eq!(located.by_row(), vec![("B", 2), ("A", 3), ("C", 4)]);
    }
}
