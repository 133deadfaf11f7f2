//! Core types for table addressing and identifiers.

use crate::error::{Result, SyncError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::OnceLock;

/// One data row, positionally aligned to a [`Header`].
pub type TableRow = Vec<String>;

/// Physical row of the first data row. Row 1 is always the header.
pub const FIRST_DATA_ROW: usize = 2;

/// Column names of a table, read from row 1.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Header {
    /// Build a header from the raw first row.
    ///
    /// Trailing empty cells are dropped. If a name is repeated, lookups
    /// resolve to its first column.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        while names.last().is_some_and(|n| n.trim().is_empty()) {
            names.pop();
        }

        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i + 1);
        }

        Self { names, index }
    }

    /// Column names in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// 1-based column index of `name`.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| SyncError::Schema(name.to_string()))
    }

    /// 1-based column index of `name`, if present.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// First header name matching `pred`, in column order.
    pub fn find(&self, pred: impl Fn(&str) -> bool) -> Option<&str> {
        self.names.iter().map(String::as_str).find(|n| pred(n))
    }
}

/// Value of the 1-based column `col` in `row`, or `""` past the row's end.
pub fn cell(row: &[String], col: usize) -> &str {
    col.checked_sub(1)
        .and_then(|i| row.get(i))
        .map(String::as_str)
        .unwrap_or("")
}

// --- A1 addressing ---

/// Column letters for a 1-based column index (`1` → `A`, `27` → `AA`).
pub fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// A1 notation for a 1-based (row, col) pair.
pub fn rowcol_to_a1(row: usize, col: usize) -> String {
    format!("{}{}", column_letters(col), row)
}

/// Parse a single A1 cell reference into a 1-based (row, col) pair.
pub fn a1_to_rowcol(a1: &str) -> Result<(usize, usize)> {
    let a1 = a1.trim();
    let split = a1
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| SyncError::InvalidRange(a1.to_string()))?;
    let (letters, digits) = a1.split_at(split);

    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(SyncError::InvalidRange(a1.to_string()));
    }

    let col = letters
        .to_ascii_uppercase()
        .bytes()
        .try_fold(0usize, |acc, b| {
            acc.checked_mul(26)?.checked_add((b - b'A' + 1) as usize)
        })
        .ok_or_else(|| SyncError::InvalidRange(a1.to_string()))?;
    let row: usize = digits
        .parse()
        .map_err(|_| SyncError::InvalidRange(a1.to_string()))?;

    if row == 0 {
        return Err(SyncError::InvalidRange(a1.to_string()));
    }

    Ok((row, col))
}

/// A contiguous rectangular range, 1-based and inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRange {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl CellRange {
    /// A single cell.
    pub fn cell(row: usize, col: usize) -> Self {
        Self {
            start_row: row,
            start_col: col,
            end_row: row,
            end_col: col,
        }
    }

    /// `width` cells of one row starting at `col`.
    pub fn row_span(row: usize, col: usize, width: usize) -> Self {
        Self {
            start_row: row,
            start_col: col,
            end_row: row,
            end_col: col + width.max(1) - 1,
        }
    }

    pub fn is_cell(&self) -> bool {
        self.start_row == self.end_row && self.start_col == self.end_col
    }

    pub fn height(&self) -> usize {
        self.end_row - self.start_row + 1
    }

    pub fn width(&self) -> usize {
        self.end_col - self.start_col + 1
    }

    /// Parse `B3` or `B3:D3`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            None => {
                let (row, col) = a1_to_rowcol(s)?;
                Ok(Self::cell(row, col))
            }
            Some((a, b)) => {
                let (start_row, start_col) = a1_to_rowcol(a)?;
                let (end_row, end_col) = a1_to_rowcol(b)?;
                if end_row < start_row || end_col < start_col {
                    return Err(SyncError::InvalidRange(s.to_string()));
                }
                Ok(Self {
                    start_row,
                    start_col,
                    end_row,
                    end_col,
                })
            }
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_cell() {
            write!(f, "{}", rowcol_to_a1(self.start_row, self.start_col))
        } else {
            write!(
                f,
                "{}:{}",
                rowcol_to_a1(self.start_row, self.start_col),
                rowcol_to_a1(self.end_row, self.end_col)
            )
        }
    }
}

// --- Resource addressing ---

/// How a spreadsheet is referenced.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKey {
    /// Opaque spreadsheet ID.
    Id(String),
    /// Human-readable spreadsheet title.
    Name(String),
}

impl ResourceKey {
    /// Resolve a URL, bare ID or title.
    ///
    /// `.../d/<id>/...` yields the ID, a bare 20+ character token of
    /// `[A-Za-z0-9_-]` is an ID, anything else is a title.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SyncError::InvalidResourceKey("empty reference".into()));
        }

        static URL_ID: OnceLock<Option<Regex>> = OnceLock::new();
        static BARE_ID: OnceLock<Option<Regex>> = OnceLock::new();

        let url = compiled(&URL_ID, r"/d/([a-zA-Z0-9_-]+)")?;
        if let Some(caps) = url.captures(s) {
            return Ok(ResourceKey::Id(caps[1].to_string()));
        }

        let bare = compiled(&BARE_ID, r"^[a-zA-Z0-9_-]{20,}$")?;
        if bare.is_match(s) {
            return Ok(ResourceKey::Id(s.to_string()));
        }

        Ok(ResourceKey::Name(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResourceKey::Id(s) | ResourceKey::Name(s) => s,
        }
    }
}

/// Compile `pattern` on first use.
fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Result<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .ok_or_else(|| SyncError::InvalidResourceKey(format!("bad pattern {}", pattern)))
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::Id(id) => write!(f, "id:{}", id),
            ResourceKey::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// How a sheet inside a spreadsheet is selected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SheetSelector {
    /// The first sheet.
    #[default]
    First,
    /// Sheet tab name.
    Name(String),
    /// Numeric sheet ID (GID).
    Gid(u64),
}

impl SheetSelector {
    /// All-digit input is a GID, other non-empty input a tab name.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            SheetSelector::First
        } else if s.chars().all(|c| c.is_ascii_digit()) {
            s.parse()
                .map(SheetSelector::Gid)
                .unwrap_or_else(|_| SheetSelector::Name(s.to_string()))
        } else {
            SheetSelector::Name(s.to_string())
        }
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::First => write!(f, "<first sheet>"),
            SheetSelector::Name(name) => write!(f, "{}", name),
            SheetSelector::Gid(gid) => write!(f, "gid={}", gid),
        }
    }
}

/// A sheet inside a spreadsheet.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub resource: ResourceKey,
    pub sheet: SheetSelector,
}

impl TableRef {
    pub fn new(resource: ResourceKey, sheet: SheetSelector) -> Self {
        Self { resource, sheet }
    }

    /// Shorthand for a named sheet in a named spreadsheet.
    pub fn named(resource: &str, sheet: &str) -> Self {
        Self {
            resource: ResourceKey::Name(resource.to_string()),
            sheet: SheetSelector::Name(sheet.to_string()),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource, self.sheet)
    }
}

// --- Identifiers ---

/// Identifiers requested for one update, with duplicates collapsed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdentifierRequest(BTreeSet<String>);

impl IdentifierRequest {
    /// Split free text on commas and newlines, trimming each part and
    /// dropping empty ones.
    pub fn parse(text: &str) -> Self {
        text.split(|c| c == ',' || c == '\n')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// Identifiers in ascending lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for IdentifierRequest {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        IdentifierRequest(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_one_based() {
        let header = Header::new(["ID", "STATUS", "TIMESTAMP"]);
        assert_eq!(header.column_index("ID").unwrap(), 1);
        assert_eq!(header.column_index("TIMESTAMP").unwrap(), 3);
        assert!(matches!(
            header.column_index("PELAKSANA"),
            Err(SyncError::Schema(name)) if name == "PELAKSANA"
        ));
    }

    #[test]
    fn test_header_drops_trailing_blanks() {
        let header = Header::new(["ID", "STATUS", "", " "]);
        assert_eq!(header.len(), 2);
        assert!(Header::new(["", ""]).is_empty());
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(52), "AZ");
        assert_eq!(column_letters(703), "AAA");
    }

    #[test]
    fn test_a1_parse() {
        assert_eq!(a1_to_rowcol("C5").unwrap(), (5, 3));
        assert_eq!(a1_to_rowcol("aa10").unwrap(), (10, 27));
        assert!(a1_to_rowcol("5C").is_err());
        assert!(a1_to_rowcol("C0").is_err());
        assert!(a1_to_rowcol("C").is_err());
    }

    #[test]
    fn test_a1_parse_rejects_oversized_column() {
        assert!(matches!(
            a1_to_rowcol("AAAAAAAAAAAAAAAAAAAA1"),
            Err(SyncError::InvalidRange(_))
        ));
        assert!(matches!(
            CellRange::parse("A1:AAAAAAAAAAAAAAAAAAAA1"),
            Err(SyncError::InvalidRange(_))
        ));
        assert_eq!(a1_to_rowcol("ZZZ1").unwrap(), (1, 18278));
    }

    #[test]
    fn test_range_display_and_parse() {
        let range = CellRange::row_span(4, 2, 3);
        assert_eq!(range.to_string(), "B4:D4");
        assert_eq!(CellRange::parse("B4:D4").unwrap(), range);
        assert_eq!(CellRange::cell(2, 1).to_string(), "A2");
        assert!(CellRange::parse("D4:B4").is_err());
    }

    #[test]
    fn test_resource_key_parse() {
        let url = "https://docs.google.com/spreadsheets/d/1AbC-xyz_0123456789abcd/edit#gid=0";
        assert_eq!(
            ResourceKey::parse(url).unwrap(),
            ResourceKey::Id("1AbC-xyz_0123456789abcd".into())
        );
        assert_eq!(
            ResourceKey::parse("1AbCdEfGhIjKlMnOpQrStUv").unwrap(),
            ResourceKey::Id("1AbCdEfGhIjKlMnOpQrStUv".into())
        );
        assert_eq!(
            ResourceKey::parse("data gardu").unwrap(),
            ResourceKey::Name("data gardu".into())
        );
        assert!(ResourceKey::parse("  ").is_err());
    }

    #[test]
    fn test_sheet_selector_parse() {
        assert_eq!(SheetSelector::parse(""), SheetSelector::First);
        assert_eq!(SheetSelector::parse("1476556612"), SheetSelector::Gid(1476556612));
        assert_eq!(SheetSelector::parse("History"), SheetSelector::Name("History".into()));
    }

    #[test]
    fn test_identifier_request_parse() {
        let req = IdentifierRequest::parse("51311172646881, 51311172646882\n51311172646881,, \n");
        assert_eq!(req.len(), 2);
        assert_eq!(
            req.iter().collect::<Vec<_>>(),
            vec!["51311172646881", "51311172646882"]
        );
        assert!(IdentifierRequest::parse(" , \n").is_empty());
    }
}
