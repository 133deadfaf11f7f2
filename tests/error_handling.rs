//! Error handling and edge case tests.

use chrono::NaiveDateTime;
use gardu_status::update::TIMESTAMP_FORMAT;
use gardu_status::{
    parse_timezone, reconcile, ColumnConfig, Engine, FaultPlan, FixedClock, Header,
    IdentifierRequest, MemoryStore, ResourceKey, Sheet, SheetSelector, SyncConfig, SyncError,
    TableRef, TableRow, TableStore, UpdateRequest, ViewRegistry, Workbook,
};

fn row(values: &[&str]) -> TableRow {
    values.iter().map(|v| v.to_string()).collect()
}

fn test_engine() -> Engine<MemoryStore> {
    let book = Workbook::new("1AbCdEfGhIjKlMnOpQrStUv", "data gardu")
        .with_sheet(Sheet::with_rows(
            0,
            "History",
            ["ID", "STATUS", "TIMESTAMP"],
            vec![row(&["G1", "Proses", ""]), row(&["G2", "Proses", ""])],
        ))
        .with_sheet(Sheet::new(7, "Kosong"));
    let now = NaiveDateTime::parse_from_str("2024-05-01 12:00:00", TIMESTAMP_FORMAT).unwrap();
    Engine::new(MemoryStore::with_workbook(book), Box::new(FixedClock(now)))
}

fn history() -> TableRef {
    TableRef::named("data gardu", "History")
}

// --- Structural errors ---

#[test]
fn test_unknown_spreadsheet() {
    let engine = test_engine();
    let table = TableRef::named("tidak ada", "History");
    let err = engine
        .update(&UpdateRequest::new(table, IdentifierRequest::parse("G1"), "Selesai"))
        .unwrap_err();
    assert!(matches!(err, SyncError::ResourceNotFound(_)));
    assert!(err.is_structural());
}

#[test]
fn test_unknown_sheet() {
    let engine = test_engine();
    let table = TableRef::named("data gardu", "Arsip");
    assert!(matches!(
        engine.store().get_header(&table),
        Err(SyncError::SheetNotFound(_))
    ));

    let by_gid = TableRef::new(ResourceKey::parse("data gardu").unwrap(), SheetSelector::Gid(99));
    assert!(matches!(
        engine.store().read_all_rows(&by_gid),
        Err(SyncError::SheetNotFound(_))
    ));
}

#[test]
fn test_sheet_by_gid_and_id() {
    let engine = test_engine();
    let table = TableRef::new(
        ResourceKey::parse("https://docs.google.com/spreadsheets/d/1AbCdEfGhIjKlMnOpQrStUv/edit#gid=0")
            .unwrap(),
        SheetSelector::parse("0"),
    );
    assert_eq!(engine.store().read_all_rows(&table).unwrap().len(), 2);
}

#[test]
fn test_empty_header() {
    let engine = test_engine();
    let table = TableRef::named("data gardu", "Kosong");
    let err = engine
        .update(&UpdateRequest::new(table, IdentifierRequest::parse("G1"), "Selesai"))
        .unwrap_err();
    assert!(matches!(err, SyncError::EmptyHeader(_)));
}

#[test]
fn test_missing_column_fails_before_writing() {
    let engine = test_engine();
    let columns = ColumnConfig {
        id: Some("KODE_GARDU".to_string()),
        ..Default::default()
    };
    let request =
        UpdateRequest::new(history(), IdentifierRequest::parse("G1"), "Selesai").with_columns(columns);

    match engine.update(&request) {
        Err(SyncError::Schema(name)) => assert_eq!(name, "KODE_GARDU"),
        other => panic!("expected schema error, got {:?}", other),
    }
    assert_eq!(engine.store().counters().batch_calls, 0);
    assert_eq!(engine.store().counters().single_calls, 0);
}

#[test]
fn test_missing_block_column() {
    let engine = test_engine();
    let request = UpdateRequest::new(history(), IdentifierRequest::parse("G1"), "Selesai")
        .with_block("PELAKSANA", vec!["Tim A".to_string()]);
    assert!(matches!(engine.update(&request), Err(SyncError::Schema(_))));
}

#[test]
fn test_zero_based_write_rejected() {
    let engine = test_engine();
    let store = engine.store();
    assert!(matches!(
        store.write_cell(&history(), 0, 2, "x"),
        Err(SyncError::InvalidRange(_))
    ));
    assert!(matches!(
        store.write_cell(&history(), 2, 0, "x"),
        Err(SyncError::InvalidRange(_))
    ));
    assert_eq!(store.sheet(&history()).unwrap().value(2, 2), "Proses");
}

// --- Remote failures ---

#[test]
fn test_row_read_failure() {
    let engine = test_engine();
    engine.store().set_faults(FaultPlan {
        fail_reads: true,
        ..Default::default()
    });
    let err = engine
        .update(&UpdateRequest::new(history(), IdentifierRequest::parse("G1"), "Selesai"))
        .unwrap_err();
    assert!(matches!(err, SyncError::RemoteRead(_)));
    assert!(!err.is_structural());
}

#[test]
fn test_partial_fallback_failure() {
    let engine = test_engine();
    engine
        .store()
        .set_faults(FaultPlan::failing_batch().with_failing_range("B3"));

    let report = engine
        .update(&UpdateRequest::new(history(), IdentifierRequest::parse("G1, G2"), "Selesai"))
        .unwrap();

    assert_eq!(report.applied_count, 2);
    assert!(report.is_degraded());
    let fallback = report.fallback.as_ref().unwrap();
    assert_eq!(fallback.succeeded, 3);
    assert_eq!(fallback.failed.len(), 1);
    assert_eq!(fallback.failed[0].0, "B3");

    match report.partial_failure() {
        Some(SyncError::PartialUpdate { succeeded, failed }) => {
            assert_eq!(succeeded, 3);
            assert_eq!(failed, vec!["B3".to_string()]);
        }
        other => panic!("expected partial update, got {:?}", other),
    }

    let sheet = engine.store().sheet(&history()).unwrap();
    assert_eq!(sheet.value(2, 2), "Selesai");
    assert_eq!(sheet.value(3, 2), "Proses");
    assert_eq!(sheet.value(3, 3), "2024-05-01 12:00:00");
}

// --- Input errors ---

#[test]
fn test_empty_identifier_request() {
    let engine = test_engine();
    let request = UpdateRequest::new(history(), IdentifierRequest::parse("\n , \n"), "Selesai");
    assert!(matches!(engine.update(&request), Err(SyncError::Config(_))));
}

#[test]
fn test_invalid_inputs() {
    assert!(matches!(ResourceKey::parse("  "), Err(SyncError::InvalidResourceKey(_))));
    assert!(matches!(parse_timezone("Mars/Olympus"), Err(SyncError::InvalidTimeZone(_))));
    assert!(matches!(
        SyncConfig::from_toml_str("[connection\nspreadsheet = 1"),
        Err(SyncError::Config(_))
    ));
    assert!(matches!(
        ViewRegistry::standard().get("input"),
        Err(SyncError::Config(_))
    ));
}

#[test]
fn test_bad_timezone_in_config() {
    let config = SyncConfig::from_toml_str("[audit]\ntimezone = \"WIB\"\n").unwrap();
    assert!(matches!(config.timezone(), Err(SyncError::InvalidTimeZone(_))));
}

// --- Change log edge cases ---

#[test]
fn test_unpivotable_log_degrades_to_empty() {
    // SECTION is missing from the key columns
    let header = Header::new([
        "TIMESTAMP",
        "PENGAWAS",
        "PENYULANG",
        "ID",
        "FIELD_CHANGED",
        "NEW_VALUE",
    ]);
    let rows = vec![row(&["2024-05-01 09:00:00", "Budi", "PYL-01", "G1", "STATUS", "Selesai"])];
    assert!(reconcile(&header, &rows).is_empty());
}

#[test]
fn test_empty_log() {
    let header = Header::new(["TIMESTAMP", "ID", "STATUS"]);
    assert!(reconcile(&header, &[]).is_empty());
}
