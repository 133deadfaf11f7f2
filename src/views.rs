//! Text views over the status table and change log.
//!
//! Views are registered under stable keys at startup; nothing is
//! discovered at runtime.

use crate::config::SyncConfig;
use crate::engine::Engine;
use crate::error::{Result, SyncError};
use crate::reconcile::Snapshot;
use crate::table::TableStore;
use crate::types::{cell, Header, TableRow};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt::Write;

/// Rows shown in a table preview.
pub const PREVIEW_ROWS: usize = 100;

/// Label for empty status cells.
pub const EMPTY_STATUS: &str = "Kosong";

/// Status columns looked for by the distribution summary, in order.
const STATUS_COLUMNS: [&str; 3] = ["STATUS_GARDU", "STATUS", "Status"];

/// What a view gets to read.
pub struct ViewContext<'a> {
    pub engine: &'a Engine<&'a dyn TableStore>,
    pub config: &'a SyncConfig,
    /// Day shown by date-bound views.
    pub date: NaiveDate,
}

/// A named, renderable view.
pub trait View {
    fn title(&self) -> &str;
    fn render(&self, ctx: &ViewContext<'_>) -> Result<String>;
}

/// Stable key to view mapping, in registration order.
#[derive(Default)]
pub struct ViewRegistry {
    views: Vec<(String, Box<dyn View>)>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in views.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("home", Box::new(HomeView));
        registry.register("update", Box::new(UpdateView));
        registry.register("activity", Box::new(ActivityView));
        registry
    }

    /// Register `view` under `key`, replacing any previous view with that key.
    pub fn register(&mut self, key: impl Into<String>, view: Box<dyn View>) {
        let key = key.into();
        self.views.retain(|(k, _)| *k != key);
        self.views.push((key, view));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.views.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Result<&dyn View> {
        self.views
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_ref())
            .ok_or_else(|| SyncError::Config(format!("unknown view '{}'", key)))
    }

    pub fn render(&self, key: &str, ctx: &ViewContext<'_>) -> Result<String> {
        self.get(key)?.render(ctx)
    }
}

/// Status table preview with a status distribution.
pub struct HomeView;

impl View for HomeView {
    fn title(&self) -> &str {
        "Home"
    }

    fn render(&self, ctx: &ViewContext<'_>) -> Result<String> {
        let table = ctx.config.table_ref()?;
        let preview = ctx.engine.preview(&table, PREVIEW_ROWS)?;

        let mut out = String::new();
        if preview.total_rows == 0 {
            out.push_str("Tidak ada data yang terbaca.\n");
            return Ok(out);
        }

        writeln!(out, "Data (sampel)").ok();
        out.push_str(&render_table(preview.header.names(), &preview.rows));

        // The distribution covers every row, not just the preview.
        let rows = ctx.engine.store().read_all_rows(&table)?;
        if let Some((column, counts)) = status_distribution(&preview.header, &rows) {
            writeln!(out, "\nDistribusi {}", column).ok();
            let counts: Vec<TableRow> = counts
                .into_iter()
                .map(|(value, n)| vec![value, n.to_string()])
                .collect();
            out.push_str(&render_table(&[column, "Jumlah".to_string()], &counts));
        }

        writeln!(
            out,
            "\n{} baris · {} kolom",
            group_thousands(preview.total_rows),
            preview.header.len()
        )
        .ok();
        Ok(out)
    }
}

/// Column bindings and status value an update would use.
pub struct UpdateView;

impl View for UpdateView {
    fn title(&self) -> &str {
        "Update Status"
    }

    fn render(&self, ctx: &ViewContext<'_>) -> Result<String> {
        let table = ctx.config.table_ref()?;
        let header = ctx.engine.store().get_header(&table)?;
        let columns = ctx.config.columns.suggest(&header);

        let mut out = String::new();
        writeln!(out, "Tabel: {}", table).ok();
        let rows: Vec<TableRow> = [
            ("Kolom ID", columns.id),
            ("Kolom status", columns.status),
            ("Kolom timestamp", columns.timestamp.filter(|c| !c.is_empty())),
        ]
        .into_iter()
        .map(|(label, column)| {
            vec![
                label.to_string(),
                column.unwrap_or_else(|| "(tidak ada)".to_string()),
            ]
        })
        .chain(std::iter::once(vec![
            "Status baru".to_string(),
            ctx.config.update.status_value.clone(),
        ]))
        .collect();
        out.push_str(&render_table(&["Pengaturan".to_string(), "Nilai".to_string()], &rows));

        // A binding that does not resolve is shown, not returned.
        if let Err(e) = ctx.config.columns.bind(&header) {
            writeln!(out, "\nPeringatan: {}", e).ok();
        }
        Ok(out)
    }
}

/// Reconciled change-log entries for one day.
pub struct ActivityView;

impl View for ActivityView {
    fn title(&self) -> &str {
        "Aktivitas Harian"
    }

    fn render(&self, ctx: &ViewContext<'_>) -> Result<String> {
        let log = ctx.config.log_table_ref()?;
        let tz = ctx.config.timezone()?;
        let snapshot = ctx.engine.daily_activity(&log, ctx.date, tz)?;

        let mut out = String::new();
        writeln!(out, "Aktivitas {} ({})", ctx.date, tz).ok();
        if snapshot.is_empty() {
            out.push_str("Tidak ada aktivitas.\n");
            return Ok(out);
        }
        out.push_str(&render_table(Snapshot::header().names(), &snapshot.to_rows()));
        writeln!(out, "\n{} entri", group_thousands(snapshot.len())).ok();
        Ok(out)
    }
}

/// Count values of the first status column present in `header`.
///
/// Empty cells count as [`EMPTY_STATUS`]. Ordered by count descending,
/// then value.
pub fn status_distribution(header: &Header, rows: &[TableRow]) -> Option<(String, Vec<(String, usize)>)> {
    let column = STATUS_COLUMNS.iter().find(|c| header.contains(c))?;
    let col = header.position(column)?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let value = cell(row, col).trim();
        let value = if value.is_empty() { EMPTY_STATUS } else { value };
        *counts.entry(value.to_string()).or_default() += 1;
    }

    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Some((column.to_string(), counts))
}

/// Plain-text table with left-aligned, space-padded columns.
pub fn render_table(header: &[String], rows: &[TableRow]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, value) in row.iter().enumerate().take(header.len()) {
            widths[i] = widths[i].max(value.chars().count());
        }
    }

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut out = String::new();
    out.push_str(&pad_line(&widths, header.iter().map(String::as_str)));
    out.push_str(&pad_line(&widths, rule.iter().map(String::as_str)));
    for row in rows {
        out.push_str(&pad_line(&widths, row.iter().map(String::as_str)));
    }
    out
}

fn pad_line<'a>(widths: &[usize], mut values: impl Iterator<Item = &'a str>) -> String {
    let cells: Vec<String> = widths
        .iter()
        .map(|w| {
            let v = values.next().unwrap_or("");
            format!("{}{}", v, " ".repeat(w.saturating_sub(v.chars().count())))
        })
        .collect();
    let mut line = cells.join("  ").trim_end().to_string();
    line.push('\n');
    line
}

/// `12345` → `12,345`.
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
