//! `gardu`: push status changes and inspect the change log.

use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use gardu_status::views::render_table;
use gardu_status::{
    filter_by_date, parse_timezone, CachedStore, Engine, FileStore, IdentifierRequest, Session,
    Snapshot, SyncConfig, SystemClock, TableStore, UpdateRequest, ViewContext, ViewRegistry,
};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, default_value = "gardu.toml")]
    config: PathBuf,

    /// Workbook file the tables are read from and written to
    #[arg(short, long, default_value = "gardu-workbook.json")]
    workbook: PathBuf,

    /// Spreadsheet URL, ID or title (overrides the config)
    #[arg(long)]
    spreadsheet: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set the status of one or more identifiers
    Update {
        /// Identifiers, separated by commas or newlines
        #[arg(short, long)]
        ids: String,

        /// New status value (defaults to the configured one)
        #[arg(short, long)]
        status: Option<String>,

        /// Worksheet: tab name, numeric GID, or empty for the first sheet
        #[arg(long)]
        worksheet: Option<String>,

        #[arg(long)]
        id_column: Option<String>,

        #[arg(long)]
        status_column: Option<String>,

        #[arg(long)]
        timestamp_column: Option<String>,

        /// Do not write a timestamp
        #[arg(long, conflicts_with = "timestamp_column")]
        no_timestamp: bool,
    },

    /// Print the reconciled change log
    Snapshot {
        /// Only entries on this day (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Time zone for --date (defaults to the configured one)
        #[arg(long)]
        tz: Option<String>,
    },

    /// Render a registered view
    View {
        /// View key
        name: String,

        /// Day for date-bound views (defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// List registered views
    Views,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut session = Session::default();
    session.ensure_initialized();

    let mut config = if cli.config.exists() {
        SyncConfig::load(&cli.config)?
    } else {
        tracing::debug!("no config at {}, using defaults", cli.config.display());
        SyncConfig::default()
    };
    if let Some(spreadsheet) = cli.spreadsheet {
        config.connection.spreadsheet = spreadsheet;
    }

    let tz = config.timezone()?;
    let open_store = || FileStore::open(&cli.workbook);

    match cli.command {
        Command::Update {
            ids,
            status,
            worksheet,
            id_column,
            status_column,
            timestamp_column,
            no_timestamp,
        } => {
            if let Some(worksheet) = worksheet {
                config.connection.worksheet = worksheet;
            }
            let mut columns = config.columns.clone();
            columns.id = id_column.or(columns.id);
            columns.status = status_column.or(columns.status);
            columns.timestamp = if no_timestamp {
                Some(String::new())
            } else {
                timestamp_column.or(columns.timestamp)
            };

            let status = status.unwrap_or_else(|| config.update.status_value.clone());
            let request =
                UpdateRequest::new(config.table_ref()?, IdentifierRequest::parse(&ids), status)
                    .with_columns(columns);

            let engine = Engine::new(open_store()?, Box::new(SystemClock::new(tz)));
            let report = engine.update(&request)?;

            if report.found.is_empty() {
                println!("Tidak ada ID yang cocok ditemukan.");
            } else {
                println!("Berhasil mengupdate {} baris.", report.applied_count);
            }
            if let Some(fallback) = &report.fallback {
                println!(
                    "Batch ditolak ({}); {} penulisan individual berhasil, {} gagal.",
                    fallback.batch_error,
                    fallback.succeeded,
                    fallback.failed.len()
                );
                for (range, reason) in &fallback.failed {
                    println!("  {}: {}", range, reason);
                }
            }
            if !report.not_found.is_empty() {
                println!("ID tidak ditemukan: {}", report.not_found.join(", "));
            }
            if let Some(err) = report.partial_failure() {
                return Err(err.into());
            }
        }

        Command::Snapshot { date, tz: zone } => {
            let cached = CachedStore::new(open_store()?, config.cache_config());
            let engine = Engine::new(cached, Box::new(SystemClock::new(tz)));
            let mut snapshot: Snapshot = engine.snapshot(&config.log_table_ref()?)?;
            if let Some(date) = date {
                let zone = match zone {
                    Some(name) => parse_timezone(&name)?,
                    None => tz,
                };
                snapshot = filter_by_date(&snapshot, date, zone);
            }
            print!("{}", render_table(Snapshot::header().names(), &snapshot.to_rows()));
        }

        Command::View { name, date } => {
            let cached = CachedStore::new(open_store()?, config.cache_config());
            let engine = Engine::new(&cached as &dyn TableStore, Box::new(SystemClock::new(tz)));
            let date = date.unwrap_or_else(|| Utc::now().with_timezone(&tz).date_naive());
            let ctx = ViewContext {
                engine: &engine,
                config: &config,
                date,
            };
            let registry = ViewRegistry::standard();
            let view = registry.get(&name)?;
            println!("== {} ==", view.title());
            print!("{}", view.render(&ctx)?);
        }

        Command::Views => {
            for key in ViewRegistry::standard().keys() {
                println!("{}", key);
            }
        }
    }

    Ok(())
}
