//! # Gardu Status
//!
//! Keeps a gardu maintenance status table, stored in a remote spreadsheet,
//! in step with field-reported status changes, and turns the append-only
//! change log into point-in-time snapshots for audit.
//!
//! ## Core Concepts
//!
//! - **Table stores**: uniform header/row reads and cell/range writes over a
//!   sheet addressed by spreadsheet and sheet selector
//! - **Row location**: map requested identifiers to physical rows
//! - **Batch updates**: one batch write, with a per-write fallback when the
//!   batch is rejected
//! - **Reconciliation**: narrow or wide change logs into wide snapshots,
//!   filterable by calendar day
//!
//! ## Example
//!
//! ```ignore
//! use gardu_status::{Engine, IdentifierRequest, MemoryStore, SystemClock, TableRef, UpdateRequest};
//!
//! let engine = Engine::new(store, Box::new(SystemClock::new(chrono_tz::Asia::Jakarta)));
//! let request = UpdateRequest::new(
//!     TableRef::named("data gardu", "History"),
//!     IdentifierRequest::parse("51311172646881, 51311172646882"),
//!     "Selesai",
//! );
//! let report = engine.update(&request)?;
//! println!("updated {} rows, missing {:?}", report.applied_count, report.not_found);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod locate;
pub mod reconcile;
pub mod session;
pub mod table;
pub mod types;
pub mod update;
pub mod views;

// Re-exports
pub use config::{ColumnBindings, ColumnConfig, SyncConfig};
pub use engine::{Engine, TablePreview, UpdateRequest};
pub use error::{Result, SyncError};
pub use locate::{locate_rows, Located};
pub use reconcile::{
    detect_form, filter_by_date, parse_timestamp, parse_timezone, reconcile, LogForm, Snapshot,
    SnapshotEntry,
};
pub use session::Session;
pub use table::{
    CacheConfig, CachedStore, FaultPlan, FileStore, MemoryStore, RangeWrite, Sheet, TableStore,
    Workbook, WriteCounters,
};
pub use types::*;
pub use update::{
    build_writes, BatchOutcome, BatchUpdater, BlockPayload, Clock, FallbackReport, FixedClock,
    SystemClock, UpdatePhase, UpdatePlan, UpdateReport,
};
pub use views::{View, ViewContext, ViewRegistry};
