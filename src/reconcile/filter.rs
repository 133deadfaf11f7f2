//! Calendar-day filtering of snapshots.

use super::Snapshot;
use crate::error::{Result, SyncError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use tracing::debug;

/// Naive layouts accepted for log timestamps, tried in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Resolve an IANA zone name such as `Asia/Jakarta`.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| SyncError::InvalidTimeZone(name.to_string()))
}

/// Parse a log timestamp in `tz`.
///
/// Timestamps with an explicit offset (RFC 3339) are converted into `tz`;
/// naive timestamps are taken as wall-clock time in `tz`. A bare date is
/// midnight. Wall-clock times that do not exist in `tz` yield `None`.
pub fn parse_timestamp(raw: &str, tz: Tz) -> Option<DateTime<Tz>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&tz));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    tz.from_local_datetime(&naive).earliest()
}

/// Keep entries whose timestamp falls on `date` in `tz`, in original order.
///
/// Entries with unparsable timestamps are left out without error.
pub fn filter_by_date(snapshot: &Snapshot, date: NaiveDate, tz: Tz) -> Snapshot {
    let mut skipped = 0usize;

    let kept: Snapshot = snapshot
        .iter()
        .filter(|entry| match parse_timestamp(entry.timestamp(), tz) {
            Some(ts) => ts.date_naive() == date,
            None => {
                skipped += 1;
                false
            }
        })
        .cloned()
        .collect();

    if skipped > 0 {
        debug!(skipped, %date, "skipped entries with unparsable timestamps");
    }

    kept
}
