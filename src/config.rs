//! Sync configuration.

use crate::error::{Result, SyncError};
use crate::reconcile::parse_timezone;
use crate::table::CacheConfig;
use crate::types::{Header, ResourceKey, SheetSelector, TableRef};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Where the tables live.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Spreadsheet URL, ID or title.
    pub spreadsheet: String,
    /// Status table: tab name, numeric GID, or empty for the first sheet.
    pub worksheet: String,
    /// Change-log table, same syntax as `worksheet`.
    pub log_worksheet: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            spreadsheet: String::new(),
            worksheet: "History".to_string(),
            log_worksheet: "Log".to_string(),
        }
    }
}

/// Column name bindings. Unset names fall back to header-based suggestions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub id: Option<String>,
    pub status: Option<String>,
    /// `Some("")` disables the timestamp write.
    pub timestamp: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Default value written into the status column.
    pub status_value: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            status_value: "Selesai".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// IANA zone used for calendar-day filtering and batch timestamps.
    pub timezone: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            timezone: "Asia/Jakarta".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            ttl_secs: defaults.ttl.as_secs(),
            capacity: defaults.capacity,
        }
    }
}

/// Full configuration, as read from a TOML file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub connection: ConnectionConfig,
    pub columns: ColumnConfig,
    pub update: UpdateConfig,
    pub audit: AuditConfig,
    pub cache: CacheSettings,
}

impl SyncConfig {
    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| {
            SyncError::Config(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// The status table.
    pub fn table_ref(&self) -> Result<TableRef> {
        Ok(TableRef::new(
            ResourceKey::parse(&self.connection.spreadsheet)?,
            SheetSelector::parse(&self.connection.worksheet),
        ))
    }

    /// The change-log table.
    pub fn log_table_ref(&self) -> Result<TableRef> {
        Ok(TableRef::new(
            ResourceKey::parse(&self.connection.spreadsheet)?,
            SheetSelector::parse(&self.connection.log_worksheet),
        ))
    }

    pub fn timezone(&self) -> Result<Tz> {
        parse_timezone(&self.audit.timezone)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.cache.ttl_secs),
            capacity: self.cache.capacity,
        }
    }
}

/// Resolved 1-based column positions for an update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnBindings {
    pub id: usize,
    pub status: usize,
    pub timestamp: Option<usize>,
}

impl ColumnConfig {
    /// Fill unset names from the header.
    ///
    /// - id: `ID`, else the first column
    /// - status: first of `STATUS`/`STATUS_GARDU` (any case), else the first column
    /// - timestamp: first of `timestamp`, `sent at`, `sent_at`, `updated_at` (any case), else none
    pub fn suggest(&self, header: &Header) -> ColumnConfig {
        let first = header.names().first().cloned();

        let id = self.id.clone().or_else(|| {
            if header.contains("ID") {
                Some("ID".to_string())
            } else {
                first.clone()
            }
        });

        let status = self.status.clone().or_else(|| {
            header
                .find(|n| matches!(n.to_uppercase().as_str(), "STATUS" | "STATUS_GARDU"))
                .map(str::to_string)
                .or_else(|| first.clone())
        });

        let timestamp = self.timestamp.clone().or_else(|| {
            header
                .find(|n| {
                    matches!(
                        n.to_lowercase().as_str(),
                        "timestamp" | "sent at" | "sent_at" | "updated_at"
                    )
                })
                .map(str::to_string)
        });

        ColumnConfig {
            id,
            status,
            timestamp,
        }
    }

    /// Resolve names to positions. Any configured name absent from the
    /// header is a schema error.
    pub fn bind(&self, header: &Header) -> Result<ColumnBindings> {
        let names = self.suggest(header);

        let id = header.column_index(names.id.as_deref().unwrap_or_default())?;
        let status = header.column_index(names.status.as_deref().unwrap_or_default())?;
        let timestamp = match names.timestamp.as_deref() {
            None | Some("") => None,
            Some(name) => Some(header.column_index(name)?),
        };

        Ok(ColumnBindings {
            id,
            status,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.connection.worksheet, "History");
        assert_eq!(config.update.status_value, "Selesai");
        assert_eq!(config.cache.ttl_secs, 120);
        assert_eq!(config.timezone().unwrap(), chrono_tz::Asia::Jakarta);
    }

    #[test]
    fn test_from_toml() {
        let config = SyncConfig::from_toml_str(
            r#"
            [connection]
            spreadsheet = "https://docs.google.com/spreadsheets/d/1AbCdEfGhIjKlMnOpQrStUv/edit"
            worksheet = "1476556612"

            [columns]
            status = "STATUS_GARDU"
            timestamp = ""

            [audit]
            timezone = "Asia/Makassar"
            "#,
        )
        .unwrap();

        let table = config.table_ref().unwrap();
        assert_eq!(table.resource, ResourceKey::Id("1AbCdEfGhIjKlMnOpQrStUv".into()));
        assert_eq!(table.sheet, SheetSelector::Gid(1476556612));
        assert_eq!(config.log_table_ref().unwrap().sheet, SheetSelector::Name("Log".into()));
        assert_eq!(config.columns.status.as_deref(), Some("STATUS_GARDU"));
        assert_eq!(config.update.status_value, "Selesai");
        assert_eq!(config.timezone().unwrap(), chrono_tz::Asia::Makassar);
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            SyncConfig::from_toml_str("[cache]\nttl_secs = \"soon\""),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn test_suggestions() {
        let header = Header::new(["NAMA", "ID", "status_gardu", "Sent At"]);
        let bound = ColumnConfig::default().bind(&header).unwrap();
        assert_eq!(
            bound,
            ColumnBindings {
                id: 2,
                status: 3,
                timestamp: Some(4)
            }
        );

        let header = Header::new(["KODE", "KETERANGAN"]);
        let bound = ColumnConfig::default().bind(&header).unwrap();
        assert_eq!(bound.id, 1);
        assert_eq!(bound.status, 1);
        assert_eq!(bound.timestamp, None);
    }

    #[test]
    fn test_bind_missing_column() {
        let header = Header::new(["ID", "STATUS"]);
        let columns = ColumnConfig {
            timestamp: Some("UPDATED".into()),
            ..Default::default()
        };
        assert!(matches!(columns.bind(&header), Err(SyncError::Schema(name)) if name == "UPDATED"));

        let disabled = ColumnConfig {
            timestamp: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(disabled.bind(&header).unwrap().timestamp, None);
    }
}
