//! Time-bounded read cache in front of a table store.

use super::{RangeWrite, TableStore};
use crate::error::Result;
use crate::types::{Header, TableRef, TableRow};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Cache sizing and freshness.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// How long a read stays valid.
    pub ttl: Duration,
    /// Max cached reads across all tables.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(120),
            capacity: 64,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ReadKind {
    Header,
    Rows,
}

#[derive(Clone)]
enum Cached {
    Header(Header),
    Rows(Vec<TableRow>),
}

struct Entry {
    value: Cached,
    stored_at: Instant,
}

/// Wraps a store and serves header and row reads from memory for `ttl`.
///
/// Writes go straight through and drop the cached reads of the written
/// table. Reads may be stale by up to `ttl` with respect to writes made by
/// other clients.
pub struct CachedStore<S> {
    inner: S,
    ttl: Duration,
    cache: Mutex<LruCache<(TableRef, ReadKind), Entry>>,
}

impl<S: TableStore> CachedStore<S> {
    pub fn new(inner: S, config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            ttl: config.ttl,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop all cached reads for `table`.
    pub fn invalidate(&self, table: &TableRef) {
        let mut cache = self.cache.lock();
        cache.pop(&(table.clone(), ReadKind::Header));
        cache.pop(&(table.clone(), ReadKind::Rows));
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    fn lookup(&self, table: &TableRef, kind: ReadKind) -> Option<Cached> {
        let key = (table.clone(), kind);
        let mut cache = self.cache.lock();
        let fresh = cache
            .get(&key)
            .map(|entry| (entry.stored_at.elapsed() < self.ttl).then(|| entry.value.clone()));
        match fresh {
            Some(Some(value)) => Some(value),
            Some(None) => {
                cache.pop(&key);
                None
            }
            None => None,
        }
    }

    fn remember(&self, table: &TableRef, kind: ReadKind, value: Cached) {
        self.cache.lock().put(
            (table.clone(), kind),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }
}

impl<S: TableStore> TableStore for CachedStore<S> {
    fn get_header(&self, table: &TableRef) -> Result<Header> {
        if let Some(Cached::Header(header)) = self.lookup(table, ReadKind::Header) {
            return Ok(header);
        }
        let header = self.inner.get_header(table)?;
        self.remember(table, ReadKind::Header, Cached::Header(header.clone()));
        Ok(header)
    }

    fn read_all_rows(&self, table: &TableRef) -> Result<Vec<TableRow>> {
        if let Some(Cached::Rows(rows)) = self.lookup(table, ReadKind::Rows) {
            return Ok(rows);
        }
        let rows = self.inner.read_all_rows(table)?;
        self.remember(table, ReadKind::Rows, Cached::Rows(rows.clone()));
        Ok(rows)
    }

    fn write_cell(&self, table: &TableRef, row: usize, col: usize, value: &str) -> Result<()> {
        self.invalidate(table);
        self.inner.write_cell(table, row, col, value)
    }

    fn write_range(&self, table: &TableRef, updates: &[RangeWrite]) -> Result<()> {
        self.invalidate(table);
        self.inner.write_range(table, updates)
    }

    fn write_one(&self, table: &TableRef, update: &RangeWrite) -> Result<()> {
        self.invalidate(table);
        self.inner.write_one(table, update)
    }
}
