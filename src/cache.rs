//! Time-to-live read-through cache for fetched sheets.
//!
//! The cache sits between the data source and the compute core. A miss or an
//! expired entry triggers the supplied fetch; failed fetches are never stored.

use crate::error::FetchError;
use crate::source::{DataSource, Table};
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub fetched_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) < ttl
    }
}

#[derive(Debug)]
pub struct TtlCache<T> {
    entries: HashMap<String, CacheEntry<T>>,
}

impl<T> Default for TtlCache<T> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<T: Clone> TtlCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_fetch<E, F>(&mut self, key: &str, ttl: Duration, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.get_or_fetch_at(key, ttl, Instant::now(), fetch)
    }

    /// Same as [`TtlCache::get_or_fetch`] with an explicit clock reading.
    pub fn get_or_fetch_at<E, F>(&mut self, key: &str, ttl: Duration, now: Instant, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_fresh(ttl, now) {
                log::debug!("Cache hit for '{}'", key);
                return Ok(entry.value.clone());
            }
            log::debug!("Cache entry for '{}' expired", key);
        } else {
            log::debug!("Cache miss for '{}'", key);
        }
        let value = fetch()?;
        self.entries.insert(
            key.to_string(),
            CacheEntry { value: value.clone(), fetched_at: now },
        );
        Ok(value)
    }

    pub fn invalidate(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A [`DataSource`] that serves sheets from a [`TtlCache`] and only goes to
/// the wrapped source on a miss or after expiry.
#[derive(Debug)]
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    cache: RefCell<TtlCache<Table>>,
}

impl<S: DataSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self { inner, ttl, cache: RefCell::new(TtlCache::new()) }
    }

    /// Drop every cached sheet so the next fetch goes to the source.
    pub fn refresh(&self) {
        self.cache.borrow_mut().clear();
    }
}

impl<S: DataSource> DataSource for CachedSource<S> {
    fn fetch(&self, sheet: &str) -> Result<Table, FetchError> {
        self.cache.borrow_mut().get_or_fetch(sheet, self.ttl, || self.inner.fetch(sheet))
    }
}
