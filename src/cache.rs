use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use parking_lot::Mutex;

use crate::{prelude::*, price::HourlyPrice, tariff::Tariff};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CacheKey {
    pub on: NaiveDate,
    pub provider: String,
    pub tariff: Tariff,
}

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub prices: Vec<HourlyPrice>,
    pub created_at: DateTime<Utc>,
}

/// In-process cache of the final hourly prices.
///
/// Entries expire lazily: a stale entry is dropped on the next lookup. There is no size limit.
#[derive(Debug)]
pub struct MemoryCache {
    ttl: TimeDelta,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

impl MemoryCache {
    pub const DEFAULT_TTL: TimeDelta = TimeDelta::hours(1);

    #[must_use]
    pub fn new(ttl: TimeDelta) -> Self {
        Self { ttl, entries: Mutex::default() }
    }

    #[must_use]
    pub fn get(&self, key: &CacheKey, bypass: bool, now: DateTime<Utc>) -> Option<Vec<HourlyPrice>> {
        if bypass {
            return None;
        }
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;
        if now - entry.created_at < self.ttl {
            debug!(on = %key.on, n_prices = entry.prices.len(), "cache hit");
            Some(entry.prices.clone())
        } else {
            debug!(on = %key.on, "cache entry expired");
            entries.remove(key);
            None
        }
    }

    pub fn set(&self, key: CacheKey, prices: Vec<HourlyPrice>, now: DateTime<Utc>) {
        self.entries.lock().insert(key, CacheEntry { prices, created_at: now });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
