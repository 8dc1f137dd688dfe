//! Time-boxed memoization of trend responses, keyed by selection and
//! window. Expired entries are dropped on read.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::ranking::EntityKind;
use crate::types::TrendResponse;

/// Cache key: mode + selection + window. The selection is stored sorted so
/// the same set of entities hits regardless of input order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrendKey {
    kind: EntityKind,
    entities: Vec<String>,
    window: u32,
}

impl TrendKey {
    pub fn new(kind: EntityKind, entities: &[String], window: u32) -> Self {
        let mut entities = entities.to_vec();
        entities.sort();
        Self {
            kind,
            entities,
            window,
        }
    }
}

struct CacheEntry {
    response: TrendResponse,
    cached_at: DateTime<Utc>,
}

/// In-memory cache with TTL
pub struct TrendCache {
    ttl: Duration,
    entries: Mutex<HashMap<TrendKey, CacheEntry>>,
}

impl TrendCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs as i64),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get a cached response if still fresh
    pub fn get(&self, key: &TrendKey) -> Option<TrendResponse> {
        let mut entries = self.entries.lock().ok()?;

        let expired = match entries.get(key) {
            Some(entry) => Utc::now() - entry.cached_at > self.ttl,
            None => return None,
        };

        if expired {
            entries.remove(key);
            return None;
        }

        entries.get(key).map(|entry| entry.response.clone())
    }

    /// Store a computed response
    pub fn set(&self, key: TrendKey, response: TrendResponse) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                CacheEntry {
                    response,
                    cached_at: Utc::now(),
                },
            );
        }
    }

    #[cfg(test)]
    fn set_at(&self, key: TrendKey, response: TrendResponse, cached_at: DateTime<Utc>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, CacheEntry { response, cached_at });
        }
    }
}
