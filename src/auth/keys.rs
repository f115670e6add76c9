//! API key validation
//!
//! Keys are configured at startup (one read-scoped, one write-scoped) and
//! checked on every proxied request. Validation decisions are cached in a
//! TTL'd map so the hot path stays a single lookup even if the key source
//! later moves behind an external store.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::auth::permissions::PermissionLevel;

/// Cached validation outcome. Only grants are cached: storing every
/// rejected key string would let arbitrary traffic grow the map without
/// bound.
#[derive(Debug, Clone, Copy)]
struct CachedDecision {
    level: PermissionLevel,
    cached_at: Instant,
}

/// Validates inbound API keys against the configured key set
pub struct KeyValidator {
    read_key: Option<String>,
    write_key: Option<String>,
    cache: DashMap<String, CachedDecision>,
    cache_ttl: Duration,
}

impl KeyValidator {
    pub fn new(
        read_key: Option<String>,
        write_key: Option<String>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            read_key,
            write_key,
            cache: DashMap::new(),
            cache_ttl,
        }
    }

    /// Look up the permission level a key grants, or None for an unknown
    /// key. The write key also satisfies read-level checks. Unknown keys
    /// are never cached.
    pub fn validate(&self, key: &str) -> Option<PermissionLevel> {
        if let Some(entry) = self.cache.get(key) {
            if entry.cached_at.elapsed() < self.cache_ttl {
                return Some(entry.level);
            }
            drop(entry);
            self.cache.remove(key);
        }

        let level = self.check(key)?;
        self.cache.insert(
            key.to_string(),
            CachedDecision {
                level,
                cached_at: Instant::now(),
            },
        );
        debug!(granted = %level, "key validated");
        Some(level)
    }

    #[cfg(test)]
    fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    fn check(&self, key: &str) -> Option<PermissionLevel> {
        if self.write_key.as_deref() == Some(key) {
            return Some(PermissionLevel::Write);
        }
        if self.read_key.as_deref() == Some(key) {
            return Some(PermissionLevel::Read);
        }
        None
    }
}
