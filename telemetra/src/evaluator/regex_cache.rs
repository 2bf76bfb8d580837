use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};

use crate::errors::TelemetraResult;

/// A bounded cache of compiled full-match regexes keyed by the literal pattern.
///
/// Entries are evicted least recently used first once `capacity` is reached,
/// and an entry not accessed for `ttl` is dropped on its next lookup. A miss
/// only costs a recompilation; it never changes a match result.
///
/// Cloning is cheap and clones share the same entries.
#[derive(Clone)]
pub struct RegexCache {
    inner: Arc<RegexCacheInner>,
}

struct RegexCacheInner {
    entries: Mutex<LruCache<String, CachedRegex>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

struct CachedRegex {
    regex: Arc<Regex>,
    last_access: Instant,
}

impl RegexCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        RegexCache {
            inner: Arc::new(RegexCacheInner {
                entries: Mutex::new(LruCache::new(capacity)),
                ttl,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the compiled full-match form of `pattern`, compiling it on a miss.
    ///
    /// # Errors
    ///
    /// A parse error if the pattern does not compile.
    pub fn get_or_compile(&self, pattern: &str) -> TelemetraResult<Arc<Regex>> {
        self.get_or_compile_at(pattern, Instant::now())
    }

    pub(crate) fn get_or_compile_at(&self, pattern: &str, now: Instant) -> TelemetraResult<Arc<Regex>> {
        {
            let mut entries = self.inner.entries.lock();
            let expired = match entries.get_mut(pattern) {
                Some(entry) if now.saturating_duration_since(entry.last_access) <= self.inner.ttl => {
                    entry.last_access = now;
                    self.inner.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Arc::clone(&entry.regex));
                }
                Some(_) => true,
                None => false,
            };
            if expired {
                log::debug!("Regex cache entry for {} expired", pattern);
                entries.pop(pattern);
            }
        }

        // compile outside the lock
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        let regex = Arc::new(compile_full_match(pattern, false)?);

        let mut entries = self.inner.entries.lock();
        let cached = CachedRegex {
            regex: Arc::clone(&regex),
            last_access: now,
        };
        if let Some((evicted, _)) = entries.push(pattern.to_string(), cached) {
            if evicted != pattern {
                log::debug!("Regex cache evicted {}", evicted);
            }
        }
        Ok(regex)
    }

    /// Drops every entry that has not been accessed within the ttl.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub(crate) fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.inner.entries.lock();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.last_access) > self.inner.ttl)
            .map(|(pattern, _)| pattern.clone())
            .collect();
        for pattern in &expired {
            entries.pop(pattern);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.entries.lock().cap().get()
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn hits(&self) -> u64 {
        self.inner.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.inner.misses.load(Ordering::Relaxed)
    }
}

/// Compiles `pattern` so that it only matches the whole input.
pub(crate) fn compile_full_match(pattern: &str, case_insensitive: bool) -> TelemetraResult<Regex> {
    let regex = RegexBuilder::new(&format!("^(?:{})$", pattern))
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| {
            log::error!("Invalid regex pattern {}: {}", pattern, e);
            e
        })?;
    Ok(regex)
}
