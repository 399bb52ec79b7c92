//! Result cache keyed by [`Fingerprint`].
//!
//! One `RwLock` guards the map; callers never lock. Entries hold their result
//! behind an `Arc` and are never modified in place, so a reader racing a
//! writer sees either the old entry or the new one.
//!
//! Entries expire by TTL even when nobody invalidates them. An entry whose
//! result breaks the result invariants is logged as a
//! [`CacheCorruptionError`], evicted and reported as a miss. A poisoned lock
//! clears the whole map.

mod fingerprint;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use jiff::Timestamp;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

pub use fingerprint::Fingerprint;

use crate::error::CacheCorruptionError;
use crate::model::{GoalId, ProbabilityResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for entries stored without an explicit one
    pub default_ttl: Duration,
    /// Oldest entries are evicted beyond this size
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(60 * 60),
            max_entries: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub evictions: u64,
}

impl CacheStats {
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// A cached result with its creation time
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub result: Arc<ProbabilityResult>,
    pub created_at: Timestamp,
}

#[derive(Debug)]
struct CacheEntry {
    result: Arc<ProbabilityResult>,
    goal_id: GoalId,
    inserted: Instant,
    created_at: Timestamp,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted) >= self.ttl
    }
}

enum Stale {
    Expired,
    Corrupt(String),
}

fn staleness(entry: &CacheEntry, now: Instant) -> Option<Stale> {
    if entry.is_expired(now) {
        Some(Stale::Expired)
    } else {
        entry.result.invariant_violation().map(Stale::Corrupt)
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: FxHashMap<Fingerprint, CacheEntry>,
    /// Fingerprints derived from each goal, for point invalidation
    by_goal: FxHashMap<GoalId, FxHashSet<Fingerprint>>,
}

impl CacheState {
    fn remove(&mut self, fingerprint: Fingerprint) -> Option<CacheEntry> {
        let entry = self.entries.remove(&fingerprint)?;
        if let Some(set) = self.by_goal.get_mut(&entry.goal_id) {
            set.remove(&fingerprint);
            if set.is_empty() {
                self.by_goal.remove(&entry.goal_id);
            }
        }
        Some(entry)
    }

    fn insert(&mut self, fingerprint: Fingerprint, entry: CacheEntry) {
        self.remove(fingerprint);
        self.by_goal
            .entry(entry.goal_id)
            .or_default()
            .insert(fingerprint);
        self.entries.insert(fingerprint, entry);
    }

    fn oldest(&self) -> Option<Fingerprint> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted)
            .map(|(fingerprint, _)| *fingerprint)
    }

    fn clear(&mut self) -> usize {
        let size = self.entries.len();
        self.entries.clear();
        self.by_goal.clear();
        size
    }
}

pub struct ProbabilityCache {
    state: RwLock<CacheState>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ProbabilityCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(|poisoned| {
            let mut state = poisoned.into_inner();
            let cleared = state.clear();
            let err = CacheCorruptionError {
                fingerprint: None,
                reason: "lock poisoned by a panicking writer".to_string(),
            };
            tracing::error!(error = %err, cleared, "Clearing result cache");
            self.evictions.fetch_add(cleared as u64, Ordering::Relaxed);
            self.state.clear_poison();
            state
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        if self.state.is_poisoned() {
            drop(self.write());
        }
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a live entry. Expired and corrupted entries are evicted and
    /// count as misses.
    pub fn get(&self, fingerprint: Fingerprint) -> Option<CacheHit> {
        let now = Instant::now();
        {
            let state = self.read();
            match state.entries.get(&fingerprint) {
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
                Some(entry) if staleness(entry, now).is_none() => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(CacheHit {
                        result: Arc::clone(&entry.result),
                        created_at: entry.created_at,
                    });
                }
                Some(_) => {}
            }
        }

        let mut state = self.write();
        // Re-check: a writer may have replaced the entry between the locks
        let stale = state
            .entries
            .get(&fingerprint)
            .and_then(|entry| staleness(entry, now));
        match stale {
            Some(Stale::Expired) => {
                state.remove(fingerprint);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(%fingerprint, "Evicted expired entry");
            }
            Some(Stale::Corrupt(reason)) => {
                state.remove(fingerprint);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                let err = CacheCorruptionError {
                    fingerprint: Some(fingerprint),
                    reason,
                };
                tracing::error!(error = %err, "Evicted corrupted cache entry");
            }
            None => {
                if let Some(entry) = state.entries.get(&fingerprint) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(CacheHit {
                        result: Arc::clone(&entry.result),
                        created_at: entry.created_at,
                    });
                }
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a result, replacing any entry under the same fingerprint.
    ///
    /// Returns the creation timestamp recorded for the entry.
    pub fn put(
        &self,
        fingerprint: Fingerprint,
        goal_id: GoalId,
        result: Arc<ProbabilityResult>,
        ttl: Option<Duration>,
    ) -> Timestamp {
        let created_at = Timestamp::now();
        let entry = CacheEntry {
            result,
            goal_id,
            inserted: Instant::now(),
            created_at,
            ttl: ttl.unwrap_or(self.config.default_ttl),
        };

        let mut state = self.write();
        if !state.entries.contains_key(&fingerprint) {
            while state.entries.len() >= self.config.max_entries.max(1) {
                let Some(oldest) = state.oldest() else { break };
                state.remove(oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        state.insert(fingerprint, entry);
        created_at
    }

    /// Drop every entry derived from `goal_id`
    pub fn invalidate(&self, goal_id: GoalId) -> usize {
        let mut state = self.write();
        let fingerprints = state.by_goal.remove(&goal_id).unwrap_or_default();
        for fingerprint in &fingerprints {
            state.entries.remove(fingerprint);
        }
        tracing::debug!(%goal_id, removed = fingerprints.len(), "Invalidated cache entries");
        fingerprints.len()
    }

    pub fn invalidate_all(&self) -> usize {
        let removed = self.write().clear();
        tracing::debug!(removed, "Cleared result cache");
        removed
    }

    /// Remove every expired entry
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.write();
        let expired: Vec<Fingerprint> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(fingerprint, _)| *fingerprint)
            .collect();
        for fingerprint in &expired {
            state.remove(*fingerprint);
        }
        self.evictions
            .fetch_add(expired.len() as u64, Ordering::Relaxed);
        expired.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for ProbabilityCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for ProbabilityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbabilityCache")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(success: f64) -> Arc<ProbabilityResult> {
        Arc::new(ProbabilityResult {
            success_probability: success,
            partial_success_probability: success,
            ..Default::default()
        })
    }

    #[test]
    fn test_get_put_and_stats() {
        let cache = ProbabilityCache::default();
        assert!(cache.get(Fingerprint(1)).is_none());

        cache.put(Fingerprint(1), GoalId(1), result(0.5), None);
        let hit = cache.get(Fingerprint(1)).unwrap();
        assert_eq!(hit.result.success_probability, 0.5);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_invalidate_goal_keeps_others() {
        let cache = ProbabilityCache::default();
        cache.put(Fingerprint(1), GoalId(1), result(0.1), None);
        cache.put(Fingerprint(2), GoalId(1), result(0.2), None);
        cache.put(Fingerprint(3), GoalId(2), result(0.3), None);

        assert_eq!(cache.invalidate(GoalId(1)), 2);
        assert!(cache.get(Fingerprint(1)).is_none());
        assert!(cache.get(Fingerprint(3)).is_some());
        assert_eq!(cache.invalidate(GoalId(1)), 0);

        assert_eq!(cache.invalidate_all(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = ProbabilityCache::default();
        cache.put(Fingerprint(1), GoalId(1), result(0.5), Some(Duration::ZERO));
        cache.put(Fingerprint(2), GoalId(1), result(0.5), Some(Duration::ZERO));
        cache.put(Fingerprint(3), GoalId(1), result(0.5), None);

        assert!(cache.get(Fingerprint(1)).is_none());
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(Fingerprint(3)).is_some());
    }

    #[test]
    fn test_max_entries_evicts_oldest() {
        let cache = ProbabilityCache::new(CacheConfig {
            max_entries: 2,
            ..Default::default()
        });
        cache.put(Fingerprint(1), GoalId(1), result(0.1), None);
        std::thread::sleep(Duration::from_millis(2));
        cache.put(Fingerprint(2), GoalId(2), result(0.2), None);
        std::thread::sleep(Duration::from_millis(2));
        cache.put(Fingerprint(3), GoalId(3), result(0.3), None);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(Fingerprint(1)).is_none());
        assert!(cache.get(Fingerprint(3)).is_some());
        // Invalidation index follows the eviction
        assert_eq!(cache.invalidate(GoalId(1)), 0);
    }

    #[test]
    fn test_corrupted_entry_is_evicted() {
        let cache = ProbabilityCache::default();
        let corrupt = Arc::new(ProbabilityResult {
            success_probability: 0.9,
            partial_success_probability: 0.1,
            ..Default::default()
        });
        cache.put(Fingerprint(7), GoalId(1), corrupt, None);

        assert!(cache.get(Fingerprint(7)).is_none());
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_poisoned_lock_recovers_empty() {
        let cache = ProbabilityCache::default();
        cache.put(Fingerprint(1), GoalId(1), result(0.5), None);

        std::thread::scope(|s| {
            let handle = s.spawn(|| {
                let _guard = cache.state.write().unwrap();
                panic!("writer panicked");
            });
            assert!(handle.join().is_err());
        });
        assert!(cache.state.is_poisoned());

        assert!(cache.get(Fingerprint(1)).is_none());
        assert!(!cache.state.is_poisoned());
        cache.put(Fingerprint(2), GoalId(1), result(0.5), None);
        assert!(cache.get(Fingerprint(2)).is_some());
    }
}
