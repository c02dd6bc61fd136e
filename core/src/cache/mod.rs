//! Version- and fingerprint-checked caches with a byte budget.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::bracket::BracketTable;
use crate::config::Settings;
use crate::diagnostic::Diagnostic;
use crate::parser::ParseResult;
use crate::pattern::PatternNode;
use crate::util::{FastHashMap, fast_hash_map_new};

mod debounce;
mod size;


pub use debounce::Debouncer;
pub use size::EstimateSize;

/// A cached value and the snapshot it was computed from.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: Arc<T>,
    pub version: i32,
    pub fingerprint: u64,
    pub created: Instant,
    pub last_accessed: Instant,
    pub access_count: u64,
    pub size: usize,
    // logical clock value of the last access; drives LRU order
    tick: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub bytes: usize,
    pub budget: usize,
}

struct Slots<T> {
    entries: FastHashMap<String, CacheEntry<T>>,
    total: usize,
    clock: u64,
    stats: CacheStats,
}

impl<T> Slots<T> {
    fn next_tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.entries.remove(key)?;
        self.total -= entry.size;
        Some(entry)
    }
}

/// One document-keyed cache bounded by `budget` estimated bytes.
pub struct Cache<T> {
    name: &'static str,
    budget: usize,
    slots: Mutex<Slots<T>>,
}

impl<T: EstimateSize> Cache<T> {
    pub fn new(name: &'static str, budget: usize) -> Self {
        Self {
            name,
            budget,
            slots: Mutex::new(Slots {
                entries: fast_hash_map_new(),
                total: 0,
                clock: 0,
                stats: CacheStats {
                    budget,
                    ..CacheStats::default()
                },
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots<T>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// The value for `key` if it was computed from exactly this version and
    /// content. A stale entry is dropped.
    pub fn get(&self, key: &str, version: i32, fingerprint: u64) -> Option<Arc<T>> {
        let mut slots = self.lock();
        let tick = slots.next_tick();
        let fresh = match slots.entries.get_mut(key) {
            Some(entry) if entry.version == version && entry.fingerprint == fingerprint => {
                entry.tick = tick;
                entry.last_accessed = Instant::now();
                entry.access_count += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                slots.remove(key);
                trace!(cache = self.name, key, version, "stale entry dropped");
                None
            }
            None => None,
        };
        match fresh {
            Some(_) => slots.stats.hits += 1,
            None => slots.stats.misses += 1,
        }
        fresh
    }

    /// The most recent value for `key` and its version, whatever snapshot it
    /// came from. Does not count as an access.
    pub fn latest(&self, key: &str) -> Option<(i32, Arc<T>)> {
        self.lock().entries.get(key).map(|e| (e.version, e.value.clone()))
    }

    /// Store `value`, evicting least recently used entries until it fits.
    /// Values larger than the whole budget are handed back without being
    /// stored.
    pub fn insert(&self, key: &str, version: i32, fingerprint: u64, value: impl Into<Arc<T>>) -> Arc<T> {
        let value: Arc<T> = value.into();
        let size = value.estimated_size() + key.len();
        let mut slots = self.lock();
        slots.remove(key);
        if size > self.budget {
            debug!(cache = self.name, key, size, budget = self.budget, "entry larger than cache budget, not stored");
            return value;
        }

        while slots.total + size > self.budget {
            let Some(oldest) = slots.entries.iter().min_by_key(|(_, e)| e.tick).map(|(k, _)| k.clone()) else {
                break;
            };
            slots.remove(&oldest);
            slots.stats.evictions += 1;
            debug!(cache = self.name, key = %oldest, "evicted least recently used entry");
        }

        let now = Instant::now();
        let tick = slots.next_tick();
        slots.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                version,
                fingerprint,
                created: now,
                last_accessed: now,
                access_count: 0,
                size,
                tick,
            },
        );
        slots.total += size;
        value
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Drop entries not accessed for longer than `ttl`. Returns how many.
    pub fn sweep(&self, ttl: Duration) -> usize {
        let mut slots = self.lock();
        let now = Instant::now();
        let expired: Vec<String> = slots
            .entries
            .iter()
            .filter(|(_, e)| now.duration_since(e.last_accessed) > ttl)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            slots.remove(key);
        }
        expired.len()
    }

    pub fn clear(&self) {
        let mut slots = self.lock();
        slots.entries.clear();
        slots.total = 0;
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> usize {
        self.lock().total
    }

    pub fn stats(&self) -> CacheStats {
        let slots = self.lock();
        CacheStats {
            entries: slots.entries.len(),
            bytes: slots.total,
            ..slots.stats
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheManagerStats {
    pub parses: CacheStats,
    pub diagnostics: CacheStats,
    pub patterns: CacheStats,
    pub brackets: CacheStats,
}

/// The four per-document caches sharing one byte budget.
pub struct CacheManager {
    pub parses: Cache<ParseResult>,
    pub diagnostics: Cache<Vec<Diagnostic>>,
    pub patterns: Cache<Vec<PatternNode>>,
    pub brackets: Cache<BracketTable>,
    ttl: Duration,
}

impl CacheManager {
    /// Split `max_bytes` 50/20/20/10 across parse results, diagnostics,
    /// pattern metadata and bracket tables.
    pub fn new(max_bytes: usize, ttl: Duration) -> Self {
        Self {
            parses: Cache::new("parse", max_bytes / 2),
            diagnostics: Cache::new("diagnostics", max_bytes / 5),
            patterns: Cache::new("patterns", max_bytes / 5),
            brackets: Cache::new("brackets", max_bytes / 10),
            ttl,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.max_cache_size, settings.cache_ttl())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Forget everything cached for `document`.
    pub fn invalidate(&self, document: &str) {
        self.parses.invalidate(document);
        self.diagnostics.invalidate(document);
        self.patterns.invalidate(document);
        self.brackets.invalidate(document);
    }

    pub fn clear(&self) {
        self.parses.clear();
        self.diagnostics.clear();
        self.patterns.clear();
        self.brackets.clear();
    }

    pub fn sweep(&self) -> usize {
        self.parses.sweep(self.ttl)
            + self.diagnostics.sweep(self.ttl)
            + self.patterns.sweep(self.ttl)
            + self.brackets.sweep(self.ttl)
    }

    pub fn stats(&self) -> CacheManagerStats {
        CacheManagerStats {
            parses: self.parses.stats(),
            diagnostics: self.diagnostics.stats(),
            patterns: self.patterns.stats(),
            brackets: self.brackets.stats(),
        }
    }

    /// Sweep expired entries every `every` until the manager is dropped.
    /// Must be called from within a tokio runtime.
    pub fn start_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let manager: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    trace!("cache manager dropped, sweeper exiting");
                    break;
                };
                let removed = manager.sweep();
                if removed > 0 {
                    debug!(removed, "swept idle cache entries");
                }
            }
        })
    }
}
