use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

pub const DEFAULT_NONCE_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Default)]
pub struct NonceStats {
    pub accepted: u64,
    pub replays: u64,
    pub evictions: u64,
}

/// Bounded replay-protection set. A nonce that has been inserted is rejected
/// on every later presentation until capacity pressure evicts it; eviction
/// always drops the least recently inserted entries, so the most recent
/// nonces survive. Internally locked so verification is safe across
/// concurrent envelopes.
#[derive(Debug)]
pub struct NonceCache {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    cache: LruCache<String, ()>,
    stats: NonceStats,
}

impl NonceCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                cache: LruCache::new(capacity),
                stats: NonceStats::default(),
            }),
        }
    }

    /// Insert the nonce if it has not been seen. Returns true on first
    /// insertion, false on replay. Insertion and lookup are one atomic step.
    pub fn insert_if_absent(&self, nonce: &str) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            // Poisoned lock: fail closed, treat everything as a replay.
            return false;
        };
        if inner.cache.contains(nonce) {
            inner.stats.replays += 1;
            return false;
        }
        let at_capacity = inner.cache.len() == inner.cache.cap().get();
        inner.cache.put(nonce.to_string(), ());
        inner.stats.accepted += 1;
        if at_capacity {
            inner.stats.evictions += 1;
        }
        true
    }

    pub fn contains(&self, nonce: &str) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.cache.contains(nonce))
            .unwrap_or(true)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> NonceStats {
        self.inner
            .lock()
            .map(|inner| inner.stats.clone())
            .unwrap_or_default()
    }
}
