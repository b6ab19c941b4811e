//! Sharded per-key entry table.
//!
//! Keys are spread over a fixed number of mutex-guarded maps. The shard lock is
//! held for the whole read-check-update of an admission, so two requests for
//! the same key are serialized while unrelated keys rarely contend.

use ahash::{AHashMap, RandomState};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::window::WindowEntry;

/// Default number of shards
pub(super) const SHARDS: usize = 16;

pub(super) struct WindowTable {
    shards: Box<[Mutex<AHashMap<String, WindowEntry>>]>,
    hasher: RandomState,
}

impl WindowTable {
    pub(super) fn new(shards: usize) -> Self {
        Self {
            shards: (0..shards.max(1))
                .map(|_| Mutex::new(AHashMap::new()))
                .collect::<Vec<_>>()
                .into_boxed_slice(),
            hasher: RandomState::new(),
        }
    }

    fn shard(&self, key: &str) -> MutexGuard<'_, AHashMap<String, WindowEntry>> {
        let hash = self.hasher.hash_one(key) as usize;
        let index = hash.checked_rem(self.shards.len()).unwrap_or_default();
        // A panic while holding the lock cannot leave an entry half-updated:
        // every mutation is a plain field store.
        self.shards[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on the entry for `key` under its shard lock, creating the entry
    /// with `init` first if the key is unknown.
    pub(super) fn with_entry<R>(
        &self,
        key: &str,
        init: impl FnOnce() -> WindowEntry,
        f: impl FnOnce(&mut WindowEntry) -> R,
    ) -> R {
        let mut shard = self.shard(key);
        match shard.get_mut(key) {
            Some(entry) => f(entry),
            None => f(shard.entry(key.to_string()).or_insert_with(init)),
        }
    }

    /// Run `f` on the entry for `key` if it exists, without creating it.
    pub(super) fn inspect<R>(&self, key: &str, f: impl FnOnce(Option<&WindowEntry>) -> R) -> R {
        let shard = self.shard(key);
        f(shard.get(key))
    }

    /// Drop every entry for which `expired` returns true. Returns how many were removed.
    pub(super) fn retain_live(&self, now: Instant, expired: impl Fn(&WindowEntry, Instant) -> bool) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                let mut map = shard.lock().unwrap_or_else(PoisonError::into_inner);
                let before = map.len();
                map.retain(|_, entry| !expired(entry, now));
                before.saturating_sub(map.len())
            })
            .sum()
    }

    pub(super) fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }
}
