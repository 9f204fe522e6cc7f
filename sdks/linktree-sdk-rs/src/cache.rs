//! Query cache keyed by typed queries.
//!
//! Each key carries a generation counter. A fetch takes a [`FetchTicket`]
//! stamped with the current generation and may only store its result while
//! that generation is still current. Storing a result or invalidating the
//! key bumps the counter, so a slow stale response can never overwrite a
//! newer answer. A fetch that fails just drops its ticket and leaves the
//! counter alone.
//!
//! Keys are only resident while they hold an answer or have a fetch in
//! flight.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use linktree_interface::state::LinkTreeAccount;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::{rpc::SignatureRecord, ProfileSummary};

/// A cacheable read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Balance(Pubkey),
    Signatures(Pubkey),
    ProfileDirectory,
    ProfilesByOwner(Pubkey),
    Profile(Pubkey),
}

/// The answer to a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    Balance(u64),
    Signatures(Vec<SignatureRecord>),
    Profiles(Vec<ProfileSummary>),
    Profile(Option<LinkTreeAccount>),
}

/// Permission to store one fetch result. Dropping it without
/// [`QueryCache::complete`] abandons the fetch.
#[must_use = "a ticket does nothing until completed"]
pub struct FetchTicket<'a> {
    cache: &'a QueryCache,
    key: QueryKey,
    generation: u64,
}

impl FetchTicket<'_> {
    pub fn key(&self) -> QueryKey {
        self.key
    }
}

impl Drop for FetchTicket<'_> {
    fn drop(&mut self) {
        self.cache.release(&self.key);
    }
}

#[derive(Default)]
struct Entry {
    generation: u64,
    value: Option<CachedValue>,
    // tickets not yet dropped
    in_flight: usize,
}

impl Entry {
    fn is_idle(&self) -> bool {
        self.in_flight == 0 && self.value.is_none()
    }
}

/// Cache of read results for one cluster endpoint.
pub struct QueryCache {
    scope: String,
    entries: Mutex<HashMap<QueryKey, Entry>>,
}

impl QueryCache {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Endpoint the cached answers came from
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Current answer for `key`, if any
    pub fn get(&self, key: &QueryKey) -> Option<CachedValue> {
        self.entries().get(key).and_then(|e| e.value.clone())
    }

    /// Keys holding an answer or with a fetch in flight
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a fetch for `key`.
    pub fn begin(&self, key: QueryKey) -> FetchTicket<'_> {
        let mut entries = self.entries();
        let entry = entries.entry(key).or_default();
        entry.in_flight += 1;
        FetchTicket {
            cache: self,
            key,
            generation: entry.generation,
        }
    }

    /// Store a fetch result. Returns false, dropping `value`, when another
    /// fetch stored or the key was invalidated since the ticket was taken.
    pub fn complete(&self, ticket: FetchTicket<'_>, value: CachedValue) -> bool {
        self.store(ticket.key, ticket.generation, value)
    }

    /// Forget the answer for `key` and void outstanding tickets.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut entries = self.entries();
        let idle = match entries.get_mut(key) {
            Some(entry) => {
                entry.generation += 1;
                entry.value = None;
                entry.is_idle()
            }
            None => false,
        };
        if idle {
            entries.remove(key);
        }
    }

    pub fn invalidate_all<'a>(&self, keys: impl IntoIterator<Item = &'a QueryKey>) {
        for key in keys {
            self.invalidate(key);
        }
    }

    fn store(&self, key: QueryKey, generation: u64, value: CachedValue) -> bool {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(&key) else {
            return false;
        };
        if entry.generation != generation {
            debug!(
                scope = %self.scope,
                key = ?key,
                ticket = generation,
                current = entry.generation,
                "discarding stale fetch result"
            );
            return false;
        }
        entry.value = Some(value);
        entry.generation += 1;
        true
    }

    fn release(&self, key: &QueryKey) {
        let mut entries = self.entries();
        let idle = match entries.get_mut(key) {
            Some(entry) => {
                entry.in_flight = entry.in_flight.saturating_sub(1);
                entry.is_idle()
            }
            None => false,
        };
        if idle {
            entries.remove(key);
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        // The map stays consistent even if a holder panicked.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_fetch_is_served() {
        let cache = QueryCache::new("local");
        let key = QueryKey::Balance(Pubkey::new_unique());
        assert_eq!(cache.get(&key), None);

        let ticket = cache.begin(key);
        assert!(cache.complete(ticket, CachedValue::Balance(42)));
        assert_eq!(cache.get(&key), Some(CachedValue::Balance(42)));
    }

    #[test]
    fn slow_stale_fetch_cannot_overwrite_newer_one() {
        let cache = QueryCache::new("local");
        let key = QueryKey::Balance(Pubkey::new_unique());

        let slow = cache.begin(key);
        let fast = cache.begin(key);
        assert!(cache.complete(fast, CachedValue::Balance(2)));
        assert!(!cache.complete(slow, CachedValue::Balance(1)));
        assert_eq!(cache.get(&key), Some(CachedValue::Balance(2)));
    }

    #[test]
    fn failed_fetch_does_not_void_a_concurrent_one() {
        let cache = QueryCache::new("local");
        let key = QueryKey::Balance(Pubkey::new_unique());

        let earlier = cache.begin(key);
        let failed = cache.begin(key);
        drop(failed);
        assert!(cache.complete(earlier, CachedValue::Balance(7)));
        assert_eq!(cache.get(&key), Some(CachedValue::Balance(7)));
    }

    #[test]
    fn keys_without_answers_are_not_kept() {
        let cache = QueryCache::new("local");
        let owner = Pubkey::new_unique();

        cache.invalidate(&QueryKey::Profile(owner));
        assert!(cache.is_empty());

        let abandoned = cache.begin(QueryKey::Signatures(owner));
        assert_eq!(cache.len(), 1);
        drop(abandoned);
        assert!(cache.is_empty());

        let ticket = cache.begin(QueryKey::Balance(owner));
        assert!(cache.complete(ticket, CachedValue::Balance(1)));
        assert_eq!(cache.len(), 1);
        cache.invalidate(&QueryKey::Balance(owner));
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidation_voids_in_flight_fetch() {
        let cache = QueryCache::new("local");
        let key = QueryKey::ProfileDirectory;
        let first = cache.begin(key);
        assert!(cache.complete(first, CachedValue::Profiles(vec![])));

        let in_flight = cache.begin(key);
        cache.invalidate(&key);
        assert_eq!(cache.get(&key), None);
        assert!(!cache.complete(in_flight, CachedValue::Profiles(vec![])));
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn invalidation_is_per_key() {
        let cache = QueryCache::new("local");
        let owner = Pubkey::new_unique();
        for (key, value) in [
            (QueryKey::Balance(owner), CachedValue::Balance(1)),
            (QueryKey::Signatures(owner), CachedValue::Signatures(vec![])),
        ] {
            let ticket = cache.begin(key);
            assert!(cache.complete(ticket, value));
        }

        cache.invalidate_all(&[QueryKey::Balance(owner)]);
        assert_eq!(cache.get(&QueryKey::Balance(owner)), None);
        assert!(cache.get(&QueryKey::Signatures(owner)).is_some());
    }
}
