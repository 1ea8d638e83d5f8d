//! The keyspace: a `Dict<Vec<u8>, Value>` plus its companion expiry index
//! (§3). This is the object every command handler mutates.

use crate::database::{
    dict::Dict,
    expire::ExpireIndex,
    siphash::SipHashKey,
    types::Value,
};

/// Default `max_list_size` for Set encoding upgrade (§3, §6), overridden by
/// `SET_MAX_ZIPLIST_ENTRIES`.
pub const DEFAULT_MAX_LIST_SIZE: usize = 256;

/// The top-level store: one keyspace `Dict`, one expiry index, sharing a
/// single process-wide SipHash key (§4.1, §9 "Global random key") so that
/// the keyspace and every nested Hash/Set `Dict` hash consistently.
pub struct Db {
    pub keyspace: Dict<Vec<u8>, Value>,
    pub expires: ExpireIndex,
    pub hash_key: SipHashKey,
    pub max_list_size: usize,
}

impl Db {
    pub fn new(max_list_size: usize) -> Self {
        let hash_key = SipHashKey::generate();
        Self {
            keyspace: Dict::with_hash_key(hash_key.clone()),
            expires: ExpireIndex::with_hash_key(hash_key.clone()),
            hash_key,
            max_list_size,
        }
    }

    /// Looks a key up, evicting it first if its TTL has already elapsed.
    /// This is the lazy-expiry half of §4.7 (the active sweep in §4.8/§4.9
    /// is the other half).
    pub fn get(
        &mut self,
        key: &[u8],
    ) -> Option<&Value> {
        if self.check_expired(key) {
            return None;
        }
        self.keyspace.get(key)
    }

    pub fn get_mut(
        &mut self,
        key: &[u8],
    ) -> Option<&mut Value> {
        if self.check_expired(key) {
            return None;
        }
        self.keyspace.get_mut(key)
    }

    pub fn contains_key(
        &mut self,
        key: &[u8],
    ) -> bool {
        self.get(key).is_some()
    }

    /// Overwrites (or creates) `key` with `value`, clearing any existing
    /// TTL (§3, "overwrite without TTL" removes the expiry entry).
    pub fn set(
        &mut self,
        key: Vec<u8>,
        value: Value,
    ) {
        self.expires.remove(&key);
        self.keyspace.insert(key, value);
    }

    /// Same as `set` but preserves an existing TTL (used by commands that
    /// mutate a value in place, e.g. APPEND, HSET).
    pub fn set_keep_ttl(
        &mut self,
        key: Vec<u8>,
        value: Value,
    ) {
        self.keyspace.insert(key, value);
    }

    pub fn remove(
        &mut self,
        key: &[u8],
    ) -> bool {
        self.expires.remove(key);
        self.keyspace.remove(key)
    }

    pub fn flush_all(&mut self) {
        self.keyspace.clear();
        self.expires = ExpireIndex::with_hash_key(self.hash_key.clone());
    }

    pub fn set_expiry(
        &mut self,
        key: &[u8],
        deadline_ms: i64,
    ) {
        self.expires.set(key.to_vec(), deadline_ms);
    }

    pub fn persist(
        &mut self,
        key: &[u8],
    ) -> bool {
        self.expires.remove(key)
    }

    pub fn ttl_ms(
        &mut self,
        key: &[u8],
    ) -> Option<i64> {
        if self.check_expired(key) {
            return None;
        }
        if !self.keyspace.contains_key(key) {
            return None;
        }
        self.expires.deadline(key).map(|d| d - ExpireIndex::now_ms())
    }

    /// If `key` has an elapsed deadline, evicts it from both the keyspace
    /// and the expiry index and returns `true`.
    fn check_expired(
        &mut self,
        key: &[u8],
    ) -> bool {
        let now = ExpireIndex::now_ms();
        if self.expires.is_expired(key, now) {
            self.expires.remove(key);
            self.keyspace.remove(key);
            true
        } else {
            false
        }
    }

    /// Runs one bounded maintenance pass: sweeps expired keys (§4.7) and
    /// advances incremental rehashing on the keyspace dict (§4.2, §4.8
    /// "server_cron"). Driven by the event loop's periodic time event.
    pub fn run_maintenance_tick(&mut self) {
        let now = ExpireIndex::now_ms();
        for key in self.expires.sweep(now) {
            self.keyspace.remove(&key);
        }
        self.keyspace.rehash_milliseconds(1);
    }
}
