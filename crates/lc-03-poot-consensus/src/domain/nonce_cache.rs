//! Replay guard for uptime beacon nonces.
//!
//! A nonce is remembered until its beacon expires; after that the beacon
//! window check rejects it anyway, so the entry can go.

use shared_crypto::Hash;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct NonceCache {
    /// nonce -> beacon expiry
    seen: HashMap<Hash, u64>,
}

impl NonceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `nonce`. Returns `false` if it is already live.
    pub fn check_and_insert(&mut self, nonce: Hash, expires_at: u64, now: u64) -> bool {
        match self.seen.get(&nonce) {
            Some(&expiry) if expiry >= now => false,
            _ => {
                self.seen.insert(nonce, expires_at);
                true
            }
        }
    }

    /// Drop nonces whose beacons have expired. Returns how many went.
    pub fn purge(&mut self, now: u64) -> usize {
        let before = self.seen.len();
        self.seen.retain(|_, expiry| *expiry >= now);
        before - self.seen.len()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_rejected_until_expiry() {
        let mut cache = NonceCache::new();
        assert!(cache.check_and_insert([1; 32], 500, 100));
        assert!(!cache.check_and_insert([1; 32], 500, 200));
        assert!(cache.check_and_insert([2; 32], 500, 200));
        // Expired entries no longer block
        assert!(cache.check_and_insert([1; 32], 900, 501));
    }

    #[test]
    fn test_purge() {
        let mut cache = NonceCache::new();
        cache.check_and_insert([1; 32], 100, 0);
        cache.check_and_insert([2; 32], 300, 0);
        assert_eq!(cache.purge(200), 1);
        assert_eq!(cache.len(), 1);
    }
}
