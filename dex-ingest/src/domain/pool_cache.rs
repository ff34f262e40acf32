//! Pool dedup cache: before writing a pool row, ingestion checks whether this exact
//! `(pool, account_key)` identity has been seen recently so repeated trade events on
//! the same pool don't pile up redundant writer work. Grounded on
//! `internal/ingest/handler/pool_cache.go`'s `PoolCache`.

use std::num::NonZeroUsize;

use dex_common::domain::Dex;
use lru::LruCache;
use xxhash_rust::xxh64::xxh64;

const DEFAULT_CAPACITY: usize = 50_000;

/// `pool_address` (32 bytes) followed by the little-endian `account_key` (8 bytes).
type PoolKey = [u8; 40];

pub struct PoolDedupCache {
    seen: LruCache<PoolKey, ()>,
}

impl PoolDedupCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self { seen: LruCache::new(capacity) }
    }

    /// Computes this pool's `account_key` and records the `(pool, account_key)` pair as
    /// seen, returning `(account_key, already_seen)`. Workers use `already_seen` to
    /// skip redundant upserts within the dedup window.
    pub fn check_and_insert(
        &mut self,
        pool: &[u8; 32],
        token_account: &[u8; 32],
        quote_account: &[u8; 32],
        dex: Dex,
    ) -> (i64, bool) {
        let account_key = account_key(token_account, quote_account, dex);

        let mut key = [0u8; 40];
        key[..32].copy_from_slice(pool);
        key[32..].copy_from_slice(&account_key.to_le_bytes());

        let already_seen = self.seen.put(key, ()).is_some();
        (account_key, already_seen)
    }
}

impl Default for PoolDedupCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Only CLMM/DLMM/Whirlpool-family pools carry a meaningful `account_key`; every other
/// dex leaves it at zero, since their `(pool_address, token_account, quote_account)`
/// triple is already a stable identity without it.
fn account_key(token_account: &[u8; 32], quote_account: &[u8; 32], dex: Dex) -> i64 {
    if !dex.uses_account_key() {
        return 0;
    }

    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(token_account);
    buf.extend_from_slice(quote_account);
    let hash = xxh64(&buf, 0);
    (hash & 0x7FFF_FFFF_FFFF_FFFF) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_account_key_dex_always_yields_zero() {
        let mut cache = PoolDedupCache::new();
        let (key, _) = cache.check_and_insert(&[1; 32], &[2; 32], &[3; 32], Dex::RaydiumAmm);
        assert_eq!(key, 0);
    }

    #[test]
    fn account_key_dex_yields_non_zero_and_is_non_negative() {
        let mut cache = PoolDedupCache::new();
        let (key, _) = cache.check_and_insert(&[1; 32], &[2; 32], &[3; 32], Dex::RaydiumClmm);
        assert!(key >= 0);
        assert_ne!(key, 0);
    }

    #[test]
    fn second_insert_of_same_identity_reports_already_seen() {
        let mut cache = PoolDedupCache::new();
        let (_, first) = cache.check_and_insert(&[1; 32], &[2; 32], &[3; 32], Dex::MeteoraDlmm);
        let (_, second) = cache.check_and_insert(&[1; 32], &[2; 32], &[3; 32], Dex::MeteoraDlmm);
        assert!(!first);
        assert!(second);
    }

    #[test]
    fn different_pool_is_not_seen() {
        let mut cache = PoolDedupCache::new();
        cache.check_and_insert(&[1; 32], &[2; 32], &[3; 32], Dex::OrcaWhirlpool);
        let (_, seen) = cache.check_and_insert(&[9; 32], &[2; 32], &[3; 32], Dex::OrcaWhirlpool);
        assert!(!seen);
    }
}
