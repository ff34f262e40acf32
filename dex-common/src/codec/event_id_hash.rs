use xxhash_rust::xxh64::xxh64;

/// Derives the shard/partition hash for an event id.
///
/// Hashes the little-endian bytes of `event_id` with xxhash64, then samples four
/// non-contiguous byte lanes out of the 64-bit digest into a 31-bit (always
/// non-negative) `i32`. The specific bit offsets are load-bearing: they are what every
/// existing partition assignment was computed with, so changing them would silently
/// re-shard all previously ingested events.
pub fn event_id_hash(event_id: u64) -> i32 {
    let digest = xxh64(&event_id.to_le_bytes(), 0);
    let hash = ((digest >> 55) & 0x7F) << 24
        | ((digest >> 45) & 0xFF) << 16
        | ((digest >> 34) & 0xFF) << 8
        | ((digest >> 3) & 0xFF);
    hash as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic() {
        assert_eq!(event_id_hash(42), event_id_hash(42));
    }

    #[test]
    fn is_always_non_negative() {
        for id in [0u64, 1, 42, u64::MAX, u64::MAX / 2] {
            assert!(event_id_hash(id) >= 0);
        }
    }

    #[test]
    fn differs_across_inputs() {
        assert_ne!(event_id_hash(1), event_id_hash(2));
    }
}
