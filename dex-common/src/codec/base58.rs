use std::sync::LazyLock;

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Native SOL is represented on the wire as 32 zero bytes.
const NATIVE_SOL: [u8; 32] = [0u8; 32];
/// Wrapped SOL mint: `So11111111111111111111111111111111111111112`.
const WSOL: &str = "So11111111111111111111111111111111111111112";
/// USDC mint: `EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v`.
const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
/// USDT mint: `Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB`.
const USDT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";

/// Default capacity of a per-worker [`Base58Cache`].
const DEFAULT_CAPACITY: usize = 20_000;

struct WellKnown {
    bytes: [u8; 32],
    id: &'static str,
}

static WELL_KNOWN: LazyLock<[WellKnown; 4]> = LazyLock::new(|| {
    [
        WellKnown { bytes: NATIVE_SOL, id: "0" },
        WellKnown { bytes: decode32(WSOL), id: "1" },
        WellKnown { bytes: decode32(USDC), id: "2" },
        WellKnown { bytes: decode32(USDT), id: "3" },
    ]
});

fn decode32(s: &str) -> [u8; 32] {
    let bytes = bs58::decode(s).into_vec().expect("valid base58 constant");
    bytes.try_into().expect("32-byte mint address")
}

/// Per-worker LRU cache folding well-known token addresses into short canonical ids and
/// memoizing base58 encodes of everything else.
///
/// A dedicated cache per partition worker keeps lock contention local; encodes never
/// cross partitions on the hot path.
pub struct Base58Cache {
    inner: Mutex<LruCache<[u8; 32], String>>,
}

impl Base58Cache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }
}

impl Default for Base58Cache {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes a 32-byte address, folding well-known token mints into their canonical short
/// id instead of a full base58 string.
///
/// # Panics
///
/// Panics if `bytes` is not exactly 32 bytes long.
pub fn encode_address_strict(cache: &Base58Cache, bytes: &[u8]) -> String {
    let array: [u8; 32] = bytes
        .try_into()
        .unwrap_or_else(|_| panic!("address must be 32 bytes, got {}", bytes.len()));

    if let Some(well_known) = WELL_KNOWN.iter().find(|w| w.bytes == array) {
        return well_known.id.to_string();
    }

    let mut cache = cache.inner.lock();
    if let Some(cached) = cache.get(&array) {
        return cached.clone();
    }

    let encoded = bs58::encode(&array).into_string();
    cache.put(array, encoded.clone());
    encoded
}

/// Like [`encode_address_strict`] but returns an empty string for an absent address
/// instead of panicking.
pub fn encode_address_optional(cache: &Base58Cache, bytes: Option<&[u8]>) -> String {
    match bytes {
        Some(bytes) => encode_address_strict(cache, bytes),
        None => String::new(),
    }
}

/// Plain base58 encoding with no well-known folding and no cache — used for fields that
/// aren't 32-byte mint addresses, such as transaction signatures.
pub fn encode_bytes(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Decodes a base58 address string back into its raw bytes, reversing the well-known
/// folding performed by [`encode_address_strict`].
pub fn decode_address(s: &str) -> Result<Vec<u8>, bs58::decode::Error> {
    if let Some(well_known) = WELL_KNOWN.iter().find(|w| w.id == s) {
        return Ok(well_known.bytes.to_vec());
    }
    bs58::decode(s).into_vec()
}
