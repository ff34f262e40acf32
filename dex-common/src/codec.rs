//! Encoding helpers shared between ingestion and query: base58 address codecs with
//! well-known-token folding, the event id hash used for shard routing, and signer
//! selection.

mod base58;
mod event_id_hash;
mod token_id;

pub use base58::{
    Base58Cache, decode_address, encode_address_optional, encode_address_strict, encode_bytes,
};
pub use event_id_hash::event_id_hash;
pub use token_id::{decode_token_address, encode_token_address};

/// Picks the signer to record for an event: an empty first signer means the fee payer
/// is the user's own wallet, in which case no explicit signer is recorded.
///
/// # Panics
///
/// Panics if `signers` is empty; every decoded event carries at least one signer.
pub fn select_signer<'a>(signers: &'a [Vec<u8>], user_wallet: &[u8]) -> Option<&'a [u8]> {
    let first = signers.first().expect("signers must not be empty");
    if first.as_slice() == user_wallet {
        None
    } else {
        Some(first.as_slice())
    }
}
