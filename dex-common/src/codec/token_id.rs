use std::sync::LazyLock;

const WSOL: &str = "So11111111111111111111111111111111111111112";
const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
const USDT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";

/// Reverse of [`crate::codec::encode_address_strict`]'s well-known folding, operating on
/// already-decoded base58 strings (as stored in the `token_address` column) rather than
/// raw bytes. Used on the query read path where rows carry the full mint string already.
static TOKEN_TO_ID: LazyLock<[(&str, &str); 3]> =
    LazyLock::new(|| [(WSOL, "1"), (USDC, "2"), (USDT, "3")]);

/// Folds a full token address string into its canonical short id, or returns it
/// unchanged if it is not one of the well-known tokens.
pub fn encode_token_address(address: &str) -> String {
    match TOKEN_TO_ID.iter().find(|(full, _)| *full == address) {
        Some((_, id)) => id.to_string(),
        None => address.to_string(),
    }
}

/// Expands a canonical short id back into its full token address string, or returns it
/// unchanged if it is not a recognized short id.
pub fn decode_token_address(id: &str) -> String {
    match TOKEN_TO_ID.iter().find(|(_, short)| *short == id) {
        Some((full, _)) => full.to_string(),
        None => id.to_string(),
    }
}
