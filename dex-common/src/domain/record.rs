use crate::domain::{Dex, EventType};

/// A trade, liquidity, mint or burn event projected from a decoded block bundle.
///
/// ```text
/// CREATE TABLE chain_event (
///     event_id_hash  INT         NOT NULL,
///     event_id       BIGINT      NOT NULL,
///     event_type     SMALLINT    NOT NULL,
///     dex            SMALLINT    NOT NULL,
///     user_wallet    VARCHAR(64) NOT NULL,
///     to_wallet      VARCHAR(64) NOT NULL,
///     pool_address   VARCHAR(64) NOT NULL,
///     token          VARCHAR(64) NOT NULL,
///     quote_token     VARCHAR(64) NOT NULL,
///     token_amount    VARCHAR(32) NOT NULL,
///     quote_amount    VARCHAR(32) NOT NULL,
///     volume_usd      DOUBLE      NOT NULL,
///     price_usd       DOUBLE      NOT NULL,
///     tx_hash         VARCHAR(96) NOT NULL,
///     signer          VARCHAR(64) NOT NULL,
///     block_time      INT         NOT NULL,
///     create_at       INT         NOT NULL,
///     PRIMARY KEY (event_id_hash, event_id)
/// )
/// ```
// `ChainEvent`/`Pool` carry `Dex`/`EventType` columns, which don't implement
// `sqlx::Type` — those two records are row-mapped by hand in
// `dex_query::infra::storage::postgres` instead of via `#[derive(sqlx::FromRow)]`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChainEvent {
    pub event_id_hash: i32,
    pub event_id: i64,
    #[serde(with = "crate::domain::event_type")]
    pub event_type: EventType,
    #[serde(with = "crate::domain::dex")]
    pub dex: Dex,
    pub user_wallet: String,
    pub to_wallet: String,
    pub pool_address: String,
    pub token: String,
    pub quote_token: String,
    pub token_amount: String,
    pub quote_amount: String,
    pub volume_usd: f64,
    pub price_usd: f64,
    pub tx_hash: String,
    pub signer: String,
    pub block_time: i32,
    pub create_at: i32,
}

/// A plain token transfer, decoupled from `chain_event` so wallet histories don't have
/// to scan trade/liquidity rows to find incidental transfers.
///
/// ```text
/// CREATE TABLE transfer_event (
///     event_id_hash INT         NOT NULL,
///     event_id      BIGINT      NOT NULL,
///     from_wallet   VARCHAR(64) NOT NULL,
///     to_wallet     VARCHAR(64) NOT NULL,
///     token         VARCHAR(64) NOT NULL,
///     amount        VARCHAR(32) NOT NULL,
///     decimals      SMALLINT    NOT NULL,
///     tx_hash       VARCHAR(96) NOT NULL,
///     signer        VARCHAR(64) NOT NULL,
///     block_time    INT         NOT NULL,
///     create_at     INT         NOT NULL,
///     PRIMARY KEY (event_id_hash, event_id)
/// )
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct TransferEvent {
    pub event_id_hash: i32,
    pub event_id: i64,
    pub from_wallet: String,
    pub to_wallet: String,
    pub token: String,
    pub amount: String,
    pub decimals: i16,
    pub tx_hash: String,
    pub signer: String,
    pub block_time: i32,
    pub create_at: i32,
}

/// A liquidity pool, keyed by `(pool_address, token_account, quote_account)` — a single
/// pool address can appear more than once if its token accounts were migrated, which is
/// why the primary key includes the accounts rather than just the pool address.
///
/// ```text
/// CREATE TABLE pool (
///     pool_address  VARCHAR(64) NOT NULL,
///     dex           SMALLINT    NOT NULL,
///     token_address VARCHAR(64) NOT NULL,
///     quote_address VARCHAR(64) NOT NULL,
///     token_account VARCHAR(64) NOT NULL,
///     quote_account VARCHAR(64) NOT NULL,
///     account_key   BIGINT      NOT NULL,
///     create_at     INT         NOT NULL,
///     update_at     INT         NOT NULL,
///     PRIMARY KEY (pool_address, token_account, quote_account)
/// )
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Pool {
    // see the comment on `ChainEvent` above — row-mapped by hand on the query side.
    pub pool_address: String,
    #[serde(with = "crate::domain::dex")]
    pub dex: Dex,
    pub token_address: String,
    pub quote_address: String,
    pub token_account: String,
    pub quote_account: String,
    /// Non-zero only for [`Dex::uses_account_key`] dexes; see the pool dedup cache.
    pub account_key: i64,
    pub create_at: i32,
    pub update_at: i32,
}

/// A wallet's current balance of a token, upserted in place rather than appended —
/// `balance` is a point-in-time snapshot, not a ledger.
///
/// ```text
/// CREATE TABLE balance (
///     account_address VARCHAR(64) NOT NULL PRIMARY KEY,
///     owner_address    VARCHAR(64) NOT NULL,
///     token_address    VARCHAR(64) NOT NULL,
///     balance          VARCHAR(32) NOT NULL,
///     last_event_id    BIGINT      NOT NULL
/// )
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct Balance {
    pub account_address: String,
    pub owner_address: String,
    pub token_address: String,
    pub balance: String,
    pub last_event_id: i64,
}

impl Balance {
    /// A zero balance means the token account was closed; it is deleted rather than
    /// kept as a zero row.
    pub fn is_zero(&self) -> bool {
        self.balance == "0"
    }
}

/// A token's mint metadata, inserted once at creation and occasionally updated
/// (off-chain metadata backfills) thereafter.
///
/// ```text
/// CREATE TABLE token (
///     token_address VARCHAR(64) NOT NULL PRIMARY KEY,
///     decimals      SMALLINT    NOT NULL,
///     source        SMALLINT    NOT NULL,
///     total_supply  VARCHAR(32) NOT NULL,
///     name          VARCHAR(64) NOT NULL,
///     symbol        VARCHAR(32) NOT NULL,
///     uri           VARCHAR(256) NOT NULL,
///     creator       VARCHAR(64) NOT NULL,
///     create_at     INT         NOT NULL,
///     update_at     INT         NOT NULL
/// )
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct Token {
    pub token_address: String,
    pub decimals: i16,
    pub source: i16,
    pub total_supply: String,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub creator: String,
    pub create_at: i32,
    pub update_at: i32,
    /// `true` routes this row through the insert-only path, `false` through update.
    pub is_creating: bool,
}
