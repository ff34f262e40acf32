//! Read-side storage seam. Distinct from `dex_ingest::domain::storage::Storage`
//! (write-oriented) the same way the teacher keeps `indexer-api`'s read storage trait
//! separate from `chain-indexer`'s write storage trait despite both ultimately backing
//! onto the same Postgres database.

use dex_common::{Balance, ChainEvent, EventType, Pool, TransferEvent};

/// A pool row together with the `pool_address` it was looked up by, since
/// `QueryPoolsByAddresses` returns potentially several rows (one per
/// `(token_account, quote_account)` pair) per input address.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolsForAddress {
    pub pool_address: String,
    pub pools: Vec<Pool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    From,
    To,
}

#[trait_variant::make(Send)]
pub trait QueryStorage {
    /// Returns one entry per input account, `None` where no row exists — callers
    /// rebuild the by-input-order response from this.
    async fn fetch_balances_by_accounts(
        &self,
        accounts: &[String],
    ) -> Result<Vec<Option<Balance>>, sqlx::Error>;

    async fn fetch_balances_by_owner(
        &self,
        owner_address: &str,
        token_address: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Balance>, sqlx::Error>;

    async fn fetch_holder_count(&self, token_address: &str) -> Result<u64, sqlx::Error>;

    /// Ordered descending by balance, truncated to `fetch_limit` (the caller has
    /// already applied the over-fetch factor).
    async fn fetch_top_holders(
        &self,
        token_address: &str,
        fetch_limit: u32,
    ) -> Result<Vec<Balance>, sqlx::Error>;

    /// Returns one entry per `(event_id_hash, event_id)` pair, `None` where absent.
    async fn fetch_events_by_ids(
        &self,
        ids: &[(i32, i64)],
    ) -> Result<Vec<Option<ChainEvent>>, sqlx::Error>;

    async fn fetch_events_by_user(
        &self,
        user_wallet: &str,
        event_types: Option<&[EventType]>,
        cursor: Option<i64>,
        limit: u32,
    ) -> Result<Vec<ChainEvent>, sqlx::Error>;

    async fn fetch_events_by_pool(
        &self,
        pool_address: &str,
        event_types: &[EventType],
        cursor: Option<i64>,
        limit: u32,
    ) -> Result<Vec<ChainEvent>, sqlx::Error>;

    async fn fetch_pools_by_addresses(
        &self,
        pool_addresses: &[String],
    ) -> Result<Vec<PoolsForAddress>, sqlx::Error>;

    async fn fetch_pools_by_token(
        &self,
        base_token: &str,
        quote_token: Option<&str>,
    ) -> Result<Vec<Pool>, sqlx::Error>;

    async fn fetch_transfer_events(
        &self,
        user_wallet: &str,
        direction: TransferDirection,
        cursor: Option<i64>,
        limit: u32,
    ) -> Result<Vec<TransferEvent>, sqlx::Error>;
}
