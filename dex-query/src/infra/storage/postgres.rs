//! Postgres-backed [`QueryStorage`]. Same `indoc!`/`QueryBuilder` idiom as
//! `dex_ingest::infra::storage::postgres`, grounded on the same teacher file
//! (`chain-indexer::infra::storage::postgres`) but on the read side.
//!
//! `ChainEvent` and `Pool` carry `Dex`/`EventType` columns that don't implement
//! `sqlx::Type`, so those two are row-mapped by hand via `sqlx::Row` rather than
//! `sqlx::query_as`; `Balance` and `TransferEvent` have no enum columns and use their
//! `#[derive(sqlx::FromRow)]` directly.

use std::collections::HashMap;

use dex_common::domain::{Balance, ChainEvent, Dex, EventType, Pool, TransferEvent};
use dex_common::infra::pool::postgres::PostgresPool;
use indoc::indoc;
use sqlx::{QueryBuilder, Row, postgres::PgRow};

use crate::domain::storage::{PoolsForAddress, QueryStorage, TransferDirection};

#[derive(Clone)]
pub struct PostgresQueryStorage {
    pool: PostgresPool,
}

impl PostgresQueryStorage {
    pub fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }
}

fn chain_event_from_row(row: &PgRow) -> Result<ChainEvent, sqlx::Error> {
    let event_type_raw: i16 = row.try_get("event_type")?;
    let dex_raw: i16 = row.try_get("dex")?;
    Ok(ChainEvent {
        event_id_hash: row.try_get("event_id_hash")?,
        event_id: row.try_get("event_id")?,
        event_type: EventType::from_i16(event_type_raw).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown event_type discriminant {event_type_raw}").into())
        })?,
        dex: Dex::from_i16(dex_raw),
        user_wallet: row.try_get("user_wallet")?,
        to_wallet: row.try_get("to_wallet")?,
        pool_address: row.try_get("pool_address")?,
        token: row.try_get("token")?,
        quote_token: row.try_get("quote_token")?,
        token_amount: row.try_get("token_amount")?,
        quote_amount: row.try_get("quote_amount")?,
        volume_usd: row.try_get("volume_usd")?,
        price_usd: row.try_get("price_usd")?,
        tx_hash: row.try_get("tx_hash")?,
        signer: row.try_get("signer")?,
        block_time: row.try_get("block_time")?,
        create_at: row.try_get("create_at")?,
    })
}

fn pool_from_row(row: &PgRow) -> Result<Pool, sqlx::Error> {
    let dex_raw: i16 = row.try_get("dex")?;
    Ok(Pool {
        pool_address: row.try_get("pool_address")?,
        dex: Dex::from_i16(dex_raw),
        token_address: row.try_get("token_address")?,
        quote_address: row.try_get("quote_address")?,
        token_account: row.try_get("token_account")?,
        quote_account: row.try_get("quote_account")?,
        account_key: row.try_get("account_key")?,
        create_at: row.try_get("create_at")?,
        update_at: row.try_get("update_at")?,
    })
}

const CHAIN_EVENT_COLUMNS: &str = indoc! {"
    event_id_hash, event_id, event_type, dex, user_wallet, to_wallet,
    pool_address, token, quote_token, token_amount, quote_amount,
    volume_usd, price_usd, tx_hash, signer, block_time, create_at
"};

const POOL_COLUMNS: &str = indoc! {"
    pool_address, dex, token_address, quote_address, token_account,
    quote_account, account_key, create_at, update_at
"};

impl QueryStorage for PostgresQueryStorage {
    async fn fetch_balances_by_accounts(
        &self,
        accounts: &[String],
    ) -> Result<Vec<Option<Balance>>, sqlx::Error> {
        if accounts.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<Balance> = sqlx::query_as(indoc! {"
            SELECT account_address, owner_address, token_address, balance, last_event_id
            FROM balance
            WHERE account_address = ANY($1)
        "})
        .bind(accounts)
        .fetch_all(&*self.pool)
        .await?;

        let by_account: HashMap<&str, &Balance> =
            rows.iter().map(|b| (b.account_address.as_str(), b)).collect();
        Ok(accounts.iter().map(|a| by_account.get(a.as_str()).map(|b| (*b).clone())).collect())
    }

    async fn fetch_balances_by_owner(
        &self,
        owner_address: &str,
        token_address: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Balance>, sqlx::Error> {
        let mut query = QueryBuilder::new(indoc! {"
            SELECT account_address, owner_address, token_address, balance, last_event_id
            FROM balance
            WHERE owner_address =
        "});
        query.push_bind(owner_address);
        if let Some(token) = token_address {
            query.push(" AND token_address = ");
            query.push_bind(token);
        }
        query.push(" ORDER BY account_address LIMIT ");
        query.push_bind(limit as i64);

        query.build_query_as().fetch_all(&*self.pool).await
    }

    async fn fetch_holder_count(&self, token_address: &str) -> Result<u64, sqlx::Error> {
        let row = sqlx::query(indoc! {"
            SELECT COUNT(*) AS count FROM balance WHERE token_address = $1 AND balance <> '0'
        "})
        .bind(token_address)
        .fetch_one(&*self.pool)
        .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count as u64)
    }

    async fn fetch_top_holders(
        &self,
        token_address: &str,
        fetch_limit: u32,
    ) -> Result<Vec<Balance>, sqlx::Error> {
        sqlx::query_as(indoc! {"
            SELECT account_address, owner_address, token_address, balance, last_event_id
            FROM balance
            WHERE token_address = $1
            ORDER BY balance::numeric DESC
            LIMIT $2
        "})
        .bind(token_address)
        .bind(fetch_limit as i64)
        .fetch_all(&*self.pool)
        .await
    }

    async fn fetch_events_by_ids(
        &self,
        ids: &[(i32, i64)],
    ) -> Result<Vec<Option<ChainEvent>>, sqlx::Error> {
        let mut results = Vec::with_capacity(ids.len());
        for &(hash, id) in ids {
            let query = format!(
                "SELECT {CHAIN_EVENT_COLUMNS} FROM chain_event WHERE event_id_hash = $1 AND event_id = $2"
            );
            let row = sqlx::query(&query).bind(hash).bind(id).fetch_optional(&*self.pool).await?;
            results.push(row.as_ref().map(chain_event_from_row).transpose()?);
        }
        Ok(results)
    }

    async fn fetch_events_by_user(
        &self,
        user_wallet: &str,
        event_types: Option<&[EventType]>,
        cursor: Option<i64>,
        limit: u32,
    ) -> Result<Vec<ChainEvent>, sqlx::Error> {
        let mut query = QueryBuilder::new(format!(
            "SELECT {CHAIN_EVENT_COLUMNS} FROM chain_event WHERE user_wallet = "
        ));
        query.push_bind(user_wallet);

        if let Some(types) = event_types {
            let discriminants: Vec<i16> = types.iter().map(|t| t.as_i16()).collect();
            query.push(" AND event_type = ANY(");
            query.push_bind(discriminants);
            query.push(")");
        }
        if let Some(cursor) = cursor {
            query.push(" AND event_id < ");
            query.push_bind(cursor);
        }
        query.push(" ORDER BY event_id DESC LIMIT ");
        query.push_bind(limit as i64);

        let rows = query.build().fetch_all(&*self.pool).await?;
        rows.iter().map(chain_event_from_row).collect()
    }

    async fn fetch_events_by_pool(
        &self,
        pool_address: &str,
        event_types: &[EventType],
        cursor: Option<i64>,
        limit: u32,
    ) -> Result<Vec<ChainEvent>, sqlx::Error> {
        let mut query = QueryBuilder::new(format!(
            "SELECT {CHAIN_EVENT_COLUMNS} FROM chain_event WHERE pool_address = "
        ));
        query.push_bind(pool_address);

        if !event_types.is_empty() {
            let discriminants: Vec<i16> = event_types.iter().map(|t| t.as_i16()).collect();
            query.push(" AND event_type = ANY(");
            query.push_bind(discriminants);
            query.push(")");
        }
        if let Some(cursor) = cursor {
            query.push(" AND event_id < ");
            query.push_bind(cursor);
        }
        query.push(" ORDER BY event_id DESC LIMIT ");
        query.push_bind(limit as i64);

        let rows = query.build().fetch_all(&*self.pool).await?;
        rows.iter().map(chain_event_from_row).collect()
    }

    async fn fetch_pools_by_addresses(
        &self,
        pool_addresses: &[String],
    ) -> Result<Vec<PoolsForAddress>, sqlx::Error> {
        if pool_addresses.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!("SELECT {POOL_COLUMNS} FROM pool WHERE pool_address = ANY($1)");
        let rows = sqlx::query(&query).bind(pool_addresses).fetch_all(&*self.pool).await?;
        let pools = rows.iter().map(pool_from_row).collect::<Result<Vec<Pool>, _>>()?;

        let mut by_address: HashMap<&str, Vec<Pool>> = HashMap::new();
        for pool in &pools {
            by_address.entry(pool.pool_address.as_str()).or_default().push(pool.clone());
        }

        Ok(pool_addresses
            .iter()
            .map(|address| PoolsForAddress {
                pool_address: address.clone(),
                pools: by_address.get(address.as_str()).cloned().unwrap_or_default(),
            })
            .collect())
    }

    async fn fetch_pools_by_token(
        &self,
        base_token: &str,
        quote_token: Option<&str>,
    ) -> Result<Vec<Pool>, sqlx::Error> {
        let mut query =
            QueryBuilder::new(format!("SELECT {POOL_COLUMNS} FROM pool WHERE token_address = "));
        query.push_bind(base_token);
        if let Some(quote) = quote_token {
            query.push(" AND quote_address = ");
            query.push_bind(quote);
        }
        query.push(" ORDER BY pool_address");

        let rows = query.build().fetch_all(&*self.pool).await?;
        rows.iter().map(pool_from_row).collect()
    }

    async fn fetch_transfer_events(
        &self,
        user_wallet: &str,
        direction: TransferDirection,
        cursor: Option<i64>,
        limit: u32,
    ) -> Result<Vec<TransferEvent>, sqlx::Error> {
        let column = match direction {
            TransferDirection::From => "from_wallet",
            TransferDirection::To => "to_wallet",
        };

        let mut query = QueryBuilder::new(indoc! {"
            SELECT event_id_hash, event_id, from_wallet, to_wallet, token, amount,
                decimals, tx_hash, signer, block_time, create_at
            FROM transfer_event
            WHERE
        "});
        query.push(column);
        query.push(" = ");
        query.push_bind(user_wallet);

        if let Some(cursor) = cursor {
            query.push(" AND event_id < ");
            query.push_bind(cursor);
        }
        query.push(" ORDER BY event_id DESC LIMIT ");
        query.push_bind(limit as i64);

        query.build_query_as().fetch_all(&*self.pool).await
    }
}
