//! Postgres-backed [`Storage`]. Grounded on
//! `chain_indexer::infra::storage::postgres`'s use of `sqlx::QueryBuilder::push_values`
//! and `indoc!`-formatted SQL; conflict handling uses Postgres `ON CONFLICT` where the
//! original MySQL-flavored source used `ON DUPLICATE KEY`.

use dex_common::domain::{Balance, ChainEvent, Pool, Token, TransferEvent};
use dex_common::infra::pool::postgres::PostgresPool;
use indoc::indoc;
use sqlx::QueryBuilder;

use crate::domain::storage::Storage;

#[derive(Clone)]
pub struct PostgresStorage {
    pool: PostgresPool,
}

impl PostgresStorage {
    pub fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }
}

impl Storage for PostgresStorage {
    async fn insert_chain_events(&self, events: &[ChainEvent]) -> Result<(), sqlx::Error> {
        if events.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::new(indoc! {"
            INSERT INTO chain_event (
                event_id_hash, event_id, event_type, dex, user_wallet, to_wallet,
                pool_address, token, quote_token, token_amount, quote_amount,
                volume_usd, price_usd, tx_hash, signer, block_time, create_at
            )
        "});

        query.push_values(events, |mut b, e| {
            b.push_bind(e.event_id_hash)
                .push_bind(e.event_id)
                .push_bind(e.event_type.as_i16())
                .push_bind(e.dex.as_i16())
                .push_bind(&e.user_wallet)
                .push_bind(&e.to_wallet)
                .push_bind(&e.pool_address)
                .push_bind(&e.token)
                .push_bind(&e.quote_token)
                .push_bind(&e.token_amount)
                .push_bind(&e.quote_amount)
                .push_bind(e.volume_usd)
                .push_bind(e.price_usd)
                .push_bind(&e.tx_hash)
                .push_bind(&e.signer)
                .push_bind(e.block_time)
                .push_bind(e.create_at);
        });
        query.push(" ON CONFLICT (event_id_hash, event_id) DO NOTHING");

        query.build().execute(&*self.pool).await?;
        Ok(())
    }

    async fn insert_transfer_events(&self, events: &[TransferEvent]) -> Result<(), sqlx::Error> {
        if events.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::new(indoc! {"
            INSERT INTO transfer_event (
                event_id_hash, event_id, from_wallet, to_wallet, token, amount,
                decimals, tx_hash, signer, block_time, create_at
            )
        "});

        query.push_values(events, |mut b, e| {
            b.push_bind(e.event_id_hash)
                .push_bind(e.event_id)
                .push_bind(&e.from_wallet)
                .push_bind(&e.to_wallet)
                .push_bind(&e.token)
                .push_bind(&e.amount)
                .push_bind(e.decimals)
                .push_bind(&e.tx_hash)
                .push_bind(&e.signer)
                .push_bind(e.block_time)
                .push_bind(e.create_at);
        });
        query.push(" ON CONFLICT (event_id_hash, event_id) DO NOTHING");

        query.build().execute(&*self.pool).await?;
        Ok(())
    }

    async fn upsert_pools_with_create_at(&self, pools: &[Pool]) -> Result<(), sqlx::Error> {
        if pools.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::new(indoc! {"
            INSERT INTO pool (
                pool_address, dex, token_address, quote_address, token_account,
                quote_account, account_key, create_at, update_at
            )
        "});

        push_pool_values(&mut query, pools);
        query.push(indoc! {"
             ON CONFLICT (pool_address, token_account, quote_account) DO UPDATE SET
                dex = EXCLUDED.dex,
                token_address = EXCLUDED.token_address,
                quote_address = EXCLUDED.quote_address,
                account_key = EXCLUDED.account_key,
                create_at = EXCLUDED.create_at,
                update_at = EXCLUDED.update_at
        "});

        query.build().execute(&*self.pool).await?;
        Ok(())
    }

    async fn upsert_pools_without_create_at(&self, pools: &[Pool]) -> Result<(), sqlx::Error> {
        if pools.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::new(indoc! {"
            INSERT INTO pool (
                pool_address, dex, token_address, quote_address, token_account,
                quote_account, account_key, create_at, update_at
            )
        "});

        push_pool_values(&mut query, pools);
        query.push(indoc! {"
             ON CONFLICT (pool_address, token_account, quote_account) DO UPDATE SET
                dex = EXCLUDED.dex,
                token_address = EXCLUDED.token_address,
                quote_address = EXCLUDED.quote_address,
                account_key = EXCLUDED.account_key,
                update_at = EXCLUDED.update_at
        "});

        query.build().execute(&*self.pool).await?;
        Ok(())
    }

    async fn insert_tokens(&self, tokens: &[Token]) -> Result<(), sqlx::Error> {
        if tokens.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::new(indoc! {"
            INSERT INTO token (
                token_address, decimals, source, total_supply, name, symbol, uri,
                creator, create_at, update_at
            )
        "});

        push_token_values(&mut query, tokens);
        query.push(" ON CONFLICT (token_address) DO NOTHING");

        query.build().execute(&*self.pool).await?;
        Ok(())
    }

    async fn update_tokens(&self, tokens: &[Token]) -> Result<(), sqlx::Error> {
        if tokens.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::new(indoc! {"
            INSERT INTO token (
                token_address, decimals, source, total_supply, name, symbol, uri,
                creator, create_at, update_at
            )
        "});

        push_token_values(&mut query, tokens);
        query.push(indoc! {"
             ON CONFLICT (token_address) DO UPDATE SET
                decimals = EXCLUDED.decimals,
                source = EXCLUDED.source,
                total_supply = EXCLUDED.total_supply,
                name = EXCLUDED.name,
                symbol = EXCLUDED.symbol,
                uri = EXCLUDED.uri,
                creator = EXCLUDED.creator,
                update_at = EXCLUDED.update_at
        "});

        query.build().execute(&*self.pool).await?;
        Ok(())
    }

    async fn upsert_balances(&self, balances: &[Balance]) -> Result<(), sqlx::Error> {
        if balances.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::new(indoc! {"
            INSERT INTO balance (
                account_address, owner_address, token_address, balance, last_event_id
            )
        "});

        query.push_values(balances, |mut b, bal| {
            b.push_bind(&bal.account_address)
                .push_bind(&bal.owner_address)
                .push_bind(&bal.token_address)
                .push_bind(&bal.balance)
                .push_bind(bal.last_event_id);
        });
        query.push(indoc! {"
             ON CONFLICT (account_address) DO UPDATE SET
                owner_address = EXCLUDED.owner_address,
                token_address = EXCLUDED.token_address,
                balance = EXCLUDED.balance,
                last_event_id = EXCLUDED.last_event_id
        "});

        query.build().execute(&*self.pool).await?;
        Ok(())
    }

    async fn delete_balances(&self, account_addresses: &[String]) -> Result<(), sqlx::Error> {
        if account_addresses.is_empty() {
            return Ok(());
        }

        sqlx::query("DELETE FROM balance WHERE account_address = ANY($1)")
            .bind(account_addresses)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    async fn fetch_last_event_ids(
        &self,
        account_addresses: &[String],
    ) -> Result<Vec<(String, i64)>, sqlx::Error> {
        if account_addresses.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as(indoc! {"
            SELECT account_address, last_event_id
            FROM balance
            WHERE account_address = ANY($1)
        "})
        .bind(account_addresses)
        .fetch_all(&*self.pool)
        .await
    }
}

fn push_pool_values<'a>(query: &mut QueryBuilder<'a, sqlx::Postgres>, pools: &'a [Pool]) {
    query.push_values(pools, |mut b, p| {
        b.push_bind(&p.pool_address)
            .push_bind(p.dex.as_i16())
            .push_bind(&p.token_address)
            .push_bind(&p.quote_address)
            .push_bind(&p.token_account)
            .push_bind(&p.quote_account)
            .push_bind(p.account_key)
            .push_bind(p.create_at)
            .push_bind(p.update_at);
    });
}

fn push_token_values<'a>(query: &mut QueryBuilder<'a, sqlx::Postgres>, tokens: &'a [Token]) {
    query.push_values(tokens, |mut b, t| {
        b.push_bind(&t.token_address)
            .push_bind(t.decimals)
            .push_bind(t.source)
            .push_bind(&t.total_supply)
            .push_bind(&t.name)
            .push_bind(&t.symbol)
            .push_bind(&t.uri)
            .push_bind(&t.creator)
            .push_bind(t.create_at)
            .push_bind(t.update_at);
    });
}
