//! End-to-end round trip: write through `dex-ingest`'s `PostgresStorage`, read back
//! through `dex-query`'s `PostgresQueryStorage` and `QueryHandlers`, against a real
//! Postgres container rather than the in-memory fakes the unit tests use.

use dex_common::domain::{Balance, ChainEvent, Dex, EventType, Pool, TransferEvent};
use dex_ingest::domain::storage::Storage;
use dex_ingest::infra::storage::postgres::PostgresStorage;
use dex_query::domain::handlers::QueryHandlers;
use dex_query::infra::storage::postgres::PostgresQueryStorage;

fn sample_chain_event(event_id: i64, pool_address: &str, user_wallet: &str) -> ChainEvent {
    ChainEvent {
        event_id_hash: 1,
        event_id,
        event_type: EventType::Trade,
        dex: Dex::RaydiumAmm,
        user_wallet: user_wallet.to_string(),
        to_wallet: "".to_string(),
        pool_address: pool_address.to_string(),
        token: "tokenA".to_string(),
        quote_token: "tokenB".to_string(),
        token_amount: "1000".to_string(),
        quote_amount: "2000".to_string(),
        volume_usd: 123.45,
        price_usd: 2.0,
        tx_hash: format!("tx{event_id}"),
        signer: user_wallet.to_string(),
        block_time: 1_700_000_000,
        create_at: 1_700_000_001,
    }
}

#[tokio::test]
async fn writes_a_chain_event_and_reads_it_back_by_pool() -> anyhow::Result<()> {
    let db = dex_tests::TestDb::start().await?;
    let ingest_storage = PostgresStorage::new(db.pool.clone());
    let query_storage = PostgresQueryStorage::new(db.pool.clone());
    let handlers = QueryHandlers::new(query_storage);

    let event = sample_chain_event(1, "pool-1", "wallet-1");
    ingest_storage.insert_chain_events(std::slice::from_ref(&event)).await?;

    let page = handlers.query_events_by_pool("pool-1", None, None, Some(10)).await?;
    assert_eq!(page.len(), 1);
    assert_eq!(page[0], event);

    Ok(())
}

#[tokio::test]
async fn events_by_pool_are_cursor_paginated_newest_first() -> anyhow::Result<()> {
    let db = dex_tests::TestDb::start().await?;
    let ingest_storage = PostgresStorage::new(db.pool.clone());
    let query_storage = PostgresQueryStorage::new(db.pool.clone());
    let handlers = QueryHandlers::new(query_storage);

    let events: Vec<ChainEvent> =
        (1..=5).map(|id| sample_chain_event(id, "pool-1", "wallet-1")).collect();
    ingest_storage.insert_chain_events(&events).await?;

    let first_page = handlers.query_events_by_pool("pool-1", None, None, Some(2)).await?;
    assert_eq!(first_page.iter().map(|e| e.event_id).collect::<Vec<_>>(), vec![5, 4]);

    let cursor = first_page.last().unwrap().event_id;
    let second_page = handlers.query_events_by_pool("pool-1", None, Some(cursor), Some(2)).await?;
    assert_eq!(second_page.iter().map(|e| e.event_id).collect::<Vec<_>>(), vec![3, 2]);

    Ok(())
}

#[tokio::test]
async fn balances_round_trip_and_support_holder_queries() -> anyhow::Result<()> {
    let db = dex_tests::TestDb::start().await?;
    let ingest_storage = PostgresStorage::new(db.pool.clone());
    let query_storage = PostgresQueryStorage::new(db.pool.clone());
    let handlers = QueryHandlers::new(query_storage);

    let balances = vec![
        Balance {
            account_address: "acct-1".to_string(),
            owner_address: "owner-1".to_string(),
            token_address: "token-x".to_string(),
            balance: "500".to_string(),
            last_event_id: 1,
        },
        Balance {
            account_address: "acct-2".to_string(),
            owner_address: "owner-2".to_string(),
            token_address: "token-x".to_string(),
            balance: "1500".to_string(),
            last_event_id: 1,
        },
        Balance {
            account_address: "acct-3".to_string(),
            owner_address: "owner-3".to_string(),
            token_address: "token-x".to_string(),
            balance: "0".to_string(),
            last_event_id: 1,
        },
    ];
    ingest_storage.upsert_balances(&balances).await?;

    let fetched = handlers
        .query_balances_by_accounts(&["acct-1".to_string(), "acct-missing".to_string()])
        .await?;
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched[0].as_ref().unwrap().balance, "500");
    assert!(fetched[1].is_none());

    let holder_count = handlers.query_holder_count_by_token("token-x").await?;
    assert_eq!(holder_count, 2, "zero-balance account must not count as a holder");

    let top = handlers.query_top_holders_by_token("token-x", Some(10)).await?;
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].owner_address, "owner-2");
    assert_eq!(top[0].balance, 1500);

    Ok(())
}

#[tokio::test]
async fn pools_round_trip_by_address_and_by_token() -> anyhow::Result<()> {
    let db = dex_tests::TestDb::start().await?;
    let ingest_storage = PostgresStorage::new(db.pool.clone());
    let query_storage = PostgresQueryStorage::new(db.pool.clone());
    let handlers = QueryHandlers::new(query_storage);

    let pool = Pool {
        pool_address: "pool-1".to_string(),
        dex: Dex::OrcaWhirlpool,
        token_address: "token-x".to_string(),
        quote_address: "token-y".to_string(),
        token_account: "ta-1".to_string(),
        quote_account: "qa-1".to_string(),
        account_key: 42,
        create_at: 1,
        update_at: 1,
    };
    ingest_storage.upsert_pools_with_create_at(std::slice::from_ref(&pool)).await?;

    let by_address = handlers.query_pools_by_addresses(&["pool-1".to_string()]).await?;
    assert_eq!(by_address.len(), 1);
    assert_eq!(by_address[0].pool_address, "pool-1");
    assert_eq!(by_address[0].pools, vec![pool.clone()]);

    let by_token = handlers.query_pools_by_token("token-x", None).await?;
    assert_eq!(by_token, vec![pool]);

    Ok(())
}

#[tokio::test]
async fn transfer_events_round_trip_by_direction() -> anyhow::Result<()> {
    let db = dex_tests::TestDb::start().await?;
    let ingest_storage = PostgresStorage::new(db.pool.clone());
    let query_storage = PostgresQueryStorage::new(db.pool.clone());
    let handlers = QueryHandlers::new(query_storage);

    let transfer = TransferEvent {
        event_id_hash: 2,
        event_id: 100,
        from_wallet: "wallet-a".to_string(),
        to_wallet: "wallet-b".to_string(),
        token: "token-x".to_string(),
        amount: "10".to_string(),
        decimals: 6,
        tx_hash: "tx-transfer".to_string(),
        signer: "wallet-a".to_string(),
        block_time: 1_700_000_002,
        create_at: 1_700_000_003,
    };
    ingest_storage.insert_transfer_events(std::slice::from_ref(&transfer)).await?;

    use dex_query::domain::handlers::TransferQueryType;

    let sent =
        handlers.query_transfer_events("wallet-a", TransferQueryType::FromWallet, None, Some(10)).await?;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event_type, EventType::Transfer);
    assert_eq!(sent[0].tx_hash, "tx-transfer");

    let received =
        handlers.query_transfer_events("wallet-b", TransferQueryType::ToWallet, None, Some(10)).await?;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].tx_hash, "tx-transfer");

    let not_a_recipient =
        handlers.query_transfer_events("wallet-a", TransferQueryType::ToWallet, None, Some(10)).await?;
    assert!(not_a_recipient.is_empty());

    Ok(())
}

#[tokio::test]
async fn deleted_balances_are_removed_and_last_event_ids_are_fetchable() -> anyhow::Result<()> {
    let db = dex_tests::TestDb::start().await?;
    let ingest_storage = PostgresStorage::new(db.pool.clone());

    let balance = Balance {
        account_address: "acct-1".to_string(),
        owner_address: "owner-1".to_string(),
        token_address: "token-x".to_string(),
        balance: "500".to_string(),
        last_event_id: 7,
    };
    ingest_storage.upsert_balances(std::slice::from_ref(&balance)).await?;

    let last_ids = ingest_storage.fetch_last_event_ids(&["acct-1".to_string()]).await?;
    assert_eq!(last_ids, vec![("acct-1".to_string(), 7)]);

    ingest_storage.delete_balances(&["acct-1".to_string()]).await?;
    let after_delete = ingest_storage.fetch_last_event_ids(&["acct-1".to_string()]).await?;
    assert!(after_delete.is_empty());

    Ok(())
}
