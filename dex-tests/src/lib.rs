//! Shared test scaffolding for cross-crate integration tests: spins up a real Postgres
//! container and creates the five tables from `SPEC_FULL.md` §6's DDL sketches, the way
//! `indexer_common::infra::migrations::postgres`'s own tests start a
//! `testcontainers_modules::postgres::Postgres` container rather than mocking the store.

use std::time::Duration;

use anyhow::Context;
use dex_common::infra::pool::postgres::{Config, PostgresPool};
use sqlx::postgres::PgSslMode;

const SCHEMA: &str = r#"
CREATE TABLE chain_event (
    event_id_hash INT NOT NULL,
    event_id BIGINT NOT NULL,
    event_type SMALLINT NOT NULL,
    dex SMALLINT NOT NULL,
    user_wallet VARCHAR(64) NOT NULL,
    to_wallet VARCHAR(64) NOT NULL,
    pool_address VARCHAR(64) NOT NULL,
    token VARCHAR(64) NOT NULL,
    quote_token VARCHAR(64) NOT NULL,
    token_amount VARCHAR(32) NOT NULL,
    quote_amount VARCHAR(32) NOT NULL,
    volume_usd DOUBLE PRECISION NOT NULL,
    price_usd DOUBLE PRECISION NOT NULL,
    tx_hash VARCHAR(96) NOT NULL,
    signer VARCHAR(64) NOT NULL,
    block_time INT NOT NULL,
    create_at INT NOT NULL,
    PRIMARY KEY (event_id_hash, event_id)
);

CREATE TABLE transfer_event (
    event_id_hash INT NOT NULL,
    event_id BIGINT NOT NULL,
    from_wallet VARCHAR(64) NOT NULL,
    to_wallet VARCHAR(64) NOT NULL,
    token VARCHAR(64) NOT NULL,
    amount VARCHAR(32) NOT NULL,
    decimals SMALLINT NOT NULL,
    tx_hash VARCHAR(96) NOT NULL,
    signer VARCHAR(64) NOT NULL,
    block_time INT NOT NULL,
    create_at INT NOT NULL,
    PRIMARY KEY (event_id_hash, event_id)
);

CREATE TABLE pool (
    pool_address VARCHAR(64) NOT NULL,
    dex SMALLINT NOT NULL,
    token_address VARCHAR(64) NOT NULL,
    quote_address VARCHAR(64) NOT NULL,
    token_account VARCHAR(64) NOT NULL,
    quote_account VARCHAR(64) NOT NULL,
    account_key BIGINT NOT NULL,
    create_at INT NOT NULL,
    update_at INT NOT NULL,
    PRIMARY KEY (pool_address, token_account, quote_account)
);

CREATE TABLE balance (
    account_address VARCHAR(64) NOT NULL PRIMARY KEY,
    owner_address VARCHAR(64) NOT NULL,
    token_address VARCHAR(64) NOT NULL,
    balance VARCHAR(32) NOT NULL,
    last_event_id BIGINT NOT NULL
);

CREATE TABLE token (
    token_address VARCHAR(64) NOT NULL PRIMARY KEY,
    decimals SMALLINT NOT NULL,
    source SMALLINT NOT NULL,
    total_supply VARCHAR(32) NOT NULL,
    name VARCHAR(64) NOT NULL,
    symbol VARCHAR(32) NOT NULL,
    uri VARCHAR(256) NOT NULL,
    creator VARCHAR(64) NOT NULL,
    create_at INT NOT NULL,
    update_at INT NOT NULL
);
"#;

pub struct TestDb {
    pub pool: PostgresPool,
    _container: testcontainers::ContainerAsync<testcontainers_modules::postgres::Postgres>,
}

impl TestDb {
    pub async fn start() -> anyhow::Result<Self> {
        use testcontainers::ImageExt;
        use testcontainers::runners::AsyncRunner;
        use testcontainers_modules::postgres::Postgres;

        let container = Postgres::default()
            .with_db_name("dex")
            .with_user("dex")
            .with_password("dex")
            .with_tag("17.1-alpine")
            .start()
            .await
            .context("start Postgres container")?;
        let port = container.get_host_port_ipv4(5432).await.context("get Postgres port")?;

        let config = Config {
            host: "localhost".to_string(),
            port,
            dbname: "dex".to_string(),
            user: "dex".to_string(),
            password: "dex".into(),
            sslmode: PgSslMode::Prefer,
            max_connections: 10,
            idle_timeout: Duration::from_secs(60),
            max_lifetime: Duration::from_secs(5 * 60),
        };
        let pool = PostgresPool::new(config).await.context("create Postgres pool")?;

        sqlx::raw_sql(SCHEMA).execute(&*pool).await.context("create schema")?;

        Ok(Self { pool, _container: container })
    }
}
