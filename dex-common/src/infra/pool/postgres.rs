use std::ops::Deref;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

/// Thin wrapper around `sqlx::PgPool`, deref-ing to it so call sites read exactly like
/// they would against a bare `PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPool(sqlx::PgPool);

impl PostgresPool {
    pub async fn new(config: Config) -> Result<Self, sqlx::Error> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.dbname)
            .username(&config.user)
            .password(config.password.expose_secret())
            .ssl_mode(config.sslmode);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect_with(options)
            .await?;

        Ok(Self(pool))
    }
}

impl Deref for PostgresPool {
    type Target = sqlx::PgPool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: SecretString,
    #[serde(default = "default_sslmode", with = "sslmode_serde")]
    pub sslmode: PgSslMode,
    pub max_connections: u32,
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub max_lifetime: Duration,
}

fn default_sslmode() -> PgSslMode {
    PgSslMode::Prefer
}

mod sslmode_serde {
    use serde::{Deserialize, Deserializer};
    use sqlx::postgres::PgSslMode;
    use std::str::FromStr;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<PgSslMode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PgSslMode::from_str(&s).map_err(serde::de::Error::custom)
    }
}
