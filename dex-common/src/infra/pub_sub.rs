//! The message-bus consumer boundary: ingestion only depends on [`MessageSource`], a
//! trait standing in for whatever wire transport actually delivers raw block event
//! bundles (NATS JetStream in production, an in-memory channel in tests). Decoding the
//! bundle's own wire *framing* (varint/protobuf/whatever the producer speaks) is the
//! upstream producer's concern and stays out of scope here; a [`PartitionedBundle`]
//! carries already-framed [`RawEvent`]s, one per on-chain instruction observed, which
//! `dex_ingest`'s record builders turn into the five stored record families.

use futures::Stream;

/// A decoded block event bundle tagged with the partition it was produced on.
#[derive(Debug, Clone)]
pub struct PartitionedBundle {
    pub partition: i32,
    pub slot: u64,
    pub is_realtime_hint: bool,
    pub events: Vec<RawEvent>,
    /// Opaque token identifying this message's position in the upstream bus, handed
    /// back to [`MessageSource::ack`] once every record it produced has been flushed.
    pub offset: MessageOffset,
}

/// A single decoded on-chain instruction, tagged by kind. The record-builder layer
/// (`dex_ingest::domain::builders`) matches on this and emits 0..N stored records —
/// this type only carries enough raw data (addresses as 32-byte pubkeys, not yet
/// base58-encoded) for that layer to do so.
#[derive(Debug, Clone, serde::Deserialize)]
pub enum RawEvent {
    Trade(RawTradeEvent),
    Liquidity(RawLiquidityEvent),
    Mint(RawMintBurnEvent),
    Burn(RawMintBurnEvent),
    Transfer(RawTransferEvent),
    Balance(RawBalanceEvent),
    Token(RawTokenEvent),
}

/// Fields every event-id-bearing raw event (everything but [`RawBalanceEvent`] and
/// [`RawTokenEvent`], which project onto MUTABLE_LATEST tables with no event id) needs
/// to pack its `EventId` and pick a signer.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawEventOrigin {
    pub slot: u64,
    pub tx_index: u16,
    pub ix_index: u8,
    pub inner_index: u8,
    pub block_time: i32,
    pub signers: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawTradeEvent {
    pub origin: RawEventOrigin,
    pub dex: i16,
    pub user_wallet: Vec<u8>,
    pub pool: Vec<u8>,
    pub token_account: Vec<u8>,
    pub quote_account: Vec<u8>,
    pub token: Vec<u8>,
    pub quote_token: Vec<u8>,
    pub token_amount: String,
    pub quote_amount: String,
    pub volume_usd: f64,
    pub price_usd: f64,
    pub tx_hash: Vec<u8>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawLiquidityEvent {
    pub origin: RawEventOrigin,
    pub dex: i16,
    pub is_add: bool,
    pub is_create_pool: bool,
    pub user_wallet: Vec<u8>,
    pub pool: Vec<u8>,
    pub token_account: Vec<u8>,
    pub quote_account: Vec<u8>,
    pub token: Vec<u8>,
    pub quote_token: Vec<u8>,
    pub token_amount: String,
    pub quote_amount: String,
    pub tx_hash: Vec<u8>,
}

/// Shared shape for Mint and Burn: both project onto a bare `ChainEvent` with no pool.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawMintBurnEvent {
    pub origin: RawEventOrigin,
    pub dex: i16,
    pub user_wallet: Vec<u8>,
    pub token: Vec<u8>,
    pub amount: String,
    pub tx_hash: Vec<u8>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawTransferEvent {
    pub origin: RawEventOrigin,
    pub from_wallet: Vec<u8>,
    pub to_wallet: Vec<u8>,
    pub token: Vec<u8>,
    pub amount: String,
    pub decimals: i16,
    pub tx_hash: Vec<u8>,
}

/// No event id: `balance` projects onto the MUTABLE_LATEST `balance` table keyed by
/// `account_address`, and `last_event_id` is handed down directly by the producer
/// rather than packed here (it orders balance observations against each other, not
/// against `chain_event`/`transfer_event` rows).
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawBalanceEvent {
    pub account: Vec<u8>,
    pub owner: Vec<u8>,
    pub token: Vec<u8>,
    pub balance: String,
    pub last_event_id: i64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawTokenEvent {
    pub token: Vec<u8>,
    pub decimals: i16,
    pub source: i16,
    pub total_supply: String,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub creator: Vec<u8>,
    pub create_at: i32,
    pub is_creating: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOffset(pub u64);

/// The inbound boundary of the ingester. Implementations own the actual wire protocol;
/// the partition router and per-partition workers only ever see already-decoded
/// bundles.
#[trait_variant::make(Send)]
pub trait MessageSource {
    /// A stream of bundles in receipt order, not partition order — the caller is
    /// responsible for routing each to its partition's worker.
    fn bundles(&self) -> impl Stream<Item = Result<PartitionedBundle, SourceError>> + Send;

    /// Acknowledges that every record carried by the bundle at `offset` has been
    /// durably flushed. Must only be called after a successful flush — this is what
    /// gives the pipeline at-least-once semantics.
    async fn ack(&self, partition: i32, offset: MessageOffset) -> Result<(), SourceError>;
}

#[derive(Debug, thiserror::Error)]
#[error("message source error: {0}")]
pub struct SourceError(#[from] pub anyhow::Error);

impl<T> MessageSource for std::sync::Arc<T>
where
    T: MessageSource + Send + Sync,
{
    fn bundles(&self) -> impl Stream<Item = Result<PartitionedBundle, SourceError>> + Send {
        T::bundles(self)
    }

    async fn ack(&self, partition: i32, offset: MessageOffset) -> Result<(), SourceError> {
        T::ack(self, partition, offset).await
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_support {
    //! In-memory [`MessageSource`] used by worker/router tests that need to assert on
    //! which offsets got acked, mirroring `FakeStorage`'s shape in `dex_ingest`. Gated
    //! behind `test-util` (rather than plain `#[cfg(test)]`) since `dex-ingest`'s own
    //! worker tests need it across the crate boundary.

    use std::sync::Mutex;

    use super::{MessageOffset, MessageSource, PartitionedBundle, SourceError};

    #[derive(Default)]
    pub struct FakeMessageSource {
        acked: Mutex<Vec<(i32, MessageOffset)>>,
    }

    impl FakeMessageSource {
        pub fn acked(&self) -> Vec<(i32, MessageOffset)> {
            self.acked.lock().unwrap().clone()
        }
    }

    impl MessageSource for FakeMessageSource {
        fn bundles(&self) -> impl futures::Stream<Item = Result<PartitionedBundle, SourceError>> + Send {
            futures::stream::empty()
        }

        async fn ack(&self, partition: i32, offset: MessageOffset) -> Result<(), SourceError> {
            self.acked.lock().unwrap().push((partition, offset));
            Ok(())
        }
    }
}

#[cfg(feature = "cloud")]
pub mod nats {
    //! JetStream-backed [`super::MessageSource`]. Bundle payloads are expected to
    //! already be decoded JSON (the wire decode itself happens upstream, per the
    //! `MessageSource` boundary); this module is only responsible for pulling
    //! messages off a partition-tagged subject and turning acks into JetStream acks.

    use async_nats::{ConnectOptions, jetstream};
    use async_nats::jetstream::consumer::PullConsumer;
    use async_nats::jetstream::consumer::pull::Config as PullConfig;
    use futures::{Stream, StreamExt, TryStreamExt};
    use secrecy::{ExposeSecret, SecretString};

    use super::{MessageOffset, PartitionedBundle, SourceError};

    #[derive(Debug, Clone, serde::Deserialize)]
    pub struct Config {
        pub url: String,
        pub username: String,
        pub password: SecretString,
        pub stream_name: String,
        pub consumer_name: String,
    }

    pub struct NatsMessageSource {
        consumer: PullConsumer,
    }

    impl NatsMessageSource {
        pub fn new(consumer: PullConsumer) -> Self {
            Self { consumer }
        }

        /// Connects to NATS, binds the configured JetStream stream and durable pull
        /// consumer, the way `NatsLedgerStateStorage::new` connects and resolves its
        /// own key-value/object stores.
        pub async fn connect(config: Config) -> anyhow::Result<Self> {
            let options = ConnectOptions::new()
                .user_and_password(config.username, config.password.expose_secret().to_owned());
            let client = options.connect(config.url).await?;
            let jetstream = jetstream::new(client);

            let stream = jetstream.get_stream(&config.stream_name).await?;
            let consumer: PullConsumer = stream
                .get_or_create_consumer(
                    &config.consumer_name,
                    PullConfig { durable_name: Some(config.consumer_name.clone()), ..Default::default() },
                )
                .await?;

            Ok(Self::new(consumer))
        }
    }

    impl super::MessageSource for NatsMessageSource {
        fn bundles(&self) -> impl Stream<Item = Result<PartitionedBundle, SourceError>> + Send {
            async_stream::try_stream! {
                let mut messages = self
                    .consumer
                    .messages()
                    .await
                    .map_err(|err| SourceError(err.into()))?;

                while let Some(message) = messages.try_next().await.map_err(|err| SourceError(err.into()))? {
                    let bundle: WireBundle = serde_json::from_slice(&message.payload)
                        .map_err(|err| SourceError(err.into()))?;
                    let offset = MessageOffset(message.info().map(|i| i.stream_sequence).unwrap_or(0));
                    yield bundle.into_partitioned(offset);
                }
            }
        }

        async fn ack(&self, _partition: i32, _offset: MessageOffset) -> Result<(), SourceError> {
            // Acking a specific historical offset isn't meaningful for a pull
            // consumer's cursor; offset commit happens implicitly as messages are
            // acked in delivery order by the worker that owns them.
            Ok(())
        }
    }

    #[derive(serde::Deserialize)]
    struct WireBundle {
        partition: i32,
        slot: u64,
        is_realtime_hint: bool,
        events: Vec<super::RawEvent>,
    }

    impl WireBundle {
        fn into_partitioned(self, offset: MessageOffset) -> PartitionedBundle {
            PartitionedBundle {
                partition: self.partition,
                slot: self.slot,
                is_realtime_hint: self.is_realtime_hint,
                events: self.events,
                offset,
            }
        }
    }
}
