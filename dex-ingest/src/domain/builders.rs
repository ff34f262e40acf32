//! Record builders: a single pass over a decoded bundle's raw events, turning each into
//! 0..N of the five stored record families. Grounded on `internal/ingest/handler/build.go`'s
//! `BuildRecords` switch over the decoded event union.
//!
//! Owns the per-worker state the build pass needs: a [`Base58Cache`] for address
//! encoding and a [`PoolDedupCache`] so repeated trade/liquidity events on the same pool
//! don't re-emit a pool record every time. Both persist across the worker's lifetime,
//! not per-bundle — a fresh [`RecordBuilder`] is created once in `worker::run`.

use dex_common::codec::{Base58Cache, encode_address_strict, encode_bytes, select_signer};
use dex_common::domain::{Balance, ChainEvent, Dex, EventId, EventType, Pool, Token, TransferEvent};
use dex_common::infra::pub_sub::{
    RawBalanceEvent, RawEvent, RawEventOrigin, RawLiquidityEvent, RawMintBurnEvent, RawTokenEvent,
    RawTradeEvent, RawTransferEvent,
};

use crate::domain::pool_cache::PoolDedupCache;

/// Records produced from one bundle's worth of raw events, ready to be folded into the
/// worker's [`BlockBatch`](crate::domain::batch::BlockBatch).
#[derive(Debug, Default)]
pub struct BuiltRecords {
    pub chain_events: Vec<ChainEvent>,
    pub transfer_events: Vec<TransferEvent>,
    pub pools: Vec<Pool>,
    pub tokens: Vec<Token>,
    pub balances: Vec<Balance>,
}

pub struct RecordBuilder {
    base58: Base58Cache,
    pool_cache: PoolDedupCache,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self { base58: Base58Cache::new(), pool_cache: PoolDedupCache::new() }
    }

    pub fn build(&mut self, events: Vec<RawEvent>) -> BuiltRecords {
        let mut out = BuiltRecords::default();
        for event in events {
            self.build_one(event, &mut out);
        }
        out
    }

    fn build_one(&mut self, event: RawEvent, out: &mut BuiltRecords) {
        match event {
            RawEvent::Trade(event) => self.build_trade(event, out),
            RawEvent::Liquidity(event) => self.build_liquidity(event, out),
            RawEvent::Mint(event) => out.chain_events.push(self.build_mint_burn(event, EventType::Mint)),
            RawEvent::Burn(event) => out.chain_events.push(self.build_mint_burn(event, EventType::Burn)),
            RawEvent::Transfer(event) => out.transfer_events.push(self.build_transfer(event)),
            RawEvent::Balance(event) => out.balances.push(self.build_balance(event)),
            RawEvent::Token(event) => out.tokens.push(self.build_token(event)),
        }
    }

    fn build_trade(&mut self, event: RawTradeEvent, out: &mut BuiltRecords) {
        let dex = Dex::from_i16(event.dex);
        let (event_id, event_id_hash, signer) =
            self.event_identity(&event.origin, &event.user_wallet);

        out.chain_events.push(ChainEvent {
            event_id_hash,
            event_id,
            event_type: EventType::Trade,
            dex,
            user_wallet: encode_address_strict(&self.base58, &event.user_wallet),
            to_wallet: String::new(),
            pool_address: encode_address_strict(&self.base58, &event.pool),
            token: encode_address_strict(&self.base58, &event.token),
            quote_token: encode_address_strict(&self.base58, &event.quote_token),
            token_amount: event.token_amount,
            quote_amount: event.quote_amount,
            volume_usd: event.volume_usd,
            price_usd: event.price_usd,
            tx_hash: encode_bytes(&event.tx_hash),
            signer,
            block_time: event.origin.block_time,
            create_at: 0,
        });

        self.emit_pool_if_unseen(
            &event.pool,
            &event.token_account,
            &event.quote_account,
            dex,
            &event.token,
            &event.quote_token,
            0,
            out,
        );
    }

    fn build_liquidity(&mut self, event: RawLiquidityEvent, out: &mut BuiltRecords) {
        let dex = Dex::from_i16(event.dex);
        let event_type = if event.is_add { EventType::AddLiquidity } else { EventType::RemoveLiquidity };
        let (event_id, event_id_hash, signer) =
            self.event_identity(&event.origin, &event.user_wallet);

        out.chain_events.push(ChainEvent {
            event_id_hash,
            event_id,
            event_type,
            dex,
            user_wallet: encode_address_strict(&self.base58, &event.user_wallet),
            to_wallet: String::new(),
            pool_address: encode_address_strict(&self.base58, &event.pool),
            token: encode_address_strict(&self.base58, &event.token),
            quote_token: encode_address_strict(&self.base58, &event.quote_token),
            token_amount: event.token_amount,
            quote_amount: event.quote_amount,
            volume_usd: 0.0,
            price_usd: 0.0,
            tx_hash: encode_bytes(&event.tx_hash),
            signer,
            block_time: event.origin.block_time,
            create_at: 0,
        });

        let create_at = if event.is_create_pool { event.origin.block_time } else { 0 };
        self.emit_pool_if_unseen(
            &event.pool,
            &event.token_account,
            &event.quote_account,
            dex,
            &event.token,
            &event.quote_token,
            create_at,
            out,
        );
    }

    fn build_mint_burn(&mut self, event: RawMintBurnEvent, event_type: EventType) -> ChainEvent {
        let dex = Dex::from_i16(event.dex);
        let (event_id, event_id_hash, signer) =
            self.event_identity(&event.origin, &event.user_wallet);

        ChainEvent {
            event_id_hash,
            event_id,
            event_type,
            dex,
            user_wallet: encode_address_strict(&self.base58, &event.user_wallet),
            to_wallet: String::new(),
            pool_address: String::new(),
            token: encode_address_strict(&self.base58, &event.token),
            quote_token: String::new(),
            token_amount: event.amount,
            quote_amount: "0".to_string(),
            volume_usd: 0.0,
            price_usd: 0.0,
            tx_hash: encode_bytes(&event.tx_hash),
            signer,
            block_time: event.origin.block_time,
            create_at: 0,
        }
    }

    fn build_transfer(&mut self, event: RawTransferEvent) -> TransferEvent {
        let (event_id, event_id_hash, signer) =
            self.event_identity(&event.origin, &event.from_wallet);

        TransferEvent {
            event_id_hash,
            event_id,
            from_wallet: encode_address_strict(&self.base58, &event.from_wallet),
            to_wallet: encode_address_strict(&self.base58, &event.to_wallet),
            token: encode_address_strict(&self.base58, &event.token),
            amount: event.amount,
            decimals: event.decimals,
            tx_hash: encode_bytes(&event.tx_hash),
            signer,
            block_time: event.origin.block_time,
            create_at: 0,
        }
    }

    fn build_balance(&mut self, event: RawBalanceEvent) -> Balance {
        Balance {
            account_address: encode_address_strict(&self.base58, &event.account),
            owner_address: encode_address_strict(&self.base58, &event.owner),
            token_address: encode_address_strict(&self.base58, &event.token),
            balance: event.balance,
            last_event_id: event.last_event_id,
        }
    }

    fn build_token(&mut self, event: RawTokenEvent) -> Token {
        Token {
            token_address: encode_address_strict(&self.base58, &event.token),
            decimals: event.decimals,
            source: event.source,
            total_supply: event.total_supply,
            name: event.name,
            symbol: event.symbol,
            uri: event.uri,
            creator: encode_address_strict(&self.base58, &event.creator),
            create_at: event.create_at,
            update_at: 0,
            is_creating: event.is_creating,
        }
    }

    /// Packs the event's `EventId`, derives its shard hash and picks the signer to
    /// record. Shared by every event-id-bearing variant.
    fn event_identity(&self, origin: &RawEventOrigin, actor_wallet: &[u8]) -> (i64, i32, String) {
        let event_id = EventId::pack(origin.slot, origin.tx_index, origin.ix_index, origin.inner_index);
        let signer = select_signer(&origin.signers, actor_wallet)
            .map(|signer| encode_address_strict(&self.base58, signer))
            .unwrap_or_default();
        (event_id.0 as i64, event_id.hash(), signer)
    }

    fn emit_pool_if_unseen(
        &mut self,
        pool: &[u8],
        token_account: &[u8],
        quote_account: &[u8],
        dex: Dex,
        token: &[u8],
        quote_token: &[u8],
        create_at: i32,
        out: &mut BuiltRecords,
    ) {
        let pool_array: [u8; 32] = pool.try_into().expect("pool address must be 32 bytes");
        let token_account_array: [u8; 32] =
            token_account.try_into().expect("token account must be 32 bytes");
        let quote_account_array: [u8; 32] =
            quote_account.try_into().expect("quote account must be 32 bytes");

        let (account_key, already_seen) =
            self.pool_cache.check_and_insert(&pool_array, &token_account_array, &quote_account_array, dex);
        if already_seen {
            return;
        }

        out.pools.push(Pool {
            pool_address: encode_address_strict(&self.base58, pool),
            dex,
            token_address: encode_address_strict(&self.base58, token),
            quote_address: encode_address_strict(&self.base58, quote_token),
            token_account: encode_address_strict(&self.base58, token_account),
            quote_account: encode_address_strict(&self.base58, quote_account),
            account_key,
            create_at,
            update_at: 0,
        });
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(slot: u64) -> RawEventOrigin {
        RawEventOrigin { slot, tx_index: 0, ix_index: 0, inner_index: 0, block_time: 1_700_000_000, signers: vec![vec![9u8; 32]] }
    }

    #[test]
    fn trade_emits_chain_event_and_pool_on_first_sight() {
        let mut builder = RecordBuilder::new();
        let event = RawTradeEvent {
            origin: origin(1),
            dex: Dex::RaydiumAmm.as_i16(),
            user_wallet: vec![1u8; 32],
            pool: vec![2u8; 32],
            token_account: vec![3u8; 32],
            quote_account: vec![4u8; 32],
            token: vec![5u8; 32],
            quote_token: vec![0u8; 32],
            token_amount: "100".into(),
            quote_amount: "200".into(),
            volume_usd: 1.0,
            price_usd: 2.0,
            tx_hash: vec![6u8; 64],
        };

        let built = builder.build(vec![RawEvent::Trade(event)]);
        assert_eq!(built.chain_events.len(), 1);
        assert_eq!(built.pools.len(), 1);
        assert_eq!(built.chain_events[0].event_type, EventType::Trade);
        assert_eq!(built.pools[0].quote_address, "0", "native SOL folds to its well-known short id");
        assert_eq!(built.chain_events[0].create_at, 0);
    }

    #[test]
    fn repeated_trade_on_the_same_pool_emits_no_second_pool_record() {
        let mut builder = RecordBuilder::new();
        let event = || RawTradeEvent {
            origin: origin(1),
            dex: Dex::RaydiumAmm.as_i16(),
            user_wallet: vec![1u8; 32],
            pool: vec![2u8; 32],
            token_account: vec![3u8; 32],
            quote_account: vec![4u8; 32],
            token: vec![5u8; 32],
            quote_token: vec![0u8; 32],
            token_amount: "1".into(),
            quote_amount: "1".into(),
            volume_usd: 0.0,
            price_usd: 0.0,
            tx_hash: vec![6u8; 64],
        };

        let first = builder.build(vec![RawEvent::Trade(event())]);
        let second = builder.build(vec![RawEvent::Trade(event())]);
        assert_eq!(first.pools.len(), 1);
        assert_eq!(second.pools.len(), 0);
    }

    #[test]
    fn create_pool_liquidity_stamps_create_at_from_block_time() {
        let mut builder = RecordBuilder::new();
        let event = RawLiquidityEvent {
            origin: origin(1),
            dex: Dex::OrcaWhirlpool.as_i16(),
            is_add: true,
            is_create_pool: true,
            user_wallet: vec![1u8; 32],
            pool: vec![2u8; 32],
            token_account: vec![3u8; 32],
            quote_account: vec![4u8; 32],
            token: vec![5u8; 32],
            quote_token: vec![6u8; 32],
            token_amount: "1".into(),
            quote_amount: "1".into(),
            tx_hash: vec![7u8; 64],
        };

        let built = builder.build(vec![RawEvent::Liquidity(event)]);
        assert_eq!(built.pools[0].create_at, 1_700_000_000);
        assert_ne!(built.pools[0].account_key, 0, "orca whirlpool pools carry a non-zero account_key");
    }

    #[test]
    fn non_create_pool_liquidity_leaves_create_at_zero() {
        let mut builder = RecordBuilder::new();
        let event = RawLiquidityEvent {
            origin: origin(1),
            dex: Dex::RaydiumAmm.as_i16(),
            is_add: false,
            is_create_pool: false,
            user_wallet: vec![1u8; 32],
            pool: vec![2u8; 32],
            token_account: vec![3u8; 32],
            quote_account: vec![4u8; 32],
            token: vec![5u8; 32],
            quote_token: vec![6u8; 32],
            token_amount: "1".into(),
            quote_amount: "1".into(),
            tx_hash: vec![7u8; 64],
        };

        let built = builder.build(vec![RawEvent::Liquidity(event)]);
        assert_eq!(built.chain_events[0].event_type, EventType::RemoveLiquidity);
        assert_eq!(built.pools[0].create_at, 0);
    }

    #[test]
    fn mint_and_burn_emit_chain_events_with_no_pool() {
        let mut builder = RecordBuilder::new();
        let event = RawMintBurnEvent {
            origin: origin(1),
            dex: Dex::PumpFun.as_i16(),
            user_wallet: vec![1u8; 32],
            token: vec![5u8; 32],
            amount: "42".into(),
            tx_hash: vec![7u8; 64],
        };

        let built = builder.build(vec![RawEvent::Mint(event)]);
        assert_eq!(built.chain_events.len(), 1);
        assert!(built.pools.is_empty());
        assert_eq!(built.chain_events[0].event_type, EventType::Mint);
        assert_eq!(built.chain_events[0].pool_address, "");
    }

    #[test]
    fn transfer_emits_only_a_transfer_event() {
        let mut builder = RecordBuilder::new();
        let event = RawTransferEvent {
            origin: origin(1),
            from_wallet: vec![1u8; 32],
            to_wallet: vec![2u8; 32],
            token: vec![5u8; 32],
            amount: "7".into(),
            decimals: 6,
            tx_hash: vec![7u8; 64],
        };

        let built = builder.build(vec![RawEvent::Transfer(event)]);
        assert_eq!(built.transfer_events.len(), 1);
        assert!(built.chain_events.is_empty());
    }

    #[test]
    fn signer_equal_to_actor_wallet_is_recorded_as_empty() {
        let mut builder = RecordBuilder::new();
        let wallet = vec![1u8; 32];
        let event = RawTransferEvent {
            origin: RawEventOrigin { signers: vec![wallet.clone()], ..origin(1) },
            from_wallet: wallet,
            to_wallet: vec![2u8; 32],
            token: vec![5u8; 32],
            amount: "7".into(),
            decimals: 6,
            tx_hash: vec![7u8; 64],
        };

        let built = builder.build(vec![RawEvent::Transfer(event)]);
        assert_eq!(built.transfer_events[0].signer, "");
    }

    #[test]
    fn balance_and_token_events_pass_through_with_well_known_folding() {
        let mut builder = RecordBuilder::new();
        let balance = RawBalanceEvent {
            account: vec![1u8; 32],
            owner: vec![2u8; 32],
            token: [0u8; 32].to_vec(),
            balance: "100".into(),
            last_event_id: 5,
        };
        let token = RawTokenEvent {
            token: vec![3u8; 32],
            decimals: 9,
            source: 1,
            total_supply: "1000000".into(),
            name: "Name".into(),
            symbol: "SYM".into(),
            uri: "https://example.invalid".into(),
            creator: vec![4u8; 32],
            create_at: 123,
            is_creating: true,
        };

        let built = builder.build(vec![RawEvent::Balance(balance), RawEvent::Token(token)]);
        assert_eq!(built.balances[0].token_address, "0");
        assert_eq!(built.tokens[0].is_creating, true);
    }
}
