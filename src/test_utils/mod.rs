//! Helpers for building deterministic chains in tests.

use bitcoin::absolute::LockTime;
use bitcoin::block::{Header, Version};
use bitcoin::hashes::Hash;
use bitcoin::transaction;
use bitcoin::{Block, BlockHash, CompactTarget, Transaction, TxMerkleNode};

use crate::chain::ChainState;
use crate::config::Settings;
use crate::event_bus::EventStream;
use crate::events::Event;
use crate::store::{ArchiveItem, MemoryStore, Store};
use crate::types::Link;

/// Regtest-style maximum target; one unit of work per header.
pub const EASY_BITS: u32 = 0x207f_ffff;

/// A quarter of the easy target; four units of work per header.
pub const STRONG_BITS: u32 = 0x201f_ffff;

/// Build a header extending `prev`. The nonce keeps sibling headers
/// distinct; no proof of work is ground.
pub fn header(prev: BlockHash, bits: u32, nonce: u32) -> Header {
    header_with_time(prev, bits, 1, nonce)
}

/// Build a header extending `prev` with an explicit timestamp.
pub fn header_with_time(prev: BlockHash, bits: u32, time: u32, nonce: u32) -> Header {
    Header {
        version: Version::ONE,
        prev_blockhash: prev,
        merkle_root: TxMerkleNode::all_zeros(),
        time,
        bits: CompactTarget::from_consensus(bits),
        nonce,
    }
}

/// Build a block with a single empty coinbase-like transaction and a
/// matching merkle commitment.
pub fn block_with_coinbase(prev: BlockHash, bits: u32, time: u32, nonce: u32) -> Block {
    let coinbase = Transaction {
        version: transaction::Version::ONE,
        lock_time: LockTime::ZERO,
        input: Vec::new(),
        output: Vec::new(),
    };
    let merkle_root = TxMerkleNode::from_raw_hash(coinbase.compute_txid().to_raw_hash());
    let mut header = header_with_time(prev, bits, time, nonce);
    header.merkle_root = merkle_root;
    Block {
        header,
        txdata: vec![coinbase],
    }
}

/// Seed a genesis store with `headers` as the candidate chain, in order.
/// Returns the store and the links pushed, genesis first.
pub async fn seeded_store(settings: &Settings, headers: &[Header]) -> (MemoryStore, Vec<Link>) {
    let mut store = MemoryStore::with_genesis(settings);
    let genesis_hash = settings.genesis_header().block_hash();
    let mut links = vec![store.to_header(&genesis_hash).await.unwrap().unwrap()];

    let mut state = ChainState::genesis(&settings.genesis_header(), settings);
    for header in headers {
        assert_eq!(header.prev_blockhash, state.hash(), "seed chain must link");
        state = state.advance(header, settings);
        let link = store
            .set_link(ArchiveItem::Header(header), &state)
            .await
            .unwrap();
        store.push_candidate(link).await.unwrap();
        links.push(link);
    }
    (store, links)
}

/// Build a linked chain of `count` headers from `prev`, all at `bits`.
pub fn chain(prev: BlockHash, bits: u32, count: usize, nonce_base: u32) -> Vec<Header> {
    let mut headers = Vec::with_capacity(count);
    let mut parent = prev;
    for offset in 0..count {
        let next = header(parent, bits, nonce_base + offset as u32);
        parent = next.block_hash();
        headers.push(next);
    }
    headers
}

/// Drain all queued events from a subscription.
pub fn drain(events: &mut EventStream) -> Vec<Event> {
    let mut drained = Vec::new();
    while let Some(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
