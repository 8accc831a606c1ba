//! In-memory store implementation.
//!
//! Reference implementation of the [`Store`] façade backing the test suite
//! and in-process use. Records live in a vector indexed by link, with a
//! reverse hash index and one link vector per chain index.

use std::collections::HashMap;

use async_trait::async_trait;
use bitcoin::block::Header;
use bitcoin::constants::genesis_block;
use bitcoin::{Block, BlockHash, CompactTarget};

use crate::chain::ChainState;
use crate::config::Settings;
use crate::error::{StoreError, StoreResult};
use crate::store::{ArchiveItem, Store};
use crate::types::{HeaderState, Height, Link};

#[derive(Debug, Clone)]
struct Record {
    hash: BlockHash,
    header: Header,
    parent: Option<Link>,
    height: Height,
    state: HeaderState,
    block: Option<Block>,
}

/// In-memory header/block archive.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    records: Vec<Record>,
    by_hash: HashMap<BlockHash, Link>,
    candidate: Vec<Link>,
    confirmed: Vec<Link>,
}

impl MemoryStore {
    /// Create a store seeded with the given genesis header on both chain
    /// indexes.
    pub fn new(genesis: Header) -> Self {
        let hash = genesis.block_hash();
        let record = Record {
            hash,
            header: genesis,
            parent: None,
            height: 0,
            state: HeaderState::Unassociated,
            block: None,
        };
        Self {
            records: vec![record],
            by_hash: HashMap::from([(hash, Link(0))]),
            candidate: vec![Link(0)],
            confirmed: vec![Link(0)],
        }
    }

    /// Create a store seeded with the configured network's genesis block.
    pub fn with_genesis(settings: &Settings) -> Self {
        let genesis = genesis_block(settings.network);
        let mut store = Self::new(genesis.header);
        store.records[0].state = HeaderState::Associated;
        store.records[0].block = Some(genesis);
        store
    }

    /// Append `link` to the confirmed chain. In the full node this write
    /// belongs to the confirmation chaser.
    pub fn push_confirmed(&mut self, link: Link) -> StoreResult<()> {
        let height = self.record(link)?.height;
        if height as usize != self.confirmed.len() {
            return Err(StoreError::Integrity(format!(
                "confirmed push of height {height} onto top {}",
                self.confirmed.len().saturating_sub(1)
            )));
        }
        self.confirmed.push(link);
        Ok(())
    }

    /// Remove the confirmed chain top. In the full node this write belongs
    /// to the confirmation chaser.
    pub fn pop_confirmed(&mut self) -> StoreResult<()> {
        if self.confirmed.len() <= 1 {
            return Err(StoreError::Integrity("confirmed pop at genesis".to_string()));
        }
        self.confirmed.pop();
        Ok(())
    }

    /// Mark the header at `link` permanently unconfirmable. In the full node
    /// this write belongs to the validation chaser.
    pub fn set_block_unconfirmable(&mut self, link: Link) -> StoreResult<()> {
        self.record_mut(link)?.state = HeaderState::Unconfirmable;
        Ok(())
    }

    fn record(&self, link: Link) -> StoreResult<&Record> {
        self.records
            .get(link.0 as usize)
            .ok_or_else(|| StoreError::Integrity(format!("unknown {link}")))
    }

    fn record_mut(&mut self, link: Link) -> StoreResult<&mut Record> {
        self.records
            .get_mut(link.0 as usize)
            .ok_or_else(|| StoreError::Integrity(format!("unknown {link}")))
    }

    /// Links from genesis to `link`, parent first.
    fn path_to(&self, link: Link) -> StoreResult<Vec<Link>> {
        let mut path = vec![link];
        let mut current = link;
        while let Some(parent) = self.record(current)?.parent {
            path.push(parent);
            current = parent;
        }
        if self.record(current)?.height != 0 {
            return Err(StoreError::Corruption(format!(
                "parentless non-genesis header at {current}"
            )));
        }
        path.reverse();
        Ok(path)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn top_candidate(&self) -> StoreResult<Height> {
        Ok((self.candidate.len() - 1) as Height)
    }

    async fn top_confirmed(&self) -> StoreResult<Height> {
        Ok((self.confirmed.len() - 1) as Height)
    }

    async fn fork_point(&self) -> StoreResult<Height> {
        let top = self.candidate.len().min(self.confirmed.len()) - 1;
        for height in (0..=top).rev() {
            if self.candidate[height] == self.confirmed[height] {
                return Ok(height as Height);
            }
        }
        Err(StoreError::Corruption(
            "candidate and confirmed chains share no genesis".to_string(),
        ))
    }

    async fn to_header(&self, hash: &BlockHash) -> StoreResult<Option<Link>> {
        Ok(self.by_hash.get(hash).copied())
    }

    async fn to_parent(&self, link: Link) -> StoreResult<Option<Link>> {
        Ok(self.record(link)?.parent)
    }

    async fn to_candidate(&self, height: Height) -> StoreResult<Option<Link>> {
        Ok(self.candidate.get(height as usize).copied())
    }

    async fn to_confirmed(&self, height: Height) -> StoreResult<Option<Link>> {
        Ok(self.confirmed.get(height as usize).copied())
    }

    async fn get_height(&self, link: Link) -> StoreResult<Height> {
        Ok(self.record(link)?.height)
    }

    async fn get_bits(&self, link: Link) -> StoreResult<CompactTarget> {
        Ok(self.record(link)?.header.bits)
    }

    async fn get_timestamp(&self, link: Link) -> StoreResult<u32> {
        Ok(self.record(link)?.header.time)
    }

    async fn get_header_key(&self, link: Link) -> StoreResult<BlockHash> {
        Ok(self.record(link)?.hash)
    }

    async fn get_header(&self, link: Link) -> StoreResult<Header> {
        Ok(self.record(link)?.header)
    }

    async fn get_block(&self, link: Link) -> StoreResult<Option<Block>> {
        Ok(self.record(link)?.block.clone())
    }

    async fn get_header_state(&self, link: Link) -> StoreResult<HeaderState> {
        Ok(self.record(link)?.state)
    }

    async fn chain_state_at(
        &self,
        settings: &Settings,
        hash: &BlockHash,
    ) -> StoreResult<Option<ChainState>> {
        let Some(link) = self.by_hash.get(hash).copied() else {
            return Ok(None);
        };

        let path = self.path_to(link)?;
        let mut state = ChainState::genesis(&self.record(path[0])?.header, settings);
        for link in &path[1..] {
            state = state.advance(&self.record(*link)?.header, settings);
        }
        Ok(Some(state))
    }

    async fn is_candidate_header(&self, link: Link) -> StoreResult<bool> {
        let height = self.record(link)?.height;
        Ok(self.candidate.get(height as usize) == Some(&link))
    }

    async fn is_confirmed_block(&self, link: Link) -> StoreResult<bool> {
        let record = self.record(link)?;
        Ok(self.confirmed.get(record.height as usize) == Some(&link) && record.block.is_some())
    }

    async fn push_candidate(&mut self, link: Link) -> StoreResult<()> {
        let height = self.record(link)?.height;
        if height as usize != self.candidate.len() {
            return Err(StoreError::Integrity(format!(
                "candidate push of height {height} onto top {}",
                self.candidate.len() - 1
            )));
        }
        self.candidate.push(link);
        Ok(())
    }

    async fn pop_candidate(&mut self) -> StoreResult<()> {
        if self.candidate.len() <= 1 {
            return Err(StoreError::Integrity("candidate pop at genesis".to_string()));
        }
        self.candidate.pop();
        Ok(())
    }

    async fn set_link(&mut self, item: ArchiveItem<'_>, state: &ChainState) -> StoreResult<Link> {
        let header = *item.header();
        let hash = header.block_hash();

        if let Some(link) = self.by_hash.get(&hash).copied() {
            // Filling in a previously header-only slot.
            if let ArchiveItem::Block(block) = item {
                let record = self.record_mut(link)?;
                if record.state == HeaderState::Unassociated {
                    record.block = Some(block.clone());
                    record.state = HeaderState::Associated;
                }
            }
            return Ok(link);
        }

        let parent = self
            .by_hash
            .get(&header.prev_blockhash)
            .copied()
            .ok_or_else(|| {
                StoreError::Integrity(format!("archival of {hash} with unknown parent"))
            })?;

        let (block, header_state) = match item {
            ArchiveItem::Header(_) => (None, HeaderState::Unassociated),
            ArchiveItem::Block(block) => (Some(block.clone()), HeaderState::Associated),
        };

        let link = Link(self.records.len() as u32);
        self.records.push(Record {
            hash,
            header,
            parent: Some(parent),
            height: state.height(),
            state: header_state,
            block,
        });
        self.by_hash.insert(hash, link);
        Ok(link)
    }

    async fn set_disassociated(&mut self, link: Link) -> StoreResult<()> {
        let record = self.record_mut(link)?;
        record.block = None;
        record.state = HeaderState::Unassociated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{header, EASY_BITS};

    fn seeded() -> (MemoryStore, Settings) {
        let settings = Settings::regtest();
        (MemoryStore::with_genesis(&settings), settings)
    }

    async fn append_candidate(
        store: &mut MemoryStore,
        settings: &Settings,
        parent: &ChainState,
        nonce: u32,
    ) -> (Link, ChainState) {
        let next = header(parent.hash(), EASY_BITS, nonce);
        let state = parent.advance(&next, settings);
        let link = store
            .set_link(ArchiveItem::Header(&next), &state)
            .await
            .unwrap();
        store.push_candidate(link).await.unwrap();
        (link, state)
    }

    #[tokio::test]
    async fn test_genesis_seeding() {
        let (store, settings) = seeded();
        let genesis_hash = settings.genesis_header().block_hash();

        assert_eq!(store.top_candidate().await.unwrap(), 0);
        assert_eq!(store.top_confirmed().await.unwrap(), 0);
        assert_eq!(store.fork_point().await.unwrap(), 0);

        let link = store.to_header(&genesis_hash).await.unwrap().unwrap();
        assert_eq!(store.get_height(link).await.unwrap(), 0);
        assert_eq!(store.get_header_key(link).await.unwrap(), genesis_hash);
        assert!(store.to_parent(link).await.unwrap().is_none());
        assert!(store.is_candidate_header(link).await.unwrap());
        assert!(store.is_confirmed_block(link).await.unwrap());
    }

    #[tokio::test]
    async fn test_archive_and_candidate_index() {
        let (mut store, settings) = seeded();
        let genesis_state = store
            .chain_state_at(&settings, &settings.genesis_header().block_hash())
            .await
            .unwrap()
            .unwrap();

        let (link, state) = append_candidate(&mut store, &settings, &genesis_state, 1).await;

        assert_eq!(store.top_candidate().await.unwrap(), 1);
        assert_eq!(store.to_candidate(1).await.unwrap(), Some(link));
        assert_eq!(store.get_height(link).await.unwrap(), 1);
        assert_eq!(
            store.get_bits(link).await.unwrap(),
            CompactTarget::from_consensus(EASY_BITS)
        );
        assert_eq!(
            store.get_header_state(link).await.unwrap(),
            HeaderState::Unassociated
        );
        assert_eq!(
            store.to_parent(link).await.unwrap(),
            store
                .to_header(&settings.genesis_header().block_hash())
                .await
                .unwrap()
        );

        // The rolled state is reproducible from the archive.
        let rolled = store
            .chain_state_at(&settings, &state.hash())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rolled, state);
    }

    #[tokio::test]
    async fn test_push_pop_candidate_guards() {
        let (mut store, settings) = seeded();
        let genesis_state = store
            .chain_state_at(&settings, &settings.genesis_header().block_hash())
            .await
            .unwrap()
            .unwrap();

        assert!(store.pop_candidate().await.is_err());

        let (link, _) = append_candidate(&mut store, &settings, &genesis_state, 1).await;
        // Pushing the same height twice breaks the index contract.
        assert!(store.push_candidate(link).await.is_err());

        store.pop_candidate().await.unwrap();
        assert_eq!(store.top_candidate().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fork_point_tracks_divergence() {
        let (mut store, settings) = seeded();
        let genesis_state = store
            .chain_state_at(&settings, &settings.genesis_header().block_hash())
            .await
            .unwrap()
            .unwrap();

        let (a, state_a) = append_candidate(&mut store, &settings, &genesis_state, 1).await;
        let (_b, _) = append_candidate(&mut store, &settings, &state_a, 2).await;

        store.push_confirmed(a).unwrap();
        assert_eq!(store.fork_point().await.unwrap(), 1);
        assert_eq!(store.top_confirmed().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_block_association_lifecycle() {
        let (mut store, settings) = seeded();
        let genesis_state = store
            .chain_state_at(&settings, &settings.genesis_header().block_hash())
            .await
            .unwrap()
            .unwrap();
        let (link, state) = append_candidate(&mut store, &settings, &genesis_state, 1).await;

        let block = Block {
            header: store.get_header(link).await.unwrap(),
            txdata: Vec::new(),
        };
        let again = store
            .set_link(ArchiveItem::Block(&block), &state)
            .await
            .unwrap();

        assert_eq!(again, link);
        assert_eq!(
            store.get_header_state(link).await.unwrap(),
            HeaderState::Associated
        );
        assert!(store.get_block(link).await.unwrap().is_some());

        store.set_disassociated(link).await.unwrap();
        assert_eq!(
            store.get_header_state(link).await.unwrap(),
            HeaderState::Unassociated
        );
        assert!(store.get_block(link).await.unwrap().is_none());

        store.set_block_unconfirmable(link).unwrap();
        assert_eq!(
            store.get_header_state(link).await.unwrap(),
            HeaderState::Unconfirmable
        );
    }

    #[tokio::test]
    async fn test_unknown_parent_rejected() {
        let (mut store, settings) = seeded();
        let stray = header(
            header(settings.genesis_header().block_hash(), EASY_BITS, 9).block_hash(),
            EASY_BITS,
            10,
        );
        let genesis_state = store
            .chain_state_at(&settings, &settings.genesis_header().block_hash())
            .await
            .unwrap()
            .unwrap();
        let state = genesis_state.advance(&stray, &settings);

        assert!(store
            .set_link(ArchiveItem::Header(&stray), &state)
            .await
            .is_err());
        assert!(store
            .chain_state_at(&settings, &stray.block_hash())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_timestamp_query() {
        let (store, settings) = seeded();
        let link = store
            .to_header(&settings.genesis_header().block_hash())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            store.get_timestamp(link).await.unwrap(),
            settings.genesis_header().time
        );
    }
}
