//! Store façade consumed by the organizer.
//!
//! The persistent header/block archive lives outside this crate. The
//! organizer consumes it through the narrow [`Store`] trait: read-only
//! queries over headers and the two chain indexes, plus the candidate-index
//! writes the organizer has exclusive access to (`push_candidate`,
//! `pop_candidate`, `set_link`). Other chasers only write the confirmed index
//! and block-body association tables.

pub mod memory;

use async_trait::async_trait;

use bitcoin::block::Header;
use bitcoin::{Block, BlockHash, CompactTarget};

use crate::chain::ChainState;
use crate::config::Settings;
use crate::error::StoreResult;
use crate::types::{HeaderState, Height, Link};

pub use memory::MemoryStore;

/// A payload handed to the store for archival.
#[derive(Debug, Clone, Copy)]
pub enum ArchiveItem<'a> {
    Header(&'a Header),
    Block(&'a Block),
}

impl ArchiveItem<'_> {
    pub fn header(&self) -> &Header {
        match self {
            ArchiveItem::Header(header) => header,
            ArchiveItem::Block(block) => &block.header,
        }
    }
}

/// Narrow façade over the append-only header/block archive.
///
/// Link-keyed getters fail with a store error on an invalid link; queries
/// that can legitimately miss return `None`.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Height of the candidate chain top.
    async fn top_candidate(&self) -> StoreResult<Height>;

    /// Height of the confirmed chain top.
    async fn top_confirmed(&self) -> StoreResult<Height>;

    /// Largest height at which candidate and confirmed chains agree.
    async fn fork_point(&self) -> StoreResult<Height>;

    /// Link of the archived header with the given hash.
    async fn to_header(&self, hash: &BlockHash) -> StoreResult<Option<Link>>;

    /// Link of the parent header; `None` at genesis.
    async fn to_parent(&self, link: Link) -> StoreResult<Option<Link>>;

    /// Link of the candidate header at `height`.
    async fn to_candidate(&self, height: Height) -> StoreResult<Option<Link>>;

    /// Link of the confirmed header at `height`.
    async fn to_confirmed(&self, height: Height) -> StoreResult<Option<Link>>;

    /// Archived height of the header at `link`.
    async fn get_height(&self, link: Link) -> StoreResult<Height>;

    /// Compact target of the header at `link`.
    async fn get_bits(&self, link: Link) -> StoreResult<CompactTarget>;

    /// Timestamp of the header at `link`.
    async fn get_timestamp(&self, link: Link) -> StoreResult<u32>;

    /// Hash of the header at `link`.
    async fn get_header_key(&self, link: Link) -> StoreResult<BlockHash>;

    /// The header at `link`.
    async fn get_header(&self, link: Link) -> StoreResult<Header>;

    /// The block body at `link`, if one is associated.
    async fn get_block(&self, link: Link) -> StoreResult<Option<Block>>;

    /// Association state of the header at `link`.
    async fn get_header_state(&self, link: Link) -> StoreResult<HeaderState>;

    /// Chain state rolled to the header with the given hash.
    ///
    /// Chain-independent: the header need not be on the candidate chain,
    /// because an earlier reorganization may have bypassed it.
    async fn chain_state_at(
        &self,
        settings: &Settings,
        hash: &BlockHash,
    ) -> StoreResult<Option<ChainState>>;

    /// True when `link` sits on the candidate chain at its height.
    async fn is_candidate_header(&self, link: Link) -> StoreResult<bool>;

    /// True when `link` sits on the confirmed chain with a block body.
    async fn is_confirmed_block(&self, link: Link) -> StoreResult<bool>;

    /// Append `link` to the candidate chain. The link's archived height must
    /// be the next candidate height.
    async fn push_candidate(&mut self, link: Link) -> StoreResult<()>;

    /// Remove the candidate chain top. Genesis cannot be popped.
    async fn pop_candidate(&mut self) -> StoreResult<()>;

    /// Archive a payload with its rolled chain state, returning its link.
    /// Archiving a block under an already stored unassociated header
    /// associates the body and returns the existing link.
    async fn set_link(&mut self, item: ArchiveItem<'_>, state: &ChainState) -> StoreResult<Link>;

    /// Detach the block body from the header at `link`, returning the header
    /// to the unassociated state.
    async fn set_disassociated(&mut self, link: Link) -> StoreResult<()>;
}
