//! In-memory side tree of valid-but-weak branches.
//!
//! Branches that are connectable but not yet strong enough to displace the
//! candidate chain wait here, keyed by block hash. The tree is a forest: each
//! entry's parent is another entry, the cached top-candidate state, or a
//! header resolvable in the store. There is no internal eviction; admission
//! is controlled upstream by the storability rule.

use std::collections::HashMap;
use std::sync::Arc;

use bitcoin::BlockHash;
use tracing::trace;

use crate::chain::state::ChainState;

/// A cached payload and the chain state rolled to it.
#[derive(Debug, Clone)]
pub struct TreeEntry<P> {
    pub payload: P,
    pub state: Arc<ChainState>,
}

/// Map from block hash to cached entry.
#[derive(Debug)]
pub struct SideTree<P> {
    entries: HashMap<BlockHash, TreeEntry<P>>,
}

impl<P> SideTree<P> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Cache a payload under the hash its state was rolled to.
    pub fn insert(&mut self, payload: P, state: Arc<ChainState>) {
        let hash = state.hash();
        trace!(%hash, height = state.height(), "caching side tree entry");
        let previous = self.entries.insert(hash, TreeEntry { payload, state });
        debug_assert!(previous.is_none(), "side tree entry replaced");
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn get(&self, hash: &BlockHash) -> Option<&TreeEntry<P>> {
        self.entries.get(hash)
    }

    /// Remove and return an entry, typically for promotion to the store.
    pub fn extract(&mut self, hash: &BlockHash) -> Option<TreeEntry<P>> {
        self.entries.remove(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P> Default for SideTree<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::test_utils::{header, EASY_BITS};
    use bitcoin::constants::genesis_block;
    use bitcoin::Network;

    fn entry_for(nonce: u32) -> (bitcoin::block::Header, Arc<ChainState>) {
        let settings = Settings::regtest();
        let genesis = genesis_block(Network::Regtest).header;
        let root = ChainState::genesis(&genesis, &settings);
        let h = header(genesis.block_hash(), EASY_BITS, nonce);
        let state = Arc::new(root.advance(&h, &settings));
        (h, state)
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut tree = SideTree::new();
        let (h, state) = entry_for(1);
        let hash = h.block_hash();

        tree.insert(h, state);

        assert!(tree.contains(&hash));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(&hash).unwrap().state.height(), 1);
    }

    #[test]
    fn test_extract_removes() {
        let mut tree = SideTree::new();
        let (h, state) = entry_for(1);
        let hash = h.block_hash();
        tree.insert(h, state);

        let entry = tree.extract(&hash).unwrap();

        assert_eq!(entry.state.hash(), hash);
        assert!(!tree.contains(&hash));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_missing_lookup() {
        let tree: SideTree<bitcoin::block::Header> = SideTree::new();
        let (h, _) = entry_for(2);

        assert!(tree.get(&h.block_hash()).is_none());
    }
}
