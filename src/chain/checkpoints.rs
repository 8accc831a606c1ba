//! Checkpoints pin specific block hashes at specific heights.
//!
//! A configured checkpoint is consensus-critical: a branch presenting a
//! different hash at a checkpointed height is rejected outright, and
//! everything at or below the top checkpoint bypasses block validation.

use bitcoin::BlockHash;

use crate::types::Height;

/// One pinned `(hash, height)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub height: Height,
    pub hash: BlockHash,
}

impl Checkpoint {
    pub fn new(height: Height, hash: BlockHash) -> Self {
        Self { height, hash }
    }
}

/// Checkpoint collection ordered by height, lowest first.
#[derive(Debug, Clone, Default)]
pub struct Checkpoints {
    checkpoints: Vec<Checkpoint>,
}

impl Checkpoints {
    pub fn new(mut checkpoints: Vec<Checkpoint>) -> Self {
        checkpoints.sort_by_key(|checkpoint| checkpoint.height);
        Self { checkpoints }
    }

    /// True when `(hash, height)` contradicts a configured checkpoint.
    pub fn is_conflict(&self, hash: &BlockHash, height: Height) -> bool {
        self.get(height)
            .map(|checkpoint| checkpoint.hash != *hash)
            .unwrap_or(false)
    }

    /// True when `height` is at or below the top checkpoint.
    pub fn is_under(&self, height: Height) -> bool {
        height <= self.top_height()
    }

    /// Height of the highest checkpoint, zero when none are configured.
    pub fn top_height(&self) -> Height {
        self.checkpoints
            .last()
            .map(|checkpoint| checkpoint.height)
            .unwrap_or(0)
    }

    pub fn get(&self, height: Height) -> Option<&Checkpoint> {
        self.checkpoints
            .binary_search_by_key(&height, |checkpoint| checkpoint.height)
            .ok()
            .map(|index| &self.checkpoints[index])
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;

    fn hash(byte: u8) -> BlockHash {
        BlockHash::from_byte_array([byte; 32])
    }

    fn sample() -> Checkpoints {
        // Deliberately unsorted input.
        Checkpoints::new(vec![
            Checkpoint::new(100, hash(1)),
            Checkpoint::new(10, hash(2)),
            Checkpoint::new(50, hash(3)),
        ])
    }

    #[test]
    fn test_conflict_detection() {
        let checkpoints = sample();

        assert!(!checkpoints.is_conflict(&hash(1), 100));
        assert!(checkpoints.is_conflict(&hash(9), 100));
        // Heights without a checkpoint never conflict.
        assert!(!checkpoints.is_conflict(&hash(9), 99));
    }

    #[test]
    fn test_is_under_top_checkpoint() {
        let checkpoints = sample();

        assert!(checkpoints.is_under(0));
        assert!(checkpoints.is_under(100));
        assert!(!checkpoints.is_under(101));
    }

    #[test]
    fn test_empty_checkpoints() {
        let checkpoints = Checkpoints::default();

        assert_eq!(checkpoints.top_height(), 0);
        assert!(checkpoints.is_under(0));
        assert!(!checkpoints.is_under(1));
        assert!(!checkpoints.is_conflict(&hash(1), 0));
    }

    #[test]
    fn test_lookup_after_sorting() {
        let checkpoints = sample();

        assert_eq!(checkpoints.get(10).unwrap().hash, hash(2));
        assert_eq!(checkpoints.get(50).unwrap().hash, hash(3));
        assert!(checkpoints.get(11).is_none());
    }
}
