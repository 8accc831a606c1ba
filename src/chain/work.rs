//! Proof-of-work accounting for branch comparison.

use bitcoin::pow::Work;
use bitcoin::{CompactTarget, Target};

use crate::types::{Height, Link};

/// Expected work to produce a header meeting the compact target `bits`.
pub fn proof(bits: CompactTarget) -> Work {
    Target::from_compact(bits).to_work()
}

/// Result of walking an incoming header back to the candidate chain.
///
/// `tree_branch` and `store_branch` are tip-first; the reorg executor
/// iterates them in reverse to push parent-first.
#[derive(Debug, Clone)]
pub struct BranchWork {
    /// Accumulated proof from the incoming header down to, excluding, the
    /// branch point.
    pub work: Work,
    /// Height of the highest candidate header the branch attaches to.
    pub branch_point: Height,
    /// Side-tree hashes on the branch, tip first.
    pub tree_branch: Vec<bitcoin::BlockHash>,
    /// Stored non-candidate links on the branch, tip first.
    pub store_branch: Vec<Link>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harder_target_means_more_work() {
        let easy = proof(CompactTarget::from_consensus(0x207fffff));
        let hard = proof(CompactTarget::from_consensus(0x201fffff));

        assert!(hard > easy);
    }

    #[test]
    fn test_work_accumulates() {
        let unit = proof(CompactTarget::from_consensus(0x207fffff));
        let double = unit + unit;

        assert!(double > unit);
        assert_eq!(double, unit + unit);
    }

    #[test]
    fn test_quartered_target_roughly_quadruples_work() {
        let unit = proof(CompactTarget::from_consensus(0x207fffff));
        let quad = proof(CompactTarget::from_consensus(0x201fffff));

        // Strictly more than three units, as used by the reorg tests to
        // outweigh short candidate chains.
        assert!(quad > unit + unit + unit);
    }
}
