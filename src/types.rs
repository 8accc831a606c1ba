//! Common type definitions for the chain organizer.

use serde::{Deserialize, Serialize};

/// Height of a header on a chain index, genesis being zero.
pub type Height = u32;

/// Opaque short identifier assigned to an archived header by the store.
///
/// Links are only meaningful to the store that issued them. The organizer
/// never fabricates links; it obtains them from store queries and hands them
/// back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Link(pub u32);

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "link_{}", self.0)
    }
}

/// Association state of an archived header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    /// Header archived without a block body.
    Unassociated,
    /// Header archived with its block body.
    Associated,
    /// Header permanently rejected; no body can confirm under it.
    Unconfirmable,
}

/// Counters describing organizer activity since start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizerStats {
    /// Payloads that topped the candidate chain.
    pub organized: u64,

    /// Submissions rejected as already known.
    pub duplicates: u64,

    /// Submissions with an unresolvable parent.
    pub orphans: u64,

    /// Payloads cached into the side tree.
    pub cached: u64,

    /// Reorganizations that popped at least one candidate.
    pub reorganizations: u64,

    /// Deepest pop performed by any single reorganization.
    pub max_reorg_depth: u32,

    /// Current number of side-tree entries.
    pub tree_size: u64,
}
