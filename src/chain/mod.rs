//! Chain primitives for the organizer.
//!
//! This module provides the building blocks the organize pipeline composes:
//! - per-height consensus context and its roller
//! - the in-memory side tree of weak branches
//! - proof-of-work accounting for branch comparison
//! - checkpoint and milestone bypass tracking

pub mod bypass;
pub mod checkpoints;
pub mod state;
pub mod tree;
pub mod work;

pub use bypass::{BypassTracker, Milestone};
pub use checkpoints::{Checkpoint, Checkpoints};
pub use state::ChainState;
pub use tree::{SideTree, TreeEntry};
pub use work::{proof, BranchWork};
