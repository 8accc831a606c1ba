//! Checkpoint and milestone bypass tracking.
//!
//! Validation is skipped for candidate heights at or below the bypass
//! extent: the top configured checkpoint, or the active milestone once the
//! candidate chain has confirmed the configured milestone header. The
//! checkpoint threshold is immutable; the milestone threshold activates when
//! its exact `(hash, height)` is seen on the candidate chain and is clamped
//! back when a reorganization pops below it.

use bitcoin::BlockHash;
use tracing::{debug, info};

use crate::chain::checkpoints::Checkpoints;
use crate::types::Height;

/// Optional single soft checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestone {
    pub height: Height,
    pub hash: BlockHash,
}

impl Milestone {
    pub fn new(height: Height, hash: BlockHash) -> Self {
        Self { height, hash }
    }
}

/// Tracks the two bypass thresholds.
#[derive(Debug)]
pub struct BypassTracker {
    checkpoint_height: Height,
    milestone: Option<Milestone>,
    active_milestone: Height,
}

impl BypassTracker {
    pub fn new(checkpoints: &Checkpoints, milestone: Option<Milestone>) -> Self {
        Self {
            checkpoint_height: checkpoints.top_height(),
            milestone,
            active_milestone: 0,
        }
    }

    pub fn is_under_checkpoint(&self, height: Height) -> bool {
        height <= self.checkpoint_height
    }

    pub fn is_under_milestone(&self, height: Height) -> bool {
        self.active_milestone != 0 && height <= self.active_milestone
    }

    /// True when validation may be skipped at `height`.
    pub fn is_bypassed(&self, height: Height) -> bool {
        self.is_under_checkpoint(height) || self.is_under_milestone(height)
    }

    /// The height published with `Bypass` events.
    pub fn extent(&self) -> Height {
        self.active_milestone.max(self.checkpoint_height)
    }

    pub fn active_milestone(&self) -> Height {
        self.active_milestone
    }

    /// Height of the configured milestone, if any.
    pub fn milestone_height(&self) -> Option<Height> {
        self.milestone.map(|milestone| milestone.height)
    }

    /// True when `(hash, height)` is exactly the configured milestone.
    pub fn matches(&self, hash: &BlockHash, height: Height) -> bool {
        self.milestone
            .map(|milestone| milestone.height == height && milestone.hash == *hash)
            .unwrap_or(false)
    }

    /// Activate the milestone found on the candidate chain at startup.
    pub fn activate(&mut self, height: Height) {
        debug_assert_eq!(self.active_milestone, 0);
        info!(height, "milestone active");
        self.active_milestone = height;
    }

    /// Activate the milestone when the pushed item is exactly the configured
    /// one. Returns true when the threshold changed.
    pub fn update(&mut self, hash: &BlockHash, height: Height) -> bool {
        if !self.matches(hash, height) || self.active_milestone == height {
            return false;
        }

        // Nonzero only when a reorg clamped the milestone to its branch
        // point and the milestone header is now being re-pushed.
        debug_assert!(self.active_milestone < height);
        info!(height, "milestone active");
        self.active_milestone = height;
        true
    }

    /// Clamp the active milestone down to `branch_point`, preserving bypass
    /// for the untouched prefix. Returns true when the threshold changed.
    pub fn reset(&mut self, branch_point: Height) -> bool {
        if self.active_milestone <= branch_point {
            return false;
        }

        debug!(
            from = self.active_milestone,
            to = branch_point,
            "milestone reset"
        );
        self.active_milestone = branch_point;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::checkpoints::Checkpoint;
    use bitcoin::hashes::Hash;

    fn hash(byte: u8) -> BlockHash {
        BlockHash::from_byte_array([byte; 32])
    }

    fn tracker(checkpoint: Height, milestone: Option<Milestone>) -> BypassTracker {
        let checkpoints = if checkpoint == 0 {
            Checkpoints::default()
        } else {
            Checkpoints::new(vec![Checkpoint::new(checkpoint, hash(0xcc))])
        };
        BypassTracker::new(&checkpoints, milestone)
    }

    #[test]
    fn test_checkpoint_threshold() {
        let tracker = tracker(100, None);

        assert!(tracker.is_under_checkpoint(100));
        assert!(!tracker.is_under_checkpoint(101));
        assert_eq!(tracker.extent(), 100);
    }

    #[test]
    fn test_inactive_milestone_covers_nothing() {
        let tracker = tracker(0, Some(Milestone::new(500, hash(5))));

        assert!(!tracker.is_under_milestone(1));
        assert!(!tracker.is_bypassed(1));
        assert_eq!(tracker.extent(), 0);
    }

    #[test]
    fn test_update_activates_on_exact_match() {
        let mut tracker = tracker(0, Some(Milestone::new(500, hash(5))));

        assert!(!tracker.update(&hash(9), 500));
        assert!(!tracker.update(&hash(5), 400));
        assert!(tracker.update(&hash(5), 500));
        assert!(tracker.is_under_milestone(500));
        assert!(!tracker.is_under_milestone(501));
        assert_eq!(tracker.extent(), 500);

        // Re-pushing the already active milestone changes nothing.
        assert!(!tracker.update(&hash(5), 500));
    }

    #[test]
    fn test_reset_clamps_to_branch_point() {
        let mut tracker = tracker(0, Some(Milestone::new(500, hash(5))));
        tracker.activate(500);

        assert!(tracker.reset(120));
        assert_eq!(tracker.active_milestone(), 120);
        assert!(tracker.is_under_milestone(120));
        assert!(!tracker.is_under_milestone(121));

        // Resetting at or above the active value is a no-op.
        assert!(!tracker.reset(120));
        assert!(!tracker.reset(400));
    }

    #[test]
    fn test_reactivation_after_clamp() {
        let mut tracker = tracker(0, Some(Milestone::new(500, hash(5))));
        tracker.activate(500);
        tracker.reset(120);

        assert!(tracker.update(&hash(5), 500));
        assert_eq!(tracker.active_milestone(), 500);
    }

    #[test]
    fn test_extent_takes_maximum() {
        let mut tracker = tracker(100, Some(Milestone::new(500, hash(5))));

        assert_eq!(tracker.extent(), 100);
        tracker.activate(500);
        assert_eq!(tracker.extent(), 500);
        tracker.reset(50);
        assert_eq!(tracker.extent(), 100);
    }
}
