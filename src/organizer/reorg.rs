//! Branch-work accumulation, the strongness test, and the reorg executor.

use bitcoin::block::Header;
use bitcoin::pow::Work;
use tracing::{debug, info};

use crate::chain::{proof, BranchWork, ChainState};
use crate::error::FatalError;
use crate::events::Event;
use crate::organizer::engine::Organizer;
use crate::organizer::mode::Mode;
use crate::store::Store;
use std::sync::Arc;

impl<M: Mode, S: Store> Organizer<M, S> {
    /// Sum of proof from `header` back to the branch point (excluded),
    /// walking the side tree first and the store second.
    ///
    /// Also collects the ordered branch for the reorg executor: tree hashes
    /// and store links, both tip first.
    pub(super) async fn branch_work(&self, header: &Header) -> Result<BranchWork, FatalError> {
        let mut work = proof(header.bits);
        let mut previous = header.prev_blockhash;
        let mut tree_branch = Vec::new();

        while let Some(entry) = self.tree.get(&previous) {
            let cached = M::header(&entry.payload);
            tree_branch.push(entry.state.hash());
            work = work + proof(cached.bits);
            previous = cached.prev_blockhash;
        }

        let mut store_branch = Vec::new();
        let mut link = self
            .store
            .to_header(&previous)
            .await?
            .ok_or(FatalError::BranchWork)?;
        while !self.store.is_candidate_header(link).await? {
            let bits = self.store.get_bits(link).await?;
            store_branch.push(link);
            work = work + proof(bits);
            link = self
                .store
                .to_parent(link)
                .await?
                .ok_or(FatalError::BranchWork)?;
        }

        // The candidate header terminating the walk is the branch point.
        let branch_point = self.store.get_height(link).await?;
        Ok(BranchWork {
            work,
            branch_point,
            tree_branch,
            store_branch,
        })
    }

    /// Branch with strictly greater work than the candidate suffix above the
    /// branch point reorganizes the candidate chain. Ties keep the incumbent.
    pub(super) async fn is_strong(&self, branch: &BranchWork) -> Result<bool, FatalError> {
        let top = self.store.top_candidate().await?;
        let mut candidate_work: Option<Work> = None;

        for height in ((branch.branch_point + 1)..=top).rev() {
            let link = self
                .store
                .to_candidate(height)
                .await?
                .ok_or(FatalError::Strength)?;
            let bits = self.store.get_bits(link).await?;

            let accumulated = match candidate_work {
                Some(work) => work + proof(bits),
                None => proof(bits),
            };
            if accumulated >= branch.work {
                return Ok(false);
            }
            candidate_work = Some(accumulated);
        }

        Ok(true)
    }

    /// Pop the candidate chain to the branch point and push the new branch:
    /// store links, then tree entries, then the incoming tip, parent first.
    pub(super) async fn execute_reorg(
        &mut self,
        payload: M::Payload,
        state: &Arc<ChainState>,
        branch: BranchWork,
    ) -> Result<(), FatalError> {
        let old_top = self
            .state
            .as_ref()
            .map(|state| state.height())
            .ok_or_else(|| Self::integrity("reorg before start"))?;
        let branch_point = branch.branch_point;
        if branch_point > old_top {
            return Err(FatalError::InvalidBranchPoint {
                branch_point,
                top: old_top,
            });
        }

        if branch_point < old_top {
            info!(
                branch_point,
                old_top,
                new_top = state.height(),
                "reorganizing candidate chain"
            );
        }

        // Pop down to the branch point.
        for height in ((branch_point + 1)..=old_top).rev() {
            self.store.pop_candidate().await?;
            self.bus.emit(&[M::reorganized(height)]);
        }

        // A milestone above the branch point no longer names a candidate.
        if self.bypass.reset(branch_point) {
            self.notify_bypass(branch_point, old_top);
        }

        // Push stored branch headers back onto the candidate chain.
        let mut height = branch_point + 1;
        for link in branch.store_branch.iter().rev() {
            self.store.push_candidate(*link).await?;
            self.bus.emit(&[M::organized(height)]);
            self.update_milestone_link(*link, height).await?;
            height += 1;
        }

        // Promote tree branch entries to the store and candidate chain.
        for key in branch.tree_branch.iter().rev() {
            let entry = self
                .tree
                .extract(key)
                .ok_or_else(|| Self::integrity("side tree branch entry vanished"))?;
            let link = self
                .store
                .set_link(M::archive_item(&entry.payload), &entry.state)
                .await?;
            self.store.push_candidate(link).await?;
            self.bus.emit(&[M::organized(height)]);
            self.update_milestone(key, height);
            height += 1;
        }

        // Push the incoming payload as the new candidate top.
        let link = self
            .store
            .set_link(M::archive_item(&payload), state)
            .await?;
        self.store.push_candidate(link).await?;
        self.bus.emit(&[M::organized(height)]);
        self.update_milestone(&state.hash(), height);

        // Kick the downstream chasers. The bypass above, when emitted, is
        // observable before this bump.
        self.bus
            .emit(&[Event::Bump {
                height: branch_point + 1,
            }]);
        self.bus.emit(&[M::chase(branch_point)]);
        if branch_point < old_top {
            self.bus.emit(&[Event::Regressed { branch_point }]);
            self.stats.reorganizations += 1;
            self.stats.max_reorg_depth = self.stats.max_reorg_depth.max(old_top - branch_point);
        }

        debug!(
            height = state.height(),
            hash = %state.hash(),
            "candidate top advanced"
        );
        Ok(())
    }
}
